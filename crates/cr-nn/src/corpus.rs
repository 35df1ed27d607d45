// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::alphabet::Alphabet;
use crate::error::{RnnError, RnnResult};
use crate::trainer::{TokenSource, TokenWindow};
use std::fs;
use std::path::Path;
use tracing::debug;

/// A text encoded against its own [`Alphabet`].
#[derive(Clone, Debug, PartialEq)]
pub struct TextCorpus {
    alphabet: Alphabet,
    indices: Vec<usize>,
}

impl TextCorpus {
    pub fn from_text(text: &str) -> Self {
        let alphabet = Alphabet::from_text(text);
        let indices = text
            .chars()
            .filter_map(|c| alphabet.char_to_index(c).ok())
            .collect();
        Self { alphabet, indices }
    }

    /// Reads a UTF-8 file. Lines are re-joined with `\n`, so `\r\n` endings
    /// and the trailing newline do not leak into the alphabet.
    pub fn from_file<P: AsRef<Path>>(path: P) -> RnnResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let text = raw.lines().collect::<Vec<_>>().join("\n");
        let corpus = Self::from_text(&text);
        debug!(
            path = %path.display(),
            symbols = corpus.indices.len(),
            vocabulary = corpus.alphabet.len(),
            "loaded text corpus"
        );
        Ok(corpus)
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl TokenSource for TextCorpus {
    fn extract(&self, offset: usize, window: usize) -> RnnResult<TokenWindow> {
        if window == 0 {
            return Err(RnnError::InvalidSize {
                what: "training window",
                value: 0,
            });
        }
        let available = self.indices.len();
        let end = offset.saturating_add(window);
        if end.saturating_add(1) > available {
            return Err(RnnError::NoMoreTrainingData {
                offset,
                window,
                available,
            });
        }
        Ok(TokenWindow {
            inputs: self.indices[offset..end].to_vec(),
            targets: self.indices[offset + 1..end + 1].to_vec(),
        })
    }

    fn len(&self) -> usize {
        self.indices.len()
    }

    fn vocabulary_size(&self) -> usize {
        self.alphabet.len()
    }
}
