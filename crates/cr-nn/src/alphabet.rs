// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::error::{RnnError, RnnResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Sorted set of distinct characters mapped to dense indices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<char>", into = "Vec<char>")]
pub struct Alphabet {
    symbols: Vec<char>,
    index: HashMap<char, usize>,
}

impl Alphabet {
    /// Collects every distinct character of `text` in ascending order.
    pub fn from_text(text: &str) -> Self {
        let symbols: Vec<char> = text.chars().collect::<BTreeSet<_>>().into_iter().collect();
        Self::from_sorted(symbols)
    }

    fn from_sorted(symbols: Vec<char>) -> Self {
        let index = symbols.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        Self { symbols, index }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    pub fn contains(&self, c: char) -> bool {
        self.index.contains_key(&c)
    }

    pub fn char_to_index(&self, c: char) -> RnnResult<usize> {
        self.index
            .get(&c)
            .copied()
            .ok_or(RnnError::CharacterNotInAlphabet(c))
    }

    pub fn index_to_char(&self, index: usize) -> RnnResult<char> {
        self.symbols
            .get(index)
            .copied()
            .ok_or(RnnError::IndexOutOfVocabulary {
                index,
                vocabulary: self.symbols.len(),
            })
    }

    pub fn encode(&self, text: &str) -> RnnResult<Vec<usize>> {
        text.chars().map(|c| self.char_to_index(c)).collect()
    }

    pub fn decode(&self, indices: &[usize]) -> RnnResult<String> {
        indices.iter().map(|&i| self.index_to_char(i)).collect()
    }
}

impl TryFrom<Vec<char>> for Alphabet {
    type Error = RnnError;

    fn try_from(symbols: Vec<char>) -> Result<Self, Self::Error> {
        if symbols.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(RnnError::BadTrainingSet(
                "alphabet symbols must be strictly ascending".to_string(),
            ));
        }
        Ok(Self::from_sorted(symbols))
    }
}

impl From<Alphabet> for Vec<char> {
    fn from(alphabet: Alphabet) -> Self {
        alphabet.symbols
    }
}
