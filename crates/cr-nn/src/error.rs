// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use cr_tensor::MatrixError;
use thiserror::Error;

/// Result alias used throughout the network crate.
pub type RnnResult<T> = Result<T, RnnError>;

/// Coarse classification of [`RnnError`] values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Programming errors: bad sizes, shapes, call order or hyperparameters.
    Configuration,
    /// Data errors: indices outside the vocabulary, malformed encodings,
    /// unusable training sets.
    Domain,
    /// The token source ran out of data. Recoverable by looping around.
    Exhausted,
    /// Filesystem or serialization failures.
    Io,
}

/// Errors emitted by layers, networks, trainers and their collaborators.
#[derive(Debug, Error)]
pub enum RnnError {
    #[error(transparent)]
    Matrix(#[from] MatrixError),
    #[error("{what} must be positive, got {value}")]
    InvalidSize { what: &'static str, value: usize },
    #[error("learning rate must be positive and finite, got {0}")]
    InvalidLearningRate(f64),
    #[error("stacked layers disagree on the learning rate: expected {expected}, got {got}")]
    LearningRateMismatch { expected: f64, got: f64 },
    #[error("sampling temperature must be finite and at least {min}, got {value}")]
    InvalidTemperature { value: f64, min: f64 },
    #[error("{0} is not initialized")]
    Uninitialized(&'static str),
    #[error("{0} must not be empty")]
    EmptySequence(&'static str),
    #[error("{what}: expected length {expected}, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{what}: expected width {expected}, got {got}")]
    WidthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("index {index} is outside the vocabulary of size {vocabulary}")]
    IndexOutOfVocabulary { index: usize, vocabulary: usize },
    #[error("character {0:?} is not part of the alphabet")]
    CharacterNotInAlphabet(char),
    #[error("bad training set: {0}")]
    BadTrainingSet(String),
    #[error("no more training data: window of {window} at offset {offset} runs past {available} symbols")]
    NoMoreTrainingData {
        offset: usize,
        window: usize,
        available: usize,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RnnError {
    /// Classifies the error so callers can tell bugs from data problems and
    /// from plain exhaustion.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RnnError::Matrix(MatrixError::InvalidOneHot(_)) => ErrorKind::Domain,
            RnnError::Matrix(_)
            | RnnError::InvalidSize { .. }
            | RnnError::InvalidLearningRate(_)
            | RnnError::LearningRateMismatch { .. }
            | RnnError::InvalidTemperature { .. }
            | RnnError::Uninitialized(_)
            | RnnError::EmptySequence(_)
            | RnnError::LengthMismatch { .. }
            | RnnError::WidthMismatch { .. } => ErrorKind::Configuration,
            RnnError::IndexOutOfVocabulary { .. }
            | RnnError::CharacterNotInAlphabet(_)
            | RnnError::BadTrainingSet(_) => ErrorKind::Domain,
            RnnError::NoMoreTrainingData { .. } => ErrorKind::Exhausted,
            RnnError::Io(_) | RnnError::Serialization(_) => ErrorKind::Io,
        }
    }

    /// Returns `true` for [`RnnError::NoMoreTrainingData`].
    pub fn is_exhausted(&self) -> bool {
        self.kind() == ErrorKind::Exhausted
    }
}
