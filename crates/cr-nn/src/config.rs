// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::error::RnnResult;
use crate::layer::MIN_TEMPERATURE;
use crate::network::MultiLayerNetwork;
use cr_tensor::RandomSource;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_HIDDEN_SIZE: usize = 50;
pub const DEFAULT_LAYERS: usize = 2;
pub const DEFAULT_SEQUENCE_LENGTH: usize = 50;
pub const DEFAULT_LEARNING_RATE: f64 = 0.1;
pub const DEFAULT_SAMPLING_TEMPERATURE: f64 = 1.0;
pub const DEFAULT_SAMPLE_LENGTH: usize = 200;
pub const DEFAULT_INPUT_FILE: &str = "input.txt";

/// Training and sampling options, stored as JSON. Missing fields take their
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RnnConfig {
    /// Hidden width of every layer.
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,
    #[serde(default = "default_layers")]
    pub layers: usize,
    /// Symbols unrolled per training step.
    #[serde(default = "default_sequence_length", alias = "window")]
    pub sequence_length: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// In `(0, 1]`; lower is more conservative.
    #[serde(default = "default_sampling_temperature", alias = "temperature")]
    pub sampling_temperature: f64,
    /// Characters printed per progress sample.
    #[serde(default = "default_sample_length")]
    pub sample_length: usize,
    #[serde(default = "default_input_file")]
    pub input_file: PathBuf,
    /// Fixed seed for weights and sampling. `None` defers to the process-wide
    /// determinism settings.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_hidden_size() -> usize {
    DEFAULT_HIDDEN_SIZE
}

fn default_layers() -> usize {
    DEFAULT_LAYERS
}

fn default_sequence_length() -> usize {
    DEFAULT_SEQUENCE_LENGTH
}

fn default_learning_rate() -> f64 {
    DEFAULT_LEARNING_RATE
}

fn default_sampling_temperature() -> f64 {
    DEFAULT_SAMPLING_TEMPERATURE
}

fn default_sample_length() -> usize {
    DEFAULT_SAMPLE_LENGTH
}

fn default_input_file() -> PathBuf {
    PathBuf::from(DEFAULT_INPUT_FILE)
}

impl Default for RnnConfig {
    fn default() -> Self {
        Self {
            hidden_size: DEFAULT_HIDDEN_SIZE,
            layers: DEFAULT_LAYERS,
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            learning_rate: DEFAULT_LEARNING_RATE,
            sampling_temperature: DEFAULT_SAMPLING_TEMPERATURE,
            sample_length: DEFAULT_SAMPLE_LENGTH,
            input_file: default_input_file(),
            seed: None,
        }
    }
}

impl RnnConfig {
    /// Replaces out-of-range values with their defaults and returns the names
    /// of the fields that were reset.
    pub fn sanitize(&mut self) -> Vec<&'static str> {
        let mut reset = Vec::new();
        if self.hidden_size == 0 {
            self.hidden_size = DEFAULT_HIDDEN_SIZE;
            reset.push("hidden_size");
        }
        if self.layers == 0 {
            self.layers = DEFAULT_LAYERS;
            reset.push("layers");
        }
        if self.sequence_length == 0 {
            self.sequence_length = DEFAULT_SEQUENCE_LENGTH;
            reset.push("sequence_length");
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            self.learning_rate = DEFAULT_LEARNING_RATE;
            reset.push("learning_rate");
        }
        let t = self.sampling_temperature;
        if !(t.is_finite() && t >= MIN_TEMPERATURE && t <= 1.0) {
            self.sampling_temperature = DEFAULT_SAMPLING_TEMPERATURE;
            reset.push("sampling_temperature");
        }
        if self.sample_length == 0 {
            self.sample_length = DEFAULT_SAMPLE_LENGTH;
            reset.push("sample_length");
        }
        for field in &reset {
            warn!(field = *field, "config value out of range, using the default");
        }
        reset
    }

    /// Reads and sanitises a JSON config.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> RnnResult<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let mut config: RnnConfig = serde_json::from_str(&raw)?;
        config.sanitize();
        Ok(config)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> RnnResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn hidden_sizes(&self) -> Vec<usize> {
        vec![self.hidden_size; self.layers]
    }

    /// An uninitialized network with this layout and learning rate.
    pub fn build_network(&self) -> RnnResult<MultiLayerNetwork> {
        MultiLayerNetwork::new(self.hidden_sizes(), self.learning_rate)
    }

    pub fn random_source(&self) -> RandomSource {
        RandomSource::new(self.seed)
    }
}
