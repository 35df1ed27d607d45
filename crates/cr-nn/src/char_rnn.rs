// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::alphabet::Alphabet;
use crate::error::{RnnError, RnnResult};
use crate::network::MultiLayerNetwork;
use crate::trainer::Trainable;
use cr_tensor::RandomSource;

/// Character-level front end for a [`MultiLayerNetwork`]: strings go in and
/// come out, the network only ever sees alphabet indices.
#[derive(Clone, Debug, PartialEq)]
pub struct CharRnn {
    alphabet: Alphabet,
    network: MultiLayerNetwork,
}

impl CharRnn {
    /// Pairs an alphabet with a (possibly uninitialized) network. An
    /// initialized network must already be sized for the alphabet.
    pub fn new(alphabet: Alphabet, network: MultiLayerNetwork) -> RnnResult<Self> {
        if network.is_initialized() {
            let vocabulary = network.vocabulary_size()?;
            if vocabulary != alphabet.len() {
                return Err(RnnError::WidthMismatch {
                    what: "network vocabulary",
                    expected: alphabet.len(),
                    got: vocabulary,
                });
            }
        }
        Ok(Self { alphabet, network })
    }

    /// Sizes the network for the alphabet and draws fresh weights.
    pub fn initialize(&mut self, rng: &mut RandomSource) -> RnnResult<()> {
        if self.alphabet.is_empty() {
            return Err(RnnError::InvalidSize {
                what: "alphabet",
                value: 0,
            });
        }
        self.network.initialize(self.alphabet.len(), rng)
    }

    pub fn is_initialized(&self) -> bool {
        self.network.is_initialized()
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn network(&self) -> &MultiLayerNetwork {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut MultiLayerNetwork {
        &mut self.network
    }

    /// Trains on a text window; `targets` is usually `inputs` shifted by one
    /// character.
    pub fn forward_backward_text(&mut self, inputs: &str, targets: &str) -> RnnResult<f64> {
        let inputs = self.alphabet.encode(inputs)?;
        let targets = self.alphabet.encode(targets)?;
        self.network.forward_backward(&inputs, &targets)
    }

    /// Primes the network with `seed` and samples `length` characters.
    pub fn sample_string(
        &mut self,
        length: usize,
        seed: &str,
        temperature: f64,
        advance: bool,
        rng: &mut RandomSource,
    ) -> RnnResult<String> {
        if !self.network.is_initialized() {
            return Err(RnnError::Uninitialized("network"));
        }
        let seed = self.alphabet.encode(seed)?;
        let indices = self
            .network
            .sample_indices(length, &seed, temperature, advance, rng)?;
        self.alphabet.decode(&indices)
    }
}

impl Trainable for CharRnn {
    fn forward_backward(&mut self, inputs: &[usize], targets: &[usize]) -> RnnResult<f64> {
        self.network.forward_backward(inputs, targets)
    }
}
