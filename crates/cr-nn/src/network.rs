// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::error::{RnnError, RnnResult};
use crate::layer::{
    validate_temperature, ForwardTrace, RnnLayer, DEFAULT_HIDDEN_SIZE, DEFAULT_LEARNING_RATE,
};
use crate::optim::validate_learning_rate;
use crate::trainer::Trainable;
use cr_tensor::{softmax_with_temperature, Matrix, RandomSource};
use tracing::{debug, info};

/// A stack of [`RnnLayer`]s where each layer's logits feed the next layer.
///
/// The first layer reads one-hot vectors over the vocabulary and the last
/// layer emits logits over it. The vocabulary size is only known once
/// [`MultiLayerNetwork::initialize`] runs.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiLayerNetwork {
    hidden_sizes: Vec<usize>,
    learning_rate: f64,
    layers: Vec<RnnLayer>,
}

impl Default for MultiLayerNetwork {
    fn default() -> Self {
        Self {
            hidden_sizes: vec![DEFAULT_HIDDEN_SIZE],
            learning_rate: DEFAULT_LEARNING_RATE,
            layers: Vec::new(),
        }
    }
}

fn validate_hidden_sizes(sizes: &[usize]) -> RnnResult<()> {
    if sizes.is_empty() {
        return Err(RnnError::InvalidSize {
            what: "layer count",
            value: 0,
        });
    }
    match sizes.iter().find(|&&size| size == 0) {
        Some(&value) => Err(RnnError::InvalidSize {
            what: "hidden size",
            value,
        }),
        None => Ok(()),
    }
}

impl MultiLayerNetwork {
    pub fn new(hidden_sizes: Vec<usize>, learning_rate: f64) -> RnnResult<Self> {
        validate_hidden_sizes(&hidden_sizes)?;
        validate_learning_rate(learning_rate)?;
        Ok(Self {
            hidden_sizes,
            learning_rate,
            layers: Vec::new(),
        })
    }

    /// Wraps already initialized layers. Adjacent layers must agree on their
    /// interface width and the stack must map the vocabulary onto itself.
    pub fn from_layers(layers: Vec<RnnLayer>) -> RnnResult<Self> {
        let first = layers.first().ok_or(RnnError::InvalidSize {
            what: "layer count",
            value: 0,
        })?;
        if let Some(layer) = layers.iter().find(|layer| !layer.is_initialized()) {
            debug!(hidden = layer.hidden_size(), "refusing uninitialized layer");
            return Err(RnnError::Uninitialized("rnn layer"));
        }
        for pair in layers.windows(2) {
            if pair[0].output_size() != pair[1].input_size() {
                return Err(RnnError::WidthMismatch {
                    what: "stacked layer input",
                    expected: pair[0].output_size(),
                    got: pair[1].input_size(),
                });
            }
        }
        let vocabulary = first.input_size();
        let learning_rate = first.learning_rate();
        if let Some(layer) = layers
            .iter()
            .find(|layer| layer.learning_rate() != learning_rate)
        {
            return Err(RnnError::LearningRateMismatch {
                expected: learning_rate,
                got: layer.learning_rate(),
            });
        }
        let last = &layers[layers.len() - 1];
        if last.output_size() != vocabulary {
            return Err(RnnError::WidthMismatch {
                what: "network output",
                expected: vocabulary,
                got: last.output_size(),
            });
        }
        Ok(Self {
            hidden_sizes: layers.iter().map(RnnLayer::hidden_size).collect(),
            learning_rate,
            layers,
        })
    }

    pub fn hidden_sizes(&self) -> &[usize] {
        &self.hidden_sizes
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn layers(&self) -> &[RnnLayer] {
        &self.layers
    }

    pub fn is_initialized(&self) -> bool {
        !self.layers.is_empty()
    }

    pub fn vocabulary_size(&self) -> RnnResult<usize> {
        self.layers
            .first()
            .map(RnnLayer::input_size)
            .ok_or(RnnError::Uninitialized("network"))
    }

    /// Changes the layer layout. Any learned weights are discarded.
    pub fn set_hidden_sizes(&mut self, hidden_sizes: Vec<usize>) -> RnnResult<()> {
        validate_hidden_sizes(&hidden_sizes)?;
        self.hidden_sizes = hidden_sizes;
        self.layers.clear();
        Ok(())
    }

    /// Changes the learning rate. Any learned weights are discarded.
    pub fn set_learning_rate(&mut self, learning_rate: f64) -> RnnResult<()> {
        validate_learning_rate(learning_rate)?;
        self.learning_rate = learning_rate;
        self.layers.clear();
        Ok(())
    }

    /// Builds and initializes one layer per hidden size. Layer `i` reads the
    /// previous layer's width (the vocabulary for the first) and writes the
    /// next layer's hidden width (the vocabulary for the last).
    pub fn initialize(&mut self, vocabulary_size: usize, rng: &mut RandomSource) -> RnnResult<()> {
        if vocabulary_size == 0 {
            return Err(RnnError::InvalidSize {
                what: "vocabulary size",
                value: 0,
            });
        }
        let count = self.hidden_sizes.len();
        let mut layers = Vec::with_capacity(count);
        for (i, &hidden) in self.hidden_sizes.iter().enumerate() {
            // Layer i > 0 reads the output of layer i - 1, which is sized to
            // this layer's hidden width.
            let input = if i == 0 { vocabulary_size } else { hidden };
            let output = if i + 1 == count {
                vocabulary_size
            } else {
                self.hidden_sizes[i + 1]
            };
            let mut layer = RnnLayer::new(input, hidden, output, self.learning_rate)?;
            layer.initialize(rng)?;
            layers.push(layer);
        }
        self.layers = layers;
        info!(
            vocabulary = vocabulary_size,
            layers = count,
            hidden = ?self.hidden_sizes,
            "initialized network"
        );
        Ok(())
    }

    fn check_indices(&self, what: &'static str, indices: &[usize]) -> RnnResult<usize> {
        let vocabulary = self.vocabulary_size()?;
        if indices.is_empty() {
            return Err(RnnError::EmptySequence(what));
        }
        match indices.iter().find(|&&index| index >= vocabulary) {
            Some(&index) => Err(RnnError::IndexOutOfVocabulary { index, vocabulary }),
            None => Ok(vocabulary),
        }
    }

    fn forward_stack(&mut self, inputs: Vec<Matrix>) -> RnnResult<Vec<ForwardTrace>> {
        let mut traces = Vec::with_capacity(self.layers.len());
        let mut current = inputs;
        for layer in self.layers.iter_mut() {
            let trace = layer.forward(&current)?;
            current = trace.logits().to_vec();
            traces.push(trace);
        }
        Ok(traces)
    }

    /// One training step over a window: forward through the stack, loss on
    /// the top layer, then backward (with clipping and Adagrad) from the top
    /// down. Returns the summed cross-entropy.
    ///
    /// All arguments are validated before any hidden state or weight moves.
    pub fn forward_backward(&mut self, inputs: &[usize], targets: &[usize]) -> RnnResult<f64> {
        let vocabulary = self.check_indices("training inputs", inputs)?;
        if targets.len() != inputs.len() {
            return Err(RnnError::LengthMismatch {
                what: "training targets",
                expected: inputs.len(),
                got: targets.len(),
            });
        }
        self.check_indices("training targets", targets)?;

        let one_hots = one_hot_sequence(vocabulary, inputs)?;
        let traces = self.forward_stack(one_hots)?;
        let top = traces
            .last()
            .ok_or(RnnError::Uninitialized("network"))?;
        let loss = top.loss(targets)?;
        let mut gradients = top.output_gradient(targets)?;
        for (layer, trace) in self.layers.iter_mut().zip(traces).rev() {
            gradients = layer.backward(trace, &gradients)?.input_gradients;
        }
        Ok(loss)
    }

    /// Hidden states of every layer, bottom first.
    pub fn save_hidden_states(&self) -> RnnResult<Vec<Matrix>> {
        if self.layers.is_empty() {
            return Err(RnnError::Uninitialized("network"));
        }
        self.layers.iter().map(RnnLayer::save_hidden_state).collect()
    }

    pub fn restore_hidden_states(&mut self, states: &[Matrix]) -> RnnResult<()> {
        if states.len() != self.layers.len() {
            return Err(RnnError::LengthMismatch {
                what: "hidden states",
                expected: self.layers.len(),
                got: states.len(),
            });
        }
        for (layer, state) in self.layers.iter().zip(states) {
            if state.vector_len()? != layer.hidden_size() {
                return Err(RnnError::WidthMismatch {
                    what: "hidden state",
                    expected: layer.hidden_size(),
                    got: state.len(),
                });
            }
        }
        for (layer, state) in self.layers.iter_mut().zip(states) {
            layer.restore_hidden_state(state)?;
        }
        Ok(())
    }

    /// Primes the stack with `seed` and then draws `n` indices, feeding each
    /// draw back in. Only the distribution after the last seed symbol is
    /// sampled from.
    ///
    /// Without `advance` every layer's hidden state is restored afterwards,
    /// so repeated calls with equally seeded `rng`s agree.
    pub fn sample_indices(
        &mut self,
        n: usize,
        seed: &[usize],
        temperature: f64,
        advance: bool,
        rng: &mut RandomSource,
    ) -> RnnResult<Vec<usize>> {
        let vocabulary = self.check_indices("sampling seed", seed)?;
        validate_temperature(temperature)?;
        if n == 0 {
            return Ok(Vec::new());
        }
        let saved = if advance {
            None
        } else {
            Some(self.save_hidden_states()?)
        };
        let drawn = self.sample_from_seed(vocabulary, n, seed, temperature, rng);
        if let Some(states) = saved {
            self.restore_hidden_states(&states)?;
        }
        drawn
    }

    fn sample_from_seed(
        &mut self,
        vocabulary: usize,
        n: usize,
        seed: &[usize],
        temperature: f64,
        rng: &mut RandomSource,
    ) -> RnnResult<Vec<usize>> {
        let mut inputs = one_hot_sequence(vocabulary, seed)?;
        let mut drawn = Vec::with_capacity(n);
        while drawn.len() < n {
            let traces = self.forward_stack(inputs)?;
            let top = traces
                .last()
                .ok_or(RnnError::Uninitialized("network"))?;
            let p = softmax_with_temperature(top.last_logits(), temperature)?;
            let index = rng.categorical_choice(p.data())?;
            drawn.push(index);
            inputs = vec![Matrix::one_hot(vocabulary, index)?];
        }
        Ok(drawn)
    }
}

impl Trainable for MultiLayerNetwork {
    fn forward_backward(&mut self, inputs: &[usize], targets: &[usize]) -> RnnResult<f64> {
        MultiLayerNetwork::forward_backward(self, inputs, targets)
    }
}

fn one_hot_sequence(vocabulary: usize, indices: &[usize]) -> RnnResult<Vec<Matrix>> {
    indices
        .iter()
        .map(|&index| Matrix::one_hot(vocabulary, index).map_err(RnnError::from))
        .collect()
}
