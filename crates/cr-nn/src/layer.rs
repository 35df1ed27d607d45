// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::error::{RnnError, RnnResult};
use crate::optim::{clip_gradient, validate_learning_rate, Adagrad};
use cr_tensor::{softmax, softmax_with_temperature, Matrix, RandomSource};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Factor applied to standard normal draws when initialising weights.
pub const INIT_SCALE: f64 = 0.1;
pub const DEFAULT_INPUT_SIZE: usize = 50;
pub const DEFAULT_HIDDEN_SIZE: usize = 100;
pub const DEFAULT_OUTPUT_SIZE: usize = 50;
pub const DEFAULT_LEARNING_RATE: f64 = 0.1;

/// Temperatures below this are treated as degenerate and rejected.
pub const MIN_TEMPERATURE: f64 = 1e-6;

pub(crate) fn validate_temperature(temperature: f64) -> RnnResult<()> {
    if temperature.is_finite() && temperature >= MIN_TEMPERATURE {
        Ok(())
    } else {
        Err(RnnError::InvalidTemperature {
            value: temperature,
            min: MIN_TEMPERATURE,
        })
    }
}

fn validate_size(what: &'static str, value: usize) -> RnnResult<()> {
    if value == 0 {
        Err(RnnError::InvalidSize { what, value })
    } else {
        Ok(())
    }
}

/// Coerces a vector of the expected length into a `k x 1` column.
fn as_column(what: &'static str, vector: &Matrix, expected: usize) -> RnnResult<Matrix> {
    let got = vector.vector_len()?;
    if got != expected {
        return Err(RnnError::WidthMismatch {
            what,
            expected,
            got,
        });
    }
    if vector.cols() == 1 {
        Ok(vector.clone())
    } else {
        Ok(vector.transpose())
    }
}

/// The five trainable tensors of a layer. The same layout is reused for
/// gradients and for Adagrad memory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RnnParameters {
    /// Input to hidden, `H x In`.
    pub wxh: Matrix,
    /// Hidden to hidden, `H x H`.
    pub whh: Matrix,
    /// Hidden to output, `Out x H`.
    pub why: Matrix,
    /// Hidden bias, `H x 1`.
    pub bh: Matrix,
    /// Output bias, `Out x 1`.
    pub by: Matrix,
}

impl RnnParameters {
    /// Scaled Gaussian weights and zero biases.
    pub fn random(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        rng: &mut RandomSource,
    ) -> RnnResult<Self> {
        Ok(Self {
            wxh: rng.gaussian_matrix(hidden_size, input_size)?.scale(INIT_SCALE),
            whh: rng.gaussian_matrix(hidden_size, hidden_size)?.scale(INIT_SCALE),
            why: rng.gaussian_matrix(output_size, hidden_size)?.scale(INIT_SCALE),
            bh: Matrix::zeros_vector(hidden_size)?,
            by: Matrix::zeros_vector(output_size)?,
        })
    }

    /// All-zero tensors with the same shapes.
    pub fn zeros_like(&self) -> Self {
        Self {
            wxh: Matrix::zeros_like(&self.wxh),
            whh: Matrix::zeros_like(&self.whh),
            why: Matrix::zeros_like(&self.why),
            bh: Matrix::zeros_like(&self.bh),
            by: Matrix::zeros_like(&self.by),
        }
    }

    pub fn input_size(&self) -> usize {
        self.wxh.cols()
    }

    pub fn hidden_size(&self) -> usize {
        self.whh.rows()
    }

    pub fn output_size(&self) -> usize {
        self.why.rows()
    }

    pub fn matrices(&self) -> [&Matrix; 5] {
        [&self.wxh, &self.whh, &self.why, &self.bh, &self.by]
    }

    pub fn matrices_mut(&mut self) -> [&mut Matrix; 5] {
        [
            &mut self.wxh,
            &mut self.whh,
            &mut self.why,
            &mut self.bh,
            &mut self.by,
        ]
    }

    /// Checks that the five shapes describe one coherent layer.
    pub fn validate(&self) -> RnnResult<()> {
        let (input, hidden, output) = (self.input_size(), self.hidden_size(), self.output_size());
        let expected = [
            ("wxh", (hidden, input), self.wxh.shape()),
            ("whh", (hidden, hidden), self.whh.shape()),
            ("why", (output, hidden), self.why.shape()),
            ("bh", (hidden, 1), self.bh.shape()),
            ("by", (output, 1), self.by.shape()),
        ];
        for (what, want, got) in expected {
            if want.0 != got.0 {
                return Err(RnnError::LengthMismatch {
                    what,
                    expected: want.0,
                    got: got.0,
                });
            }
            if want.1 != got.1 {
                return Err(RnnError::WidthMismatch {
                    what,
                    expected: want.1,
                    got: got.1,
                });
            }
        }
        Ok(())
    }

    fn clip(&mut self) -> RnnResult<()> {
        for gradient in self.matrices_mut() {
            clip_gradient(gradient)?;
        }
        Ok(())
    }
}

/// Everything a forward pass produced, consumed by [`RnnLayer::backward`].
///
/// `hidden[0]` is the state the pass started from, `hidden[t + 1]` the state
/// after step `t`.
#[derive(Clone, Debug)]
pub struct ForwardTrace {
    inputs: Vec<Matrix>,
    hidden: Vec<Matrix>,
    logits: Vec<Matrix>,
    probabilities: Vec<Matrix>,
}

impl ForwardTrace {
    /// Number of timesteps.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn inputs(&self) -> &[Matrix] {
        &self.inputs
    }

    pub fn initial_hidden(&self) -> &Matrix {
        &self.hidden[0]
    }

    /// Hidden states after each timestep.
    pub fn hidden_states(&self) -> &[Matrix] {
        &self.hidden[1..]
    }

    /// Unnormalised outputs, one per timestep.
    pub fn logits(&self) -> &[Matrix] {
        &self.logits
    }

    pub fn probabilities(&self) -> &[Matrix] {
        &self.probabilities
    }

    pub fn last_logits(&self) -> &Matrix {
        &self.logits[self.logits.len() - 1]
    }

    fn output_size(&self) -> usize {
        self.logits[0].rows()
    }

    fn check_targets(&self, targets: &[usize]) -> RnnResult<()> {
        if targets.len() != self.len() {
            return Err(RnnError::LengthMismatch {
                what: "targets",
                expected: self.len(),
                got: targets.len(),
            });
        }
        let vocabulary = self.output_size();
        match targets.iter().find(|&&index| index >= vocabulary) {
            Some(&index) => Err(RnnError::IndexOutOfVocabulary { index, vocabulary }),
            None => Ok(()),
        }
    }

    /// Cross-entropy summed over timesteps: `sum_t -ln p_t[target_t]`.
    pub fn loss(&self, targets: &[usize]) -> RnnResult<f64> {
        self.check_targets(targets)?;
        Ok(self
            .probabilities
            .iter()
            .zip(targets)
            .map(|(p, &target)| -p.data()[target].ln())
            .sum())
    }

    /// Gradient of [`ForwardTrace::loss`] with respect to the logits:
    /// `p_t - onehot(target_t)`.
    pub fn output_gradient(&self, targets: &[usize]) -> RnnResult<Vec<Matrix>> {
        self.check_targets(targets)?;
        Ok(self
            .probabilities
            .iter()
            .zip(targets)
            .map(|(p, &target)| {
                let mut dy = p.clone();
                dy.data_mut()[target] -= 1.0;
                dy
            })
            .collect())
    }
}

/// Result of a backward pass.
#[derive(Clone, Debug)]
pub struct BackwardPass {
    /// Clipped gradients with respect to each timestep's input.
    pub input_gradients: Vec<Matrix>,
    /// Clipped parameter gradients that were applied.
    pub gradients: RnnParameters,
}

#[derive(Clone, Debug, PartialEq)]
struct LayerState {
    params: RnnParameters,
    memory: RnnParameters,
    hidden: Matrix,
}

/// Vanilla recurrent layer:
///
/// ```text
/// h_t = tanh(Wxh · x_t + Whh · h_{t-1} + bh)
/// y_t = Why · h_t + by
/// ```
///
/// A layer is either configured (sizes only) or initialized (weights, Adagrad
/// memory and a hidden state). Changing a size or the learning rate drops the
/// weights again.
#[derive(Clone, Debug, PartialEq)]
pub struct RnnLayer {
    input_size: usize,
    hidden_size: usize,
    output_size: usize,
    learning_rate: f64,
    state: Option<LayerState>,
}

impl Default for RnnLayer {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_INPUT_SIZE,
            hidden_size: DEFAULT_HIDDEN_SIZE,
            output_size: DEFAULT_OUTPUT_SIZE,
            learning_rate: DEFAULT_LEARNING_RATE,
            state: None,
        }
    }
}

impl RnnLayer {
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        learning_rate: f64,
    ) -> RnnResult<Self> {
        validate_size("input size", input_size)?;
        validate_size("hidden size", hidden_size)?;
        validate_size("output size", output_size)?;
        validate_learning_rate(learning_rate)?;
        Ok(Self {
            input_size,
            hidden_size,
            output_size,
            learning_rate,
            state: None,
        })
    }

    /// Builds an initialized layer from explicit weights with fresh Adagrad
    /// memory.
    pub fn from_parameters(
        params: RnnParameters,
        hidden: Matrix,
        learning_rate: f64,
    ) -> RnnResult<Self> {
        let memory = params.zeros_like();
        Self::from_state(params, memory, hidden, learning_rate)
    }

    pub(crate) fn from_state(
        params: RnnParameters,
        memory: RnnParameters,
        hidden: Matrix,
        learning_rate: f64,
    ) -> RnnResult<Self> {
        params.validate()?;
        let mut layer = Self::new(
            params.input_size(),
            params.hidden_size(),
            params.output_size(),
            learning_rate,
        )?;
        for (param, mem) in params.matrices().into_iter().zip(memory.matrices()) {
            if param.shape() != mem.shape() {
                return Err(RnnError::WidthMismatch {
                    what: "adagrad memory",
                    expected: param.len(),
                    got: mem.len(),
                });
            }
        }
        let hidden = as_column("hidden state", &hidden, layer.hidden_size)?;
        layer.state = Some(LayerState {
            params,
            memory,
            hidden,
        });
        Ok(layer)
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn set_input_size(&mut self, input_size: usize) -> RnnResult<()> {
        validate_size("input size", input_size)?;
        self.input_size = input_size;
        self.state = None;
        Ok(())
    }

    pub fn set_hidden_size(&mut self, hidden_size: usize) -> RnnResult<()> {
        validate_size("hidden size", hidden_size)?;
        self.hidden_size = hidden_size;
        self.state = None;
        Ok(())
    }

    pub fn set_output_size(&mut self, output_size: usize) -> RnnResult<()> {
        validate_size("output size", output_size)?;
        self.output_size = output_size;
        self.state = None;
        Ok(())
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) -> RnnResult<()> {
        validate_learning_rate(learning_rate)?;
        self.learning_rate = learning_rate;
        self.state = None;
        Ok(())
    }

    /// Draws fresh weights, zeroes the Adagrad memory and samples a new
    /// Gaussian hidden state. Re-initialising discards all learned state.
    pub fn initialize(&mut self, rng: &mut RandomSource) -> RnnResult<()> {
        let params = RnnParameters::random(
            self.input_size,
            self.hidden_size,
            self.output_size,
            rng,
        )?;
        let memory = params.zeros_like();
        let hidden = rng.gaussian_vector(self.hidden_size)?;
        self.state = Some(LayerState {
            params,
            memory,
            hidden,
        });
        debug!(
            input = self.input_size,
            hidden = self.hidden_size,
            output = self.output_size,
            "initialized rnn layer"
        );
        Ok(())
    }

    fn state(&self) -> RnnResult<&LayerState> {
        self.state.as_ref().ok_or(RnnError::Uninitialized("rnn layer"))
    }

    fn state_mut(&mut self) -> RnnResult<&mut LayerState> {
        self.state.as_mut().ok_or(RnnError::Uninitialized("rnn layer"))
    }

    pub fn parameters(&self) -> RnnResult<&RnnParameters> {
        Ok(&self.state()?.params)
    }

    pub fn adagrad_memory(&self) -> RnnResult<&RnnParameters> {
        Ok(&self.state()?.memory)
    }

    pub fn hidden_state(&self) -> RnnResult<&Matrix> {
        Ok(&self.state()?.hidden)
    }

    /// Copy of the current hidden state.
    pub fn save_hidden_state(&self) -> RnnResult<Matrix> {
        Ok(self.state()?.hidden.clone())
    }

    pub fn restore_hidden_state(&mut self, hidden: &Matrix) -> RnnResult<()> {
        let hidden = as_column("hidden state", hidden, self.hidden_size)?;
        self.state_mut()?.hidden = hidden;
        Ok(())
    }

    fn step(params: &RnnParameters, x: &Matrix, h_prev: &Matrix) -> RnnResult<(Matrix, Matrix)> {
        let mut pre = params.wxh.dot(x)?;
        pre.add_inplace(&params.whh.dot(h_prev)?)?;
        pre.add_inplace(&params.bh)?;
        let h = pre.tanh();
        let mut y = params.why.dot(&h)?;
        y.add_inplace(&params.by)?;
        Ok((h, y))
    }

    /// Runs the recurrence over `inputs` starting from the stored hidden
    /// state and advances that state to the last step. Inputs are validated
    /// before anything is touched.
    pub fn forward(&mut self, inputs: &[Matrix]) -> RnnResult<ForwardTrace> {
        let input_size = self.input_size;
        let state = self.state_mut()?;
        if inputs.is_empty() {
            return Err(RnnError::EmptySequence("layer inputs"));
        }
        let inputs = inputs
            .iter()
            .map(|x| as_column("layer input", x, input_size))
            .collect::<RnnResult<Vec<_>>>()?;

        let steps = inputs.len();
        let mut hidden = Vec::with_capacity(steps + 1);
        let mut logits = Vec::with_capacity(steps);
        let mut probabilities = Vec::with_capacity(steps);
        hidden.push(state.hidden.clone());
        for x in &inputs {
            let (h, y) = Self::step(&state.params, x, &hidden[hidden.len() - 1])?;
            probabilities.push(softmax(&y));
            logits.push(y);
            hidden.push(h);
        }
        state.hidden = hidden[steps].clone();
        Ok(ForwardTrace {
            inputs,
            hidden,
            logits,
            probabilities,
        })
    }

    /// Sequence loss for a trace produced by this layer.
    pub fn loss(&self, trace: &ForwardTrace, targets: &[usize]) -> RnnResult<f64> {
        self.check_trace(trace)?;
        trace.loss(targets)
    }

    /// Output gradient for a trace produced by this layer.
    pub fn output_gradient(&self, trace: &ForwardTrace, targets: &[usize]) -> RnnResult<Vec<Matrix>> {
        self.check_trace(trace)?;
        trace.output_gradient(targets)
    }

    fn check_trace(&self, trace: &ForwardTrace) -> RnnResult<()> {
        let checks = [
            ("trace input", self.input_size, trace.inputs[0].rows()),
            ("trace hidden", self.hidden_size, trace.hidden[0].rows()),
            ("trace output", self.output_size, trace.output_size()),
        ];
        for (what, expected, got) in checks {
            if expected != got {
                return Err(RnnError::WidthMismatch {
                    what,
                    expected,
                    got,
                });
            }
        }
        Ok(())
    }

    /// Backpropagation through time over `trace`, followed by clipping and
    /// one Adagrad step on every parameter.
    ///
    /// `output_gradients[t]` is `dL/dy_t`. The returned input gradients feed
    /// the layer below in a stack.
    pub fn backward(
        &mut self,
        trace: ForwardTrace,
        output_gradients: &[Matrix],
    ) -> RnnResult<BackwardPass> {
        self.check_trace(&trace)?;
        if output_gradients.len() != trace.len() {
            return Err(RnnError::LengthMismatch {
                what: "output gradients",
                expected: trace.len(),
                got: output_gradients.len(),
            });
        }
        let output_size = self.output_size;
        let dys = output_gradients
            .iter()
            .map(|dy| as_column("output gradient", dy, output_size))
            .collect::<RnnResult<Vec<_>>>()?;
        let optimizer = Adagrad::new(self.learning_rate)?;
        let state = self.state_mut()?;

        let params = &state.params;
        let mut grads = params.zeros_like();
        let why_t = params.why.transpose();
        let whh_t = params.whh.transpose();
        let wxh_t = params.wxh.transpose();
        let mut dh_next = Matrix::zeros_like(&params.bh);
        let mut input_gradients = vec![Matrix::zeros_like(&trace.inputs[0]); trace.len()];

        for t in (0..trace.len()).rev() {
            let dy = &dys[t];
            let h = &trace.hidden[t + 1];
            let h_prev = &trace.hidden[t];

            grads.why.add_inplace(&dy.dot(&h.transpose())?)?;
            grads.by.add_inplace(dy)?;

            let mut dh = why_t.dot(dy)?;
            dh.add_inplace(&dh_next)?;
            let dh_raw = h.map(|v| 1.0 - v * v).hadamard(&dh)?;

            grads.wxh.add_inplace(&dh_raw.dot(&trace.inputs[t].transpose())?)?;
            grads.whh.add_inplace(&dh_raw.dot(&h_prev.transpose())?)?;
            grads.bh.add_inplace(&dh_raw)?;

            dh_next = whh_t.dot(&dh_raw)?;
            input_gradients[t] = wxh_t.dot(&dh_raw)?;
        }

        grads.clip()?;
        for dx in &mut input_gradients {
            clip_gradient(dx)?;
        }

        let LayerState { params, memory, .. } = state;
        for ((param, grad), mem) in params
            .matrices_mut()
            .into_iter()
            .zip(grads.matrices())
            .zip(memory.matrices_mut())
        {
            optimizer.update(param, grad, mem)?;
        }

        Ok(BackwardPass {
            input_gradients,
            gradients: grads,
        })
    }

    /// Generates `n` indices by feeding each draw back as the next input,
    /// starting from `seed_index`. Requires matching input and output sizes.
    /// With `advance` the final hidden state is kept, otherwise the stored
    /// state is left untouched.
    pub fn sample(
        &mut self,
        n: usize,
        seed_index: usize,
        temperature: f64,
        advance: bool,
        rng: &mut RandomSource,
    ) -> RnnResult<Vec<usize>> {
        let vocabulary = self.input_size;
        if self.output_size != vocabulary {
            return Err(RnnError::WidthMismatch {
                what: "sampling output",
                expected: vocabulary,
                got: self.output_size,
            });
        }
        if seed_index >= vocabulary {
            return Err(RnnError::IndexOutOfVocabulary {
                index: seed_index,
                vocabulary,
            });
        }
        validate_temperature(temperature)?;
        let state = self.state_mut()?;

        let mut h = state.hidden.clone();
        let mut x = Matrix::one_hot(vocabulary, seed_index)?;
        let mut drawn = Vec::with_capacity(n);
        for _ in 0..n {
            let (next, y) = Self::step(&state.params, &x, &h)?;
            h = next;
            let p = softmax_with_temperature(&y, temperature)?;
            let index = rng.categorical_choice(p.data())?;
            drawn.push(index);
            x = Matrix::one_hot(vocabulary, index)?;
        }
        if advance {
            state.hidden = h;
        }
        Ok(drawn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::optim::GRADIENT_CLIP;
    use approx::assert_abs_diff_eq;

    fn layer(input: usize, hidden: usize, output: usize, seed: u64) -> RnnLayer {
        let mut layer = RnnLayer::new(input, hidden, output, 0.1).unwrap();
        layer.initialize(&mut RandomSource::seeded(seed)).unwrap();
        layer
    }

    fn one_hots(k: usize, indices: &[usize]) -> Vec<Matrix> {
        indices
            .iter()
            .map(|&i| Matrix::one_hot(k, i).unwrap())
            .collect()
    }

    #[test]
    fn initialize_shapes_and_zero_biases() {
        let layer = layer(4, 6, 3, 1);
        let params = layer.parameters().unwrap();
        assert_eq!(params.wxh.shape(), (6, 4));
        assert_eq!(params.whh.shape(), (6, 6));
        assert_eq!(params.why.shape(), (3, 6));
        assert_eq!(params.bh.sum(), 0.0);
        assert_eq!(params.by.sum(), 0.0);
        assert!(params.wxh.data().iter().all(|v| v.abs() < 1.0));
        assert_eq!(layer.hidden_state().unwrap().shape(), (6, 1));
        let memory = layer.adagrad_memory().unwrap();
        assert!(memory.matrices().iter().all(|m| m.sum() == 0.0));
    }

    #[test]
    fn uninitialized_layer_refuses_work() {
        let mut layer = RnnLayer::default();
        assert_eq!(layer.input_size(), DEFAULT_INPUT_SIZE);
        let err = layer.forward(&one_hots(50, &[1])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(layer.save_hidden_state().is_err());
        assert!(layer
            .sample(3, 0, 1.0, true, &mut RandomSource::seeded(0))
            .is_err());
    }

    #[test]
    fn setters_drop_learned_state() {
        let mut layer = layer(3, 4, 3, 2);
        layer.set_learning_rate(0.05).unwrap();
        assert!(!layer.is_initialized());
        layer.initialize(&mut RandomSource::seeded(2)).unwrap();
        layer.set_hidden_size(8).unwrap();
        assert!(!layer.is_initialized());
        assert!(layer.set_input_size(0).is_err());
        assert!(layer.set_learning_rate(-1.0).is_err());
        assert_eq!(layer.learning_rate(), 0.05);
    }

    #[test]
    fn forward_advances_hidden_state() {
        let mut layer = layer(4, 5, 4, 3);
        let before = layer.save_hidden_state().unwrap();
        let trace = layer.forward(&one_hots(4, &[0, 1, 2])).unwrap();
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.initial_hidden(), &before);
        assert_eq!(trace.hidden_states().len(), 3);
        assert_eq!(layer.hidden_state().unwrap(), &trace.hidden_states()[2]);
        for p in trace.probabilities() {
            assert_abs_diff_eq!(p.sum(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn forward_matches_manual_recurrence() {
        let params = RnnParameters {
            wxh: Matrix::from_rows(&[vec![0.5, -0.5]]).unwrap(),
            whh: Matrix::from_rows(&[vec![0.25]]).unwrap(),
            why: Matrix::from_rows(&[vec![1.0], vec![-1.0]]).unwrap(),
            bh: Matrix::column(vec![0.1]).unwrap(),
            by: Matrix::column(vec![0.0, 0.2]).unwrap(),
        };
        let h0 = Matrix::column(vec![0.3]).unwrap();
        let mut layer = RnnLayer::from_parameters(params, h0, 0.1).unwrap();
        let trace = layer.forward(&one_hots(2, &[0])).unwrap();
        let h = (0.5f64 + 0.25 * 0.3 + 0.1).tanh();
        assert_abs_diff_eq!(trace.hidden_states()[0].data()[0], h, epsilon = 1e-12);
        assert_abs_diff_eq!(trace.logits()[0].data()[0], h, epsilon = 1e-12);
        assert_abs_diff_eq!(trace.logits()[0].data()[1], -h + 0.2, epsilon = 1e-12);
    }

    #[test]
    fn row_vector_inputs_are_accepted() {
        let mut a = layer(3, 4, 3, 9);
        let mut b = a.clone();
        let column = a.forward(&one_hots(3, &[2])).unwrap();
        let row = b
            .forward(&[Matrix::from_rows(&[vec![0.0, 0.0, 1.0]]).unwrap()])
            .unwrap();
        assert_eq!(column.logits(), row.logits());
    }

    #[test]
    fn wrong_input_width_leaves_state_alone() {
        let mut layer = layer(3, 4, 3, 4);
        let snapshot = layer.clone();
        let mut inputs = one_hots(3, &[0, 1]);
        inputs.push(Matrix::one_hot(5, 0).unwrap());
        assert!(layer.forward(&inputs).is_err());
        assert!(layer.forward(&[]).is_err());
        assert_eq!(layer, snapshot);
    }

    #[test]
    fn loss_and_output_gradient_agree() {
        let mut layer = layer(4, 5, 4, 5);
        let trace = layer.forward(&one_hots(4, &[0, 1])).unwrap();
        let targets = [1, 3];
        let loss = layer.loss(&trace, &targets).unwrap();
        let expected: f64 = trace
            .probabilities()
            .iter()
            .zip(targets)
            .map(|(p, t)| -p.data()[t].ln())
            .sum();
        assert_abs_diff_eq!(loss, expected, epsilon = 1e-12);
        let dy = layer.output_gradient(&trace, &targets).unwrap();
        for (g, t) in dy.iter().zip(targets) {
            assert_abs_diff_eq!(g.sum(), 0.0, epsilon = 1e-12);
            assert!(g.data()[t] < 0.0);
        }
        assert!(trace.loss(&[1]).is_err());
        let err = trace.loss(&[1, 4]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Domain);
    }

    #[test]
    fn backward_clips_and_updates() {
        let mut layer = layer(3, 4, 3, 6);
        let before = layer.parameters().unwrap().clone();
        let trace = layer.forward(&one_hots(3, &[0, 1, 2, 0])).unwrap();
        let huge = vec![Matrix::column(vec![100.0, -100.0, 100.0]).unwrap(); 4];
        let pass = layer.backward(trace, &huge).unwrap();
        for g in pass.gradients.matrices() {
            assert!(g.data().iter().all(|v| v.abs() <= GRADIENT_CLIP));
        }
        assert_eq!(pass.gradients.by.data(), &[5.0, -5.0, 5.0]);
        assert_eq!(pass.input_gradients.len(), 4);
        for dx in &pass.input_gradients {
            assert_eq!(dx.shape(), (3, 1));
            assert!(dx.data().iter().all(|v| v.abs() <= GRADIENT_CLIP));
        }
        let after = layer.parameters().unwrap();
        assert_ne!(after.by, before.by);
        let memory = layer.adagrad_memory().unwrap();
        assert_eq!(memory.by.data(), &[25.0, 25.0, 25.0]);
    }

    #[test]
    fn backward_rejects_mismatched_gradients() {
        let mut layer = layer(3, 4, 3, 7);
        let trace = layer.forward(&one_hots(3, &[0, 1])).unwrap();
        let snapshot = layer.clone();
        let dy = vec![Matrix::zeros_vector(3).unwrap()];
        assert!(layer.backward(trace.clone(), &dy).is_err());
        let wide = vec![Matrix::zeros_vector(4).unwrap(); 2];
        assert!(layer.backward(trace, &wide).is_err());
        assert_eq!(layer, snapshot);
    }

    #[test]
    fn sampling_without_advance_is_repeatable() {
        let mut layer = layer(5, 8, 5, 8);
        let hidden = layer.save_hidden_state().unwrap();
        let a = layer
            .sample(20, 1, 1.0, false, &mut RandomSource::seeded(11))
            .unwrap();
        let b = layer
            .sample(20, 1, 1.0, false, &mut RandomSource::seeded(11))
            .unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|&i| i < 5));
        assert_eq!(layer.hidden_state().unwrap(), &hidden);
        layer
            .sample(5, 1, 1.0, true, &mut RandomSource::seeded(11))
            .unwrap();
        assert_ne!(layer.hidden_state().unwrap(), &hidden);
    }

    #[test]
    fn sampling_validates_arguments() {
        let mut layer = layer(5, 8, 5, 8);
        let mut rng = RandomSource::seeded(0);
        assert!(layer.sample(3, 5, 1.0, false, &mut rng).is_err());
        assert!(layer.sample(3, 0, 0.0, false, &mut rng).is_err());
        assert!(layer.sample(3, 0, f64::NAN, false, &mut rng).is_err());
        assert!(layer.sample(0, 0, 1.0, true, &mut rng).unwrap().is_empty());
        let mut skewed = self::layer(5, 8, 4, 8);
        assert!(skewed.sample(3, 0, 1.0, false, &mut rng).is_err());
    }

    #[test]
    fn restore_checks_width() {
        let mut layer = layer(3, 4, 3, 10);
        assert!(layer
            .restore_hidden_state(&Matrix::zeros_vector(5).unwrap())
            .is_err());
        let row = Matrix::from_rows(&[vec![0.1, 0.2, 0.3, 0.4]]).unwrap();
        layer.restore_hidden_state(&row).unwrap();
        assert_eq!(layer.hidden_state().unwrap().shape(), (4, 1));
    }
}
