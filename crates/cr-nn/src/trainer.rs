// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::error::{RnnError, RnnResult};
use tracing::{debug, info};

/// Weight of the previous value in the exponential loss average.
pub const SMOOTHING: f64 = 0.999;

/// An input window and its targets, the inputs shifted by one symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenWindow {
    pub inputs: Vec<usize>,
    pub targets: Vec<usize>,
}

/// Something that can hand out consecutive training windows of symbol
/// indices.
pub trait TokenSource {
    /// Returns `inputs = s[offset..offset + window]` and
    /// `targets = s[offset + 1..offset + window + 1]`, or
    /// [`RnnError::NoMoreTrainingData`] when the window runs past the end.
    fn extract(&self, offset: usize, window: usize) -> RnnResult<TokenWindow>;

    /// Number of symbols available.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the symbol set the indices are drawn from.
    fn vocabulary_size(&self) -> usize;
}

/// A model that can take one training step on a window.
pub trait Trainable {
    /// Trains on `inputs -> targets` and returns the window's loss.
    fn forward_backward(&mut self, inputs: &[usize], targets: &[usize]) -> RnnResult<f64>;
}

/// Walks a [`TokenSource`] window by window, training a model and tracking a
/// smoothed loss.
#[derive(Clone, Debug)]
pub struct Trainer<S> {
    source: S,
    window: usize,
    offset: usize,
    smooth_loss: f64,
    steps: u64,
}

impl<S: TokenSource> Trainer<S> {
    /// Starts at offset zero with the loss of a uniform predictor,
    /// `-ln(1 / vocabulary) * window`.
    pub fn new(source: S, window: usize) -> RnnResult<Self> {
        if window == 0 {
            return Err(RnnError::InvalidSize {
                what: "training window",
                value: 0,
            });
        }
        let vocabulary = source.vocabulary_size();
        if vocabulary == 0 {
            return Err(RnnError::BadTrainingSet(
                "the vocabulary is empty".to_string(),
            ));
        }
        if source.len() < window + 1 {
            return Err(RnnError::BadTrainingSet(format!(
                "{} symbols can't fill a window of {window} plus one target",
                source.len()
            )));
        }
        let smooth_loss = -(1.0 / vocabulary as f64).ln() * window as f64;
        debug!(window, vocabulary, smooth_loss, "created trainer");
        Ok(Self {
            source,
            window,
            offset: 0,
            smooth_loss,
            steps: 0,
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Total number of completed training steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn smooth_loss(&self) -> f64 {
        self.smooth_loss
    }

    /// Smoothed loss per symbol, in percent of one nat.
    pub fn normalized_smooth_loss(&self) -> f64 {
        self.smooth_loss / self.window as f64 * 100.0
    }

    /// Runs `count` steps. Each step trains on the window at the current
    /// offset, folds the loss into the average and moves the offset forward
    /// by one window. The first error stops the run; steps that already
    /// completed stay applied.
    pub fn step<M>(&mut self, model: &mut M, count: usize) -> RnnResult<()>
    where
        M: Trainable + ?Sized,
    {
        for _ in 0..count {
            let TokenWindow { inputs, targets } = self.source.extract(self.offset, self.window)?;
            let loss = model.forward_backward(&inputs, &targets)?;
            self.smooth_loss = SMOOTHING * self.smooth_loss + (1.0 - SMOOTHING) * loss;
            self.offset += self.window;
            self.steps += 1;
        }
        debug!(
            steps = self.steps,
            offset = self.offset,
            smooth_loss = self.smooth_loss,
            "training progress"
        );
        Ok(())
    }

    /// Trains until the source runs dry and returns how many steps ran.
    pub fn train_until_exhausted<M>(&mut self, model: &mut M) -> RnnResult<usize>
    where
        M: Trainable + ?Sized,
    {
        let mut completed = 0;
        loop {
            match self.step(model, 1) {
                Ok(()) => completed += 1,
                Err(err) if err.is_exhausted() => break,
                Err(err) => return Err(err),
            }
        }
        info!(
            completed,
            smooth_loss = self.smooth_loss,
            "reached the end of the training data"
        );
        Ok(completed)
    }

    /// Rewinds to the start of the source. The smoothed loss and step count
    /// carry over.
    pub fn loop_around(&mut self) {
        self.offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use approx::assert_abs_diff_eq;

    #[derive(Debug)]
    struct Counting(usize);

    impl TokenSource for Counting {
        fn extract(&self, offset: usize, window: usize) -> RnnResult<TokenWindow> {
            if offset + window + 1 > self.0 {
                return Err(RnnError::NoMoreTrainingData {
                    offset,
                    window,
                    available: self.0,
                });
            }
            Ok(TokenWindow {
                inputs: (offset..offset + window).map(|i| i % 4).collect(),
                targets: (offset + 1..offset + window + 1).map(|i| i % 4).collect(),
            })
        }

        fn len(&self) -> usize {
            self.0
        }

        fn vocabulary_size(&self) -> usize {
            4
        }
    }

    #[derive(Default)]
    struct Recorder {
        windows: Vec<TokenWindow>,
        loss: f64,
    }

    impl Trainable for Recorder {
        fn forward_backward(&mut self, inputs: &[usize], targets: &[usize]) -> RnnResult<f64> {
            self.windows.push(TokenWindow {
                inputs: inputs.to_vec(),
                targets: targets.to_vec(),
            });
            Ok(self.loss)
        }
    }

    #[test]
    fn initial_loss_is_uniform_baseline() {
        let trainer = Trainer::new(Counting(10), 3).unwrap();
        assert_abs_diff_eq!(trainer.smooth_loss(), 4f64.ln() * 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            trainer.normalized_smooth_loss(),
            4f64.ln() * 100.0,
            epsilon = 1e-9
        );
        assert_eq!(trainer.offset(), 0);
        assert_eq!(trainer.window(), 3);
    }

    #[test]
    fn construction_rejects_tiny_sources() {
        assert!(Trainer::new(Counting(10), 0).is_err());
        let err = Trainer::new(Counting(3), 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Domain);
        assert!(Trainer::new(Counting(4), 3).is_ok());
    }

    #[test]
    fn steps_walk_the_source_and_smooth_the_loss() {
        let mut trainer = Trainer::new(Counting(10), 3).unwrap();
        let mut model = Recorder::default();
        let start = trainer.smooth_loss();
        trainer.step(&mut model, 2).unwrap();
        assert_eq!(trainer.offset(), 6);
        assert_eq!(trainer.steps(), 2);
        assert_eq!(model.windows[0].inputs, vec![0, 1, 2]);
        assert_eq!(model.windows[1].inputs, vec![3, 0, 1]);
        assert_eq!(model.windows[1].targets, vec![0, 1, 2]);
        let expected = start * SMOOTHING * SMOOTHING;
        assert_abs_diff_eq!(trainer.smooth_loss(), expected, epsilon = 1e-12);
    }

    #[test]
    fn exhaustion_is_reported_and_recoverable() {
        let mut trainer = Trainer::new(Counting(10), 3).unwrap();
        let mut model = Recorder::default();
        trainer.step(&mut model, 3).unwrap();
        let loss = trainer.smooth_loss();
        let err = trainer.step(&mut model, 1).unwrap_err();
        assert!(err.is_exhausted());
        assert_eq!(trainer.offset(), 9);
        assert_eq!(trainer.steps(), 3);
        assert_eq!(trainer.smooth_loss(), loss);

        trainer.loop_around();
        assert_eq!(trainer.offset(), 0);
        assert_eq!(trainer.smooth_loss(), loss);
        trainer.step(&mut model, 1).unwrap();
        assert_eq!(trainer.steps(), 4);
    }

    #[test]
    fn train_until_exhausted_counts_steps() {
        let mut trainer = Trainer::new(Counting(11), 2).unwrap();
        let mut model = Recorder::default();
        assert_eq!(trainer.train_until_exhausted(&mut model).unwrap(), 5);
        assert_eq!(trainer.offset(), 10);
        assert_eq!(model.windows.len(), 5);
    }
}
