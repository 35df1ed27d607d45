// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Character-level recurrent networks: a vanilla RNN layer trained with
//! backpropagation through time and Adagrad, stacked into a multi-layer
//! network, plus the text plumbing around it (alphabet, corpus, trainer,
//! snapshots and config).
//!
//! ```no_run
//! use cr_nn::{CharRnn, MultiLayerNetwork, TextCorpus, Trainer};
//! use cr_tensor::RandomSource;
//!
//! # fn main() -> cr_nn::RnnResult<()> {
//! let corpus = TextCorpus::from_text("hello hello hello hello");
//! let network = MultiLayerNetwork::new(vec![32, 32], 0.1)?;
//! let mut model = CharRnn::new(corpus.alphabet().clone(), network)?;
//! let mut rng = RandomSource::seeded(7);
//! model.initialize(&mut rng)?;
//!
//! let mut trainer = Trainer::new(corpus, 4)?;
//! trainer.train_until_exhausted(&mut model)?;
//! let text = model.sample_string(20, "h", 0.8, false, &mut rng)?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```

pub mod alphabet;
pub mod char_rnn;
pub mod config;
pub mod corpus;
pub mod error;
pub mod io;
pub mod layer;
pub mod network;
pub mod optim;
pub mod trainer;

pub use alphabet::Alphabet;
pub use char_rnn::CharRnn;
pub use config::RnnConfig;
pub use corpus::TextCorpus;
pub use error::{ErrorKind, RnnError, RnnResult};
pub use io::{load_json, save_json};
pub use layer::{BackwardPass, ForwardTrace, RnnLayer, RnnParameters};
pub use network::MultiLayerNetwork;
pub use optim::{Adagrad, ADAGRAD_EPSILON, GRADIENT_CLIP};
pub use trainer::{TokenSource, TokenWindow, Trainable, Trainer};
