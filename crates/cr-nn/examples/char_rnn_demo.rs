// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use cr_config::{flush_tracing, init_tracing};
use cr_nn::{CharRnn, RnnConfig, TextCorpus, Trainer};
use std::path::PathBuf;

const FALLBACK_TEXT: &str = "\
to be, or not to be, that is the question:
whether 'tis nobler in the mind to suffer
the slings and arrows of outrageous fortune,
or to take arms against a sea of troubles
and by opposing end them.";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing()?;

    // Optional first argument: a JSON config file.
    let mut config = match std::env::args().nth(1) {
        Some(path) => RnnConfig::from_json_file(PathBuf::from(path))?,
        None => RnnConfig {
            hidden_size: 32,
            sequence_length: 25,
            sample_length: 120,
            seed: Some(7),
            ..RnnConfig::default()
        },
    };
    config.sanitize();

    let corpus = if config.input_file.exists() {
        TextCorpus::from_file(&config.input_file)?
    } else {
        println!(
            "{} not found, training on the built-in snippet",
            config.input_file.display()
        );
        TextCorpus::from_text(FALLBACK_TEXT)
    };

    let mut rng = config.random_source();
    let mut model = CharRnn::new(corpus.alphabet().clone(), config.build_network()?)?;
    model.initialize(&mut rng)?;

    let mut trainer = Trainer::new(corpus, config.sequence_length)?;
    let seed: String = trainer.source().alphabet().symbols()[..1].iter().collect();
    for epoch in 1..=20 {
        let steps = trainer.train_until_exhausted(&mut model)?;
        trainer.loop_around();
        let sample = model.sample_string(
            config.sample_length,
            &seed,
            config.sampling_temperature,
            false,
            &mut rng,
        )?;
        println!(
            "epoch {epoch:>2}: steps={steps} loss={:.3}%\n{sample}\n",
            trainer.normalized_smooth_loss()
        );
    }
    flush_tracing();
    Ok(())
}
