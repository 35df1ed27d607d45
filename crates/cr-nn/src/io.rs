// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::alphabet::Alphabet;
use crate::char_rnn::CharRnn;
use crate::error::{RnnError, RnnResult};
use crate::layer::{RnnLayer, RnnParameters};
use crate::network::MultiLayerNetwork;
use cr_tensor::Matrix;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct LayerSnapshot {
    learning_rate: f64,
    parameters: RnnParameters,
    adagrad_memory: RnnParameters,
    hidden_state: Matrix,
}

impl LayerSnapshot {
    fn from_layer(layer: &RnnLayer) -> RnnResult<Self> {
        Ok(Self {
            learning_rate: layer.learning_rate(),
            parameters: layer.parameters()?.clone(),
            adagrad_memory: layer.adagrad_memory()?.clone(),
            hidden_state: layer.save_hidden_state()?,
        })
    }

    fn into_layer(self) -> RnnResult<RnnLayer> {
        RnnLayer::from_state(
            self.parameters,
            self.adagrad_memory,
            self.hidden_state,
            self.learning_rate,
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ModelSnapshot {
    alphabet: Alphabet,
    layers: Vec<LayerSnapshot>,
}

fn to_snapshot(model: &CharRnn) -> RnnResult<ModelSnapshot> {
    let network = model.network();
    if !network.is_initialized() {
        return Err(RnnError::Uninitialized("network"));
    }
    let layers = network
        .layers()
        .iter()
        .map(LayerSnapshot::from_layer)
        .collect::<RnnResult<Vec<_>>>()?;
    Ok(ModelSnapshot {
        alphabet: model.alphabet().clone(),
        layers,
    })
}

fn from_snapshot(snapshot: ModelSnapshot) -> RnnResult<CharRnn> {
    let layers = snapshot
        .layers
        .into_iter()
        .map(LayerSnapshot::into_layer)
        .collect::<RnnResult<Vec<_>>>()?;
    let network = MultiLayerNetwork::from_layers(layers)?;
    CharRnn::new(snapshot.alphabet, network)
}

/// Writes the alphabet plus every layer's weights, Adagrad memory and hidden
/// state as pretty JSON.
pub fn save_json<P: AsRef<Path>>(model: &CharRnn, path: P) -> RnnResult<()> {
    let snapshot = to_snapshot(model)?;
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &snapshot)?;
    writer.flush()?;
    info!(path = %path.as_ref().display(), layers = snapshot.layers.len(), "saved model snapshot");
    Ok(())
}

/// Restores a model written by [`save_json`]. Training and sampling resume
/// exactly where the saved model left off.
pub fn load_json<P: AsRef<Path>>(path: P) -> RnnResult<CharRnn> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    let snapshot: ModelSnapshot = serde_json::from_reader(reader)?;
    let model = from_snapshot(snapshot)?;
    info!(path = %path.as_ref().display(), "loaded model snapshot");
    Ok(model)
}
