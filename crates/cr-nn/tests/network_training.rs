// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use cr_nn::{ErrorKind, MultiLayerNetwork, RnnLayer, RnnParameters, GRADIENT_CLIP};
use cr_tensor::{Matrix, RandomSource};

fn one_hots(vocabulary: usize, indices: &[usize]) -> Vec<Matrix> {
    indices
        .iter()
        .map(|&i| Matrix::one_hot(vocabulary, i).unwrap())
        .collect()
}

#[test]
fn repeated_pattern_is_learned() {
    let mut net = MultiLayerNetwork::new(vec![10], 0.1).unwrap();
    net.initialize(4, &mut RandomSource::seeded(2024)).unwrap();
    let hidden = net.save_hidden_states().unwrap();
    let (ix, iy) = ([0, 1, 2], [1, 2, 3]);

    let mut losses = Vec::with_capacity(200);
    for _ in 0..200 {
        net.restore_hidden_states(&hidden).unwrap();
        losses.push(net.forward_backward(&ix, &iy).unwrap());
    }
    let initial = losses[0];
    let last = losses[losses.len() - 1];
    assert!(last < 0.1 * initial, "loss went from {initial} to {last}");
    assert!(last < losses[100]);
}

#[test]
fn tapering_stacks_train_and_sample() {
    let mut net = MultiLayerNetwork::new(vec![10, 6, 4], 0.1).unwrap();
    net.initialize(5, &mut RandomSource::seeded(31)).unwrap();
    let widths: Vec<_> = net
        .layers()
        .iter()
        .map(|l| (l.input_size(), l.hidden_size(), l.output_size()))
        .collect();
    assert_eq!(widths, vec![(5, 10, 6), (6, 6, 4), (4, 4, 5)]);
    for pair in net.layers().windows(2) {
        assert_eq!(pair[0].output_size(), pair[1].input_size());
    }

    let hidden = net.save_hidden_states().unwrap();
    let (ix, iy) = ([0, 1, 2, 3], [1, 2, 3, 4]);
    let mut losses = Vec::with_capacity(150);
    for _ in 0..150 {
        net.restore_hidden_states(&hidden).unwrap();
        losses.push(net.forward_backward(&ix, &iy).unwrap());
    }
    assert!(losses.iter().all(|loss| loss.is_finite()));
    assert!(losses[losses.len() - 1] < losses[0]);

    let drawn = net
        .sample_indices(12, &[0, 2], 0.8, true, &mut RandomSource::seeded(9))
        .unwrap();
    assert_eq!(drawn.len(), 12);
    assert!(drawn.iter().all(|&i| i < 5));
}

#[test]
fn pathological_gradients_are_clipped() {
    let params = RnnParameters {
        wxh: Matrix::zeros(4, 3).unwrap(),
        whh: Matrix::zeros(4, 4).unwrap(),
        why: Matrix::zeros(3, 4).unwrap(),
        bh: Matrix::zeros_vector(4).unwrap(),
        by: Matrix::column(vec![50.0, 0.0, 0.0]).unwrap(),
    };
    let mut layer = RnnLayer::from_parameters(params, Matrix::zeros_vector(4).unwrap(), 0.1).unwrap();
    let inputs = one_hots(3, &[0; 20]);
    let targets = [2; 20];
    let trace = layer.forward(&inputs).unwrap();
    let dy = trace.output_gradient(&targets).unwrap();
    let pass = layer.backward(trace, &dy).unwrap();

    assert_eq!(pass.gradients.by.data()[0], GRADIENT_CLIP);
    assert_eq!(pass.gradients.by.data()[2], -GRADIENT_CLIP);
    for gradient in pass.gradients.matrices() {
        assert!(gradient.data().iter().all(|v| v.abs() <= GRADIENT_CLIP));
    }
    for dx in &pass.input_gradients {
        assert!(dx.data().iter().all(|v| v.abs() <= GRADIENT_CLIP));
    }
}

#[test]
fn sampling_without_advance_is_repeatable_and_side_effect_free() {
    let mut net = MultiLayerNetwork::new(vec![16, 12], 0.1).unwrap();
    net.initialize(6, &mut RandomSource::seeded(5)).unwrap();
    let untouched = net.clone();

    let first = net
        .sample_indices(30, &[1, 4, 2], 1.0, false, &mut RandomSource::seeded(77))
        .unwrap();
    let second = net
        .sample_indices(30, &[1, 4, 2], 1.0, false, &mut RandomSource::seeded(77))
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(net, untouched);

    let mut replica = untouched.clone();
    let expected = replica.forward_backward(&[0, 1], &[1, 2]).unwrap();
    assert_eq!(net.forward_backward(&[0, 1], &[1, 2]).unwrap(), expected);
}

#[test]
fn one_layer_network_matches_a_bare_layer() {
    let mut layer = RnnLayer::new(5, 9, 5, 0.1).unwrap();
    layer.initialize(&mut RandomSource::seeded(31)).unwrap();
    let mut net = MultiLayerNetwork::from_layers(vec![layer.clone()]).unwrap();

    let ix = [0, 3, 1, 4];
    let iy = [3, 1, 4, 2];
    for _ in 0..3 {
        let trace = layer.forward(&one_hots(5, &ix)).unwrap();
        let loss = layer.loss(&trace, &iy).unwrap();
        let dy = layer.output_gradient(&trace, &iy).unwrap();
        layer.backward(trace, &dy).unwrap();
        assert_eq!(net.forward_backward(&ix, &iy).unwrap(), loss);
    }
    assert_eq!(net.layers()[0], layer);

    let direct = layer
        .sample(25, 2, 1.0, false, &mut RandomSource::seeded(8))
        .unwrap();
    let stacked = net
        .sample_indices(25, &[2], 1.0, false, &mut RandomSource::seeded(8))
        .unwrap();
    assert_eq!(direct, stacked);
}

#[test]
fn failed_training_steps_leave_weights_alone() {
    let mut net = MultiLayerNetwork::new(vec![8, 8], 0.1).unwrap();
    net.initialize(4, &mut RandomSource::seeded(13)).unwrap();
    let before = net.clone();

    let mismatched = net.forward_backward(&[0, 1, 2], &[1, 2]).unwrap_err();
    assert_eq!(mismatched.kind(), ErrorKind::Configuration);
    let empty = net.forward_backward(&[], &[]).unwrap_err();
    assert_eq!(empty.kind(), ErrorKind::Configuration);
    let out_of_range = net.forward_backward(&[0, 7], &[1, 2]).unwrap_err();
    assert_eq!(out_of_range.kind(), ErrorKind::Domain);
    assert_eq!(net, before);
}
