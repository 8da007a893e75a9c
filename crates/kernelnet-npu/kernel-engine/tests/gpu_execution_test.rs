// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # GPU Execution Tests
//!
//! End-to-end runs on the WGPU backend. Skipped silently when the host has
//! no adapter (CI without a GPU).

#![cfg(feature = "gpu")]

use kernelnet_kernel_engine::*;
use kernelnet_neural::{MemoryContext, NeuronFragments, NeuronGraph, TrainingContext};

fn gpu_network() -> Option<NetworkCompiler> {
    let backend = WgpuBackend::new().ok()?;

    let mut context = TrainingContext::new();
    let input = context.allocate(0.0);
    let hidden = context.allocate(0.0);
    let weight = context.allocate(2.0);
    let rate = context.allocate(0.0);
    let target = context.allocate(0.0);
    context.register_input(input).unwrap();
    context.register_output(hidden).unwrap();
    context.set_rate_variable(rate).unwrap();
    context.register_target(target).unwrap();

    let neuron = NeuronFragments::new(
        ["x[1] = x[0] * x[2]"].into_iter().collect(),
        Default::default(),
        ["x[2] = x[2] + x[3] * (x[4] - x[1])"].into_iter().collect(),
    );
    let graph = NeuronGraph::new(vec![vec![neuron]]);

    Some(NetworkCompiler::with_graph(context, &graph, 100).with_backend(Box::new(backend)))
}

#[test]
fn test_feed_then_train_on_gpu() {
    let Some(mut network) = gpu_network() else {
        return;
    };

    network.compile().unwrap();
    assert!(network.is_built());

    let outputs = network.feed(&[1.5]).unwrap();
    assert_eq!(outputs, vec![3.0]);

    // w += 0.5 * (4 - 3)
    network.train(0.5, &[4.0]).unwrap();
    assert_eq!(network.context().memory()[2], 2.5);

    let outputs = network.feed(&[2.0]).unwrap();
    assert_eq!(outputs, vec![5.0]);
}

#[test]
fn test_invalid_kernel_reports_build_failure() {
    let Some(network) = gpu_network() else {
        return;
    };

    let mut record = network.to_record();
    record.feed_kernels[0].full_source = record.feed_kernels[0]
        .full_source
        .replace("x[1] = x[0] * x[2];", "x[1] = undefined_symbol;");
    let mut broken = NetworkCompiler::from_record(network.into_context(), record)
        .with_backend(Box::new(WgpuBackend::new().unwrap()));

    assert!(matches!(
        broken.compile(),
        Err(EngineError::BuildFailure { .. })
    ));
    assert!(!broken.is_built());
}
