// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Persisting a network and its memory snapshot, then restoring both

use kernelnet::prelude::*;
use tempfile::tempdir;

fn trained_context() -> TrainingContext {
    let mut context = TrainingContext::new();
    let input = context.allocate(0.0);
    let hidden = context.allocate(0.0);
    context.allocate_or_reuse("w0", 0.75);
    let rate = context.allocate(0.0);
    let target = context.allocate(0.0);
    context.register_input(input).unwrap();
    context.register_output(hidden).unwrap();
    context.set_rate_variable(rate).unwrap();
    context.register_target(target).unwrap();
    context
}

fn graph() -> NeuronGraph<NeuronFragments> {
    let neuron = NeuronFragments::new(
        ["x[1] = x[0] * x[2]"].into_iter().collect(),
        ["x[5] = x[1]"].into_iter().collect(),
        ["x[2] = x[2] + x[3] * (x[4] - x[1])"].into_iter().collect(),
    );
    NeuronGraph::new(vec![vec![neuron.clone()], vec![neuron]])
}

#[test]
fn test_saved_network_reloads_unbuilt_with_same_kernels() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("network.json");

    let original = NetworkCompiler::with_graph(trained_context(), &graph(), 0);
    original.save(&path).unwrap();

    let mut restored = NetworkCompiler::new(trained_context());
    restored.load(&path).unwrap();

    assert!(!restored.is_built());
    assert_eq!(restored.to_record(), original.to_record());
    for (a, b) in original.feed_kernels().iter().zip(restored.feed_kernels()) {
        assert_eq!(a.entry_point(), b.entry_point());
        assert_eq!(a.full_source(), b.full_source());
        assert_eq!(a.num_expressions(), b.num_expressions());
    }
}

#[test]
fn test_persisted_json_uses_stable_field_names() {
    let network = NetworkCompiler::with_graph(trained_context(), &graph(), 0);
    let json: serde_json::Value = serde_json::from_str(&network.to_json().unwrap()).unwrap();

    let feed = json["FeedKernels"].as_array().unwrap();
    let train = json["TrainKernels"].as_array().unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(train.len(), 1);
    assert_eq!(feed[0]["EntryPoint"], "feed_0");
    assert_eq!(train[0]["EntryPoint"], "train_0");
    // two neurons, one feed and one trace expression each
    assert_eq!(feed[0]["NumExpressions"], 4);
    assert_eq!(train[0]["NumExpressions"], 2);
    assert!(feed[0]["FullSource"]
        .as_str()
        .unwrap()
        .starts_with("void kernel feed_0("));
}

#[test]
fn test_malformed_network_file_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, r#"{"FeedKernels": [{"EntryPoint": "feed_0"}]}"#).unwrap();

    let mut network = NetworkCompiler::new(TrainingContext::new());
    assert!(matches!(
        network.load(&path),
        Err(EngineError::MalformedRecord(_))
    ));
    assert!(network.feed_kernels().is_empty());
}

#[test]
fn test_memory_snapshot_round_trips_through_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("memory.json");
    let context = trained_context();
    std::fs::write(&path, context.to_json().unwrap()).unwrap();

    let loaded = TrainingContext::load(&path).unwrap();
    assert_eq!(loaded, context);
    assert_eq!(loaded.variable_index("w0"), Some(2));
    assert_eq!(loaded.memory()[2], 0.75);
    assert_eq!(loaded.num_inputs(), 1);
    assert_eq!(loaded.num_outputs(), 1);
    assert_eq!(loaded.num_targets(), 1);
}

#[test]
fn test_restored_network_exports_like_the_original() {
    let original = NetworkCompiler::with_graph(trained_context(), &graph(), 0);
    let restored = NetworkCompiler::from_record(trained_context(), original.to_record());

    let a = original.as_standalone("net", false);
    let b = restored.as_standalone("net", false);
    assert_eq!(a["net.c"], b["net.c"]);
    // headers differ only in their include guard
    let strip_guard = |h: &str| {
        h.lines()
            .filter(|line| !line.contains("KERNELNET_STANDALONE_GUARD_"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    assert_eq!(strip_guard(&a["net.h"]), strip_guard(&b["net.h"]));
}
