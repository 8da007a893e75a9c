// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Network Execution Tests
//!
//! Drives `NetworkCompiler` against a recording backend to check the call
//! sequence: one combined build, per-kernel enqueue followed by a blocking
//! finish, staging before dispatch and readback after it.

use kernelnet_kernel_engine::*;
use kernelnet_neural::{
    Fragment, MemoryContext, NeuronFragments, NeuronGraph, TrainingContext, Value,
};
use std::sync::{Arc, Mutex};

/// Backend that records every call and fakes kernel side effects
///
/// Each enqueued kernel adds 1 to memory slot 0 and copies it to output 0,
/// which is enough to observe ordering and readback on the host side.
struct RecordingBackend {
    log: Arc<Mutex<Vec<String>>>,
    fail_build: bool,
    entry_points: Vec<String>,
    memory: Vec<Value>,
    outputs: Vec<Value>,
}

impl RecordingBackend {
    fn new(log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            log,
            fail_build: false,
            entry_points: Vec::new(),
            memory: Vec::new(),
            outputs: Vec::new(),
        }
    }

    fn failing(log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            fail_build: true,
            ..Self::new(log)
        }
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

impl ComputeBackend for RecordingBackend {
    fn backend_name(&self) -> &str {
        "Recording"
    }

    fn is_accelerated(&self) -> bool {
        true
    }

    fn build_program(&mut self, kernels: &[KernelSource<'_>]) -> Result<()> {
        let names: Vec<&str> = kernels.iter().map(|k| k.entry_point).collect();
        self.record(format!("build {}", names.join(",")));
        if self.fail_build {
            return Err(EngineError::BuildFailure {
                diagnostics: "syntax error".to_string(),
            });
        }
        self.entry_points = names.into_iter().map(String::from).collect();
        Ok(())
    }

    fn kernel_handle(&self, entry_point: &str) -> Result<KernelHandle> {
        self.entry_points
            .iter()
            .position(|name| name == entry_point)
            .map(KernelHandle::new)
            .ok_or_else(|| EngineError::UnknownKernel(entry_point.to_string()))
    }

    fn upload_memory(&mut self, memory: &[Value]) -> Result<()> {
        self.record(format!("upload {}", memory.len()));
        self.memory = memory.to_vec();
        Ok(())
    }

    fn stage_feed_arguments(&mut self, inputs: &[Value], outputs_len: usize) -> Result<()> {
        self.record(format!("stage_feed {} {}", inputs.len(), outputs_len));
        self.outputs = vec![0.0; outputs_len];
        Ok(())
    }

    fn stage_train_arguments(&mut self, rate: Value, targets: &[Value]) -> Result<()> {
        self.record(format!("stage_train {} {}", rate, targets.len()));
        Ok(())
    }

    fn enqueue(&mut self, kernel: KernelHandle) -> Result<()> {
        self.record(format!("enqueue {}", self.entry_points[kernel.index()]));
        self.memory[0] += 1.0;
        if let Some(first) = self.outputs.first_mut() {
            *first = self.memory[0];
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.record("finish".to_string());
        Ok(())
    }

    fn read_outputs(&mut self, outputs: &mut [Value]) -> Result<()> {
        self.record("read_outputs".to_string());
        outputs.copy_from_slice(&self.outputs);
        Ok(())
    }

    fn read_memory(&mut self, memory: &mut [Value]) -> Result<()> {
        self.record("read_memory".to_string());
        memory.copy_from_slice(&self.memory);
        Ok(())
    }
}

fn fragment(count: usize) -> Fragment {
    (0..count).map(|_| "x[0] = x[0]").collect()
}

/// Two feed kernels (100 expressions each) and two train kernels (101 each)
fn network() -> NetworkCompiler {
    let mut context = TrainingContext::new();
    let state = context.allocate(0.0);
    let input = context.allocate(0.0);
    context.register_input(input).unwrap();
    context.register_output(state).unwrap();

    let neuron = NeuronFragments::new(fragment(60), fragment(40), fragment(101));
    let graph = NeuronGraph::new(vec![vec![neuron.clone()], vec![neuron]]);
    NetworkCompiler::with_graph(context, &graph, 100)
}

fn take_log(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    std::mem::take(&mut *log.lock().unwrap())
}

#[test]
fn test_compile_builds_one_program_and_binds_every_kernel() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut network = network().with_backend(Box::new(RecordingBackend::new(log.clone())));
    assert!(!network.is_built());

    network.compile().unwrap();

    assert!(network.is_built());
    assert_eq!(
        take_log(&log),
        vec!["build feed_0,feed_1,train_0,train_1", "upload 2"]
    );
    let handles: Vec<usize> = network
        .feed_kernels()
        .iter()
        .chain(network.train_kernels())
        .map(|k| k.handle().unwrap().index())
        .collect();
    assert_eq!(handles, vec![0, 1, 2, 3]);
}

#[test]
fn test_build_failure_leaves_everything_unbuilt() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut network = network().with_backend(Box::new(RecordingBackend::failing(log)));

    let result = network.compile();

    assert!(matches!(result, Err(EngineError::BuildFailure { .. })));
    assert!(!network.is_built());
    assert!(network.feed_kernels().iter().all(|k| !k.is_built()));
    assert!(network.feed(&[1.0]).unwrap().is_empty());
}

#[test]
fn test_train_before_compile_is_a_no_op() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut network = network().with_backend(Box::new(RecordingBackend::new(log.clone())));
    network.context_mut().set_value(0, 3.0).unwrap();
    let before = network.context().memory().to_vec();

    network.train(0.5, &[1.0]).unwrap();

    assert!(take_log(&log).is_empty());
    assert_eq!(network.context().memory(), before.as_slice());
}

#[test]
fn test_train_after_build_failure_is_a_no_op() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut network = network().with_backend(Box::new(RecordingBackend::failing(log.clone())));
    assert!(network.compile().is_err());
    take_log(&log);
    let before = network.context().memory().to_vec();

    network.train(0.5, &[1.0]).unwrap();
    assert!(network.feed(&[1.0]).unwrap().is_empty());

    assert!(take_log(&log).is_empty());
    assert_eq!(network.context().memory(), before.as_slice());
}

#[test]
fn test_feed_dispatches_sequentially_and_reads_back() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut network = network().with_backend(Box::new(RecordingBackend::new(log.clone())));
    network.compile().unwrap();
    take_log(&log);

    let outputs = network.feed(&[0.5]).unwrap();

    assert_eq!(
        take_log(&log),
        vec![
            "upload 2",
            "stage_feed 1 1",
            "enqueue feed_0",
            "finish",
            "enqueue feed_1",
            "finish",
            "read_outputs",
            "read_memory",
        ]
    );
    assert_eq!(outputs, vec![2.0]);
    assert_eq!(network.context().outputs(), &[2.0]);
    assert_eq!(network.context().memory()[0], 2.0);
}

#[test]
fn test_train_mutates_memory_only() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut network = network().with_backend(Box::new(RecordingBackend::new(log.clone())));
    network.compile().unwrap();
    take_log(&log);

    network.train(0.25, &[1.0]).unwrap();

    assert_eq!(
        take_log(&log),
        vec![
            "upload 2",
            "stage_train 0.25 1",
            "enqueue train_0",
            "finish",
            "enqueue train_1",
            "finish",
            "read_memory",
        ]
    );
    assert_eq!(network.context().memory()[0], 2.0);
    assert_eq!(network.context().outputs(), &[0.0]);
}

#[test]
fn test_host_edits_reach_the_device_before_each_pass() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut network = network().with_backend(Box::new(RecordingBackend::new(log)));
    network.compile().unwrap();

    network.context_mut().set_value(0, 10.0).unwrap();
    let outputs = network.feed(&[0.0]).unwrap();

    assert_eq!(outputs, vec![12.0]);
}

#[test]
fn test_loading_a_record_unbuilds_the_network() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut network = network().with_backend(Box::new(RecordingBackend::new(log)));
    network.compile().unwrap();
    assert!(network.is_built());

    let json = network.to_json().unwrap();
    network.load_json(&json).unwrap();

    assert!(!network.is_built());
    assert!(network.feed(&[0.0]).unwrap().is_empty());

    network.compile().unwrap();
    assert!(network.is_built());
}

#[test]
fn test_is_built_requires_both_passes() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut context = TrainingContext::new();
    context.allocate(0.0);
    let neuron = NeuronFragments::new(fragment(1), Fragment::new(), Fragment::new());
    let graph = NeuronGraph::new(vec![vec![neuron]]);

    let mut network = NetworkCompiler::with_graph(context, &graph, 100)
        .with_backend(Box::new(RecordingBackend::new(log)));
    network.compile().unwrap();

    // an empty train fragment still yields a train kernel
    assert_eq!(network.train_kernels().len(), 1);
    assert!(network.is_built());

    let mut empty = NetworkCompiler::new(TrainingContext::new());
    empty.load_record(NetworkRecord {
        feed_kernels: network.to_record().feed_kernels,
        train_kernels: Vec::new(),
    });
    assert!(!empty.is_built());
}
