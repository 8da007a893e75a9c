// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Network Compiler
//!
//! Owns the memory context, both kernel lists and the compute backend, and
//! drives everything after assembly:
//!
//! ```text
//! NeuronGraph + budget ──assembler──▶ feed/train kernels
//!                                          │
//!              compile() ◀─────────────────┤──────────▶ as_standalone()
//!                 │                        │
//!        feed() / train()                  └──────────▶ to_record() / to_json()
//! ```
//!
//! ## Execution discipline
//!
//! Kernels communicate only through the shared memory arena, so every
//! dispatch is followed by a blocking `finish()` before the next one is
//! enqueued. The host copy of the arena is authoritative: it is uploaded
//! before each pass and read back after it.
//!
//! `&mut self` on compile/feed/train rules out concurrent use of one network.

use crate::assembler::{assemble_feed_kernels, assemble_train_kernels};
use crate::backend::{ComputeBackend, PortableBackend};
use crate::error::{EngineError, Result};
use crate::kernel::{KernelPass, KernelSource, KernelUnit};
use crate::record::NetworkRecord;
use crate::standalone::{render_standalone, StandaloneInput, StandaloneSources};
use kernelnet_neural::{MemoryContext, NeuronGraph, NeuronUnit, TrainingContext, Value};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};

/// A neuron graph compiled into ordered feed and train kernels
pub struct NetworkCompiler<C: MemoryContext = TrainingContext> {
    context: C,
    feed_kernels: Vec<KernelUnit>,
    train_kernels: Vec<KernelUnit>,
    backend: Box<dyn ComputeBackend>,
}

impl<C: MemoryContext> NetworkCompiler<C> {
    /// Network with no kernels, to be filled by [`load_record`](Self::load_record)
    pub fn new(context: C) -> Self {
        Self {
            context,
            feed_kernels: Vec::new(),
            train_kernels: Vec::new(),
            backend: Box::new(PortableBackend::new()),
        }
    }

    /// Assemble both passes of `graph` under `max_expressions_per_kernel`
    pub fn with_graph<N: NeuronUnit>(
        context: C,
        graph: &NeuronGraph<N>,
        max_expressions_per_kernel: usize,
    ) -> Self {
        let _span = info_span!(
            "assemble",
            neurons = graph.num_neurons(),
            budget = max_expressions_per_kernel
        )
        .entered();
        let start = Instant::now();

        let feed_kernels = assemble_feed_kernels(graph, &context, max_expressions_per_kernel);
        let train_kernels = assemble_train_kernels(graph, &context, max_expressions_per_kernel);

        info!(
            feed_kernels = feed_kernels.len(),
            train_kernels = train_kernels.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Network assembled"
        );

        Self {
            context,
            feed_kernels,
            train_kernels,
            backend: Box::new(PortableBackend::new()),
        }
    }

    /// Replace the backend; any previous build is discarded
    pub fn with_backend(mut self, backend: Box<dyn ComputeBackend>) -> Self {
        self.backend = backend;
        self.unbind_all();
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.backend_name()
    }

    pub fn feed_kernels(&self) -> &[KernelUnit] {
        &self.feed_kernels
    }

    pub fn train_kernels(&self) -> &[KernelUnit] {
        &self.train_kernels
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn into_context(self) -> C {
        self.context
    }

    /// Both lists non-empty and every kernel built
    pub fn is_built(&self) -> bool {
        !self.feed_kernels.is_empty()
            && !self.train_kernels.is_empty()
            && self.kernels().all(KernelUnit::is_built)
    }

    fn kernels(&self) -> impl Iterator<Item = &KernelUnit> + '_ {
        self.feed_kernels.iter().chain(&self.train_kernels)
    }

    fn unbind_all(&mut self) {
        for kernel in self.feed_kernels.iter_mut().chain(self.train_kernels.iter_mut()) {
            kernel.unbind();
        }
    }

    /// Build every kernel into one backend program
    ///
    /// On any failure all kernels are left unbuilt.
    pub fn compile(&mut self) -> Result<()> {
        let _span = info_span!("compile", backend = self.backend.backend_name()).entered();
        let start = Instant::now();
        self.unbind_all();

        if !self.backend.is_accelerated() {
            warn!("No compute device available, only standalone emission is possible");
            return Err(EngineError::AccelerationUnavailable(format!(
                "{} cannot build kernels",
                self.backend.backend_name()
            )));
        }

        let sources: Vec<KernelSource<'_>> = self
            .feed_kernels
            .iter()
            .chain(&self.train_kernels)
            .map(KernelUnit::as_source)
            .collect();
        if let Err(e) = self.backend.build_program(&sources) {
            if let EngineError::BuildFailure { diagnostics } = &e {
                error!(diagnostics = %diagnostics, "Kernel program build failed");
            }
            return Err(e);
        }

        let handles = self
            .kernels()
            .map(|kernel| self.backend.kernel_handle(kernel.entry_point()))
            .collect::<Result<Vec<_>>>()?;
        self.backend.upload_memory(self.context.memory())?;

        let kernels = self.feed_kernels.iter_mut().chain(self.train_kernels.iter_mut());
        for (kernel, handle) in kernels.zip(handles) {
            kernel.bind(handle);
        }

        info!(
            kernels = self.feed_kernels.len() + self.train_kernels.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Network compiled"
        );
        Ok(())
    }

    fn is_executable(&self, pass: KernelPass) -> bool {
        let kernels = match pass {
            KernelPass::Feed => &self.feed_kernels,
            KernelPass::Train => &self.train_kernels,
        };
        self.backend.is_accelerated() && !kernels.is_empty() && kernels.iter().all(KernelUnit::is_built)
    }

    /// Run every feed kernel in order and return the outputs snapshot
    ///
    /// Returns an empty vector when the network cannot execute (portable
    /// backend or not compiled); use [`as_standalone`](Self::as_standalone)
    /// for backend-free execution.
    pub fn feed(&mut self, inputs: &[Value]) -> Result<Vec<Value>> {
        if !self.is_executable(KernelPass::Feed) {
            debug!("Feed skipped, network is not executable");
            return Ok(Vec::new());
        }

        let _span = info_span!("feed", kernels = self.feed_kernels.len()).entered();
        let start = Instant::now();

        self.context.outputs_mut().fill(0.0);
        let outputs_len = self.context.outputs().len();
        self.backend.upload_memory(self.context.memory())?;
        self.backend.stage_feed_arguments(inputs, outputs_len)?;

        dispatch_all(self.backend.as_mut(), &self.feed_kernels)?;

        self.backend.read_outputs(self.context.outputs_mut())?;
        self.backend.read_memory(self.context.memory_mut())?;

        debug!(elapsed_us = start.elapsed().as_micros() as u64, "Feed complete");
        Ok(self.context.outputs().to_vec())
    }

    /// Run every train kernel in order; only the memory arena changes
    pub fn train(&mut self, rate: Value, targets: &[Value]) -> Result<()> {
        if !self.is_executable(KernelPass::Train) {
            debug!("Train skipped, network is not executable");
            return Ok(());
        }

        let _span = info_span!("train", kernels = self.train_kernels.len()).entered();
        let start = Instant::now();

        self.backend.upload_memory(self.context.memory())?;
        self.backend.stage_train_arguments(rate, targets)?;

        dispatch_all(self.backend.as_mut(), &self.train_kernels)?;

        self.backend.read_memory(self.context.memory_mut())?;

        debug!(elapsed_us = start.elapsed().as_micros() as u64, "Train complete");
        Ok(())
    }

    /// Backend-free `{name}.h` / `{name}.c` pair of the first kernels
    pub fn as_standalone(&self, name: &str, const_only: bool) -> StandaloneSources {
        render_standalone(
            name,
            StandaloneInput {
                feed_kernels: &self.feed_kernels,
                train_kernels: &self.train_kernels,
                memory: self.context.memory(),
                outputs: self.context.outputs(),
            },
            const_only,
        )
    }

    pub fn to_record(&self) -> NetworkRecord {
        NetworkRecord {
            feed_kernels: self.feed_kernels.iter().map(KernelUnit::to_record).collect(),
            train_kernels: self.train_kernels.iter().map(KernelUnit::to_record).collect(),
        }
    }

    /// Replace both kernel lists; every kernel comes back unbuilt
    pub fn load_record(&mut self, record: NetworkRecord) {
        self.feed_kernels = record
            .feed_kernels
            .into_iter()
            .map(|kernel| KernelUnit::from_record(KernelPass::Feed, kernel))
            .collect();
        self.train_kernels = record
            .train_kernels
            .into_iter()
            .map(|kernel| KernelUnit::from_record(KernelPass::Train, kernel))
            .collect();
        debug!(
            feed_kernels = self.feed_kernels.len(),
            train_kernels = self.train_kernels.len(),
            "Network record loaded"
        );
    }

    /// Network with `context` and the kernels of `record`
    pub fn from_record(context: C, record: NetworkRecord) -> Self {
        let mut network = Self::new(context);
        network.load_record(record);
        network
    }

    pub fn to_json(&self) -> Result<String> {
        self.to_record().to_json()
    }

    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let record = NetworkRecord::from_json(json)?;
        self.load_record(record);
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), "Network saved");
        Ok(())
    }

    pub fn load(&mut self, path: &Path) -> Result<()> {
        let json = std::fs::read_to_string(path)?;
        self.load_json(&json)
    }
}

/// Enqueue each kernel and block until it completes before the next one
fn dispatch_all(backend: &mut dyn ComputeBackend, kernels: &[KernelUnit]) -> Result<()> {
    for kernel in kernels {
        let handle = kernel.handle().ok_or(EngineError::NotBuilt)?;
        backend.enqueue(handle)?;
        backend.finish()?;
    }
    Ok(())
}
