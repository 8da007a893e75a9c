// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # KernelNet Kernel Engine
//!
//! Turns a layered neuron graph into executable kernel programs and runs them
//! against one shared memory arena.
//!
//! ## Architecture
//! - **assembler**: pure bin-packing of neurons into ordered feed/train kernels
//! - **dialect**: structured kernel IR rendered once to OpenCL C or WGSL
//! - **backend**: `ComputeBackend` strategy (portable, WGPU)
//! - **network**: `NetworkCompiler`, which compiles, executes, exports and persists
//! - **standalone**: backend-free C export of the first kernel of each pass
//! - **record**: serde form of a network (`FeedKernels` / `TrainKernels`)
//!
//! ## Example
//! ```
//! use kernelnet_kernel_engine::NetworkCompiler;
//! use kernelnet_neural::{NeuronFragments, NeuronGraph, TrainingContext};
//!
//! let neuron = NeuronFragments::new(
//!     ["x[0] = x[0] * 0.5"].into_iter().collect(),
//!     Default::default(),
//!     ["x[0] = x[0] + 0.1"].into_iter().collect(),
//! );
//! let graph = NeuronGraph::new(vec![vec![neuron]]);
//! let mut context = TrainingContext::new();
//! context.allocate(1.0);
//!
//! let network = NetworkCompiler::with_graph(context, &graph, 100);
//! assert_eq!(network.feed_kernels()[0].entry_point(), "feed_0");
//! assert_eq!(network.as_standalone("tiny", false).len(), 2);
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod assembler;
pub mod backend;
pub mod dialect;
pub mod error;
pub mod kernel;
pub mod network;
pub mod record;
pub mod standalone;

pub use assembler::{
    assemble_feed_kernels, assemble_train_kernels, expression_limit, MIN_EXPRESSIONS_PER_KERNEL,
};
pub use backend::{
    create_backend, is_gpu_available, select_backend, BackendConfig, BackendDecision,
    BackendType, ComputeBackend, PortableBackend,
};
#[cfg(feature = "gpu")]
pub use backend::WgpuBackend;
pub use dialect::{KernelIr, SourceDialect};
pub use error::{EngineError, Error, Result};
pub use kernel::{KernelHandle, KernelPass, KernelSource, KernelUnit};
pub use network::NetworkCompiler;
pub use record::{KernelRecord, NetworkRecord};
pub use standalone::{render_standalone, StandaloneInput, StandaloneSources};
