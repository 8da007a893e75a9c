// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # KernelNet Neural Building Blocks
//!
//! Everything the kernel assembler reads, but never writes:
//! - **Types**: the kernel value type (`f64`, or `f32` with `single-precision`) and errors
//! - **Fragment**: an ordered list of generated expressions with a known size
//! - **NeuronUnit**: the three per-neuron fragments (feed, trace, train)
//! - **NeuronGraph**: ordered layers of neuron units with forward/reverse traversal
//! - **MemoryContext**: the shared memory arena plus the four bind-fragment builders
//!
//! The expression micro-language that produces fragment contents lives outside
//! this crate; fragments are treated as opaque, already-generated statements.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod fragment;
pub mod graph;
pub mod memory;
pub mod neuron;
pub mod types;

pub use fragment::Fragment;
pub use graph::NeuronGraph;
pub use memory::{MemoryContext, TrainingContext};
pub use neuron::{NeuronFragments, NeuronUnit};
pub use types::{value_type_name, NeuralError, Result, Value};
