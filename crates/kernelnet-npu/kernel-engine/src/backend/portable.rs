// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Portable Backend
//!
//! The fallback for hosts without a usable compute device. Kernels are still
//! assembled, persisted and exported as standalone C; they are just never
//! built or dispatched here, so the network compiler treats feed/train as
//! no-ops.

use super::ComputeBackend;
use crate::error::{EngineError, Result};
use crate::kernel::{KernelHandle, KernelSource};
use kernelnet_neural::Value;

/// Source-emission-only backend
#[derive(Debug, Clone)]
pub struct PortableBackend {
    /// Backend name for logging
    name: String,
}

impl PortableBackend {
    pub fn new() -> Self {
        Self {
            name: "Portable (source emission only)".to_string(),
        }
    }

    fn unavailable(&self) -> EngineError {
        EngineError::AccelerationUnavailable(format!("{} cannot execute kernels", self.name))
    }
}

impl Default for PortableBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for PortableBackend {
    fn backend_name(&self) -> &str {
        &self.name
    }

    fn is_accelerated(&self) -> bool {
        false
    }

    fn build_program(&mut self, _kernels: &[KernelSource<'_>]) -> Result<()> {
        Err(self.unavailable())
    }

    fn kernel_handle(&self, _entry_point: &str) -> Result<KernelHandle> {
        Err(EngineError::NotBuilt)
    }

    fn upload_memory(&mut self, _memory: &[Value]) -> Result<()> {
        Err(self.unavailable())
    }

    fn stage_feed_arguments(&mut self, _inputs: &[Value], _outputs_len: usize) -> Result<()> {
        Err(self.unavailable())
    }

    fn stage_train_arguments(&mut self, _rate: Value, _targets: &[Value]) -> Result<()> {
        Err(self.unavailable())
    }

    fn enqueue(&mut self, _kernel: KernelHandle) -> Result<()> {
        Err(EngineError::NotBuilt)
    }

    fn finish(&mut self) -> Result<()> {
        // nothing is ever queued
        Ok(())
    }

    fn read_outputs(&mut self, _outputs: &mut [Value]) -> Result<()> {
        Err(EngineError::NotBuilt)
    }

    fn read_memory(&mut self, _memory: &mut [Value]) -> Result<()> {
        Err(EngineError::NotBuilt)
    }
}
