// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Compute Backend Abstraction
//!
//! A network holds exactly one backend, chosen at construction. The backend
//! owns everything device-side: the built program, the per-kernel entry
//! handles, the command queue and the argument buffers. The network only
//! talks to it through [`ComputeBackend`], in this order:
//!
//! 1. `build_program` once with every kernel source (feed first, then train)
//! 2. `kernel_handle` per entry point, then `upload_memory`
//! 3. per pass: `stage_*_arguments`, then `enqueue` + `finish` per kernel,
//!    then `read_outputs` / `read_memory`
//!
//! Two implementations exist:
//! - [`PortableBackend`]: always available, never accelerated. Networks on it
//!   still assemble, serialize and export standalone C.
//! - `WgpuBackend` (`gpu` feature): Metal/Vulkan/DirectX through WGPU.

mod portable;
#[cfg(feature = "gpu")]
mod wgpu_backend;

pub use portable::PortableBackend;
#[cfg(feature = "gpu")]
pub use wgpu_backend::WgpuBackend;

use crate::error::{Error, Result};
use crate::kernel::{KernelHandle, KernelSource};
use kernelnet_neural::Value;
use tracing::{info, warn};

/// Execution capability required by the network compiler
pub trait ComputeBackend: Send {
    /// Backend name for logging/debugging
    fn backend_name(&self) -> &str;

    /// False for backends that cannot build or dispatch kernels
    fn is_accelerated(&self) -> bool;

    /// Build one program out of all kernel sources
    ///
    /// On failure nothing from this call may be kept; diagnostics travel in
    /// [`Error::BuildFailure`].
    fn build_program(&mut self, kernels: &[KernelSource<'_>]) -> Result<()>;

    /// Callable entry of the last built program
    fn kernel_handle(&self, entry_point: &str) -> Result<KernelHandle>;

    /// Replace the device copy of the shared memory arena
    fn upload_memory(&mut self, memory: &[Value]) -> Result<()>;

    /// Stage `input` and a zeroed `output` of `outputs_len` values
    fn stage_feed_arguments(&mut self, inputs: &[Value], outputs_len: usize) -> Result<()>;

    /// Stage the `rate` scalar and the `target` array
    fn stage_train_arguments(&mut self, rate: Value, targets: &[Value]) -> Result<()>;

    /// Submit one kernel against the staged arguments
    fn enqueue(&mut self, kernel: KernelHandle) -> Result<()>;

    /// Block until everything enqueued so far has completed
    fn finish(&mut self) -> Result<()>;

    /// Copy the device `output` buffer into `outputs`
    fn read_outputs(&mut self, outputs: &mut [Value]) -> Result<()>;

    /// Copy the device memory arena into `memory`
    fn read_memory(&mut self, memory: &mut [Value]) -> Result<()>;
}

impl<B: ComputeBackend + ?Sized> ComputeBackend for Box<B> {
    fn backend_name(&self) -> &str {
        (**self).backend_name()
    }

    fn is_accelerated(&self) -> bool {
        (**self).is_accelerated()
    }

    fn build_program(&mut self, kernels: &[KernelSource<'_>]) -> Result<()> {
        (**self).build_program(kernels)
    }

    fn kernel_handle(&self, entry_point: &str) -> Result<KernelHandle> {
        (**self).kernel_handle(entry_point)
    }

    fn upload_memory(&mut self, memory: &[Value]) -> Result<()> {
        (**self).upload_memory(memory)
    }

    fn stage_feed_arguments(&mut self, inputs: &[Value], outputs_len: usize) -> Result<()> {
        (**self).stage_feed_arguments(inputs, outputs_len)
    }

    fn stage_train_arguments(&mut self, rate: Value, targets: &[Value]) -> Result<()> {
        (**self).stage_train_arguments(rate, targets)
    }

    fn enqueue(&mut self, kernel: KernelHandle) -> Result<()> {
        (**self).enqueue(kernel)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }

    fn read_outputs(&mut self, outputs: &mut [Value]) -> Result<()> {
        (**self).read_outputs(outputs)
    }

    fn read_memory(&mut self, memory: &mut [Value]) -> Result<()> {
        (**self).read_memory(memory)
    }
}

/// Backend type enum for construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendType {
    /// Source emission only; feed/train are no-ops
    Portable,

    /// GPU via WGPU (Metal/Vulkan/DirectX - cross-platform)
    #[cfg(feature = "gpu")]
    Wgpu,

    /// WGPU when compiled in and an adapter is present, otherwise Portable
    #[default]
    Auto,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Portable => write!(f, "Portable"),
            #[cfg(feature = "gpu")]
            BackendType::Wgpu => write!(f, "WGPU"),
            BackendType::Auto => write!(f, "Auto"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "portable" | "cpu" => Ok(BackendType::Portable),
            #[cfg(feature = "gpu")]
            "wgpu" | "gpu" => Ok(BackendType::Wgpu),
            "auto" => Ok(BackendType::Auto),
            _ => Err(Error::InvalidBackend(s.to_string())),
        }
    }
}

/// Configuration for backend auto-selection
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    /// Force the portable backend even if a GPU is present
    pub force_portable: bool,

    /// Request WGPU explicitly; falls back to portable if no adapter exists
    pub force_gpu: bool,
}

/// Backend selection decision with rationale
#[derive(Debug, Clone)]
pub struct BackendDecision {
    pub backend_type: BackendType,
    pub reason: String,
}

/// Resolve the backend to construct
///
/// Selection priority:
/// 1. Honor force flags (force_portable, then force_gpu)
/// 2. Explicit `requested` type
/// 3. Auto: WGPU when an adapter is present, otherwise portable
pub fn select_backend(requested: BackendType, config: &BackendConfig) -> BackendDecision {
    if config.force_portable {
        return BackendDecision {
            backend_type: BackendType::Portable,
            reason: "Forced portable backend via configuration".to_string(),
        };
    }

    if requested == BackendType::Portable && !config.force_gpu {
        return BackendDecision {
            backend_type: BackendType::Portable,
            reason: "Portable backend requested".to_string(),
        };
    }

    #[cfg(feature = "gpu")]
    {
        if is_gpu_available() {
            let reason = if config.force_gpu {
                "Forced WGPU via configuration"
            } else if requested == BackendType::Wgpu {
                "WGPU backend requested"
            } else {
                "WGPU selected: adapter available"
            };
            return BackendDecision {
                backend_type: BackendType::Wgpu,
                reason: reason.to_string(),
            };
        }
        warn!("No WGPU adapter available, kernels will not be executable");
        BackendDecision {
            backend_type: BackendType::Portable,
            reason: "No WGPU adapter available, falling back to portable".to_string(),
        }
    }

    #[cfg(not(feature = "gpu"))]
    {
        if config.force_gpu {
            warn!("GPU requested but 'gpu' feature not enabled at compile time, falling back to portable");
        }
        BackendDecision {
            backend_type: BackendType::Portable,
            reason: "Built without the 'gpu' feature".to_string(),
        }
    }
}

/// Construct the backend chosen by [`select_backend`]
///
/// Missing hardware never fails here; it degrades to the portable backend.
/// Only device initialization errors on an adapter that was found propagate.
pub fn create_backend(
    requested: BackendType,
    config: &BackendConfig,
) -> Result<Box<dyn ComputeBackend>> {
    let decision = select_backend(requested, config);
    info!(
        backend = %decision.backend_type,
        reason = %decision.reason,
        "Backend selected"
    );

    match decision.backend_type {
        #[cfg(feature = "gpu")]
        BackendType::Wgpu => Ok(Box::new(WgpuBackend::new()?)),
        BackendType::Portable | BackendType::Auto => Ok(Box::new(PortableBackend::new())),
    }
}

/// Check if a WGPU adapter is available
#[cfg(feature = "gpu")]
pub fn is_gpu_available() -> bool {
    use wgpu::Backends;

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: Backends::all(),
        ..Default::default()
    });

    pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .is_some()
}

/// Check if a WGPU adapter is available
#[cfg(not(feature = "gpu"))]
pub fn is_gpu_available() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_parsing() {
        assert_eq!("portable".parse::<BackendType>().unwrap(), BackendType::Portable);
        assert_eq!("CPU".parse::<BackendType>().unwrap(), BackendType::Portable);
        assert_eq!("Auto".parse::<BackendType>().unwrap(), BackendType::Auto);
        assert!(matches!(
            "opencl-fpga".parse::<BackendType>(),
            Err(Error::InvalidBackend(_))
        ));
        assert_eq!(BackendType::default(), BackendType::Auto);
        assert_eq!(BackendType::Portable.to_string(), "Portable");
    }

    #[test]
    fn test_force_portable_wins() {
        let config = BackendConfig {
            force_portable: true,
            force_gpu: true,
        };
        let decision = select_backend(BackendType::Auto, &config);
        assert_eq!(decision.backend_type, BackendType::Portable);
    }

    #[test]
    fn test_create_portable_backend() {
        let backend = create_backend(BackendType::Portable, &BackendConfig::default()).unwrap();
        assert!(!backend.is_accelerated());
    }

    #[cfg(not(feature = "gpu"))]
    #[test]
    fn test_auto_without_gpu_feature_is_portable() {
        let decision = select_backend(BackendType::Auto, &BackendConfig::default());
        assert_eq!(decision.backend_type, BackendType::Portable);
        assert!(!is_gpu_available());
    }
}
