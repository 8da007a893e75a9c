// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # kernelnet
//!
//! Compiles a layered graph of neuron fragments into size-bounded compute
//! kernels, runs them against one shared memory arena, and exports the
//! network as standalone C.
//!
//! ## Feature Flags
//! - **`gpu`**: WGPU execution backend (f32 kernels)
//! - **`single-precision`**: f32 kernels without the GPU backend
//! - **`file-logging`**: rotated log files for the tools
//!
//! ## Architecture
//!
//! ```text
//! kernelnet-config         kernelnet.toml + env + CLI overrides
//! kernelnet-observability  tracing subscriber setup, debug flags
//!            ↓
//! kernelnet-neural         fragments, neuron graph, memory arena
//!            ↓
//! kernelnet-kernel-engine  assembler, dialects, backends, network, export
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use kernelnet::prelude::*;
//!
//! let neuron = NeuronFragments::new(
//!     ["x[1] = x[0] * 2.0"].into_iter().collect(),
//!     Default::default(),
//!     Default::default(),
//! );
//! let graph = NeuronGraph::new(vec![vec![neuron]]);
//! let mut context = TrainingContext::new();
//! context.allocate(0.0);
//! context.allocate(0.0);
//!
//! let config = KernelNetConfig::default();
//! let network = kernelnet::compiler_from_config(context, &graph, &config).unwrap();
//! assert_eq!(network.feed_kernels().len(), 1);
//! ```

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

pub use kernelnet_config as config;
pub use kernelnet_kernel_engine as engine;
pub use kernelnet_neural as neural;
pub use kernelnet_observability as observability;

use kernelnet_config::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config, ConfigError,
    ConfigResult, KernelNetConfig, LoggingConfig, StandaloneConfig, CONFIG_PATH_ENV,
};
use kernelnet_kernel_engine::{
    create_backend, BackendConfig, BackendType, ComputeBackend, NetworkCompiler, Result,
};
use kernelnet_neural::{MemoryContext, NeuronGraph, NeuronUnit};
use kernelnet_observability::LoggingOptions;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use kernelnet_config::{load_config, validate_config, KernelNetConfig};
    pub use kernelnet_kernel_engine::{
        BackendType, ComputeBackend, EngineError, KernelPass, KernelUnit, NetworkCompiler,
        NetworkRecord,
    };
    pub use kernelnet_neural::{
        Fragment, MemoryContext, NeuronFragments, NeuronGraph, NeuronUnit, TrainingContext, Value,
    };
}

/// Configuration for a tool run
///
/// An explicit `path`, or one named by `KERNELNET_CONFIG_PATH`, must exist.
/// Without either, a discovered `kernelnet.toml` is used if present and the
/// defaults otherwise; environment and `overrides` apply in both cases.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: &HashMap<String, String>,
) -> ConfigResult<KernelNetConfig> {
    if path.is_some() {
        return load_config(path, Some(overrides));
    }
    match find_config_file() {
        Ok(found) => load_config(Some(&found), Some(overrides)),
        Err(ConfigError::FileNotFound(_)) if env::var_os(CONFIG_PATH_ENV).is_none() => {
            let mut config = KernelNetConfig::default();
            apply_environment_overrides(&mut config);
            apply_cli_overrides(&mut config, overrides)?;
            Ok(config)
        }
        Err(e) => Err(e),
    }
}

/// Backend named by the `[backend]` section
///
/// # Errors
///
/// `EngineError::InvalidBackend` for an unknown backend name.
pub fn backend_from_config(config: &KernelNetConfig) -> Result<Box<dyn ComputeBackend>> {
    let requested: BackendType = config.backend.backend_type.parse()?;
    let backend_config = BackendConfig {
        force_portable: config.backend.force_portable,
        force_gpu: config.backend.force_gpu,
    };
    create_backend(requested, &backend_config)
}

/// Assemble `graph` with the configured budget and attach the configured backend
///
/// The network is not compiled; call [`NetworkCompiler::compile`] to build it.
pub fn compiler_from_config<N, C>(
    context: C,
    graph: &NeuronGraph<N>,
    config: &KernelNetConfig,
) -> Result<NetworkCompiler<C>>
where
    N: NeuronUnit,
    C: MemoryContext,
{
    let backend = backend_from_config(config)?;
    Ok(
        NetworkCompiler::with_graph(context, graph, config.compiler.max_expressions_per_kernel)
            .with_backend(backend),
    )
}

/// Write the standalone pair of `network` into `standalone.output_dir`
///
/// Returns the written paths, in name order. An empty network writes nothing.
pub fn write_standalone<C: MemoryContext>(
    network: &NetworkCompiler<C>,
    standalone: &StandaloneConfig,
) -> Result<Vec<PathBuf>> {
    let sources = network.as_standalone(&standalone.name, standalone.const_only);
    if sources.is_empty() {
        info!(name = %standalone.name, "Network has no kernels, nothing to export");
        return Ok(Vec::new());
    }

    fs::create_dir_all(&standalone.output_dir)?;
    let mut written = Vec::with_capacity(sources.len());
    for (file_name, text) in sources {
        let path = standalone.output_dir.join(&file_name);
        fs::write(&path, text)?;
        info!(path = %path.display(), "Wrote standalone source");
        written.push(path);
    }
    Ok(written)
}

/// Logging options for the `[logging]` section
pub fn logging_options(logging: &LoggingConfig) -> LoggingOptions {
    LoggingOptions {
        level: logging.level.clone(),
        log_dir: logging.file_logging.then(|| logging.log_dir.clone()),
        ..LoggingOptions::default()
    }
}
