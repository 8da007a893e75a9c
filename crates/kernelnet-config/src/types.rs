// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Every struct maps to one section of `kernelnet.toml`. All fields have
//! defaults, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct KernelNetConfig {
    pub compiler: CompilerConfig,
    pub backend: BackendSettings,
    pub standalone: StandaloneConfig,
    pub logging: LoggingConfig,
}

/// Kernel assembly settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Per-kernel expression budget; values below 100 are raised to 100
    pub max_expressions_per_kernel: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_expressions_per_kernel: 100,
        }
    }
}

/// Compute backend selection
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendSettings {
    /// "auto", "portable" (alias "cpu") or "wgpu" (alias "gpu")
    pub backend_type: String,
    pub force_portable: bool,
    pub force_gpu: bool,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            backend_type: "auto".to_string(),
            force_portable: false,
            force_gpu: false,
        }
    }
}

/// Standalone C export
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StandaloneConfig {
    /// Artifact base name; also prefixes the exported C entry points
    pub name: String,
    /// Export inference only (no train entry)
    pub const_only: bool,
    pub output_dir: PathBuf,
}

impl Default for StandaloneConfig {
    fn default() -> Self {
        Self {
            name: "network".to_string(),
            const_only: false,
            output_dir: PathBuf::from("."),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file_logging: bool,
    pub log_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
            log_dir: PathBuf::from("logs"),
        }
    }
}
