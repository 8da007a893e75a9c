// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, KernelNetConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "kernelnet.toml";

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "KERNELNET_CONFIG_PATH";

/// Find the kernelnet configuration file
///
/// Search order:
/// 1. `KERNELNET_CONFIG_PATH` environment variable
/// 2. Current working directory: `./kernelnet.toml`
/// 3. Parent directories (up to 5 levels)
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by KERNELNET_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(path) = search_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet KERNELNET_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides (dotted keys, see [`apply_cli_overrides`])
///
/// # Errors
///
/// Returns error if config file is not found, contains invalid TOML, or a
/// CLI override is unknown or unparsable. Validation is a separate step.
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<KernelNetConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: KernelNetConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    Ok(config)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `KERNELNET_MAX_EXPRESSIONS` -> `compiler.max_expressions_per_kernel`
/// - `KERNELNET_BACKEND` -> `backend.backend_type`
/// - `KERNELNET_FORCE_PORTABLE` -> `backend.force_portable`
/// - `KERNELNET_LOG_LEVEL` -> `logging.level`
/// - `KERNELNET_STANDALONE_DIR` -> `standalone.output_dir`
///
/// Unparsable values are ignored.
pub fn apply_environment_overrides(config: &mut KernelNetConfig) {
    if let Ok(value) = env::var("KERNELNET_MAX_EXPRESSIONS") {
        if let Ok(budget) = value.parse::<usize>() {
            config.compiler.max_expressions_per_kernel = budget;
        }
    }
    if let Ok(value) = env::var("KERNELNET_BACKEND") {
        config.backend.backend_type = value;
    }
    if let Ok(value) = env::var("KERNELNET_FORCE_PORTABLE") {
        if let Some(flag) = parse_bool(&value) {
            config.backend.force_portable = flag;
        }
    }
    if let Ok(value) = env::var("KERNELNET_LOG_LEVEL") {
        config.logging.level = value;
    }
    if let Ok(value) = env::var("KERNELNET_STANDALONE_DIR") {
        config.standalone.output_dir = PathBuf::from(value);
    }
}

/// Apply CLI argument overrides to configuration
///
/// Keys are dotted `section.field` paths, e.g.
/// `{"compiler.max_expressions_per_kernel": "250", "backend.backend_type": "portable"}`.
///
/// # Errors
///
/// `UnknownKey` for a key that names no field, `InvalidValue` for a value
/// that does not parse as the field's type.
pub fn apply_cli_overrides(
    config: &mut KernelNetConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    for (key, value) in cli_args {
        let invalid = || ConfigError::InvalidValue(format!("{} = {:?}", key, value));
        let flag = || parse_bool(value).ok_or_else(invalid);

        match key.as_str() {
            "compiler.max_expressions_per_kernel" => {
                config.compiler.max_expressions_per_kernel =
                    value.parse().map_err(|_| invalid())?;
            }
            "backend.backend_type" => config.backend.backend_type = value.clone(),
            "backend.force_portable" => config.backend.force_portable = flag()?,
            "backend.force_gpu" => config.backend.force_gpu = flag()?,
            "standalone.name" => config.standalone.name = value.clone(),
            "standalone.const_only" => config.standalone.const_only = flag()?,
            "standalone.output_dir" => config.standalone.output_dir = PathBuf::from(value),
            "logging.level" => config.logging.level = value.clone(),
            "logging.file_logging" => config.logging.file_logging = flag()?,
            "logging.log_dir" => config.logging.log_dir = PathBuf::from(value),
            _ => return Err(ConfigError::UnknownKey(key.clone())),
        }
    }
    Ok(())
}
