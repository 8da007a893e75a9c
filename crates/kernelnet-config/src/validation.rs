// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Collects every problem in one pass so a bad file is fixed in one edit.

use crate::{ConfigError, ConfigResult, KernelNetConfig};

const BACKEND_NAMES: &[&str] = &["auto", "portable", "cpu", "wgpu", "gpu"];
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
    Conflict { field1: String, field2: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
            Self::Conflict { field1, field2 } => {
                write!(f, "{} and {} cannot both be enabled", field1, field2)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Known backend names and log levels
/// - Mutually exclusive backend force flags
/// - A standalone name usable as a C identifier prefix
/// - A log directory when file logging is on
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &KernelNetConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);
    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

/// Every validation problem of `config`, in section order
pub fn collect_errors(config: &KernelNetConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_backend(config, &mut errors);
    validate_standalone(config, &mut errors);
    validate_logging(config, &mut errors);
    errors
}

fn validate_backend(config: &KernelNetConfig, errors: &mut Vec<ConfigValidationError>) {
    let backend_type = config.backend.backend_type.to_lowercase();
    if !BACKEND_NAMES.contains(&backend_type.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "backend.backend_type".to_string(),
            reason: format!(
                "'{}' is not one of {}",
                config.backend.backend_type,
                BACKEND_NAMES.join(", ")
            ),
        });
    }

    if config.backend.force_portable && config.backend.force_gpu {
        errors.push(ConfigValidationError::Conflict {
            field1: "backend.force_portable".to_string(),
            field2: "backend.force_gpu".to_string(),
        });
    }
}

fn validate_standalone(config: &KernelNetConfig, errors: &mut Vec<ConfigValidationError>) {
    let name = &config.standalone.name;
    if name.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "standalone.name".to_string(),
        });
        return;
    }

    let valid_start = name.starts_with(|c: char| c == '_' || c.is_ascii_alphabetic());
    let valid_rest = name.chars().all(|c| c == '_' || c.is_ascii_alphanumeric());
    if !valid_start || !valid_rest {
        errors.push(ConfigValidationError::InvalidValue {
            field: "standalone.name".to_string(),
            reason: format!("'{}' is not a valid C identifier", name),
        });
    }
}

fn validate_logging(config: &KernelNetConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("'{}' is not one of {}", config.logging.level, LOG_LEVELS.join(", ")),
        });
    }

    if config.logging.file_logging && config.logging.log_dir.as_os_str().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "logging.log_dir".to_string(),
        });
    }
}
