// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for kernel assembly and execution
//!
//! Every failure is local to the call that raised it; nothing in this crate
//! retries automatically.

/// Kernel engine errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No compatible platform/device, or the backend is source-emission only
    #[error("Acceleration unavailable: {0}")]
    AccelerationUnavailable(String),

    /// The backend rejected the generated sources
    #[error("Kernel build failed: {diagnostics}")]
    BuildFailure { diagnostics: String },

    /// Dispatch requested before a successful build
    #[error("Kernels are not built")]
    NotBuilt,

    /// A persisted network record is missing expected fields
    #[error("Malformed network record: {0}")]
    MalformedRecord(String),

    #[error("Unknown kernel entry point: {0}")]
    UnknownKernel(String),

    /// Device-side failure while enqueueing, waiting or reading back
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Invalid backend: {0}")]
    InvalidBackend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, EngineError>;
pub type Error = EngineError;
