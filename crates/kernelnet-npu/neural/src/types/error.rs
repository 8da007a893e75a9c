// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for neural building blocks

/// Errors raised by the memory arena and its snapshots
#[derive(Debug, thiserror::Error)]
pub enum NeuralError {
    #[error("Memory index {index} out of bounds (arena size {size})")]
    IndexOutOfBounds { index: usize, size: usize },

    #[error("Output slot {index} out of bounds (outputs size {size})")]
    OutputOutOfBounds { index: usize, size: usize },

    #[error("Invalid context snapshot: {0}")]
    InvalidSnapshot(String),
}

impl From<serde_json::Error> for NeuralError {
    fn from(err: serde_json::Error) -> Self {
        NeuralError::InvalidSnapshot(err.to_string())
    }
}

pub type Result<T> = core::result::Result<T, NeuralError>;
