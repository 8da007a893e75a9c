// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Persisted network form
//!
//! Field names are part of the on-disk format and must not change:
//!
//! ```json
//! {
//!   "FeedKernels": [{ "NumExpressions": 3, "EntryPoint": "feed_0", "FullSource": "..." }],
//!   "TrainKernels": [{ "NumExpressions": 2, "EntryPoint": "train_0", "FullSource": "..." }]
//! }
//! ```
//!
//! Compiled handles are never persisted; a loaded network is always unbuilt.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// One kernel unit as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelRecord {
    #[serde(rename = "NumExpressions")]
    pub num_expressions: u64,
    #[serde(rename = "EntryPoint")]
    pub entry_point: String,
    #[serde(rename = "FullSource")]
    pub full_source: String,
}

/// Both kernel collections of a network, in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRecord {
    #[serde(rename = "FeedKernels")]
    pub feed_kernels: Vec<KernelRecord>,
    #[serde(rename = "TrainKernels")]
    pub train_kernels: Vec<KernelRecord>,
}

impl NetworkRecord {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::MalformedRecord(format!("Failed to encode record: {}", e)))
    }

    /// Decode a record; missing fields or invalid JSON are `MalformedRecord`
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::MalformedRecord(e.to_string()))
    }
}
