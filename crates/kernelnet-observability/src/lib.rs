// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # kernelnet-observability
//!
//! Logging initialization shared by the kernelnet tools, with per-crate
//! debug flag support.
//!
//! ## Features
//! - `file-logging`: timestamped run folders with daily rotated log files

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known kernelnet crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "kernelnet",
    "kernelnet-neural",
    "kernelnet-kernel-engine",
    "kernelnet-config",
    "kernelnet-observability",
];
