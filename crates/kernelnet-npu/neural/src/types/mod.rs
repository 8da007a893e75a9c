// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neural Types Module
//!
//! Value type selection and error types shared by every kernelnet crate.

pub mod error;
pub mod value;

pub use error::{NeuralError, Result};
pub use value::{value_type_name, Value};
