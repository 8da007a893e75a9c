// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Kernel value type, resolved at build time.
//!
//! Generated kernels, the memory arena and the standalone artifacts all agree on
//! one numeric type. GPU backends only support single precision, so the `gpu`
//! feature of the engine turns `single-precision` on.

/// Numeric element type of the memory arena and of every generated kernel
#[cfg(not(feature = "single-precision"))]
pub type Value = f64;

/// Numeric element type of the memory arena and of every generated kernel
#[cfg(feature = "single-precision")]
pub type Value = f32;

/// C spelling of [`Value`], used in kernel signatures and standalone artifacts
pub const fn value_type_name() -> &'static str {
    if core::mem::size_of::<Value>() == core::mem::size_of::<f64>() {
        "double"
    } else {
        "float"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_name_matches_precision() {
        #[cfg(not(feature = "single-precision"))]
        assert_eq!(value_type_name(), "double");
        #[cfg(feature = "single-precision")]
        assert_eq!(value_type_name(), "float");
    }
}
