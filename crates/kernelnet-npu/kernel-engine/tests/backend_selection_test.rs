// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Backend Selection Tests
//!
//! Validates that selection honors force flags and explicit requests, and
//! degrades to the portable backend when no device can be used.

use kernelnet_kernel_engine::*;

#[test]
fn test_force_portable_overrides_everything() {
    let config = BackendConfig {
        force_portable: true,
        force_gpu: true,
    };

    let decision = select_backend(BackendType::Auto, &config);

    assert_eq!(decision.backend_type, BackendType::Portable);
    assert!(decision.reason.contains("Forced portable"));
}

#[test]
fn test_explicit_portable_request() {
    let decision = select_backend(BackendType::Portable, &BackendConfig::default());
    assert_eq!(decision.backend_type, BackendType::Portable);
}

#[test]
fn test_auto_selection_follows_hardware() {
    let decision = select_backend(BackendType::Auto, &BackendConfig::default());

    #[cfg(feature = "gpu")]
    {
        if is_gpu_available() {
            assert_eq!(decision.backend_type, BackendType::Wgpu);
        } else {
            assert_eq!(decision.backend_type, BackendType::Portable);
        }
    }

    #[cfg(not(feature = "gpu"))]
    {
        assert_eq!(decision.backend_type, BackendType::Portable);
    }
}

#[test]
fn test_create_backend_never_fails_without_hardware() {
    let backend = create_backend(BackendType::Auto, &BackendConfig::default());

    match backend {
        Ok(backend) => {
            assert!(!backend.backend_name().is_empty());
            if !is_gpu_available() {
                assert!(!backend.is_accelerated());
            }
        }
        // an adapter was found but the device could not be opened
        Err(e) => assert!(matches!(e, EngineError::AccelerationUnavailable(_))),
    }
}

#[test]
fn test_backend_type_round_trips_through_display() {
    for backend_type in [BackendType::Portable, BackendType::Auto] {
        let parsed: BackendType = backend_type.to_string().parse().unwrap();
        assert_eq!(parsed, backend_type);
    }

    #[cfg(feature = "gpu")]
    {
        assert_eq!("gpu".parse::<BackendType>().unwrap(), BackendType::Wgpu);
        assert_eq!(BackendType::Wgpu.to_string().parse::<BackendType>().unwrap(), BackendType::Wgpu);
    }

    #[cfg(not(feature = "gpu"))]
    {
        assert!(matches!(
            "wgpu".parse::<BackendType>(),
            Err(EngineError::InvalidBackend(_))
        ));
    }
}
