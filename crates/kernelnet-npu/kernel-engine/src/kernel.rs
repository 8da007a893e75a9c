// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Kernel units
//!
//! A kernel unit is one compiled-or-compilable program: its entry point name,
//! its full source (finalized when assembly closes it), the number of neuron
//! expressions it carries, and the backend handle bound by a successful build.

use crate::record::KernelRecord;
use std::fmt;

/// Which network pass a kernel belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelPass {
    /// Forward pass: feed + trace fragments, writes outputs
    Feed,
    /// Backward pass: train fragments, memory side effects only
    Train,
}

impl KernelPass {
    /// Entry point prefix (`feed` / `train`)
    pub fn prefix(self) -> &'static str {
        match self {
            KernelPass::Feed => "feed",
            KernelPass::Train => "train",
        }
    }

    /// Positional entry point name of the `index`-th kernel of this pass
    pub fn entry_point(self, index: usize) -> String {
        format!("{}_{}", self.prefix(), index)
    }
}

impl fmt::Display for KernelPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Backend-issued reference to a callable kernel inside a built program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelHandle(usize);

impl KernelHandle {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Borrowed view of a kernel handed to a backend for building
#[derive(Debug, Clone, Copy)]
pub struct KernelSource<'a> {
    pub pass: KernelPass,
    pub entry_point: &'a str,
    pub source: &'a str,
}

/// One kernel program of a network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelUnit {
    pass: KernelPass,
    entry_point: String,
    full_source: String,
    num_expressions: usize,
    handle: Option<KernelHandle>,
}

impl KernelUnit {
    pub fn new(
        pass: KernelPass,
        entry_point: impl Into<String>,
        full_source: impl Into<String>,
        num_expressions: usize,
    ) -> Self {
        Self {
            pass,
            entry_point: entry_point.into(),
            full_source: full_source.into(),
            num_expressions,
            handle: None,
        }
    }

    pub fn pass(&self) -> KernelPass {
        self.pass
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn full_source(&self) -> &str {
        &self.full_source
    }

    pub fn num_expressions(&self) -> usize {
        self.num_expressions
    }

    /// True only after a successful backend build bound a handle
    pub fn is_built(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<KernelHandle> {
        self.handle
    }

    pub fn as_source(&self) -> KernelSource<'_> {
        KernelSource {
            pass: self.pass,
            entry_point: &self.entry_point,
            source: &self.full_source,
        }
    }

    pub(crate) fn bind(&mut self, handle: KernelHandle) {
        self.handle = Some(handle);
    }

    pub(crate) fn unbind(&mut self) {
        self.handle = None;
    }

    /// Persisted form; the handle is never part of it
    pub fn to_record(&self) -> KernelRecord {
        KernelRecord {
            num_expressions: self.num_expressions as u64,
            entry_point: self.entry_point.clone(),
            full_source: self.full_source.clone(),
        }
    }

    /// Rebuild an unbuilt kernel of `pass` from its persisted form
    pub fn from_record(pass: KernelPass, record: KernelRecord) -> Self {
        Self::new(
            pass,
            record.entry_point,
            record.full_source,
            record.num_expressions as usize,
        )
    }
}
