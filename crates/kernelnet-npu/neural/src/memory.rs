// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shared memory arena
//!
//! All learnable and state values of a network live in one flat array (`x` in
//! generated code). Offsets are assigned once, while the neuron fragments are
//! generated; afterwards every kernel reads and writes the arena by index.
//! There is no locking: exactly one kernel runs at a time, so the call order
//! of the caller is the only ordering mechanism.
//!
//! The context also owns the outputs array and knows which arena slots are
//! bound to kernel arguments, which is what the four bind fragments encode.

use crate::fragment::Fragment;
use crate::types::{NeuralError, Result, Value};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// What the kernel assembler and the network compiler need from a memory owner
pub trait MemoryContext {
    /// The shared arena (`x` in generated code)
    fn memory(&self) -> &[Value];
    fn memory_mut(&mut self) -> &mut [Value];

    /// The outputs array (`output` in generated feed kernels)
    fn outputs(&self) -> &[Value];
    fn outputs_mut(&mut self) -> &mut [Value];

    /// Copies kernel `input` arguments into their arena slots
    fn inputs_fragment(&self) -> Fragment;

    /// Copies arena slots into the kernel `output` argument
    fn outputs_fragment(&self) -> Fragment;

    /// Copies the kernel `rate` scalar into its arena slot
    fn rate_fragment(&self) -> Fragment;

    /// Copies kernel `target` arguments into their arena slots
    fn targets_fragment(&self) -> Fragment;
}

/// Reference arena: a flat value vector plus argument bindings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingContext {
    memory: Vec<Value>,
    outputs: Vec<Value>,
    variables: AHashMap<String, usize>,
    input_mapping: Vec<usize>,
    output_mapping: Vec<usize>,
    target_mapping: Vec<usize>,
    rate_variable: Option<usize>,
}

impl TrainingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fresh slot initialized to `value` and return its index
    pub fn allocate(&mut self, value: Value) -> usize {
        self.memory.push(value);
        self.memory.len() - 1
    }

    /// Slot for `key`, allocating it with `value` on first use
    ///
    /// Fragment builders use this so that the same logical variable (for
    /// example a weight shared by two fragments) maps to a single offset.
    pub fn allocate_or_reuse(&mut self, key: &str, value: Value) -> usize {
        if let Some(&index) = self.variables.get(key) {
            return index;
        }
        let index = self.allocate(value);
        self.variables.insert(key.to_string(), index);
        index
    }

    pub fn variable_index(&self, key: &str) -> Option<usize> {
        self.variables.get(key).copied()
    }

    pub fn value(&self, index: usize) -> Result<Value> {
        self.memory
            .get(index)
            .copied()
            .ok_or(NeuralError::IndexOutOfBounds {
                index,
                size: self.memory.len(),
            })
    }

    pub fn set_value(&mut self, index: usize, value: Value) -> Result<()> {
        let size = self.memory.len();
        let slot = self
            .memory
            .get_mut(index)
            .ok_or(NeuralError::IndexOutOfBounds { index, size })?;
        *slot = value;
        Ok(())
    }

    /// Bind the next kernel input (`input[k]`) to arena slot `index`
    pub fn register_input(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.input_mapping.push(index);
        Ok(())
    }

    /// Bind the next kernel output (`output[k]`) to arena slot `index`
    pub fn register_output(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.output_mapping.push(index);
        self.outputs.push(0.0);
        Ok(())
    }

    /// Bind the next training target (`target[k]`) to arena slot `index`
    pub fn register_target(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.target_mapping.push(index);
        Ok(())
    }

    /// Bind the learning-rate scalar (`rate[0]`) to arena slot `index`
    pub fn set_rate_variable(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.rate_variable = Some(index);
        Ok(())
    }

    pub fn num_inputs(&self) -> usize {
        self.input_mapping.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.output_mapping.len()
    }

    pub fn num_targets(&self) -> usize {
        self.target_mapping.len()
    }

    pub fn output(&self, index: usize) -> Result<Value> {
        self.outputs
            .get(index)
            .copied()
            .ok_or(NeuralError::OutputOutOfBounds {
                index,
                size: self.outputs.len(),
            })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let context: Self = serde_json::from_str(json)?;
        context.validate()?;
        Ok(context)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            NeuralError::InvalidSnapshot(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let context = Self::from_json(&json)?;
        debug!(
            path = %path.display(),
            memory = context.memory.len(),
            outputs = context.outputs.len(),
            "Loaded training context snapshot"
        );
        Ok(context)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.memory.len() {
            Ok(())
        } else {
            Err(NeuralError::IndexOutOfBounds {
                index,
                size: self.memory.len(),
            })
        }
    }

    fn validate(&self) -> Result<()> {
        let bound = self
            .input_mapping
            .iter()
            .chain(&self.output_mapping)
            .chain(&self.target_mapping)
            .chain(self.rate_variable.iter())
            .chain(self.variables.values());
        for &index in bound {
            self.check_index(index)?;
        }
        if self.outputs.len() != self.output_mapping.len() {
            return Err(NeuralError::InvalidSnapshot(format!(
                "{} outputs but {} output bindings",
                self.outputs.len(),
                self.output_mapping.len()
            )));
        }
        Ok(())
    }
}

impl MemoryContext for TrainingContext {
    fn memory(&self) -> &[Value] {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut [Value] {
        &mut self.memory
    }

    fn outputs(&self) -> &[Value] {
        &self.outputs
    }

    fn outputs_mut(&mut self) -> &mut [Value] {
        &mut self.outputs
    }

    fn inputs_fragment(&self) -> Fragment {
        self.input_mapping
            .iter()
            .enumerate()
            .map(|(k, index)| format!("x[{}] = input[{}]", index, k))
            .collect()
    }

    fn outputs_fragment(&self) -> Fragment {
        self.output_mapping
            .iter()
            .enumerate()
            .map(|(k, index)| format!("output[{}] = x[{}]", k, index))
            .collect()
    }

    fn rate_fragment(&self) -> Fragment {
        self.rate_variable
            .iter()
            .map(|index| format!("x[{}] = rate[0]", index))
            .collect()
    }

    fn targets_fragment(&self) -> Fragment {
        self.target_mapping
            .iter()
            .enumerate()
            .map(|(k, index)| format!("x[{}] = target[{}]", index, k))
            .collect()
    }
}
