// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Layered neuron graph
//!
//! Read-only input to kernel assembly. Forward order is layer 0..n, neuron
//! 0..m within each layer; reverse order is the exact mirror (last layer
//! first, last neuron first within a layer), which is the direction gradients
//! propagate in.

use crate::neuron::NeuronUnit;

/// Ordered layers of ordered neuron units
#[derive(Debug, Clone)]
pub struct NeuronGraph<N> {
    layers: Vec<Vec<N>>,
}

impl<N> Default for NeuronGraph<N> {
    fn default() -> Self {
        Self { layers: Vec::new() }
    }
}

impl<N: NeuronUnit> NeuronGraph<N> {
    pub fn new(layers: Vec<Vec<N>>) -> Self {
        Self { layers }
    }

    /// Append a layer after the current last one
    pub fn push_layer(&mut self, layer: Vec<N>) {
        self.layers.push(layer);
    }

    pub fn layers(&self) -> &[Vec<N>] {
        &self.layers
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Total neurons across all layers
    pub fn num_neurons(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.num_neurons() == 0
    }

    /// Neurons in forward (inference) order
    pub fn forward(&self) -> impl Iterator<Item = &N> + '_ {
        self.layers.iter().flat_map(|layer| layer.iter())
    }

    /// Neurons in reverse (training) order
    pub fn reverse(&self) -> impl Iterator<Item = &N> + '_ {
        self.layers.iter().rev().flat_map(|layer| layer.iter().rev())
    }
}

impl<N: NeuronUnit> FromIterator<Vec<N>> for NeuronGraph<N> {
    fn from_iter<I: IntoIterator<Item = Vec<N>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
