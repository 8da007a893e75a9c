// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Neuron units
//!
//! Every node of the neuron graph exposes three pre-generated fragments:
//! - **feed**: the forward activation update
//! - **trace**: eligibility-trace updates needed later by training; always
//!   emitted right after the feed fragment of the same neuron
//! - **train**: the weight/bias update for the backward pass

use crate::fragment::Fragment;
use std::sync::Arc;

/// A graph node that contributes generated code to both kernel passes
pub trait NeuronUnit {
    fn feed_fragment(&self) -> &Fragment;
    fn trace_fragment(&self) -> &Fragment;
    fn train_fragment(&self) -> &Fragment;

    /// Expression count of the forward pass contribution (feed + trace)
    fn feed_size(&self) -> usize {
        self.feed_fragment().size() + self.trace_fragment().size()
    }

    /// Expression count of the backward pass contribution
    fn train_size(&self) -> usize {
        self.train_fragment().size()
    }
}

impl<N: NeuronUnit + ?Sized> NeuronUnit for Arc<N> {
    fn feed_fragment(&self) -> &Fragment {
        (**self).feed_fragment()
    }

    fn trace_fragment(&self) -> &Fragment {
        (**self).trace_fragment()
    }

    fn train_fragment(&self) -> &Fragment {
        (**self).train_fragment()
    }
}

impl<N: NeuronUnit + ?Sized> NeuronUnit for Box<N> {
    fn feed_fragment(&self) -> &Fragment {
        (**self).feed_fragment()
    }

    fn trace_fragment(&self) -> &Fragment {
        (**self).trace_fragment()
    }

    fn train_fragment(&self) -> &Fragment {
        (**self).train_fragment()
    }
}

/// Plain holder of the three fragments of one neuron
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeuronFragments {
    pub feed: Fragment,
    pub trace: Fragment,
    pub train: Fragment,
}

impl NeuronFragments {
    pub fn new(feed: Fragment, trace: Fragment, train: Fragment) -> Self {
        Self { feed, trace, train }
    }
}

impl NeuronUnit for NeuronFragments {
    fn feed_fragment(&self) -> &Fragment {
        &self.feed
    }

    fn trace_fragment(&self) -> &Fragment {
        &self.trace
    }

    fn train_fragment(&self) -> &Fragment {
        &self.train
    }
}
