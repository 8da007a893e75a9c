// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Kernel Assembler
//!
//! Pure partitioning of a neuron graph into ordered kernel lists. No backend,
//! no I/O: the same graph, context and budget always yield the same kernels.
//!
//! ## Packing rules
//!
//! A neuron is never split across kernels. Kernels are filled greedily and a
//! new one is opened when the incoming neuron would break the limit
//! `max(budget, MIN_EXPRESSIONS_PER_KERNEL)`:
//!
//! | pass  | order   | neuron size     | opens a new kernel when    |
//! |-------|---------|-----------------|----------------------------|
//! | feed  | forward | feed + trace    | `acc + incoming >= limit`  |
//! | train | reverse | train           | `acc + incoming > limit`   |
//!
//! Feed closes one expression early to leave room for its output epilogue;
//! train has no epilogue and fills up to the limit. A neuron larger than the
//! limit on its own still gets a private kernel.

use crate::dialect::KernelIr;
use crate::kernel::{KernelPass, KernelUnit};
use kernelnet_neural::{MemoryContext, NeuronGraph, NeuronUnit};
use tracing::{debug, trace};

/// Floor applied to any requested per-kernel budget
pub const MIN_EXPRESSIONS_PER_KERNEL: usize = 100;

/// Effective per-kernel expression limit for `budget`
pub fn expression_limit(budget: usize) -> usize {
    budget.max(MIN_EXPRESSIONS_PER_KERNEL)
}

/// Feed kernels in forward graph order
pub fn assemble_feed_kernels<N, C>(
    graph: &NeuronGraph<N>,
    context: &C,
    budget: usize,
) -> Vec<KernelUnit>
where
    N: NeuronUnit,
    C: MemoryContext + ?Sized,
{
    let limit = expression_limit(budget);
    let inputs = context.inputs_fragment();
    let outputs = context.outputs_fragment();

    let mut kernels = Vec::new();
    let mut open: Option<KernelIr> = None;

    for neuron in graph.forward() {
        let incoming = neuron.feed_size();
        let spill = open
            .as_ref()
            .map_or(true, |ir| ir.num_expressions() + incoming >= limit);

        if spill {
            if let Some(mut ir) = open.take() {
                ir.push_epilogue(&outputs);
                kernels.push(seal(ir));
            }
            let mut ir = KernelIr::new(KernelPass::Feed, KernelPass::Feed.entry_point(kernels.len()));
            ir.push_prologue(&inputs);
            open = Some(ir);
        }

        if let Some(ir) = open.as_mut() {
            let mut statements = neuron.feed_fragment().build();
            statements.push_str(&neuron.trace_fragment().build());
            ir.push_neuron(statements, incoming);
        }
    }

    if let Some(mut ir) = open {
        ir.push_epilogue(&outputs);
        kernels.push(seal(ir));
    }

    debug!(kernels = kernels.len(), limit, "Assembled feed kernels");
    kernels
}

/// Train kernels in reverse graph order
pub fn assemble_train_kernels<N, C>(
    graph: &NeuronGraph<N>,
    context: &C,
    budget: usize,
) -> Vec<KernelUnit>
where
    N: NeuronUnit,
    C: MemoryContext + ?Sized,
{
    let limit = expression_limit(budget);
    let rate = context.rate_fragment();
    let targets = context.targets_fragment();

    let mut kernels = Vec::new();
    let mut open: Option<KernelIr> = None;

    for neuron in graph.reverse() {
        let incoming = neuron.train_size();
        let spill = open
            .as_ref()
            .map_or(true, |ir| ir.num_expressions() + incoming > limit);

        if spill {
            if let Some(ir) = open.take() {
                kernels.push(seal(ir));
            }
            let mut ir =
                KernelIr::new(KernelPass::Train, KernelPass::Train.entry_point(kernels.len()));
            ir.push_prologue(&rate);
            ir.push_prologue(&targets);
            open = Some(ir);
        }

        if let Some(ir) = open.as_mut() {
            ir.push_neuron(neuron.train_fragment().build(), incoming);
        }
    }

    if let Some(ir) = open {
        kernels.push(seal(ir));
    }

    debug!(kernels = kernels.len(), limit, "Assembled train kernels");
    kernels
}

fn seal(ir: KernelIr) -> KernelUnit {
    trace!(
        entry_point = ir.entry_point(),
        expressions = ir.num_expressions(),
        neurons = ir.body().len(),
        "Closing kernel"
    );
    ir.into_kernel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernelnet_neural::{Fragment, NeuronFragments, TrainingContext};

    fn numbered(tag: &str, count: usize) -> Fragment {
        (0..count).map(|i| format!("{}_{}", tag, i)).collect()
    }

    fn neuron(tag: &str, feed: usize, trace: usize, train: usize) -> NeuronFragments {
        NeuronFragments::new(
            numbered(&format!("{}f", tag), feed),
            numbered(&format!("{}t", tag), trace),
            numbered(&format!("{}r", tag), train),
        )
    }

    fn names(kernels: &[KernelUnit]) -> Vec<&str> {
        kernels.iter().map(KernelUnit::entry_point).collect()
    }

    #[test]
    fn test_budget_is_floored() {
        assert_eq!(expression_limit(6), 100);
        assert_eq!(expression_limit(250), 250);
    }

    #[test]
    fn test_empty_graph_yields_no_kernels() {
        let graph: NeuronGraph<NeuronFragments> = NeuronGraph::new(vec![vec![], vec![]]);
        let context = TrainingContext::new();
        assert!(assemble_feed_kernels(&graph, &context, 100).is_empty());
        assert!(assemble_train_kernels(&graph, &context, 100).is_empty());
    }

    #[test]
    fn test_small_neurons_share_one_kernel_under_the_floor() {
        let graph = NeuronGraph::new(vec![vec![neuron("a", 5, 3, 7), neuron("b", 5, 3, 7)]]);
        let context = TrainingContext::new();

        let feed = assemble_feed_kernels(&graph, &context, 6);
        let train = assemble_train_kernels(&graph, &context, 6);

        assert_eq!(names(&feed), vec!["feed_0"]);
        assert_eq!(feed[0].num_expressions(), 16);
        assert_eq!(names(&train), vec!["train_0"]);
        assert_eq!(train[0].num_expressions(), 14);
    }

    #[test]
    fn test_neurons_reaching_the_limit_get_private_kernels() {
        let graph = NeuronGraph::new(vec![vec![neuron("a", 60, 40, 101), neuron("b", 60, 40, 101)]]);
        let context = TrainingContext::new();

        let feed = assemble_feed_kernels(&graph, &context, 6);
        assert_eq!(names(&feed), vec!["feed_0", "feed_1"]);
        assert!(feed[0].full_source().contains("af_0;"));
        assert!(feed[1].full_source().contains("bf_0;"));

        let train = assemble_train_kernels(&graph, &context, 6);
        assert_eq!(names(&train), vec!["train_0", "train_1"]);
        assert!(train[0].full_source().contains("br_0;"));
        assert!(train[1].full_source().contains("ar_0;"));
        assert_eq!(train[0].num_expressions(), 101);
    }

    #[test]
    fn test_feed_and_train_thresholds_differ_at_the_limit() {
        // 50 + 50 == limit: feed spills (>=), train does not (>)
        let graph = NeuronGraph::new(vec![vec![neuron("a", 50, 0, 50), neuron("b", 50, 0, 50)]]);
        let context = TrainingContext::new();

        assert_eq!(assemble_feed_kernels(&graph, &context, 100).len(), 2);
        let train = assemble_train_kernels(&graph, &context, 100);
        assert_eq!(train.len(), 1);
        assert_eq!(train[0].num_expressions(), 100);
    }

    #[test]
    fn test_trace_follows_feed_of_the_same_neuron() {
        let graph = NeuronGraph::new(vec![vec![neuron("a", 1, 1, 0)], vec![neuron("b", 1, 1, 0)]]);
        let context = TrainingContext::new();

        let feed = assemble_feed_kernels(&graph, &context, 100);
        let source = feed[0].full_source();
        let body = source.split_once('\n').unwrap().1;
        assert_eq!(body, "af_0;\nat_0;\nbf_0;\nbt_0;\n}\n");
    }

    #[test]
    fn test_bind_fragments_wrap_every_kernel() {
        let mut context = TrainingContext::new();
        let input = context.allocate(0.0);
        let output = context.allocate(0.0);
        let rate = context.allocate(0.0);
        let target = context.allocate(0.0);
        context.register_input(input).unwrap();
        context.register_output(output).unwrap();
        context.set_rate_variable(rate).unwrap();
        context.register_target(target).unwrap();

        let graph = NeuronGraph::new(vec![vec![neuron("a", 100, 0, 150), neuron("b", 1, 0, 1)]]);

        for kernel in assemble_feed_kernels(&graph, &context, 100) {
            let body = kernel.full_source().split_once('\n').unwrap().1;
            assert!(body.starts_with("x[0] = input[0];\n"));
            assert!(body.ends_with("output[0] = x[1];\n}\n"));
        }
        for kernel in assemble_train_kernels(&graph, &context, 100) {
            let body = kernel.full_source().split_once('\n').unwrap().1;
            assert!(body.starts_with("x[2] = rate[0];\nx[3] = target[0];\n"));
            assert!(!body.contains("output["));
        }
    }
}
