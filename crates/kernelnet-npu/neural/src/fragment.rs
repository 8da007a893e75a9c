// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Generated source fragments
//!
//! A fragment is one neuron's (or one binding's) contribution to a kernel: an
//! ordered list of expressions produced by the expression builders. The
//! assembler only needs two things from it: how many expressions it holds, and
//! its rendered statement text.

/// Ordered, immutable sequence of generated expressions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    expressions: Vec<String>,
}

impl Fragment {
    /// Empty fragment (size 0, renders to nothing)
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of expressions in this fragment
    pub fn size(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    pub fn expressions(&self) -> &[String] {
        &self.expressions
    }

    /// Render as a statement sequence, one `expr;` per line
    pub fn build(&self) -> String {
        let mut out = String::with_capacity(self.expressions.iter().map(|e| e.len() + 2).sum());
        for expression in &self.expressions {
            out.push_str(expression);
            out.push_str(";\n");
        }
        out
    }
}

impl<S: Into<String>> FromIterator<S> for Fragment {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            expressions: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Vec<String>> for Fragment {
    fn from(expressions: Vec<String>) -> Self {
        Self { expressions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_terminates_every_expression() {
        let fragment: Fragment = ["x[1] = x[0] * 0.5", "x[2] = x[1]"].into_iter().collect();
        assert_eq!(fragment.size(), 2);
        assert_eq!(fragment.build(), "x[1] = x[0] * 0.5;\nx[2] = x[1];\n");
    }

    #[test]
    fn test_empty_fragment() {
        let fragment = Fragment::new();
        assert!(fragment.is_empty());
        assert_eq!(fragment.size(), 0);
        assert_eq!(fragment.build(), "");
    }
}
