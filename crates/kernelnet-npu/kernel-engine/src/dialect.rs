// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Kernel IR and Source Dialects
//!
//! The assembler never concatenates kernel text incrementally. It fills a
//! [`KernelIr`] (signature data plus an ordered list of statement chunks) and
//! renders it exactly once, when the kernel is closed.
//!
//! Two dialects exist:
//! - **OpenCL C**: the canonical form. Kernel units are always rendered,
//!   persisted and exported in this dialect; with `#define kernel` and
//!   `#define global` it is also plain C, which the standalone export relies on.
//! - **WGSL**: used by the WGPU backend, which parses units back into IR and
//!   re-renders them. Bindings are declared once per module by
//!   [`SourceDialect::module_prelude`].
//!
//! Statement chunks are shared verbatim between dialects, so fragments must
//! stay within their common subset (indexed loads/stores, arithmetic, builtin
//! calls). Identifiers reserved in WGSL are renamed during lowering.

use crate::error::{EngineError, Result};
use crate::kernel::{KernelPass, KernelSource, KernelUnit};
use kernelnet_neural::{value_type_name, Fragment};

/// Kernel argument holding the feed inputs
pub const INPUT_ARG: &str = "input";
/// Kernel argument receiving the feed outputs
pub const OUTPUT_ARG: &str = "output";
/// Kernel argument aliasing the shared memory arena
pub const MEMORY_ARG: &str = "x";
/// Kernel argument holding the learning-rate scalar
pub const RATE_ARG: &str = "rate";
/// Kernel argument holding the training targets
pub const TARGET_ARG: &str = "target";

const CLOSING: &str = "}\n";

/// WGSL reserves `target`, so the lowered module binds it under another name
const WGSL_RENAMES: &[(&str, &str)] = &[(TARGET_ARG, "target_values")];

/// Target language of a rendered kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SourceDialect {
    #[default]
    OpenCl,
    Wgsl,
}

impl SourceDialect {
    /// Opening line(s) of a kernel, including the opening brace
    pub fn signature(self, pass: KernelPass, entry_point: &str) -> String {
        match self {
            SourceDialect::OpenCl => {
                let t = value_type_name();
                let (first, second) = match pass {
                    KernelPass::Feed => (INPUT_ARG, OUTPUT_ARG),
                    KernelPass::Train => (RATE_ARG, TARGET_ARG),
                };
                let second_qualifier = match pass {
                    KernelPass::Feed => "",
                    KernelPass::Train => "const ",
                };
                format!(
                    "void kernel {entry}(global const {t} *{first}, global {q}{t} *{second}, global {t} *{mem}) {{\n",
                    entry = entry_point,
                    t = t,
                    first = first,
                    q = second_qualifier,
                    second = second,
                    mem = MEMORY_ARG,
                )
            }
            SourceDialect::Wgsl => {
                format!("@compute @workgroup_size(1)\nfn {}() {{\n", entry_point)
            }
        }
    }

    pub fn closing(self) -> &'static str {
        CLOSING
    }

    /// Module-level declarations emitted once before all kernels
    pub fn module_prelude(self) -> String {
        match self {
            SourceDialect::OpenCl => String::new(),
            SourceDialect::Wgsl => {
                let bindings = [
                    (INPUT_ARG, "read"),
                    (OUTPUT_ARG, "read_write"),
                    (MEMORY_ARG, "read_write"),
                    (RATE_ARG, "read"),
                    (TARGET_ARG, "read"),
                ];
                let mut prelude = String::new();
                for (binding, (name, access)) in bindings.iter().enumerate() {
                    prelude.push_str(&format!(
                        "@group(0) @binding({}) var<storage, {}> {}: array<f32>;\n",
                        binding,
                        access,
                        self.identifier(name)
                    ));
                }
                prelude.push('\n');
                prelude
            }
        }
    }

    /// Dialect spelling of a generated identifier
    pub fn identifier(self, name: &str) -> &str {
        match self {
            SourceDialect::OpenCl => name,
            SourceDialect::Wgsl => WGSL_RENAMES
                .iter()
                .find(|(from, _)| *from == name)
                .map(|(_, to)| *to)
                .unwrap_or(name),
        }
    }

    fn lower_statements(self, text: &str) -> String {
        match self {
            SourceDialect::OpenCl => text.to_string(),
            SourceDialect::Wgsl => rename_identifiers(text, |word| self.identifier(word)),
        }
    }
}

/// Replace whole identifier tokens of `text` through `rename`
fn rename_identifiers<'a>(text: &'a str, rename: impl Fn(&'a str) -> &'a str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut token_start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        let is_ident = c == '_' || c.is_ascii_alphanumeric();
        match (token_start, is_ident) {
            (None, true) => token_start = Some(i),
            (Some(start), false) => {
                push_token(&mut out, &text[start..i], &rename);
                out.push(c);
                token_start = None;
            }
            (None, false) => out.push(c),
            (Some(_), true) => {}
        }
    }
    if let Some(start) = token_start {
        push_token(&mut out, &text[start..], &rename);
    }
    out
}

fn push_token<'a>(out: &mut String, token: &'a str, rename: &impl Fn(&'a str) -> &'a str) {
    // numeric literals such as `1e5` start with a digit and are never renamed
    if token.starts_with(|c: char| c.is_ascii_digit()) {
        out.push_str(token);
    } else {
        out.push_str(rename(token));
    }
}

/// Structured form of one kernel before rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelIr {
    pass: KernelPass,
    entry_point: String,
    prologue: Vec<String>,
    body: Vec<String>,
    epilogue: Vec<String>,
    num_expressions: usize,
}

impl KernelIr {
    pub fn new(pass: KernelPass, entry_point: impl Into<String>) -> Self {
        Self {
            pass,
            entry_point: entry_point.into(),
            prologue: Vec::new(),
            body: Vec::new(),
            epilogue: Vec::new(),
            num_expressions: 0,
        }
    }

    pub fn pass(&self) -> KernelPass {
        self.pass
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Neuron expressions only; bind fragments do not count
    pub fn num_expressions(&self) -> usize {
        self.num_expressions
    }

    /// Argument binding statements placed before any neuron code
    pub fn push_prologue(&mut self, fragment: &Fragment) {
        if !fragment.is_empty() {
            self.prologue.push(fragment.build());
        }
    }

    /// One neuron's statements and their expression count
    pub fn push_neuron(&mut self, statements: String, num_expressions: usize) {
        self.body.push(statements);
        self.num_expressions += num_expressions;
    }

    /// Statements placed after all neuron code
    pub fn push_epilogue(&mut self, fragment: &Fragment) {
        if !fragment.is_empty() {
            self.epilogue.push(fragment.build());
        }
    }

    /// Neuron statement chunks, in emission order
    pub fn body(&self) -> &[String] {
        &self.body
    }

    pub fn render(&self, dialect: SourceDialect) -> String {
        let mut source = dialect.signature(self.pass, &self.entry_point);
        for chunk in self.prologue.iter().chain(&self.body).chain(&self.epilogue) {
            source.push_str(&dialect.lower_statements(chunk));
        }
        source.push_str(dialect.closing());
        source
    }

    /// Render in the canonical dialect and seal as a kernel unit
    pub fn into_kernel(self) -> KernelUnit {
        let source = self.render(SourceDialect::OpenCl);
        KernelUnit::new(self.pass, self.entry_point, source, self.num_expressions)
    }

    /// Recover the IR of a canonical kernel unit
    ///
    /// The statements come back as one opaque chunk and the expression count
    /// is not recoverable from text, so the result is only meant for
    /// re-rendering in another dialect.
    pub fn parse(kernel: KernelSource<'_>) -> Result<Self> {
        let signature = SourceDialect::OpenCl.signature(kernel.pass, kernel.entry_point);
        let statements = kernel
            .source
            .strip_prefix(signature.as_str())
            .and_then(|rest| rest.strip_suffix(CLOSING))
            .ok_or_else(|| EngineError::BuildFailure {
                diagnostics: format!(
                    "kernel `{}` does not have the generated {} layout",
                    kernel.entry_point, kernel.pass
                ),
            })?;

        let mut ir = Self::new(kernel.pass, kernel.entry_point);
        if !statements.is_empty() {
            ir.body.push(statements.to_string());
        }
        Ok(ir)
    }
}
