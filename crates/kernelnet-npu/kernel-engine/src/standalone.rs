// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Standalone C Emission
//!
//! Renders a backend-free artifact pair from the kernel lists and the current
//! memory snapshot:
//!
//! - `{name}.h`: extern declarations of `kMemory`/`kOutputs`, their sizes, and
//!   the `{name}Feed` (and `{name}Train`) entry points
//! - `{name}.c`: the first feed kernel (and first train kernel) as `static`
//!   C functions, thin wrappers binding them to the static arrays, and both
//!   arrays statically initialized from the snapshot
//!
//! Only the first kernel of each pass is exported. Kernel sources are
//! canonical OpenCL C; `#define kernel` and `#define global` make them plain C.
//!
//! Non-finite snapshot values are written as the `NAN` / `INFINITY` macros,
//! and `<math.h>` is included only when one of them is present.

use crate::kernel::KernelUnit;
use kernelnet_neural::{value_type_name, Value};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Artifact file name to file content
pub type StandaloneSources = BTreeMap<String, String>;

const GUARD_PREFIX: &str = "KERNELNET_STANDALONE_GUARD_";
const VALUES_PER_LINE: usize = 8;

/// Everything the emitter reads from a network
#[derive(Debug, Clone, Copy)]
pub struct StandaloneInput<'a> {
    pub feed_kernels: &'a [KernelUnit],
    pub train_kernels: &'a [KernelUnit],
    pub memory: &'a [Value],
    pub outputs: &'a [Value],
}

/// Render `{name}.h` and `{name}.c`; empty when there is no feed kernel
///
/// With `const_only` the train entry is left out. It is also left out when
/// the network has no train kernel at all.
pub fn render_standalone(name: &str, input: StandaloneInput<'_>, const_only: bool) -> StandaloneSources {
    let mut result = StandaloneSources::new();

    let Some(feed) = input.feed_kernels.first() else {
        return result;
    };
    let train = if const_only {
        None
    } else {
        input.train_kernels.first()
    };

    let guard = format!("{}{}", GUARD_PREFIX, uuid::Uuid::new_v4().simple());
    let header_name = format!("{}.h", name);

    result.insert(header_name.clone(), render_header(name, &guard, &input, train.is_some()));
    result.insert(
        format!("{}.c", name),
        render_source(name, &header_name, feed, train, &input),
    );
    result
}

fn render_header(name: &str, guard: &str, input: &StandaloneInput<'_>, trainable: bool) -> String {
    let t = value_type_name();
    let mut header = String::new();

    // writing into a String cannot fail
    let _ = writeln!(header, "#ifndef {}", guard);
    let _ = writeln!(header, "#define {}", guard);
    header.push('\n');
    let _ = writeln!(header, "extern {} kMemory[];", t);
    let _ = writeln!(header, "const int kMemorySize = {};", input.memory.len());
    header.push('\n');
    let _ = writeln!(header, "extern {} kOutputs[];", t);
    let _ = writeln!(header, "const int kOutputsSize = {};", input.outputs.len());
    header.push('\n');
    let _ = writeln!(header, "void {}Feed(const {} *input);", name, t);
    if trainable {
        let _ = writeln!(header, "void {}Train(const {t} rate, const {t} *target);", name, t = t);
    }
    header.push('\n');
    let _ = writeln!(header, "#endif //{}", guard);
    header
}

fn render_source(
    name: &str,
    header_name: &str,
    feed: &KernelUnit,
    train: Option<&KernelUnit>,
    input: &StandaloneInput<'_>,
) -> String {
    let t = value_type_name();
    let mut source = String::new();

    let _ = writeln!(source, "#include \"{}\"", header_name);
    let non_finite = input.memory.iter().chain(input.outputs).any(|v| !v.is_finite());
    if non_finite {
        source.push_str("#include <math.h>\n");
    }
    source.push_str("#define kernel\n");
    source.push_str("#define global\n");
    source.push('\n');

    let _ = writeln!(source, "static {}", feed.full_source());
    if let Some(train) = train {
        let _ = writeln!(source, "static {}", train.full_source());
    }

    let _ = writeln!(source, "void {}Feed(const {} *input) {{", name, t);
    let _ = writeln!(source, "    {}(input, kOutputs, kMemory);", feed.entry_point());
    source.push_str("}\n\n");

    if let Some(train) = train {
        let _ = writeln!(source, "void {}Train(const {t} rate, const {t} *target) {{", name, t = t);
        let _ = writeln!(source, "    {}(&rate, target, kMemory);", train.entry_point());
        source.push_str("}\n\n");
    }

    write_array(&mut source, "kMemory", input.memory);
    source.push('\n');
    write_array(&mut source, "kOutputs", input.outputs);
    source
}

/// Static initializer with a trailing `0` sentinel, 8 values per line
fn write_array(out: &mut String, name: &str, values: &[Value]) {
    let _ = writeln!(out, "{} {}[] = ", value_type_name(), name);
    out.push_str("{ \n");
    for (i, &value) in values.iter().enumerate() {
        write_value(out, value);
        out.push_str(", ");
        if i % VALUES_PER_LINE == VALUES_PER_LINE - 1 {
            out.push('\n');
        }
    }
    out.push_str("0 }; \n");
}

/// C initializer spelling of one value
fn write_value(out: &mut String, value: Value) {
    if value.is_nan() {
        out.push_str("NAN");
    } else if value.is_infinite() {
        out.push_str(if value > 0.0 { "INFINITY" } else { "-INFINITY" });
    } else {
        let _ = write!(out, "{}", value);
    }
}
