// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Standalone Export Tool

Renders a persisted network and a memory snapshot as a backend-free
`{name}.h` / `{name}.c` pair.

Usage:
  cargo run --bin export_standalone -- --network net.json --context memory.json --name tiny

Settings not given on the command line come from `kernelnet.toml`
(`[standalone]` and `[logging]` sections) and `KERNELNET_*` variables.
`--debug-<crate>` / `--debug-all` raise log levels per crate.
*/

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use kernelnet::config::validate_config;
use kernelnet::engine::NetworkCompiler;
use kernelnet::neural::TrainingContext;
use kernelnet::observability::{debug_flags_help, init_logging, parse_debug_flags};

#[derive(Debug, Parser)]
#[command(
    name = "export_standalone",
    version,
    about = "Export a kernelnet network as standalone C",
    after_help = debug_flags_help()
)]
struct Args {
    /// Network JSON (`FeedKernels` / `TrainKernels`)
    #[arg(long)]
    network: PathBuf,

    /// Memory context JSON snapshot
    #[arg(long)]
    context: PathBuf,

    /// Artifact base name and C entry point prefix
    #[arg(long)]
    name: Option<String>,

    /// Export inference only
    #[arg(long)]
    const_only: bool,

    /// Directory receiving the generated files
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Configuration file (defaults to a discovered kernelnet.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn config_overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if let Some(name) = &self.name {
            overrides.insert("standalone.name".to_string(), name.clone());
        }
        if self.const_only {
            overrides.insert("standalone.const_only".to_string(), "true".to_string());
        }
        if let Some(dir) = &self.output_dir {
            overrides.insert(
                "standalone.output_dir".to_string(),
                dir.to_string_lossy().into_owned(),
            );
        }
        overrides
    }
}

fn main() -> Result<()> {
    // debug flags are handled by observability, not clap
    let debug_flags = parse_debug_flags();
    let args = Args::parse_from(env::args().filter(|arg| !arg.starts_with("--debug-")));

    let config = kernelnet::resolve_config(args.config.as_deref(), &args.config_overrides())
        .context("Failed to load configuration")?;
    validate_config(&config)?;

    let _logging = init_logging(&debug_flags, &kernelnet::logging_options(&config.logging))?;

    let context = TrainingContext::load(&args.context)
        .with_context(|| format!("Failed to load memory context {}", args.context.display()))?;
    let mut network = NetworkCompiler::new(context);
    network
        .load(&args.network)
        .with_context(|| format!("Failed to load network {}", args.network.display()))?;

    let written = kernelnet::write_standalone(&network, &config.standalone)?;
    info!(files = written.len(), name = %config.standalone.name, "Export complete");
    for path in &written {
        println!("{}", path.display());
    }
    Ok(())
}
