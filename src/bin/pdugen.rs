//! Generate marshalling code from a PDU schema.
//!
//! Usage:
//!   pdugen SCHEMA.xml --rust-out src/pdus --java-out java/
//!   pdugen SCHEMA.xml --check
//!
//! Diagnostics go to stdout as `SCHEMA: severity: message [kind] (Class.field)`.
//! Exit status is 1 when the schema fails to load or validate, or when any class
//! could not be generated for some backend.

use anyhow::Context;
use clap::Parser;
use pdugen::pipeline::{check, run, BackendTarget, PipelineError};
use pdugen::{JavaBackend, RustBackend};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pdugen", version, about = "Schema-driven PDU code generator")]
struct Cli {
    /// Schema document.
    schema: PathBuf,

    /// Output directory for Rust modules.
    #[arg(long, value_name = "DIR")]
    rust_out: Option<PathBuf>,

    /// Output directory (package root) for Java classes.
    #[arg(long, value_name = "DIR")]
    java_out: Option<PathBuf>,

    /// Load and validate only; write nothing.
    #[arg(long)]
    check: bool,

    /// More logging (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let path = cli.schema.display().to_string();
    let source = std::fs::read_to_string(&cli.schema).with_context(|| format!("reading {}", path))?;

    let mut targets = Vec::new();
    if let Some(dir) = &cli.rust_out {
        targets.push(BackendTarget::new(Box::new(RustBackend), dir));
    }
    if let Some(dir) = &cli.java_out {
        targets.push(BackendTarget::new(Box::new(JavaBackend), dir));
    }

    let result = if cli.check || targets.is_empty() {
        check(&source).map(|(_, diagnostics)| (diagnostics, Vec::new(), 0))
    } else {
        run(&source, &targets).map(|report| (report.diagnostics, report.failures, report.written.len()))
    };

    match result {
        Ok((diagnostics, failures, written)) => {
            for d in &diagnostics {
                println!("{}: {}", path, d);
            }
            for f in &failures {
                println!("{}: error: {} [{}]", path, f.error, f.backend);
            }
            if written > 0 {
                eprintln!("pdugen: wrote {} file(s)", written);
            }
            if !failures.is_empty() {
                eprintln!("pdugen: {} class(es) not generated", failures.len());
                std::process::exit(1);
            }
        }
        Err(PipelineError::Validation(diagnostics)) => {
            for d in &diagnostics {
                println!("{}: {}", path, d);
            }
            let errors = diagnostics.iter().filter(|d| d.is_error()).count();
            eprintln!("pdugen: {} error(s), nothing written", errors);
            std::process::exit(1);
        }
        Err(PipelineError::Load(e)) => {
            println!("{}: error: {}", path, e);
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("generation failed"),
    }
    Ok(())
}
