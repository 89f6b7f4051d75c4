//! `brace`: convert Python source into a brace-delimited, statically typed
//! dialect.

mod settings;

use anyhow::{Context, Result};
use brace_syntax::{SyntaxTree, reader_for_extension};
use brace_transpile::{Conversion, Diagnostics, Pipeline, PluginChain, Severity};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use settings::Options;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "brace", version)]
#[command(about = "Convert Python source into a brace-delimited, statically typed dialect")]
struct Cli {
    /// Debug logging on stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a file (`.py`, or a `.json` syntax tree)
    Convert {
        input: PathBuf,

        /// Write the result here instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// How diagnostics are printed on stderr
        #[arg(long, value_enum, default_value_t = DiagnosticsFormat::Text)]
        diagnostics: DiagnosticsFormat,

        #[command(flatten)]
        options: Options,
    },
    /// Convert a file and print only its diagnostics. Fails on warnings.
    Check {
        input: PathBuf,

        #[arg(long, value_enum, default_value_t = DiagnosticsFormat::Text)]
        diagnostics: DiagnosticsFormat,

        #[command(flatten)]
        options: Options,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DiagnosticsFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct Report<'a> {
    file: String,
    cached: bool,
    elapsed_ms: f64,
    diagnostics: &'a Diagnostics,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "brace=debug,brace_transpile=debug,brace_syntax=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("failed to resolve the working directory")?;
    match command {
        Command::Convert {
            input,
            output,
            diagnostics,
            options,
        } => {
            let conversion = convert(&input, &options, &cwd)?;
            match output {
                Some(path) => std::fs::write(&path, &conversion.text)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => print!("{}", conversion.text),
            }
            let report = format_diagnostics(&input, &conversion, diagnostics)?;
            if !report.is_empty() {
                eprint!("{report}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Check {
            input,
            diagnostics,
            options,
        } => {
            let conversion = convert(&input, &options, &cwd)?;
            print!("{}", format_diagnostics(&input, &conversion, diagnostics)?);
            let failed = conversion
                .diagnostics
                .iter()
                .any(|d| d.severity >= Severity::Warning);
            Ok(if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
    }
}

fn convert(input: &Path, options: &Options, cwd: &Path) -> Result<Conversion> {
    let config = options.resolve(cwd)?;
    let pipeline = Pipeline::new(config, PluginChain::empty())?;
    if let Some(path) = &options.cache_file
        && path.is_file()
    {
        // A stale or damaged cache only costs a recomputation.
        if let Err(err) = pipeline.cache().load(path) {
            tracing::warn!(path = %path.display(), %err, "ignoring unreadable cache file");
        }
    }
    let source = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let extension = input.extension().and_then(|e| e.to_str()).unwrap_or("");
    let conversion = if extension == "json" {
        let tree = SyntaxTree::from_json(&source)
            .with_context(|| format!("invalid syntax tree in {}", input.display()))?;
        pipeline.convert(&tree)
    } else {
        let reader = reader_for_extension(extension)
            .with_context(|| format!("no reader for `.{extension}` files"))?;
        pipeline.convert_source(&source, reader)
    }
    .with_context(|| format!("failed to convert {}", input.display()))?;

    tracing::debug!(
        file = %input.display(),
        diagnostics = conversion.diagnostics.len(),
        "converted"
    );

    if let Some(path) = &options.cache_file {
        pipeline
            .cache()
            .save(path)
            .with_context(|| format!("failed to write cache file {}", path.display()))?;
    }
    if options.stats {
        eprintln!(
            "{}: {:.3} ms{}",
            input.display(),
            conversion.elapsed.as_secs_f64() * 1000.0,
            if conversion.cached { " (cached)" } else { "" }
        );
        eprintln!("{}", pipeline.cache().stats());
    }
    Ok(conversion)
}

fn format_diagnostics(
    input: &Path,
    conversion: &Conversion,
    format: DiagnosticsFormat,
) -> Result<String> {
    match format {
        DiagnosticsFormat::Text => Ok(conversion
            .diagnostics
            .iter()
            .map(|d| format!("{}: {d}\n", input.display()))
            .collect()),
        DiagnosticsFormat::Json => {
            let report = Report {
                file: input.display().to_string(),
                cached: conversion.cached,
                elapsed_ms: conversion.elapsed.as_secs_f64() * 1000.0,
                diagnostics: &conversion.diagnostics,
            };
            Ok(serde_json::to_string_pretty(&report)? + "\n")
        }
    }
}
