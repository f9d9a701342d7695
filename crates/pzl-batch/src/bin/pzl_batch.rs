#![forbid(unsafe_code)]

use clap::{Args, Parser, Subcommand};
use pzl_batch::{
    BatchConfig, DEFAULT_MAX_FAILURES, DEFAULT_WORKERS, capture_boundary_cases, normalize_suite, run_batch,
    set_verdict_log_path, validate_suite, write_summary,
};
use pzl_harness::Language;
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pzl-batch")]
#[command(about = "Runs puzzle solution suites and maintains their test cases")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SuiteArgs {
    /// Suite manifest (defaults to the bundled fixtures)
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Only units in this language (repeatable)
    #[arg(short, long = "language")]
    languages: Vec<String>,

    /// Only units for this problem id (repeatable)
    #[arg(short, long = "problem")]
    problems: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every selected unit and print the batch summary
    Run {
        #[command(flatten)]
        suite: SuiteArgs,

        /// Units executed concurrently
        #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,

        /// Per-invocation wall-clock limit in seconds (clamped to 1..=60)
        #[arg(short, long, default_value = "10")]
        timeout: u64,

        /// Failing verdicts kept per unit
        #[arg(long, default_value_t = DEFAULT_MAX_FAILURES)]
        max_failures: usize,

        /// Also write the summary JSON here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Append every verdict to this JSONL file
        #[arg(long)]
        verdict_log: Option<PathBuf>,
    },

    /// Bind every test case without running anything
    Validate {
        #[command(flatten)]
        suite: SuiteArgs,
    },

    /// Rewrite named-mapping inputs to positional form
    Normalize {
        #[command(flatten)]
        suite: SuiteArgs,

        /// Write changed files (otherwise report only)
        #[arg(long)]
        write: bool,
    },

    /// Derive boundary inputs and record the reference solution's outputs
    /// (exits 2 when the reference rejects any input)
    Capture {
        /// Suite manifest (defaults to the bundled fixtures)
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Problem id to extend
        #[arg(short, long)]
        problem: String,

        /// Language of the reference solution
        #[arg(short, long, default_value = "python")]
        language: String,

        /// Per-invocation wall-clock limit in seconds
        #[arg(short, long, default_value = "10")]
        timeout: u64,

        /// Append captured cases to the problem's submit tests
        #[arg(long)]
        write: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(err) => {
            eprintln!("pzl-batch failed: {err}");
            std::process::exit(1);
        }
    }
}

fn config(manifest: Option<PathBuf>) -> BatchConfig {
    let mut cfg = BatchConfig::default_paths();
    if let Some(manifest) = manifest {
        cfg.manifest_path = manifest;
    }
    cfg
}

fn with_filters(suite: SuiteArgs) -> BatchConfig {
    let mut cfg = config(suite.manifest);
    cfg.languages = suite.languages;
    cfg.problems = suite.problems;
    cfg
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let raw = serde_json::to_string_pretty(value).map_err(|err| format!("failed to serialize output: {err}"))?;
    println!("{raw}");
    Ok(())
}

/// `Ok(false)` means the command ran but found failures.
fn run() -> Result<bool, String> {
    match Cli::parse().command {
        Commands::Run {
            suite,
            workers,
            timeout,
            max_failures,
            output,
            verdict_log,
        } => {
            let mut cfg = with_filters(suite);
            cfg.workers = workers;
            cfg.timeout = Duration::from_secs(timeout);
            cfg.max_failures = max_failures;
            if verdict_log.is_some() {
                set_verdict_log_path(verdict_log);
            }
            let summary = run_batch(&cfg).map_err(|err| err.to_string())?;
            if let Some(path) = output {
                write_summary(&path, &summary).map_err(|err| err.to_string())?;
            }
            print_json(&summary)?;
            Ok(summary.all_passed())
        }
        Commands::Validate { suite } => {
            let report = validate_suite(&with_filters(suite)).map_err(|err| err.to_string())?;
            print_json(&report)?;
            Ok(report.is_clean())
        }
        Commands::Normalize { suite, write } => {
            let outcomes = normalize_suite(&with_filters(suite), write).map_err(|err| err.to_string())?;
            print_json(&outcomes)?;
            Ok(outcomes.iter().all(|outcome| outcome.error.is_none()))
        }
        Commands::Capture {
            manifest,
            problem,
            language,
            timeout,
            write,
        } => {
            let language: Language = language.parse()?;
            let mut cfg = config(manifest);
            cfg.timeout = Duration::from_secs(timeout);
            let report =
                capture_boundary_cases(&cfg, &problem, language, write).map_err(|err| err.to_string())?;
            print_json(&report)?;
            Ok(report.all_captured())
        }
    }
}
