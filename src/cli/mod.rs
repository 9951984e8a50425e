//! The `stepscript` command line: `ast`, `check`, and `events`.
//!
//! Exit status is 0 when every script is accepted, 1 when any script is
//! rejected or fails to parse, and 2 when the configuration cannot be loaded.

use std::{
    env,
    path::{Path, PathBuf},
    process,
};

use clap::Parser;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use crate::{
    cli::{
        args::{Command, StepArgs},
        output::{CheckStatus, CheckSummary},
    },
    config::Config,
    engine::CompilePipeline,
    errors::{print_error, print_report, DiagnosticReport, SourceContext, StepError},
};

pub mod args;
pub mod output;

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV: &str = "STEPSCRIPT_LOG";

/// File extension of StepScript sources.
pub const SCRIPT_EXTENSION: &str = "ns";

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

/// Parses arguments, installs logging, and runs one subcommand.
pub fn run() {
    let args = StepArgs::parse();
    init_tracing(args.verbose);

    let config = load_config(args.config.as_deref()).unwrap_or_else(|e| {
        print_error(e);
        process::exit(2);
    });
    let pipeline = CompilePipeline::new(config);

    let ok = match args.command {
        Command::Ast { file, json } => handle_ast(&pipeline, &file, json),
        Command::Check { path } => handle_check(&pipeline, &path),
        Command::Events { file, json } => handle_events(&pipeline, &file, json),
    };
    if !ok {
        process::exit(1);
    }
}

/// Installs a stderr subscriber. `STEPSCRIPT_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

fn load_config(explicit: Option<&Path>) -> Result<Config, StepError> {
    match explicit {
        Some(path) => Config::load(path),
        None => {
            let cwd = env::current_dir().map_err(|source| StepError::Io {
                path: ".".to_string(),
                source,
            })?;
            Config::discover(&cwd)
        }
    }
}

// ============================================================================
// SUBCOMMANDS
// ============================================================================

fn handle_ast(pipeline: &CompilePipeline, file: &Path, json: bool) -> bool {
    let Some(source) = read_or_report(file) else {
        return false;
    };
    let output = match pipeline.build(&source) {
        Ok(output) => output,
        Err(e) => {
            print_error(e);
            return false;
        }
    };
    let warnings: Vec<_> = output
        .diagnostics
        .iter()
        .filter(|d| !d.is_error())
        .cloned()
        .collect();
    let program = match pipeline.accept(&source, output) {
        Ok(program) => program,
        Err(e) => {
            print_error(e);
            return false;
        }
    };
    for report in DiagnosticReport::for_all(&warnings, &source) {
        print_report(report);
    }
    if let Err(e) = output::print_ast(&program, json) {
        eprintln!("Error: could not serialize the tree: {}", e);
        return false;
    }
    true
}

fn handle_events(pipeline: &CompilePipeline, file: &Path, json: bool) -> bool {
    let Some(source) = read_or_report(file) else {
        return false;
    };
    let events = match pipeline.events(&source) {
        Ok(events) => events,
        Err(e) => {
            print_error(e);
            return false;
        }
    };
    if let Err(e) = output::print_events(&events, json) {
        eprintln!("Error: could not serialize the event stream: {}", e);
        return false;
    }
    true
}

fn handle_check(pipeline: &CompilePipeline, path: &Path) -> bool {
    let files = match discover_scripts(path) {
        Ok(files) => files,
        Err(e) => {
            print_error(e);
            return false;
        }
    };
    if files.is_empty() {
        println!("No .{} scripts found under {}", SCRIPT_EXTENSION, path.display());
        return true;
    }

    let mut summary = CheckSummary::default();
    for file in &files {
        let (status, errors, warnings) = check_one(pipeline, file);
        output::print_check_line(&file.display().to_string(), status, warnings);
        summary.record(status, errors, warnings);
    }
    output::print_summary(&summary);
    summary.is_clean()
}

fn check_one(pipeline: &CompilePipeline, file: &Path) -> (CheckStatus, usize, usize) {
    let Some(source) = read_or_report(file) else {
        return (CheckStatus::Failed, 0, 0);
    };
    let output = match pipeline.build(&source) {
        Ok(output) => output,
        Err(e) => {
            print_error(e);
            return (CheckStatus::Failed, 0, 0);
        }
    };
    let errors = output.error_count();
    let warnings = output.diagnostics.len() - errors;
    let accepted = output.is_accepted(pipeline.config.warnings_as_errors);
    for report in DiagnosticReport::for_all(&output.diagnostics, &source) {
        print_report(report);
    }
    let status = if accepted {
        CheckStatus::Accepted
    } else {
        CheckStatus::Rejected
    };
    (status, errors, warnings)
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn read_or_report(file: &Path) -> Option<SourceContext> {
    match CompilePipeline::read_file(file) {
        Ok(source) => Some(source),
        Err(e) => {
            print_error(e);
            None
        }
    }
}

/// A single file is taken as-is; a directory is searched for `.ns` files.
pub fn discover_scripts(root: &Path) -> Result<Vec<PathBuf>, StepError> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| StepError::Io {
            path: root.display().to_string(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some(SCRIPT_EXTENSION) {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    tracing::debug!(root = %root.display(), count = files.len(), "scripts discovered");
    Ok(files)
}
