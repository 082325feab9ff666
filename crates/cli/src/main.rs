// snapdiff CLI - reconcile entity snapshots from the command line

mod exit_codes;
mod output;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::{debug, warn};
use serde_json::Value;
use snapdiff_recon::{apply_records, parse_snapshot, run, Diff, DuplicatePolicy, ReconConfig, ReconError, Side, SnapshotFormat};

// Re-export exit codes from registry (single source of truth)
use exit_codes::{
    EXIT_SUCCESS, EXIT_USAGE, EXIT_IO,
    EXIT_DIFF_CHANGES, EXIT_APPLY_BAD_DIFF,
    recon_exit_code,
};

#[derive(Parser)]
#[command(name = "snapdiff")]
#[command(about = "Reconcile two entity snapshots into creates, updates and deletes")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log verbosity (-v warn, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diff two snapshots keyed by one or more fields
    #[command(after_help = "\
Examples:
  snapdiff diff before.json after.json --key id
  snapdiff diff stock-mon.csv stock-tue.csv --key warehouse --key sku --out text
  snapdiff diff old.jsonl new.jsonl --config inventory.snapdiff.toml --summary stderr
  cat now.json | snapdiff diff yesterday.json - --key id --ignore updated_at")]
    Diff {
        /// Before snapshot (`-` for stdin)
        before: String,

        /// After snapshot (`-` for stdin)
        after: String,

        /// Key field; repeat for a composite key
        #[arg(long, short = 'k', value_name = "FIELD")]
        key: Vec<String>,

        /// Field excluded from comparison; repeatable
        #[arg(long, value_name = "FIELD")]
        ignore: Vec<String>,

        /// TOML config with key, ignore, on_duplicate (flags override it)
        #[arg(long, short = 'c', value_name = "PATH", env = "SNAPDIFF_CONFIG")]
        config: Option<PathBuf>,

        /// Policy for a key repeated within one snapshot
        #[arg(long, value_enum)]
        on_duplicate: Option<OnDuplicate>,

        /// Input format (inferred from the file extension when omitted)
        #[arg(long, short = 'f', value_enum)]
        format: Option<InputFormat>,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        out: OutputFormat,

        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Where to print summary counts
        #[arg(long, value_enum, default_value = "none")]
        summary: SummaryMode,

        /// Suppress stderr notes (warnings, summary)
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Apply a diff to a snapshot and print the resulting snapshot as JSON
    #[command(after_help = "\
Examples:
  snapdiff diff a.json b.json --key id -o changes.json
  snapdiff apply a.json changes.json --key id -o b-rebuilt.json")]
    Apply {
        /// Snapshot to apply the diff to (`-` for stdin)
        before: String,

        /// Diff file: a bare diff or the JSON report from `snapdiff diff`
        diff: PathBuf,

        /// Key field; repeat for a composite key
        #[arg(long, short = 'k', value_name = "FIELD")]
        key: Vec<String>,

        /// TOML config with key fields (flags override it)
        #[arg(long, short = 'c', value_name = "PATH", env = "SNAPDIFF_CONFIG")]
        config: Option<PathBuf>,

        /// Input format of BEFORE (inferred from the file extension when omitted)
        #[arg(long, short = 'f', value_enum)]
        format: Option<InputFormat>,

        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    Json,
    Jsonl,
    Csv,
}

impl From<InputFormat> for SnapshotFormat {
    fn from(f: InputFormat) -> Self {
        match f {
            InputFormat::Json => SnapshotFormat::Json,
            InputFormat::Jsonl => SnapshotFormat::Jsonl,
            InputFormat::Csv => SnapshotFormat::Csv,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OnDuplicate {
    LastWriteWins,
    Error,
}

impl From<OnDuplicate> for DuplicatePolicy {
    fn from(p: OnDuplicate) -> Self {
        match p {
            OnDuplicate::LastWriteWins => DuplicatePolicy::LastWriteWins,
            OnDuplicate::Error => DuplicatePolicy::Error,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SummaryMode {
    None,
    Stderr,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\nengine:  snapdiff-recon ", env!("CARGO_PKG_VERSION"),
        "\ncontract_version(diff): 1",
    )
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "error",
        1 => "warn",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Diff {
            before,
            after,
            key,
            ignore,
            config,
            on_duplicate,
            format,
            out,
            output,
            summary,
            quiet,
        } => cmd_diff(before, after, key, ignore, config, on_duplicate, format, out, output, summary, quiet),
        Commands::Apply {
            before,
            diff,
            key,
            config,
            format,
            output,
        } => cmd_apply(before, diff, key, config, format, output),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Create error from an engine error with its registered exit code.
    pub fn recon(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::DuplicateKeys(_) => Some(
                "each key must be unique within its snapshot; deduplicate, choose a different --key, or use --on-duplicate last-write-wins".to_string(),
            ),
            ReconError::MissingKey { .. } => {
                Some("every record needs a non-null value for each --key field".to_string())
            }
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn cmd_diff(
    before_arg: String,
    after_arg: String,
    key: Vec<String>,
    ignore: Vec<String>,
    config_path: Option<PathBuf>,
    on_duplicate: Option<OnDuplicate>,
    format: Option<InputFormat>,
    out: OutputFormat,
    output: Option<PathBuf>,
    summary_mode: SummaryMode,
    quiet: bool,
) -> Result<(), CliError> {
    if before_arg == "-" && after_arg == "-" {
        return Err(CliError::args("cannot read both snapshots from stdin")
            .with_hint("provide at least one file path: snapdiff diff - after.json --key id"));
    }

    let config = resolve_config(config_path.as_deref(), key, ignore, on_duplicate)?;
    debug!("config '{}': key={:?} ignore={:?} on_duplicate={}", config.name, config.key, config.ignore, config.on_duplicate);

    let before = read_snapshot(Side::Before, &before_arg, format)?;
    let after = read_snapshot(Side::After, &after_arg, format)?;

    let report = run(&config, before, after).map_err(CliError::recon)?;

    if !quiet {
        for dup in &report.duplicate_keys {
            eprintln!(
                "warning: {} key {:?} appears {} times; keeping the last record",
                dup.side, dup.key, dup.count
            );
        }
    }

    let output_bytes = match out {
        OutputFormat::Json => output::format_report_json(&report)?,
        OutputFormat::Text => output::format_report_text(&report),
    };
    write_output(output.as_deref(), &output_bytes)?;

    if !quiet && summary_mode == SummaryMode::Stderr {
        for line in output::summary_lines(&report, label(&before_arg), label(&after_arg)) {
            eprintln!("{}", line);
        }
    }

    // Exit 1 when the snapshots differ, like diff(1).
    if !report.diff.is_empty() {
        return Err(CliError { code: EXIT_DIFF_CHANGES, message: String::new(), hint: None });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// apply
// ---------------------------------------------------------------------------

fn cmd_apply(
    before_arg: String,
    diff_path: PathBuf,
    key: Vec<String>,
    config_path: Option<PathBuf>,
    format: Option<InputFormat>,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = resolve_config(config_path.as_deref(), key, Vec::new(), None)?;
    let before = read_snapshot(Side::Before, &before_arg, format)?;

    let diff_text = std::fs::read_to_string(&diff_path)
        .map_err(|e| CliError::io(format!("{}: {}", diff_path.display(), e)))?;
    let diff = parse_diff(&diff_text).map_err(|msg| CliError {
        code: EXIT_APPLY_BAD_DIFF,
        message: format!("{}: {}", diff_path.display(), msg),
        hint: Some("expected {\"creates\": [...], \"updates\": [[before, after], ...], \"deletes\": [...]} or a `snapdiff diff` JSON report".to_string()),
    })?;

    let applied = apply_records(&config, before, diff).map_err(CliError::recon)?;

    let mut bytes = serde_json::to_vec_pretty(&applied).map_err(|e| CliError::io(e.to_string()))?;
    bytes.push(b'\n');
    write_output(output.as_deref(), &bytes)
}

/// Accept a bare diff or a full report (whose `diff` field is the diff).
fn parse_diff(text: &str) -> Result<Diff<Value>, String> {
    let mut value: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
    if value.get("contract_version").is_some() {
        value = value
            .get_mut("diff")
            .map(Value::take)
            .ok_or_else(|| "report has no 'diff' field".to_string())?;
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load `--config` if given, then apply flag overrides.
fn resolve_config(
    path: Option<&Path>,
    key: Vec<String>,
    ignore: Vec<String>,
    on_duplicate: Option<OnDuplicate>,
) -> Result<ReconConfig, CliError> {
    let mut config = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .map_err(|e| CliError::io(format!("{}: {}", p.display(), e)))?;
            ReconConfig::from_toml(&text).map_err(CliError::recon)?
        }
        None => {
            if key.is_empty() {
                return Err(CliError::args("no key field given")
                    .with_hint("pass --key FIELD (repeatable) or --config PATH"));
            }
            ReconConfig::new(Vec::new())
        }
    };

    if !key.is_empty() {
        config.key = key;
    }
    for field in ignore {
        if !config.ignore.contains(&field) {
            config.ignore.push(field);
        }
    }
    if let Some(policy) = on_duplicate {
        config.on_duplicate = policy.into();
    }

    config.validate().map_err(CliError::recon)?;
    Ok(config)
}

fn read_snapshot(side: Side, arg: &str, format: Option<InputFormat>) -> Result<Vec<Value>, CliError> {
    let (text, fmt) = if arg == "-" {
        let fmt = format.map(SnapshotFormat::from).ok_or_else(|| {
            CliError::args(format!("cannot infer {} format from stdin", side))
                .with_hint("use --format json|jsonl|csv when reading from stdin")
        })?;
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| CliError::io(format!("stdin: {}", e)))?;
        (buf, fmt)
    } else {
        let path = Path::new(arg);
        let fmt = match format {
            Some(f) => SnapshotFormat::from(f),
            None => SnapshotFormat::from_path(path).ok_or_else(|| {
                CliError::args(format!("cannot infer format of {}", path.display()))
                    .with_hint("use --format json|jsonl|csv")
            })?,
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))?;
        (text, fmt)
    };

    let records = parse_snapshot(side, &text, fmt).map_err(CliError::recon)?;
    debug!("{} snapshot: {} record(s) as {}", side, records.len(), fmt.as_str());
    if records.is_empty() {
        warn!("{} snapshot {} has no records", side, label(arg));
    }
    Ok(records)
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<(), CliError> {
    match path {
        Some(path) => std::fs::write(path, bytes)
            .map_err(|e| CliError::io(format!("{}: {}", path.display(), e))),
        None => io::stdout()
            .write_all(bytes)
            .map_err(|e| CliError::io(e.to_string())),
    }
}

fn label(arg: &str) -> &str {
    if arg == "-" { "stdin" } else { arg }
}
