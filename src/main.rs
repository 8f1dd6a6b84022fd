//! Evidence Bundle CLI
//!
//! Verify Evidence Bundles from the command line, or write a demo bundle.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Map, Value};
use tracing_subscriber::EnvFilter;

use evidence_bundle_cli::report::{render_json, render_text};
use evidence_bundle_cli::{
    read_metadata, verify_bundle, BundleBuilder, BundleError, EntryDraft, Verdict, RULES,
};

/// Evidence Bundle CLI - Build and verify Evidence Bundles
#[derive(Parser, Debug)]
#[command(name = "evidence-bundle")]
#[command(version)]
#[command(about = "Build and verify Evidence Bundles from the command line")]
struct Cli {
    /// Show verbose output and debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify an Evidence Bundle (L1)
    Verify(VerifyArgs),
    /// Write a demo Evidence Bundle
    Demo(DemoArgs),
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// Path to the bundle .zip
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct DemoArgs {
    /// Where to write the demo bundle
    #[arg(short, long, value_name = "PATH", default_value = "demo/evidence-bundle-demo.zip")]
    output: PathBuf,
}

#[derive(Clone, Debug, PartialEq)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use 'text' or 'json'", s)),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Verify(args) => run_verify(args, cli.verbose),
        Command::Demo(args) => match run_demo(args) {
            Ok(path) => {
                println!("Demo bundle written to: {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {:#}", e);
                let code = e
                    .downcast_ref::<BundleError>()
                    .map(BundleError::exit_code)
                    .unwrap_or(1);
                ExitCode::from(code as u8)
            }
        },
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_verify(args: &VerifyArgs, verbose: bool) -> ExitCode {
    let path = &args.path;

    if let Some(verdict) = missing_input_verdict(path) {
        let message = format!("File not found: {}", path.display());
        if args.format == OutputFormat::Json {
            print_json(&json!({
                "status": "failed",
                "error": message,
                "exitCode": verdict.exit_code()
            }));
        } else {
            eprintln!("{}", message);
        }
        return ExitCode::from(verdict.exit_code());
    }

    let outcome = verify_bundle(path);

    if args.format == OutputFormat::Json {
        print_json(&render_json(&outcome, path));
    } else {
        let meta = if verbose { read_metadata(path).ok() } else { None };
        print!("{}", render_text(&RULES, &outcome, path, meta.as_ref(), verbose));
    }

    ExitCode::from(outcome.verdict().exit_code())
}

/// A path that does not exist fails without reaching the archive reader.
fn missing_input_verdict(path: &Path) -> Option<Verdict> {
    if path.exists() {
        None
    } else {
        Some(Verdict::Fail)
    }
}

fn run_demo(args: &DemoArgs) -> anyhow::Result<PathBuf> {
    let mut bundle = BundleBuilder::new_demo()?;

    bundle.append_entry(
        EntryDraft::new("user", "send_message")
            .timestamp("2025-11-19T12:00:00Z")
            .input(object(json!({ "text": "How did the AI decide this?" }))?)
            .metadata(object(json!({ "channel": "web", "session_id": "session-demo-001" }))?),
    )?;
    bundle.append_entry(
        EntryDraft::new("chat-model", "generate_response")
            .timestamp("2025-11-19T12:00:01Z")
            .input(object(json!({ "prompt_ref": "attachments/prompt.txt" }))?)
            .output(object(json!({ "text": "Here is how the decision was made..." }))?)
            .metadata(object(json!({
                "model": "demo-model-001",
                "temperature": 0.3,
                "latency_ms": 180
            }))?),
    )?;
    bundle.append_entry(
        EntryDraft::new("logger", "write_aal_entry")
            .timestamp("2025-11-19T12:00:02Z")
            .input(object(json!({ "entries": 2 }))?)
            .output(object(json!({ "status": "ok" }))?),
    )?;

    bundle.add_text_attachment(
        "attachments/prompt.txt",
        "System: You are an AI whose decisions must be auditable.\n\
         User: How did the AI decide this?\n",
    );
    bundle.add_text_attachment(
        "attachments/notes.md",
        "# Demo bundle\n\n\
         - This is a demo Evidence Bundle.\n\
         - It shows how meta.json and aal.ndjson work together.\n",
    );

    bundle
        .write(&args.output)
        .with_context(|| format!("writing demo bundle to {}", args.output.display()))
}

fn object(value: Value) -> anyhow::Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("expected a JSON object, got {}", other),
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Error: cannot render JSON report: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_path_is_fail() {
        let verdict = missing_input_verdict(Path::new("/nonexistent/bundle.zip"));
        assert_eq!(verdict, Some(Verdict::Fail));
        assert_eq!(verdict.map(|v| v.exit_code()), Some(Verdict::Fail.exit_code()));
        assert_eq!(Verdict::Fail.exit_code(), 2);
    }

    #[test]
    fn test_existing_path_goes_to_verifier() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(missing_input_verdict(file.path()), None);
    }

    #[test]
    fn test_object_rejects_non_objects() {
        assert!(object(json!({ "a": 1 })).is_ok());
        assert!(object(json!([1, 2])).is_err());
    }

    #[test]
    fn test_demo_bundle_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let args = DemoArgs {
            output: dir.path().join("demo/bundle.zip"),
        };
        let path = run_demo(&args).unwrap();
        let outcome = verify_bundle(&path);
        assert_eq!(outcome.verdict(), Verdict::Pass);
        assert_eq!(outcome.total_score(), 8.0);
    }
}
