// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Textwerk command line.
//
// Entry point. Initialises logging, resolves configuration, runs one
// subcommand and prints its result as pretty JSON on stdout.  Diagnostics
// go to stderr.

mod commands;
mod services;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use textwerk_core::error::Result;
use textwerk_core::human_errors::{Severity, humanize_error};

use commands::{AdapterCommand, AnalysisArgs, ConfigCommand, JobKind, StartArgs};
use services::input::Input;
use services::session::{ConnectOptions, Session};

#[derive(Debug, Parser)]
#[command(name = "textwerk")]
#[command(version)]
#[command(about = "Detect text, tables, forms and expenses in documents", long_about = None)]
struct Cli {
    /// Service endpoint, overriding config and environment.
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Region; also selects the public endpoint.
    #[arg(long, global = true)]
    region: Option<String>,

    /// Config file (defaults to the user config directory).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run against an in-process stub instead of the network.
    #[arg(long, global = true)]
    stub: bool,

    /// More logging on stderr (-v, -vv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Detect lines and words in a single-page document.
    Detect {
        #[arg(value_name = "DOCUMENT")]
        input: Input,
    },

    /// Extract tables, forms, query answers, signatures or layout.
    Analyze {
        #[arg(value_name = "DOCUMENT")]
        input: Input,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Extract invoice and receipt fields.
    Expense {
        #[arg(value_name = "DOCUMENT")]
        input: Input,
    },

    /// Extract identity document fields (front and back as two documents).
    Id {
        #[arg(value_name = "DOCUMENT", required = true, num_args = 1..=2)]
        inputs: Vec<Input>,
    },

    /// Start an asynchronous job.
    Start(StartArgs),

    /// Poll a job until it finishes and print its first page.
    Wait {
        #[arg(value_enum)]
        kind: JobKind,
        job_id: String,
    },

    /// Print every result page of a finished job.
    Results {
        #[arg(value_enum)]
        kind: JobKind,
        job_id: String,

        /// Page size requested from the service.
        #[arg(long)]
        max_results: Option<u32>,
    },

    /// Manage custom adapters.
    #[command(subcommand)]
    Adapters(AdapterCommand),

    /// Serve the stub service over HTTP until interrupted.
    ServeStub {
        #[arg(long, default_value = "127.0.0.1:8808")]
        addr: SocketAddr,

        /// Polls a job stays IN_PROGRESS before completing.
        #[arg(long, default_value_t = 1)]
        polls: u32,
    },

    /// Show or create the config file.
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            config_path: self.config.clone(),
            endpoint: self.endpoint.clone(),
            region: self.region.clone(),
            stub: self.stub,
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

async fn run(cli: &Cli) -> Result<Value> {
    let options = cli.connect_options();
    let session = || Session::init(&options);
    match &cli.command {
        Command::Detect { input } => commands::detect(&session()?, input).await,
        Command::Analyze { input, analysis } => {
            commands::analyze(&session()?, input, analysis).await
        }
        Command::Expense { input } => commands::expense(&session()?, input).await,
        Command::Id { inputs } => commands::identity(&session()?, inputs).await,
        Command::Start(args) => commands::start(&session()?, args).await,
        Command::Wait { kind, job_id } => commands::wait(&session()?, *kind, job_id).await,
        Command::Results {
            kind,
            job_id,
            max_results,
        } => commands::results(&session()?, *kind, job_id, *max_results).await,
        Command::Adapters(command) => commands::adapters(&session()?, command).await,
        Command::ServeStub { addr, polls } => commands::serve_stub(*addr, *polls).await,
        Command::Config(command) => commands::config(&options, command),
    }
}

/// Exit status for a failed command: 75 (EX_TEMPFAIL) when a retry may
/// help, 2 when the input or config must change, 1 otherwise.
fn exit_status(severity: Severity) -> u8 {
    match severity {
        Severity::Transient => 75,
        Severity::ActionRequired => 2,
        Severity::Permanent => 1,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    tracing::debug!(command = ?cli.command, "textwerk starting");

    match run(&cli).await {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: could not render output: {e}");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            let human = humanize_error(&err);
            eprintln!("error: {}", human.message);
            eprintln!("hint: {}", human.suggestion);
            ExitCode::from(exit_status(human.severity))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_analyze_with_features_and_queries() {
        let cli = Cli::try_parse_from([
            "textwerk",
            "--stub",
            "analyze",
            "invoice.png",
            "--features",
            "tables,forms",
            "-q",
            "TOTAL=What is the total?",
        ])
        .expect("parse");
        assert!(cli.stub);
        let Command::Analyze { input, analysis } = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(input, Input::Local("invoice.png".into()));
        assert_eq!(analysis.features.len(), 2);
        assert_eq!(analysis.queries, vec!["TOTAL=What is the total?".to_owned()]);
    }

    #[test]
    fn parses_start_with_s3_input() {
        let cli = Cli::try_parse_from([
            "textwerk",
            "start",
            "expense",
            "s3://receipts/2026/march.pdf",
            "--token",
            "march",
            "--wait",
        ])
        .expect("parse");
        let Command::Start(args) = cli.command else {
            panic!("expected start");
        };
        assert_eq!(args.kind, JobKind::Expense);
        assert!(args.wait);
        assert!(matches!(args.input, Input::S3 { ref bucket, .. } if bucket == "receipts"));
    }

    #[test]
    fn rejects_unknown_feature_and_bad_s3_uri() {
        assert!(Cli::try_parse_from(["textwerk", "analyze", "a.png", "-f", "barcodes"]).is_err());
        assert!(Cli::try_parse_from(["textwerk", "detect", "s3://only-bucket"]).is_err());
    }

    #[test]
    fn identity_takes_at_most_two_pages() {
        assert!(Cli::try_parse_from(["textwerk", "id", "front.png", "back.png"]).is_ok());
        assert!(Cli::try_parse_from(["textwerk", "id", "a.png", "b.png", "c.png"]).is_err());
    }

    #[test]
    fn severities_map_to_distinct_exit_codes() {
        assert_eq!(exit_status(Severity::Transient), 75);
        assert_ne!(
            exit_status(Severity::ActionRequired),
            exit_status(Severity::Permanent)
        );
    }
}
