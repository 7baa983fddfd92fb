//! One-shot command-line front end
//!
//! Exactly one action flag per invocation:
//!   certstore -add -serial SN001 -signer AcmeCA -components bootloader,kernel
//!   certstore -check -serial SN001
//!   certstore -show -serial SN001
//!   certstore -list
//!   certstore -stats
//!
//! Single-dash long flags are accepted alongside `--flag`.

use std::path::PathBuf;
use anyhow::Context;
use chrono::Utc;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use crate::certificate::{Certificate, SchemaProfile, split_components};
use crate::config::{self, CLI_DATABASE};
use crate::storage::{CertificateStore, StoreStats};
use crate::ui::{self, Icons};
use crate::{Error, Result, logging};

/// Exit status for argument errors and repository failures
pub const EXIT_FAILURE: u8 = 1;

#[derive(Parser, Debug)]
#[command(name = "certstore")]
#[command(version)]
#[command(about = "Record and query certificate metadata in a local SQLite store")]
pub struct Cli {
    /// Add a certificate (requires -serial, -signer and -components)
    #[arg(long)]
    pub add: bool,

    /// Check whether a certificate exists (requires -serial)
    #[arg(long)]
    pub check: bool,

    /// Show one certificate with its validity (requires -serial)
    #[arg(long)]
    pub show: bool,

    /// List all stored certificates
    #[arg(long)]
    pub list: bool,

    /// Show store statistics
    #[arg(long)]
    pub stats: bool,

    /// Certificate serial number
    #[arg(long, allow_hyphen_values = true)]
    pub serial: Option<String>,

    /// Issuing authority
    #[arg(long, allow_hyphen_values = true)]
    pub signer: Option<String>,

    /// Comma-separated component names
    #[arg(long, allow_hyphen_values = true)]
    pub components: Option<String>,

    /// Path to the database file (default: certificates.db)
    #[arg(long, allow_hyphen_values = true)]
    pub db: Option<PathBuf>,

    /// Path to the config file (default: certstore.toml)
    #[arg(long, allow_hyphen_values = true)]
    pub config: Option<PathBuf>,

    /// Schema profile: basic or dated (default: basic)
    #[arg(long)]
    pub profile: Option<SchemaProfile>,

    /// Emit JSON instead of human-readable output
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Long flag names that may also be written with a single dash
const LONG_FLAGS: &[&str] = &[
    "add", "check", "show", "list", "stats", "serial", "signer", "components", "db", "config",
    "profile", "json", "verbose", "help", "version",
];

/// Flags whose next argument is their value
const VALUE_FLAGS: &[&str] = &["serial", "signer", "components", "db", "config", "profile"];

/// Rewrite `-serial X` style flags to `--serial X`. The program name, values
/// of flags and unknown single-dash arguments are left alone.
pub fn normalize_flags<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut expects_value = false;
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            if i == 0 {
                return arg;
            }
            if expects_value {
                expects_value = false;
                return arg;
            }
            match arg.strip_prefix("--").or_else(|| arg.strip_prefix('-')) {
                Some(rest) if !rest.is_empty() => {
                    let (name, inline_value) = match rest.split_once('=') {
                        Some((name, _)) => (name, true),
                        None => (rest, false),
                    };
                    if !LONG_FLAGS.contains(&name) {
                        return arg;
                    }
                    expects_value = !inline_value && VALUE_FLAGS.contains(&name);
                    if arg.starts_with("--") {
                        arg
                    } else {
                        format!("-{}", arg)
                    }
                }
                _ => arg,
            }
        })
        .collect()
}

/// Usage line printed after argument errors
pub fn usage() -> String {
    let usage = Cli::command().render_usage().to_string();
    format!("{}\n\nRun with -help for the full flag list.", usage)
}

/// What a validated invocation will do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Add {
        serial_number: String,
        signer: String,
        components: String,
    },
    Check {
        serial_number: String,
    },
    Show {
        serial_number: String,
    },
    List,
    Stats,
}

impl Action {
    /// Name used in JSON envelopes
    pub fn command(&self) -> &'static str {
        match self {
            Action::Add { .. } => "add",
            Action::Check { .. } => "check",
            Action::Show { .. } => "show",
            Action::List => "list",
            Action::Stats => "stats",
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            Action::Add { .. } => "add certificate",
            Action::Check { .. } => "check certificate",
            Action::Show { .. } => "show certificate",
            Action::List => "list certificates",
            Action::Stats => "read store statistics",
        }
    }
}

fn required(value: &Option<String>, flag: &str, action: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(Error::InvalidArgument(format!("-{} requires a non-empty -{}", action, flag))),
    }
}

impl Cli {
    /// Validate the flag combination into a single action
    pub fn action(&self) -> Result<Action> {
        let selected = [self.add, self.check, self.show, self.list, self.stats]
            .iter()
            .filter(|set| **set)
            .count();
        if selected == 0 {
            return Err(Error::InvalidArgument(
                "one of -add, -check, -show, -list or -stats is required".to_string(),
            ));
        }
        if selected > 1 {
            return Err(Error::InvalidArgument(
                "-add, -check, -show, -list and -stats are mutually exclusive".to_string(),
            ));
        }

        if self.add {
            let components = required(&self.components, "components", "add")?;
            if split_components(&components).is_empty() {
                return Err(Error::InvalidArgument(
                    "-components must name at least one component".to_string(),
                ));
            }
            Ok(Action::Add {
                serial_number: required(&self.serial, "serial", "add")?,
                signer: required(&self.signer, "signer", "add")?,
                components,
            })
        } else if self.check {
            Ok(Action::Check {
                serial_number: required(&self.serial, "serial", "check")?,
            })
        } else if self.show {
            Ok(Action::Show {
                serial_number: required(&self.serial, "serial", "show")?,
            })
        } else if self.list {
            Ok(Action::List)
        } else {
            Ok(Action::Stats)
        }
    }

    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        matches!(self, OutputMode::Human)
    }
}

/// Result of a single repository call
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Added { serial_number: String },
    Checked { serial_number: String, exists: bool },
    Shown { serial_number: String, certificate: Option<Certificate> },
    Listed(Vec<Certificate>),
    Stats(StoreStats),
}

/// Perform exactly one repository call for `action`
pub fn execute(store: &CertificateStore, action: &Action) -> Result<Outcome> {
    match action {
        Action::Add {
            serial_number,
            signer,
            components,
        } => {
            store.insert_certificate_raw(serial_number, signer, components)?;
            Ok(Outcome::Added {
                serial_number: serial_number.clone(),
            })
        }
        Action::Check { serial_number } => Ok(Outcome::Checked {
            serial_number: serial_number.clone(),
            exists: store.certificate_exists(serial_number)?,
        }),
        Action::Show { serial_number } => Ok(Outcome::Shown {
            serial_number: serial_number.clone(),
            certificate: store.get_certificate(serial_number)?,
        }),
        Action::List => Ok(Outcome::Listed(store.get_certificates()?)),
        Action::Stats => Ok(Outcome::Stats(store.stats()?)),
    }
}

pub fn emit_success(command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    let envelope = serde_json::json!({
        "ok": true,
        "command": command,
        "data": data,
    });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

/// JSON envelope reporting a failed command
pub fn error_envelope(command: &str, message: &str) -> serde_json::Value {
    serde_json::json!({
        "ok": false,
        "command": command,
        "error": message,
    })
}

pub fn emit_failure(command: &str, message: &str) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&error_envelope(command, message))?);
    Ok(())
}

fn print_missing(serial_number: &str) {
    println!(
        "{} Certificate {} does not exist.",
        Icons::SEARCH,
        serial_number.style(ui::theme().dim.clone())
    );
}

/// Print an outcome in the requested mode
pub fn render(outcome: &Outcome, mode: OutputMode) -> anyhow::Result<()> {
    match (outcome, mode) {
        (Outcome::Added { serial_number }, OutputMode::Human) => {
            ui::success(&format!("Certificate {} added.", serial_number));
        }
        (Outcome::Added { serial_number }, OutputMode::Json) => {
            emit_success("add", serde_json::json!({ "serial_number": serial_number }))?;
        }
        (Outcome::Checked { serial_number, exists }, OutputMode::Human) => {
            if *exists {
                ui::success(&format!("Certificate {} exists.", serial_number));
            } else {
                print_missing(serial_number);
            }
        }
        (Outcome::Checked { serial_number, exists }, OutputMode::Json) => {
            emit_success(
                "check",
                serde_json::json!({ "serial_number": serial_number, "exists": exists }),
            )?;
        }
        (Outcome::Shown { serial_number, certificate }, OutputMode::Human) => match certificate {
            Some(cert) => {
                println!("{}", ui::certificate_table(std::slice::from_ref(cert)));
                if cert.is_expired_at(Utc::now()) {
                    ui::error(&format!("Certificate {} has expired.", serial_number));
                }
            }
            None => print_missing(serial_number),
        },
        (Outcome::Shown { serial_number, certificate }, OutputMode::Json) => {
            let expired = certificate.as_ref().map(|c| c.is_expired_at(Utc::now()));
            emit_success(
                "show",
                serde_json::json!({
                    "serial_number": serial_number,
                    "certificate": certificate,
                    "expired": expired,
                }),
            )?;
        }
        (Outcome::Listed(certs), OutputMode::Human) => {
            if certs.is_empty() {
                ui::info("Certificates", "none stored");
            } else {
                println!("{}", ui::certificate_table(certs));
            }
        }
        (Outcome::Listed(certs), OutputMode::Json) => {
            emit_success("list", serde_json::to_value(certs)?)?;
        }
        (Outcome::Stats(stats), OutputMode::Human) => {
            println!("{}", stats);
        }
        (Outcome::Stats(stats), OutputMode::Json) => {
            emit_success("stats", serde_json::to_value(stats)?)?;
        }
    }
    Ok(())
}

/// Open the store, perform `action`, render it and close the store.
pub fn run(cli: &Cli, action: &Action) -> anyhow::Result<()> {
    let config = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let database = config.resolve_database(cli.db.as_deref(), CLI_DATABASE);
    let profile = config.resolve_profile(cli.profile, SchemaProfile::Basic);

    config::ensure_db_dir(&database)?;
    let store = CertificateStore::open(&database, profile)
        .with_context(|| format!("Failed to initialize database {}", database.display()))?;
    if cli.output_mode().is_human() && cli.verbose {
        ui::info(&format!("{} Database", Icons::DATABASE), &database.display().to_string());
    }

    let outcome = execute(&store, action).with_context(|| format!("Failed to {}", action.verb()))?;
    render(&outcome, cli.output_mode())?;
    store.close()?;
    Ok(())
}

/// Whole one-shot invocation: parse, validate, run. Returns the exit status.
///
/// Argument errors print usage and return [`EXIT_FAILURE`] before the
/// database is opened.
pub fn run_with_args<I>(args: I) -> u8
where
    I: IntoIterator<Item = String>,
{
    let cli = match Cli::try_parse_from(normalize_flags(args)) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return 0;
        }
        Err(e) => {
            let _ = e.print();
            return EXIT_FAILURE;
        }
    };

    logging::init(cli.verbose);

    let action = match cli.action() {
        Ok(action) => action,
        Err(e) => {
            ui::error(&e.to_string());
            eprintln!("{}", usage());
            return EXIT_FAILURE;
        }
    };

    match run(&cli, &action) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("{:#}", e);
            if cli.output_mode().is_human() {
                ui::error(&format!("{:#}", e));
            } else if let Err(emit) = emit_failure(action.command(), &format!("{:#}", e)) {
                tracing::error!("Failed to write JSON error: {}", emit);
            }
            EXIT_FAILURE
        }
    }
}
