// src/cli.rs
//! Command-line front end. Each subcommand maps to one session action and
//! prints its outcome as JSON on stdout.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use serde::Serialize;

use crate::auth::{CredentialProvider, EnvCredential, StaticCredential, Token};
use crate::config::consts::CONFIG_FILE;
use crate::config::{MatchMode, SyncOptions};
use crate::error::{Outcome, SyncError};
use crate::progress::LogProgress;
use crate::session::Session;
use crate::store::CsvRecordStore;
use crate::view::HtmlView;

#[derive(Parser)]
#[command(name = "attendance-sync")]
#[command(about = "Sync an attendance record with a live attendance table", long_about = None)]
#[command(version)]
pub struct Cli {
    /// JSON options file
    #[arg(short, long, default_value = CONFIG_FILE)]
    pub config: PathBuf,

    /// Credential token (default: environment)
    #[arg(long)]
    pub token: Option<String>,

    /// substring | reverse_substring | exact
    #[arg(long, value_parser = parse_match_mode)]
    pub match_mode: Option<MatchMode>,

    /// Record directory override
    #[arg(long)]
    pub record: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Acquire and cache a credential
    Authorize,
    /// Read and normalize the attendance table
    Load {
        /// Date used when the table is empty (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Mark attendance on a saved attendance page
    Apply {
        page: PathBuf,
    },
    /// Add the names on a saved attendance page to the roster
    Extract {
        page: PathBuf,
    },
    /// Print the roster
    Names {
        /// Alphabetical instead of discovery order
        #[arg(long)]
        sorted: bool,
    },
    /// Append roster names missing from the record
    Upload {
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Clear the roster (or everything with --all)
    Reset {
        #[arg(long)]
        all: bool,
    },
}

fn parse_match_mode(s: &str) -> Result<MatchMode, String> {
    MatchMode::parse(s).ok_or_else(|| format!("unknown match mode `{s}`"))
}

/// Static token from the command line, else the environment.
pub enum CliCredential {
    Static(StaticCredential),
    Env(EnvCredential),
}

impl CredentialProvider for CliCredential {
    async fn acquire(&mut self, interactive: bool) -> Result<Token, SyncError> {
        match self {
            CliCredential::Static(p) => p.acquire(interactive).await,
            CliCredential::Env(p) => p.acquire(interactive).await,
        }
    }
}

fn emit<T: Serialize>(out: &Outcome<T>) -> Result<bool> {
    println!("{}", serde_json::to_string_pretty(out)?);
    Ok(out.success)
}

fn today(arg: Option<NaiveDate>) -> NaiveDate {
    arg.unwrap_or_else(|| chrono::Local::now().date_naive())
}

/// Run one subcommand. Returns whether the action succeeded.
pub async fn run(cli: Cli) -> Result<bool> {
    let mut opts = SyncOptions::load(&cli.config)
        .wrap_err_with(|| format!("loading {}", cli.config.display()))?;
    if let Some(m) = cli.match_mode {
        opts.match_mode = m;
    }
    if let Some(r) = cli.record {
        opts.record_id = r;
    }

    let creds = match cli.token {
        Some(t) => CliCredential::Static(StaticCredential::new(Some(Token::new(t)?))),
        None => CliCredential::Env(EnvCredential::default()),
    };
    let mut session = Session::open(opts, creds, CsvRecordStore::default())?;

    match cli.command {
        Command::Authorize => emit(&session.authorize().await),
        Command::Load { today: t } => emit(&session.load_attendance(today(t)).await),
        Command::Apply { page } => {
            let mut view = HtmlView::from_file(&page)?;
            let out = session.apply_attendance(&mut view).await;
            logd!("Dispatched cells: {:?}", view.dispatched());
            emit(&out)
        }
        Command::Extract { page } => {
            let mut view = HtmlView::from_file(&page)?;
            emit(&session.extract_names(&mut view, &mut LogProgress).await)
        }
        Command::Names { sorted } => {
            if sorted {
                emit(&Outcome::ok(session.state().roster.sorted_for_display()))
            } else {
                emit(&session.extracted_names())
            }
        }
        Command::Upload { today: t } => emit(&session.send_names(today(t)).await),
        Command::Reset { all } => {
            if all { emit(&session.reset_all()) } else { emit(&session.reset_extraction()) }
        }
    }
}
