use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod catalog;
mod config;
mod conflict;
mod models;
mod report;
mod request;
mod selection;

use crate::catalog::DataSet;
use crate::config::Settings;
use crate::models::{BatchId, Conflict};
use crate::selection::EditSession;

#[derive(Parser)]
#[command(name = "ya-enroll")]
#[command(about = "Batch enrollment checks for the Young Achievers console", long_about = None)]
struct Cli {
    /// Directory with batches.csv, levels.json and members.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the built-in fixtures to a directory
    Seed {
        #[arg(long, default_value = "fixtures")]
        out: PathBuf,
    },
    /// List batches in the catalog
    Batches {
        #[arg(long)]
        program: Option<String>,
    },
    /// Check a member's batches for level conflicts
    Check {
        #[arg(long)]
        member: String,
        /// Batch ids to check instead of the member's current enrollment
        #[arg(long, value_delimiter = ',')]
        select: Option<Vec<BatchId>>,
        #[arg(long)]
        json: bool,
    },
    /// Build and submit an enrollment change request for admin approval
    Request {
        #[arg(long)]
        member: String,
        #[arg(long, value_delimiter = ',')]
        add: Vec<BatchId>,
        #[arg(long, value_delimiter = ',')]
        remove: Vec<BatchId>,
        #[arg(long)]
        note: Option<String>,
        /// Simulated submission delay, overrides YA_SUBMIT_DELAY_MS
        #[arg(long)]
        delay_ms: Option<u64>,
        #[arg(long)]
        json: bool,
    },
    /// Write a markdown enrollment review
    Report {
        #[arg(long)]
        member: String,
        #[arg(long, default_value = "enrollment-review.md")]
        out: PathBuf,
    },
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    member_id: &'a str,
    selection: Vec<BatchId>,
    conflicts: &'a [Conflict],
    disabled: Vec<BatchId>,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_data(settings: &Settings) -> anyhow::Result<DataSet> {
    match &settings.data_dir {
        Some(dir) => catalog::load_dir(dir)
            .with_context(|| format!("failed to load data from {}", dir.display())),
        None => {
            info!("no data directory configured, using built-in seed data");
            Ok(catalog::seed())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command {
        Commands::Seed { out } => {
            catalog::write_dir(&catalog::seed(), &out)?;
            println!("Fixtures written to {}.", out.display());
        }
        Commands::Batches { program } => {
            let data = load_data(&settings.with_overrides(cli.data_dir, None))?;
            let batches: Vec<_> = data
                .catalog
                .batches
                .iter()
                .filter(|batch| program.as_deref().map_or(true, |p| batch.program == p))
                .collect();

            if batches.is_empty() {
                println!("No batches found.");
                return Ok(());
            }

            for batch in batches {
                let tracked = if data.catalog.levels.contains(&batch.program) {
                    ""
                } else {
                    " [untracked program]"
                };
                println!(
                    "- #{} {} ({} {}) {} {}{}",
                    batch.id,
                    batch.name,
                    batch.program,
                    batch.level,
                    batch.time,
                    batch.days.join("/"),
                    tracked
                );
            }
        }
        Commands::Check {
            member,
            select,
            json,
        } => {
            let data = load_data(&settings.with_overrides(cli.data_dir, None))?;
            let member = data
                .member(&member)
                .with_context(|| format!("no member with id {member}"))?;
            let session = match select {
                Some(ids) => {
                    EditSession::with_selection(&data.catalog, member, ids.into_iter().collect())
                }
                None => EditSession::open(&data.catalog, member),
            };
            let disabled = conflict::disabled_candidates(
                &data.catalog.batches,
                &data.catalog.levels,
                session.selection(),
            );

            if json {
                let output = CheckOutput {
                    member_id: &member.id,
                    selection: session.selection().iter().collect(),
                    conflicts: &session.report().conflicts,
                    disabled,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
                return Ok(());
            }

            if session.report().is_clear() {
                println!("No conflicts for {} ({}).", member.name, member.id);
            } else {
                println!("Conflicts for {} ({}):", member.name, member.id);
                for conflict in &session.report().conflicts {
                    println!(
                        "- {} [{}]: {}",
                        conflict.program,
                        conflict.levels.join(", "),
                        conflict.message
                    );
                }
            }
            if !disabled.is_empty() {
                let ids: Vec<String> = disabled.iter().map(|id| format!("#{id}")).collect();
                println!("Unavailable to add: {}", ids.join(", "));
            }
        }
        Commands::Request {
            member,
            add,
            remove,
            note,
            delay_ms,
            json,
        } => {
            let settings = settings.with_overrides(cli.data_dir, delay_ms);
            let data = load_data(&settings)?;
            let member = data
                .member(&member)
                .with_context(|| format!("no member with id {member}"))?;
            let mut session = EditSession::open(&data.catalog, member);

            session.apply(&remove, &add)?;

            let request = session.into_request(note)?;
            let receipt = request::submit(&request, settings.submit_delay).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&request)?);
            } else {
                println!(
                    "Request {} for {} submitted at {}, pending admin approval.",
                    receipt.request_id,
                    request.member_name,
                    receipt.submitted_at.format("%Y-%m-%d %H:%M UTC")
                );
            }
        }
        Commands::Report { member, out } => {
            let data = load_data(&settings.with_overrides(cli.data_dir, None))?;
            let member = data
                .member(&member)
                .with_context(|| format!("no member with id {member}"))?;
            let session = EditSession::open(&data.catalog, member);
            let report = report::build_report(&data.catalog, &session);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
