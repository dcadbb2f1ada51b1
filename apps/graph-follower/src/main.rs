mod client;
mod config;
mod session;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crate::config::FollowerConfig;
use dotenv::dotenv;
use follow_core::{setup_logger, AttemptLedger, FollowOrchestrator};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Follow accounts and their followers, once each",
    long_about = None
)]
struct Args {
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Show library debug output on the console
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Follow specific accounts and/or followers of one target account
    Run {
        /// Specific accounts to follow
        #[arg(long, num_args = 1..)]
        follow: Vec<String>,
        /// Target account to follow followers of
        #[arg(long)]
        target: Option<String>,
        /// Maximum users to follow from the target
        #[arg(long, requires = "target")]
        max: Option<usize>,
    },
    /// Show ledger statistics
    Stats,
    /// Clear failed entries so they are retried on the next run
    RetryFailed,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = setup_logger(args.verbose);
    dotenv().ok();

    let config = match FollowerConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:#}", e);
            return Err(e);
        }
    };
    let settings = &config.campaign.settings;

    // Maintenance commands never authenticate
    match &args.command {
        Some(Commands::Stats) => {
            let ledger = AttemptLedger::open_read_only(&settings.cache_file);
            println!("\nLedger Statistics:\n{}", ledger.stats());
            return Ok(());
        }
        Some(Commands::RetryFailed) => {
            let mut ledger = AttemptLedger::open(&settings.cache_file);
            let cleared = ledger.purge_failed();
            println!("Cleared {} failed entries", cleared);
            return Ok(());
        }
        _ => {}
    }

    let client = session::authenticate(&config)
        .await
        .context("Failed to login. Exiting.")?;

    let ledger = AttemptLedger::open(&settings.cache_file);
    let stats = ledger.stats();
    info!(
        "Ledger stats: {} total, {} followed, {} skipped, {} failed",
        stats.total, stats.followed, stats.skipped, stats.failed
    );

    let mut orchestrator = FollowOrchestrator::new(client, ledger, settings);

    match args.command {
        Some(Commands::Run {
            follow,
            target,
            max,
        }) if !follow.is_empty() || target.is_some() => {
            let mut total = 0;

            if !follow.is_empty() {
                let report = orchestrator.process_explicit_list(&follow).await;
                println!("Followed {} specific accounts", report.followed);
                total += report.followed;
            }

            if let Some(target) = target {
                let cap = max.unwrap_or(settings.max_followers_to_follow);
                let report = orchestrator.process_followers_of(&target, cap).await;
                println!(
                    "Followed {} users from {}'s followers",
                    report.followed, target
                );
                total += report.followed;
            }

            println!("\nTotal followed: {}", total);
            println!("\nLedger Statistics:\n{}", orchestrator.ledger().stats());
        }
        _ => {
            let summary = orchestrator.run_campaign(&config.campaign).await;
            info!("Run complete: {} followed", summary.total_followed);
        }
    }

    Ok(())
}
