//! nuliga-sync
//!
//! Scrapes league, club, team, and meeting pages from the nuLiga tennis
//! portal and reconciles clubs, teams, fixtures, results, and players into
//! a local SQLite database without creating duplicates.

mod cli;
mod config;
mod error;
mod matcher;
mod normalize;
mod pipeline;
mod reconcile;
mod retry;
mod scraper;
mod storage;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nuliga_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let refresh = cli.refresh;

    match cli.command {
        Commands::SyncGroup {
            group,
            with_results,
            championship,
            season,
            apply,
            format,
        } => {
            cli::run_sync_group(group, with_results, championship, season, apply, refresh, format)
                .await
        }
        Commands::SyncClub {
            club,
            championship,
            season,
            apply,
            format,
        } => cli::run_sync_club(club, championship, season, apply, refresh, format).await,
        Commands::SyncRoster {
            team,
            championship,
            season,
            apply,
            format,
        } => cli::run_sync_roster(team, championship, season, apply, refresh, format).await,
        Commands::SyncResults {
            meetings,
            championship,
            season,
            apply,
            format,
        } => cli::run_sync_results(meetings, championship, season, apply, refresh, format).await,
        Commands::SearchClub {
            name,
            championship,
            apply,
            format,
        } => cli::run_search_club(name, championship, apply, refresh, format).await,
        Commands::Stats { format } => cli::run_stats(format),
    }
}
