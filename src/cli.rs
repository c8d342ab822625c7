//! CLI commands for nuliga-sync.
//!
//! Every sync command is a dry run unless --apply is given; the report
//! shows what would change either way.

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::pipeline::Pipeline;
use crate::reconcile::{Outcome, SyncReport};

#[derive(Parser)]
#[command(name = "nuliga-sync")]
#[command(version, about = "Scrape the nuLiga portal and reconcile league data", long_about = None)]
pub struct Cli {
    /// Refetch pages even when a fresh cached copy exists
    #[arg(long, global = true)]
    pub refresh: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync a league group: standings and fixture plan
    SyncGroup {
        /// Portal group identifier (e.g. 035)
        #[arg(short, long)]
        group: String,

        /// Also fetch the meeting report of every played fixture
        #[arg(long)]
        with_results: bool,

        /// Championship override (e.g. "TVM Winter 2025/26")
        #[arg(short, long)]
        championship: Option<String>,

        /// Season label override (e.g. "Winter 2025/26")
        #[arg(short, long)]
        season: Option<String>,

        /// Write changes; without this flag the run is a dry run
        #[arg(long)]
        apply: bool,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Sync all fixtures of a club
    SyncClub {
        /// Portal club number (e.g. 36124)
        #[arg(long)]
        club: i64,

        #[arg(short, long)]
        championship: Option<String>,

        #[arg(short, long)]
        season: Option<String>,

        #[arg(long)]
        apply: bool,

        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Sync a team roster from its portrait page
    SyncRoster {
        /// Portal team-table identifier
        #[arg(long)]
        team: i64,

        #[arg(short, long)]
        championship: Option<String>,

        #[arg(short, long)]
        season: Option<String>,

        #[arg(long)]
        apply: bool,

        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Sync meeting reports by portal meeting id
    SyncResults {
        /// Meeting ids
        #[arg(value_name = "MEETING", required = true)]
        meetings: Vec<i64>,

        #[arg(short, long)]
        championship: Option<String>,

        #[arg(short, long)]
        season: Option<String>,

        #[arg(long)]
        apply: bool,

        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Search clubs by name on the portal
    SearchClub {
        /// Name or name fragment to search for
        #[arg(value_name = "NAME")]
        name: String,

        #[arg(short, long)]
        championship: Option<String>,

        #[arg(long)]
        apply: bool,

        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show row counts of the local database
    Stats {
        #[arg(short, long, default_value = "table")]
        format: String,
    },
}

/// Load config with CLI overrides applied.
fn load_config(championship: Option<String>, season: Option<String>) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load()?;
    if let Some(championship) = championship {
        config.portal.championship = championship;
    }
    if let Some(season) = season {
        config.sync.season = season;
    }
    Ok(config)
}

pub async fn run_sync_group(
    group: String,
    with_results: bool,
    championship: Option<String>,
    season: Option<String>,
    apply: bool,
    refresh: bool,
    format: String,
) -> anyhow::Result<()> {
    let config = load_config(championship, season)?;
    let pipeline = Pipeline::new(config, apply, refresh)?;
    let report = pipeline.sync_group(&group, with_results).await?;
    print_report(&report, apply, &format)
}

pub async fn run_sync_club(
    club: i64,
    championship: Option<String>,
    season: Option<String>,
    apply: bool,
    refresh: bool,
    format: String,
) -> anyhow::Result<()> {
    let config = load_config(championship, season)?;
    let pipeline = Pipeline::new(config, apply, refresh)?;
    let report = pipeline.sync_club(club).await?;
    print_report(&report, apply, &format)
}

pub async fn run_sync_roster(
    team: i64,
    championship: Option<String>,
    season: Option<String>,
    apply: bool,
    refresh: bool,
    format: String,
) -> anyhow::Result<()> {
    let config = load_config(championship, season)?;
    let pipeline = Pipeline::new(config, apply, refresh)?;
    let report = pipeline.sync_roster(team).await?;
    print_report(&report, apply, &format)
}

pub async fn run_sync_results(
    meetings: Vec<i64>,
    championship: Option<String>,
    season: Option<String>,
    apply: bool,
    refresh: bool,
    format: String,
) -> anyhow::Result<()> {
    let config = load_config(championship, season)?;
    let pipeline = Pipeline::new(config, apply, refresh)?;
    let report = pipeline.sync_results(&meetings).await?;
    print_report(&report, apply, &format)
}

pub async fn run_search_club(
    name: String,
    championship: Option<String>,
    apply: bool,
    refresh: bool,
    format: String,
) -> anyhow::Result<()> {
    let config = load_config(championship, None)?;
    let pipeline = Pipeline::new(config, apply, refresh)?;
    let (hits, report) = pipeline.search_clubs(&name).await?;

    match format.as_str() {
        "json" => {
            let output = serde_json::json!({
                "hits": hits,
                "report": report,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            println!("=== Clubs matching {:?} ===", name);
            for hit in &hits {
                println!(
                    "  {:<40} {:>8}  {}",
                    hit.name,
                    hit.club_number.map_or("-".to_string(), |n| n.to_string()),
                    hit.city.as_deref().unwrap_or("")
                );
            }
            println!();
            print_report(&report, apply, "table")?;
        }
    }
    Ok(())
}

pub fn run_stats(format: String) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let pipeline = Pipeline::new(config, false, false)?;
    let counts = pipeline.stats()?;

    match format.as_str() {
        "json" => {
            let output: serde_json::Map<String, serde_json::Value> = counts
                .into_iter()
                .map(|(table, count)| (table, serde_json::json!(count)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            println!("=== Database ===");
            for (table, count) in counts {
                println!("  {:<15} {:>7}", table, count);
            }
        }
    }
    Ok(())
}

/// Print a sync report in the requested format.
fn print_report(report: &SyncReport, apply: bool, format: &str) -> anyhow::Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(report)?),
        _ => print_report_table(report, apply),
    }
    Ok(())
}

fn print_report_table(report: &SyncReport, apply: bool) {
    if !apply {
        println!("DRY RUN - no changes written (use --apply to write)");
        println!();
    }

    println!("=== Summary ({} entities) ===", report.total());
    println!("  matched:   {:>5}", report.matched);
    println!("  created:   {:>5}", report.created);
    println!("  updated:   {:>5}", report.updated);
    println!("  skipped:   {:>5}", report.skipped);
    println!("  unmatched: {:>5}", report.unmatched);
    println!("  failed:    {:>5}", report.failed);
    println!();

    // Skipped items are noise; everything else is worth a line
    let notable: Vec<_> = report
        .items
        .iter()
        .filter(|item| item.outcome != Outcome::Skipped)
        .collect();
    if !notable.is_empty() {
        println!("=== Changes ===");
        for item in notable {
            match &item.detail {
                Some(detail) => println!(
                    "  {:<9} {:<8} {} ({})",
                    item.outcome.as_str(),
                    item.entity,
                    item.label,
                    detail
                ),
                None => println!(
                    "  {:<9} {:<8} {}",
                    item.outcome.as_str(),
                    item.entity,
                    item.label
                ),
            }
        }
        println!();
    }

    if !report.missing_players.is_empty() {
        println!("=== Missing players ===");
        for name in &report.missing_players {
            println!("  {}", name);
        }
        println!();
    }
}
