use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use base64::Engine as _;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};

mod cache;
mod config;
mod csv_line;
mod error;
mod fetch;
mod mapper;
mod models;
mod report;
mod stats;
mod temporal;

use cache::{CachedClient, SystemClock};
use fetch::HttpFetcher;
use models::{AssetRequest, Dashboard};

#[derive(Parser)]
#[command(name = "sheet-pipeline")]
#[command(about = "CSV ingestion and analytics pipeline for the department dashboards", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every sheet-reading subcommand.
#[derive(Args)]
struct SourceArgs {
    #[arg(long, value_enum)]
    dashboard: Dashboard,
    /// Override the dashboard's SHEET_URL_* environment variable.
    #[arg(long)]
    url: Option<String>,
    #[arg(long, default_value_t = 300)]
    ttl_secs: u64,
    /// Clear the cache entry first, forcing a fresh fetch.
    #[arg(long)]
    refresh: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a dashboard sheet and show its typed records
    Fetch {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        json: bool,
    },
    /// Compute the dashboard's aggregate statistics
    Stats {
        #[command(flatten)]
        source: SourceArgs,
        /// Restrict to one ISO week of the current ISO year
        #[arg(long)]
        week: Option<u32>,
        #[arg(long)]
        json: bool,
    },
    /// Show record counts per ISO week, including undated records
    Weekly {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Submit an asset request to the submission endpoint
    Submit {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        department: String,
        #[arg(long)]
        asset: String,
        #[arg(long)]
        reason: String,
        /// PNG signature file, sent as a data URL
        #[arg(long)]
        signature: Option<PathBuf>,
        /// Override the ASSET_REQUEST_URL environment variable
        #[arg(long)]
        url: Option<String>,
    },
}

async fn fetch_batch(
    client: &CachedClient,
    source: &SourceArgs,
) -> anyhow::Result<Arc<models::RecordBatch>> {
    let url = config::source_url(source.dashboard, source.url.as_deref())?;
    let key = format!("{}:{url}", source.dashboard.label());
    if source.refresh {
        client.clear(&key);
    }
    let batch = client
        .fetch_with_cache(
            &url,
            source.dashboard,
            &key,
            Duration::from_secs(source.ttl_secs),
        )
        .await
        .map_err(|err| anyhow::anyhow!("{err} ({})", err.hint()))?;
    Ok(batch)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let client = CachedClient::new(Arc::new(HttpFetcher::new()), Arc::new(SystemClock));

    match cli.command {
        Commands::Fetch { source, json } => {
            let batch = fetch_batch(&client, &source).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(batch.as_ref())?);
            } else if batch.is_empty() {
                println!("No {} records in the sheet.", source.dashboard.label());
            } else {
                println!(
                    "Fetched {} {} records.",
                    batch.len(),
                    source.dashboard.label()
                );
            }
        }
        Commands::Stats { source, week, json } => {
            let batch = fetch_batch(&client, &source).await?;
            let snapshot = match week {
                Some(week) => {
                    let (_, year) = temporal::iso_week_year(Utc::now().date_naive());
                    stats::compute_stats(&stats::filter_to_week(&batch, year, week))
                }
                None => stats::compute_stats(&batch),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_snapshot(&snapshot);
            }
        }
        Commands::Weekly { source } => {
            let batch = fetch_batch(&client, &source).await?;
            let (weeks, undated) = stats::weekly_counts(&batch);
            println!(
                "Current ISO week: {}",
                temporal::iso_week(Utc::now().date_naive())
            );
            if weeks.is_empty() && undated == 0 {
                println!("No dated records for this dashboard.");
                return Ok(());
            }
            for ((year, week), count) in &weeks {
                println!("{year} W{week:02}: {count}");
            }
            if undated > 0 {
                println!("Undated: {undated}");
            }
        }
        Commands::Report { source, out } => {
            let batch = fetch_batch(&client, &source).await?;
            let report = report::build_report(&batch);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Submit {
            name,
            email,
            department,
            asset,
            reason,
            signature,
            url,
        } => {
            let endpoint = config::submit_url(url.as_deref())?;
            let signature = match signature {
                Some(path) => {
                    let bytes = std::fs::read(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
                    Some(format!("data:image/png;base64,{encoded}"))
                }
                None => None,
            };
            let request = AssetRequest {
                name,
                email,
                department,
                asset,
                reason,
                signature,
            };
            let response =
                fetch::submit_asset_request(&reqwest::Client::new(), &endpoint, &request)
                    .await
                    .map_err(|err| anyhow::anyhow!("{err} ({})", err.hint()))?;
            if response.success {
                println!(
                    "Request accepted: {}.",
                    response.request_id.as_deref().unwrap_or("no id returned")
                );
            } else {
                println!(
                    "Request rejected: {}.",
                    response.message.as_deref().unwrap_or("no reason given")
                );
            }
        }
    }

    Ok(())
}

fn print_snapshot(snapshot: &models::StatsSnapshot) {
    match snapshot {
        models::StatsSnapshot::Sales(stats) => {
            println!(
                "{} leads, {} converted ({}% conversion)",
                stats.total, stats.converted, stats.conversion_rate
            );
            print_group("by status", &stats.by_status);
            print_group("by source", &stats.by_source);
        }
        models::StatsSnapshot::It(stats) => {
            println!(
                "{} tickets, {} resolved ({}% completion, {}% satisfaction), avg resolution {}",
                stats.total,
                stats.resolved,
                stats.completion_rate,
                stats.satisfaction_rate,
                stats.avg_resolution
            );
            print_group("by status", &stats.by_status);
            print_group("by technician", &stats.by_technician);
            print_group("by category", &stats.by_category);
        }
        models::StatsSnapshot::Dpo(stats) => {
            println!(
                "{} lead groups ({} items), {} resolved / {} pending / {} overdue, {}% complete",
                stats.total,
                stats.item_count,
                stats.resolved,
                stats.pending,
                stats.overdue,
                stats.completion_rate
            );
            print_group("by status", &stats.by_status);
        }
        models::StatsSnapshot::Payroll(stats) => {
            println!(
                "{} concerns, {} resolved ({}%), {} pending, {} overdue",
                stats.total, stats.resolved, stats.resolution_rate, stats.pending, stats.overdue
            );
            print_group("by status", &stats.by_status);
            print_group("by type", &stats.by_concern_type);
        }
        models::StatsSnapshot::Bonus(stats) => {
            println!(
                "{} profiles, monthly total {} (avg {}), quarterly total {}",
                stats.total, stats.total_monthly, stats.avg_monthly, stats.total_quarterly
            );
            print_group("by department", &stats.by_department);
        }
    }
}

fn print_group(title: &str, counts: &std::collections::BTreeMap<String, usize>) {
    if counts.is_empty() {
        return;
    }
    println!("{title}:");
    for (label, count) in counts {
        println!("  {label}: {count}");
    }
}
