//! `status` command implementation.

use anyhow::{Context, Result};
use config_loader::LoadedConfig;
use contracts::BatchWriter;
use serde::Serialize;
use storage::{DatabaseStats, LatestPosition, SqlWriter};
use tracing::{info, warn};

use crate::cli::StatusArgs;

#[derive(Debug, Serialize)]
struct StatusReport {
    database: String,
    reachable: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing_tables: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    statistics: Option<DatabaseStats>,
    latest_positions: Vec<LatestPosition>,
}

/// Execute the `status` command
pub async fn run_status(args: &StatusArgs, loaded: LoadedConfig) -> Result<()> {
    let database = loaded.config.database;
    info!(database = %database.url, "Checking database status");

    let writer = SqlWriter::connect(&database)
        .await
        .with_context(|| format!("Failed to connect to database {}", database.url))?;
    let report = collect(&writer, database.url.clone(), args.limit).await;
    writer.close().await;
    let report = report?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize status report")?;
        println!("{}", json);
    } else {
        print_report(&report);
    }

    if report.reachable {
        Ok(())
    } else {
        anyhow::bail!("Database liveness probe failed")
    }
}

async fn collect(writer: &SqlWriter, database: String, limit: u32) -> Result<StatusReport> {
    let reachable = writer.ping().await;
    let missing_tables = writer
        .missing_tables()
        .await
        .context("Failed to inspect schema")?;

    // The views depend on every table
    if !missing_tables.is_empty() {
        warn!(missing = ?missing_tables, "Schema incomplete, skipping statistics");
        return Ok(StatusReport {
            database,
            reachable,
            missing_tables,
            statistics: None,
            latest_positions: Vec::new(),
        });
    }

    let statistics = writer
        .database_stats()
        .await
        .context("Failed to read statistics view")?;
    let latest_positions = writer
        .latest_positions(limit)
        .await
        .context("Failed to read latest positions view")?;

    Ok(StatusReport {
        database,
        reachable,
        missing_tables,
        statistics: Some(statistics),
        latest_positions,
    })
}

fn print_report(report: &StatusReport) {
    let health = if report.reachable { "✓ reachable" } else { "✗ unreachable" };
    println!("Database: {} ({})", report.database, health);

    if !report.missing_tables.is_empty() {
        println!("\n⚠ Missing tables: {}", report.missing_tables.join(", "));
        return;
    }

    if let Some(stats) = report.statistics {
        println!("\nStatistics");
        println!("   ├─ Aircraft: {}", stats.total_aircraft);
        println!("   ├─ Messages: {}", stats.total_messages);
        println!("   ├─ Positions: {}", stats.total_positions);
        println!("   ├─ Active aircraft (1h): {}", stats.active_aircraft_1h);
        println!("   └─ Messages (1h): {}", stats.messages_1h);
    }

    if report.latest_positions.is_empty() {
        println!("\nNo positions recorded");
        return;
    }

    println!("\nLatest positions");
    println!(
        "   {:<6}  {:<8}  {:<23}  {:>9}  {:>10}  {:>6}  {:>6}",
        "ICAO", "Callsign", "Seen", "Lat", "Lon", "Alt", "Speed"
    );
    for p in &report.latest_positions {
        println!(
            "   {:<6}  {:<8}  {:<23}  {:>9.4}  {:>10.4}  {:>6}  {:>6}",
            p.icao24,
            p.callsign.as_deref().unwrap_or("-"),
            p.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            p.lat,
            p.lon,
            p.altitude.map_or_else(|| "-".to_string(), |a| a.to_string()),
            p.ground_speed
                .map_or_else(|| "-".to_string(), |s| format!("{s:.0}")),
        );
    }
}
