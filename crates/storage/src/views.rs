//! Read side: the two derived views

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::StorageError;
use crate::writer::SqlWriter;

/// Row of the `statistics` view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DatabaseStats {
    pub total_aircraft: i64,
    pub total_messages: i64,
    pub total_positions: i64,
    /// Aircraft whose `last_seen` is within the last hour
    pub active_aircraft_1h: i64,
    /// Messages whose event time is within the last hour
    pub messages_1h: i64,
}

/// Row of the `latest_positions` view
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct LatestPosition {
    pub icao24: String,
    pub callsign: Option<String>,
    pub timestamp: NaiveDateTime,
    pub lat: f64,
    pub lon: f64,
    pub altitude: Option<i32>,
    pub ground_speed: Option<f64>,
    pub track: Option<f64>,
    pub vertical_rate: Option<i32>,
}

impl SqlWriter {
    /// Aggregate counts
    pub async fn database_stats(&self) -> Result<DatabaseStats, StorageError> {
        let stats = sqlx::query_as::<_, DatabaseStats>(
            "SELECT total_aircraft, total_messages, total_positions, active_aircraft_1h, messages_1h \
             FROM statistics",
        )
        .fetch_one(self.pool())
        .await?;
        Ok(stats)
    }

    /// Most recent position per aircraft, newest first
    pub async fn latest_positions(&self, limit: u32) -> Result<Vec<LatestPosition>, StorageError> {
        let rows = sqlx::query_as::<_, LatestPosition>(
            "SELECT icao24, callsign, timestamp, lat, lon, altitude, ground_speed, track, vertical_rate \
             FROM latest_positions ORDER BY timestamp DESC, icao24 LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}
