//! SqlWriter - transactional batch writer over a SQLite pool
//!
//! One batch = one transaction, in referential order:
//! 1. upsert every distinct aircraft of the batch
//! 2. insert every message
//! 3. insert every message that carries both coordinates as a position
//!
//! Any failure rolls the whole batch back.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{
    Batch, BatchWriter, ContractError, DatabaseConfig, IdentitySummary, TelemetryMessage,
    TransactionState, WriteReport,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::error::{StorageError, WriteStage};
use crate::metrics::WriterMetrics;

/// Tables the writer expects to find
pub const REQUIRED_TABLES: [&str; 3] = ["aircraft", "messages", "positions"];

/// SQLite's lowest compiled-in bind parameter limit
const MAX_BIND_PARAMS: usize = 999;

const AIRCRAFT_COLUMNS: usize = 4;
const MESSAGE_COLUMNS: usize = 19;
const POSITION_COLUMNS: usize = 8;

/// Pooled transactional writer
#[derive(Debug, Clone)]
pub struct SqlWriter {
    name: String,
    pool: SqlitePool,
    acquire_timeout: Duration,
    metrics: Arc<WriterMetrics>,
}

impl SqlWriter {
    /// Open the pool, check connectivity and log what the store looks like
    ///
    /// Missing tables are reported as a warning; the writer never creates them.
    #[instrument(name = "storage_connect", skip(config), fields(url = %config.url, pool_size = config.pool_size))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(StorageError::Connection)?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(config.acquire_timeout())
            .connect_with(options)
            .await
            .map_err(StorageError::Connection)?;

        let writer = Self::from_pool(pool, config.acquire_timeout());
        writer.verify_schema().await?;
        Ok(writer)
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: SqlitePool, acquire_timeout: Duration) -> Self {
        Self {
            name: "sqlite".to_string(),
            pool,
            acquire_timeout,
            metrics: Arc::new(WriterMetrics::new()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn metrics(&self) -> Arc<WriterMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Names of [`REQUIRED_TABLES`] that do not exist
    pub async fn missing_tables(&self) -> Result<Vec<&'static str>, StorageError> {
        let present: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('aircraft', 'messages', 'positions')",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(REQUIRED_TABLES
            .into_iter()
            .filter(|table| !present.iter().any(|p| p.as_str() == *table))
            .collect())
    }

    async fn verify_schema(&self) -> Result<(), StorageError> {
        let version: String = sqlx::query_scalar("SELECT sqlite_version()")
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::Connection)?;
        info!(version = %version, "connected to database");

        let missing = self.missing_tables().await?;
        if !missing.is_empty() {
            warn!(
                missing = ?missing,
                "expected tables not found, provision schema/schema.sql"
            );
        }
        Ok(())
    }

    /// Persist one batch in a single transaction
    #[instrument(
        name = "storage_write_batch",
        skip(self, batch),
        fields(batch_id = batch.batch_id, size = batch.len())
    )]
    pub async fn write(&self, batch: &Batch) -> Result<WriteReport, StorageError> {
        let started = Instant::now();
        let mut state = TransactionState::Pending;
        trace!(%state, "batch received");

        let mut tx = self.pool.begin().await.map_err(|e| match e {
            sqlx::Error::PoolTimedOut => {
                self.metrics.record_pool_exhausted();
                StorageError::PoolExhausted {
                    waited: self.acquire_timeout,
                }
            }
            other => StorageError::Transaction {
                stage: WriteStage::Begin,
                source: other,
            },
        })?;
        state = TransactionState::InTransaction;
        trace!(%state, "transaction open");

        let outcome = match apply_batch(&mut *tx, batch).await {
            Ok(counts) => tx
                .commit()
                .await
                .map(|()| counts)
                .map_err(StorageError::at(WriteStage::Commit)),
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    error!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        };

        match outcome {
            Ok((identities, messages, positions)) => {
                state = TransactionState::Committed;
                self.metrics.record_commit(identities, messages, positions);
                debug!(%state, identities, messages, positions, "batch committed");
                Ok(WriteReport {
                    batch_id: batch.batch_id,
                    state,
                    identities,
                    messages,
                    positions,
                    elapsed: started.elapsed(),
                })
            }
            Err(e) => {
                state = TransactionState::RolledBack;
                self.metrics.record_rollback();
                warn!(%state, error = %e, "batch rolled back");
                Err(e)
            }
        }
    }

    /// Liveness probe: one trivial query on a pooled connection
    pub async fn check(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

impl BatchWriter for SqlWriter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write_batch(&self, batch: &Batch) -> Result<WriteReport, ContractError> {
        self.write(batch).await.map_err(ContractError::from)
    }

    async fn ping(&self) -> bool {
        match self.check().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "database ping failed");
                false
            }
        }
    }
}

/// Returns (identities, messages, positions)
async fn apply_batch(
    conn: &mut SqliteConnection,
    batch: &Batch,
) -> Result<(usize, usize, usize), StorageError> {
    let identities = batch.identities();
    upsert_identities(conn, &identities)
        .await
        .map_err(StorageError::at(WriteStage::UpsertIdentities))?;

    insert_messages(conn, &batch.messages)
        .await
        .map_err(StorageError::at(WriteStage::InsertMessages))?;

    let positions: Vec<&TelemetryMessage> = batch.positions().collect();
    insert_positions(conn, &positions)
        .await
        .map_err(StorageError::at(WriteStage::InsertPositions))?;

    Ok((identities.len(), batch.len(), positions.len()))
}

fn rows_per_statement(columns: usize) -> usize {
    (MAX_BIND_PARAMS / columns).max(1)
}

/// Insert new aircraft, or widen `first_seen`/`last_seen` and keep the
/// stored callsign unless a new one is supplied
async fn upsert_identities(
    conn: &mut SqliteConnection,
    identities: &[IdentitySummary],
) -> Result<(), sqlx::Error> {
    for chunk in identities.chunks(rows_per_statement(AIRCRAFT_COLUMNS)) {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO aircraft (icao24, callsign, first_seen, last_seen) ");
        qb.push_values(chunk, |mut row, identity| {
            row.push_bind(identity.icao24.as_str())
                .push_bind(identity.callsign.as_deref())
                .push_bind(identity.first_seen)
                .push_bind(identity.last_seen);
        });
        qb.push(
            " ON CONFLICT (icao24) DO UPDATE SET \
             callsign = COALESCE(excluded.callsign, aircraft.callsign), \
             first_seen = MIN(aircraft.first_seen, excluded.first_seen), \
             last_seen = MAX(aircraft.last_seen, excluded.last_seen)",
        );
        qb.build().execute(&mut *conn).await?;
    }
    Ok(())
}

async fn insert_messages(
    conn: &mut SqliteConnection,
    messages: &[TelemetryMessage],
) -> Result<(), sqlx::Error> {
    for chunk in messages.chunks(rows_per_statement(MESSAGE_COLUMNS)) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO messages (icao24, message_type, session_id, aircraft_id, flight_id, \
             timestamp, logged_at, callsign, altitude, ground_speed, track, lat, lon, \
             vertical_rate, squawk, alert, emergency, spi, is_on_ground) ",
        );
        qb.push_values(chunk, |mut row, msg| {
            row.push_bind(msg.icao24.as_str())
                .push_bind(msg.transmission_type.map(|t| i64::from(t.code())))
                .push_bind(msg.session_id)
                .push_bind(msg.aircraft_id)
                .push_bind(msg.flight_id)
                .push_bind(msg.timestamp)
                .push_bind(msg.logged_at)
                .push_bind(msg.callsign.as_deref())
                .push_bind(msg.altitude)
                .push_bind(msg.ground_speed)
                .push_bind(msg.track)
                .push_bind(msg.lat)
                .push_bind(msg.lon)
                .push_bind(msg.vertical_rate)
                .push_bind(msg.squawk.as_deref())
                .push_bind(msg.alert)
                .push_bind(msg.emergency)
                .push_bind(msg.spi)
                .push_bind(msg.is_on_ground);
        });
        qb.build().execute(&mut *conn).await?;
    }
    Ok(())
}

async fn insert_positions(
    conn: &mut SqliteConnection,
    positions: &[&TelemetryMessage],
) -> Result<(), sqlx::Error> {
    for chunk in positions.chunks(rows_per_statement(POSITION_COLUMNS)) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO positions (icao24, timestamp, lat, lon, altitude, ground_speed, \
             track, vertical_rate) ",
        );
        qb.push_values(chunk, |mut row, msg| {
            row.push_bind(msg.icao24.as_str())
                .push_bind(msg.timestamp)
                .push_bind(msg.lat)
                .push_bind(msg.lon)
                .push_bind(msg.altitude)
                .push_bind(msg.ground_speed)
                .push_bind(msg.track)
                .push_bind(msg.vertical_rate);
        });
        qb.build().execute(&mut *conn).await?;
    }
    Ok(())
}
