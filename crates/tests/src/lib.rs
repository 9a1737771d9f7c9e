//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - configuration round trip into the stage configs
//! - fake TCP feed → source → decoder → accumulator → SQLite

#[cfg(test)]
mod contract_tests {
    use std::time::Duration;

    use accumulator::AccumulatorConfig;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::ServiceConfig;
    use ingestion::SourceConfig;

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let toml = ConfigLoader::to_toml(&ServiceConfig::default()).unwrap();
        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.feed.endpoint(), "localhost:30003");
        assert_eq!(config.processing.batch_size, 100);
    }

    #[test]
    fn test_stage_configs_follow_service_config() {
        let config = ConfigLoader::load_from_str(
            r#"
            [feed]
            reconnect_interval_s = 2
            max_reconnect_interval_s = 30
            read_timeout_s = 3

            [processing]
            batch_size = 50
            batch_timeout_s = 0.5
            enable_deduplication = false
            "#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let source = SourceConfig::from(&config.feed);
        assert_eq!(source.initial_backoff, Duration::from_secs(2));
        assert_eq!(source.max_backoff, Duration::from_secs(30));
        assert_eq!(source.read_timeout, Duration::from_secs(3));

        let accumulator = AccumulatorConfig::from(&config.processing);
        assert_eq!(accumulator.batch_size, 50);
        assert_eq!(accumulator.max_age, Duration::from_millis(500));
        assert_eq!(accumulator.dedup_capacity, None);
        assert_eq!(accumulator.max_pending_batches, 2);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use accumulator::{Accumulator, AccumulatorConfig, Admission, DEFAULT_MAX_PENDING_BATCHES};
    use async_channel::Receiver;
    use chrono::NaiveDateTime;
    use contracts::DatabaseConfig;
    use ingestion::{decode_line, ChannelHandler, Decoded, FeedSource, SourceConfig, TcpConnector};
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use storage::SqlWriter;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    const MSG_LINE: &str = "MSG,3,1,1,4CA123,1,2024/01/01,12:00:00.000,2024/01/01,12:00:00.000,ABC123,35000,450.0,180.0,51.5,-0.1,0,,0,0,0,0";
    const IDENT_LINE: &str = "MSG,1,1,1,40621D,1,2024/01/01,12:00:05.000,2024/01/01,12:00:05.000,BAW12,,,,,,,,,,,0";

    /// SQLite file provisioned with the schema, opened through the writer
    async fn provisioned_writer(dir: &Path) -> SqlWriter {
        let path = dir.join("adsb.db");
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        sqlx::raw_sql(storage::SCHEMA_SQL).execute(&pool).await.unwrap();
        pool.close().await;

        let config = DatabaseConfig {
            url: format!("sqlite://{}", path.display()),
            pool_size: 2,
            ..Default::default()
        };
        SqlWriter::connect(&config).await.unwrap()
    }

    fn fast_source(port: u16) -> FeedSource<TcpConnector> {
        FeedSource::new(
            TcpConnector::new(format!("127.0.0.1:{port}"), Duration::from_secs(1)),
            SourceConfig {
                initial_backoff: Duration::from_millis(50),
                max_backoff: Duration::from_millis(400),
                read_timeout: Duration::from_millis(200),
            },
        )
    }

    /// Receive `n` lines and submit every transmission
    async fn pump(
        lines: &Receiver<String>,
        accumulator: &Accumulator<SqlWriter>,
        n: usize,
    ) -> Vec<Admission> {
        let mut admissions = Vec::new();
        for _ in 0..n {
            let line = tokio::time::timeout(Duration::from_secs(5), lines.recv())
                .await
                .expect("feed line not delivered in time")
                .unwrap();
            if let Decoded::Transmission(msg) = decode_line(&line).unwrap() {
                admissions.push(accumulator.submit(msg).await);
            }
        }
        admissions
    }

    async fn count(writer: &SqlWriter, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(writer.pool())
            .await
            .unwrap()
    }

    /// End-to-end: one transmission line and its retransmission
    ///
    /// 1. The fake feed sends the same MSG line twice
    /// 2. The accumulator admits one and discards the duplicate
    /// 3. The shutdown flush commits one aircraft, one message, one position
    #[tokio::test]
    async fn test_e2e_duplicate_persisted_once() {
        let dir = tempfile::tempdir().unwrap();
        let writer = Arc::new(provisioned_writer(dir.path()).await);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let feed = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let payload = format!("{MSG_LINE}\r\n{MSG_LINE}\r\n");
            stream.write_all(payload.as_bytes()).await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let accumulator = Accumulator::new(
            Arc::clone(&writer),
            AccumulatorConfig {
                batch_size: 100,
                max_age: Duration::from_secs(30),
                dedup_capacity: Some(1000),
                max_pending_batches: DEFAULT_MAX_PENDING_BATCHES,
            },
        );

        let cancel = CancellationToken::new();
        let (mut handler, lines) = ChannelHandler::bounded(16);
        let mut source = fast_source(port);
        let source_task = tokio::spawn({
            let cancel = cancel.clone();
            async move { source.run(&mut handler, cancel).await }
        });

        let admissions = pump(&lines, &accumulator, 2).await;
        assert_eq!(admissions, vec![Admission::Admitted, Admission::Duplicate]);

        cancel.cancel();
        source_task.await.unwrap();
        feed.abort();

        // Nothing reached the size or age trigger; the forced flush writes it
        assert_eq!(accumulator.stats().batches_flushed, 0);
        let stats = accumulator.shutdown().await;
        assert_eq!(stats.received, 2);
        assert_eq!(stats.admitted, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.batches_flushed, 1);
        assert_eq!(stats.write_errors, 0);
        assert_eq!(stats.records_written, 1);

        let aircraft: Vec<(String, Option<String>, NaiveDateTime, NaiveDateTime)> =
            sqlx::query_as("SELECT icao24, callsign, first_seen, last_seen FROM aircraft")
                .fetch_all(writer.pool())
                .await
                .unwrap();
        assert_eq!(aircraft.len(), 1);
        let (icao24, callsign, first_seen, last_seen) = &aircraft[0];
        assert_eq!(icao24, "4CA123");
        assert_eq!(callsign.as_deref(), Some("ABC123"));
        assert_eq!(first_seen, last_seen);
        assert_eq!(first_seen.to_string(), "2024-01-01 12:00:00");

        let (message_type, altitude): (Option<i64>, Option<i64>) =
            sqlx::query_as("SELECT message_type, altitude FROM messages")
                .fetch_one(writer.pool())
                .await
                .unwrap();
        assert_eq!(message_type, Some(3));
        assert_eq!(altitude, Some(35000));
        assert_eq!(count(&writer, "messages").await, 1);

        let (lat, lon): (f64, f64) = sqlx::query_as("SELECT lat, lon FROM positions")
            .fetch_one(writer.pool())
            .await
            .unwrap();
        assert!((lat - 51.5).abs() < 1e-9);
        assert!((lon + 0.1).abs() < 1e-9);
        assert_eq!(count(&writer, "positions").await, 1);

        writer.close().await;
    }

    /// The source reconnects after the feed drops and the pipeline keeps going
    #[tokio::test]
    async fn test_e2e_reconnect_after_feed_drop() {
        let dir = tempfile::tempdir().unwrap();
        let writer = Arc::new(provisioned_writer(dir.path()).await);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let feed = tokio::spawn(async move {
            let (mut first, _) = listener.accept().await.unwrap();
            first
                .write_all(format!("{MSG_LINE}\n").as_bytes())
                .await
                .unwrap();
            drop(first);

            let (mut second, _) = listener.accept().await.unwrap();
            second
                .write_all(format!("{IDENT_LINE}\n").as_bytes())
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        // Two distinct records fill the batch
        let accumulator = Accumulator::new(
            Arc::clone(&writer),
            AccumulatorConfig {
                batch_size: 2,
                max_age: Duration::from_secs(30),
                dedup_capacity: Some(1000),
                max_pending_batches: DEFAULT_MAX_PENDING_BATCHES,
            },
        );

        let cancel = CancellationToken::new();
        let (mut handler, lines) = ChannelHandler::bounded(16);
        let mut source = fast_source(port);
        let source_metrics = source.metrics();
        let source_task = tokio::spawn({
            let cancel = cancel.clone();
            async move { source.run(&mut handler, cancel).await }
        });

        let admissions = pump(&lines, &accumulator, 2).await;
        assert_eq!(admissions, vec![Admission::Admitted, Admission::Admitted]);

        accumulator.wait_idle().await;
        assert_eq!(accumulator.stats().batches_flushed, 1);

        cancel.cancel();
        source_task.await.unwrap();
        feed.abort();

        let snapshot = source_metrics.snapshot();
        assert_eq!(snapshot.connections_established, 2);
        assert!(snapshot.disconnects >= 1);

        let stats = accumulator.shutdown().await;
        assert_eq!(stats.records_written, 2);
        assert_eq!(count(&writer, "aircraft").await, 2);
        assert_eq!(count(&writer, "messages").await, 2);
        // The identification message carries no coordinates
        assert_eq!(count(&writer, "positions").await, 1);

        let db = writer.database_stats().await.unwrap();
        assert_eq!(db.total_aircraft, 2);
        assert_eq!(db.total_positions, 1);

        writer.close().await;
    }
}
