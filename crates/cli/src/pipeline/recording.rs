//! Writer wrapper feeding committed reports into metrics and the run summary.

use std::sync::{Mutex, PoisonError};

use contracts::{Batch, BatchWriter, ContractError, WriteReport};
use observability::{WriteSummary, WriteSummaryAggregator};
use storage::SqlWriter;

pub struct RecordingWriter {
    inner: SqlWriter,
    summary: Mutex<WriteSummaryAggregator>,
}

impl RecordingWriter {
    pub fn new(inner: SqlWriter) -> Self {
        Self {
            inner,
            summary: Mutex::new(WriteSummaryAggregator::new()),
        }
    }

    pub fn inner(&self) -> &SqlWriter {
        &self.inner
    }

    pub fn summary(&self) -> WriteSummary {
        self.summary
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .summary()
    }
}

impl BatchWriter for RecordingWriter {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn write_batch(&self, batch: &Batch) -> Result<WriteReport, ContractError> {
        let report = self.inner.write_batch(batch).await?;
        observability::record_write_report(&report);
        self.summary
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update(&report);
        Ok(report)
    }

    async fn ping(&self) -> bool {
        self.inner.ping().await
    }
}
