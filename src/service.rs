//! Run Orchestrator: validate the operator's inputs, read the range,
//! synchronize rows through the relay, write the range back, report.

use std::sync::Arc;

use blob_store::{BlobStorage, BucketName, BucketNameError};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    config::Config,
    data_model::{range_expr, ColumnRef, InvalidColumnLabel},
    fetch::{HttpFetcher, ResourceFetcher},
    relay::ResourceRelay,
    sheets::{GoogleSheetsClient, SheetError, SpreadsheetBackend},
    sync::{synchronize_rows, RowOutcome},
};

/// The four operator-supplied strings that drive one run.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub spreadsheet_id: String,
    pub bucket: String,
    pub source_column: String,
    pub target_column: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Validating,
    Reading,
    Synchronizing,
    Writing,
    Done,
    Aborted,
}

/// Abort-class errors. Anything here ends the run: validation failures
/// before any I/O has happened, backend failures with nothing further
/// executed (a failed read is never followed by a write, a failed write is
/// not retried). Row-level fetch/store failures are not represented here;
/// they live in the per-row outcome log.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    InvalidBucketName(#[from] BucketNameError),
    #[error(transparent)]
    InvalidColumnLabel(#[from] InvalidColumnLabel),
    #[error("failed to initialize blob storage: {0}")]
    StorageInit(#[source] anyhow::Error),
    #[error("failed to read {range} from spreadsheet {spreadsheet_id}: {source}")]
    ReadFailed {
        spreadsheet_id: String,
        range: String,
        #[source]
        source: SheetError,
    },
    #[error("failed to write {range} to spreadsheet {spreadsheet_id}: {source}")]
    WriteFailed {
        spreadsheet_id: String,
        range: String,
        #[source]
        source: SheetError,
    },
}

impl RunError {
    /// The phase the run was in when it aborted.
    pub fn phase(&self) -> RunPhase {
        match self {
            RunError::InvalidBucketName(_)
            | RunError::InvalidColumnLabel(_)
            | RunError::StorageInit(_) => RunPhase::Validating,
            RunError::ReadFailed { .. } => RunPhase::Reading,
            RunError::WriteFailed { .. } => RunPhase::Writing,
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub range: String,
    pub rows: usize,
    pub outcomes: Vec<RowOutcome>,
}

impl RunReport {
    pub fn uploaded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_uploaded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }
}

pub struct Service {
    config: Config,
    sheets: Arc<dyn SpreadsheetBackend>,
    fetcher: Arc<dyn ResourceFetcher>,
}

impl Service {
    pub fn new(config: Config) -> Self {
        let sheets = Arc::new(GoogleSheetsClient::new(&config.sheets));
        let fetcher = Arc::new(HttpFetcher::new());
        Self::with_backends(config, sheets, fetcher)
    }

    pub fn with_backends(
        config: Config,
        sheets: Arc<dyn SpreadsheetBackend>,
        fetcher: Arc<dyn ResourceFetcher>,
    ) -> Self {
        Self {
            config,
            sheets,
            fetcher,
        }
    }

    pub async fn run(&self, request: &SyncRequest) -> Result<RunReport, RunError> {
        let phase = RunPhase::Idle;
        debug!(?phase, spreadsheet_id = %request.spreadsheet_id, "run requested");
        let result = self.execute(request).await;
        if let Err(err) = &result {
            let phase = RunPhase::Aborted;
            debug!(?phase, from = ?err.phase(), "run aborted");
        }
        result
    }

    async fn execute(&self, request: &SyncRequest) -> Result<RunReport, RunError> {
        let mut phase = RunPhase::Validating;
        debug!(?phase, "validating inputs");
        let bucket = BucketName::parse(&request.bucket)?;
        let source = ColumnRef::parse(&request.source_column)?;
        let target = ColumnRef::parse(&request.target_column)?;
        let storage = BlobStorage::new(&bucket, &self.config.blob_storage)
            .map_err(RunError::StorageInit)?;
        let range = range_expr(&source, &target);

        phase = RunPhase::Reading;
        debug!(?phase, %range, "reading range");
        let mut rows = self
            .sheets
            .read(&request.spreadsheet_id, &range)
            .await
            .map_err(|source| RunError::ReadFailed {
                spreadsheet_id: request.spreadsheet_id.clone(),
                range: range.clone(),
                source,
            })?;
        info!(rows = rows.len(), %range, "read range");

        phase = RunPhase::Synchronizing;
        debug!(?phase, "synchronizing rows");
        let relay = ResourceRelay::new(self.fetcher.clone(), storage);
        let outcomes = synchronize_rows(
            &mut rows,
            source.index(),
            target.index(),
            &relay,
            self.config.url_policy,
        )
        .await;

        phase = RunPhase::Writing;
        debug!(?phase, %range, "writing range back");
        self.sheets
            .write(&request.spreadsheet_id, &range, &rows)
            .await
            .map_err(|source| RunError::WriteFailed {
                spreadsheet_id: request.spreadsheet_id.clone(),
                range: range.clone(),
                source,
            })?;

        phase = RunPhase::Done;
        debug!(?phase, "run complete");
        Ok(RunReport {
            range,
            rows: rows.len(),
            outcomes,
        })
    }
}
