//! Stub backends shared by the test modules.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    data_model::RowSet,
    fetch::{FetchError, FetchedResource, ResourceFetcher},
    relay::{Relay, RelayError},
    sheets::{SheetError, SpreadsheetBackend},
};

fn backend_error() -> SheetError {
    SheetError::Api {
        status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        body: "backend unavailable".to_string(),
    }
}

/// Relay stub with deterministic object URLs (`{base}/k1`, `{base}/k2`, ...)
/// and optional per-URL failures.
pub struct StubRelay {
    base: String,
    fail_on: HashSet<String>,
    calls: Mutex<Vec<String>>,
    successes: AtomicUsize,
}

impl StubRelay {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
            fail_on: HashSet::new(),
            calls: Mutex::new(Vec::new()),
            successes: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(mut self, url: &str) -> Self {
        self.fail_on.insert(url.to_string());
        self
    }

    /// Source URLs the relay was invoked with, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Relay for StubRelay {
    async fn relay(&self, source_url: &str) -> Result<String, RelayError> {
        self.calls.lock().unwrap().push(source_url.to_string());
        if self.fail_on.contains(source_url) {
            return Err(RelayError::Fetch(FetchError::Status {
                url: source_url.to_string(),
                status: reqwest::StatusCode::NOT_FOUND,
            }));
        }
        let n = self.successes.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("{}/k{}", self.base, n))
    }
}

/// In-memory spreadsheet backend with call counters, so tests can assert
/// the orchestrator's abort ordering.
#[derive(Default)]
pub struct StubSheets {
    rows: Mutex<RowSet>,
    fail_reads: bool,
    fail_writes: bool,
    reads: AtomicUsize,
    writes: AtomicUsize,
    written: Mutex<Option<(String, String, RowSet)>>,
}

impl StubSheets {
    pub fn new(rows: RowSet) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// The last successful write: (spreadsheet id, range, rows).
    pub fn written(&self) -> Option<(String, String, RowSet)> {
        self.written.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpreadsheetBackend for StubSheets {
    async fn read(&self, _spreadsheet_id: &str, _range: &str) -> Result<RowSet, SheetError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(backend_error());
        }
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn write(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &RowSet,
    ) -> Result<(), SheetError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(backend_error());
        }
        *self.written.lock().unwrap() = Some((
            spreadsheet_id.to_string(),
            range.to_string(),
            rows.clone(),
        ));
        Ok(())
    }
}

/// Resource fetcher serving canned responses; unknown URLs come back 404.
#[derive(Default)]
pub struct StubFetcher {
    resources: HashMap<String, FetchedResource>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, bytes: &'static [u8], content_type: &str) -> Self {
        self.resources.insert(
            url.to_string(),
            FetchedResource {
                bytes: Bytes::from_static(bytes),
                content_type: content_type.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl ResourceFetcher for StubFetcher {
    async fn get(&self, url: &str) -> Result<FetchedResource, FetchError> {
        self.resources
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: reqwest::StatusCode::NOT_FOUND,
            })
    }
}
