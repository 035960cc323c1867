//! Row Synchronizer: walks the fetched rows in order, relays each
//! qualifying source cell, and writes the resulting object URL into the
//! target slot of an in-memory copy of the row set.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    data_model::RowSet,
    relay::{Relay, RelayError},
};

/// Whether rows whose source cell is not URL-shaped are relayed anyway or
/// skipped with a warning. Early revisions of this tool accepted anything
/// non-empty; the strict check is the current default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlPolicy {
    AcceptAny,
    #[default]
    RequireHttpScheme,
}

impl UrlPolicy {
    fn qualifies(&self, cell: &str) -> bool {
        match self {
            UrlPolicy::AcceptAny => true,
            UrlPolicy::RequireHttpScheme => {
                let lower = cell.to_ascii_lowercase();
                lower.starts_with("http://") || lower.starts_with("https://")
            }
        }
    }
}

#[derive(Debug)]
pub enum RowOutcome {
    Uploaded {
        row: usize,
        source_url: String,
        object_url: String,
    },
    SkippedNoSource {
        row: usize,
    },
    SkippedInvalidUrl {
        row: usize,
        cell: String,
    },
    Failed {
        row: usize,
        source_url: String,
        error: RelayError,
    },
}

impl RowOutcome {
    pub fn is_uploaded(&self) -> bool {
        matches!(self, RowOutcome::Uploaded { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RowOutcome::Failed { .. })
    }
}

/// Relays every qualifying row, strictly one at a time, mutating `rows` in
/// place. A mutated row is padded with empty cells up to the target slot; a
/// skipped or failed row keeps its original cells and length. A single
/// row's failure never ends the walk.
pub async fn synchronize_rows(
    rows: &mut RowSet,
    source_index: usize,
    target_index: usize,
    relay: &dyn Relay,
    policy: UrlPolicy,
) -> Vec<RowOutcome> {
    let mut outcomes = Vec::with_capacity(rows.len());
    for (i, row) in rows.rows_mut().iter_mut().enumerate() {
        let source_url = match row.get(source_index) {
            Some(cell) if !cell.trim().is_empty() => cell.trim().to_string(),
            _ => {
                debug!(row = i, "no source cell");
                outcomes.push(RowOutcome::SkippedNoSource { row: i });
                continue;
            }
        };
        if !policy.qualifies(&source_url) {
            warn!(row = i, cell = %source_url, "source cell is not an http(s) URL, skipping");
            outcomes.push(RowOutcome::SkippedInvalidUrl {
                row: i,
                cell: source_url,
            });
            continue;
        }
        match relay.relay(&source_url).await {
            Ok(object_url) => {
                if row.len() <= target_index {
                    row.resize(target_index + 1, String::new());
                }
                row[target_index] = object_url.clone();
                info!(row = i, source = %source_url, url = %object_url, "uploaded");
                outcomes.push(RowOutcome::Uploaded {
                    row: i,
                    source_url,
                    object_url,
                });
            }
            Err(error) => {
                warn!(row = i, source = %source_url, %error, "row failed, continuing");
                outcomes.push(RowOutcome::Failed {
                    row: i,
                    source_url,
                    error,
                });
            }
        }
    }
    outcomes
}
