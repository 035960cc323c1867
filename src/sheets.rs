//! Spreadsheet backend: a narrow read-range/write-range contract and its
//! Google Sheets v4 REST implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{config::SheetsConfig, data_model::RowSet};

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("sheets request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("sheets API returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[async_trait]
pub trait SpreadsheetBackend: Send + Sync {
    /// Reads the rectangular region named by `range` as rows of string
    /// cells. Trailing empty cells are omitted by the backend, so rows come
    /// back ragged.
    async fn read(&self, spreadsheet_id: &str, range: &str) -> Result<RowSet, SheetError>;

    /// Replaces the region named by `range` wholesale with `rows`.
    async fn write(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &RowSet,
    ) -> Result<(), SheetError>;
}

/// Wire format of the Sheets `values` endpoints. A read of an empty range
/// comes back without a `values` field at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Vec<String>>>,
}

pub struct GoogleSheetsClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GoogleSheetsClient {
    pub fn new(config: &SheetsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        }
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url, spreadsheet_id, range
        )
    }
}

#[async_trait]
impl SpreadsheetBackend for GoogleSheetsClient {
    async fn read(&self, spreadsheet_id: &str, range: &str) -> Result<RowSet, SheetError> {
        let response = self
            .client
            .get(self.values_url(spreadsheet_id, range))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SheetError::Api { status, body });
        }
        let value_range = response.json::<ValueRange>().await?;
        Ok(RowSet::new(value_range.values.unwrap_or_default()))
    }

    async fn write(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &RowSet,
    ) -> Result<(), SheetError> {
        let body = ValueRange {
            range: Some(range.to_string()),
            major_dimension: None,
            values: Some(rows.rows().to_vec()),
        };
        let response = self
            .client
            .put(self.values_url(spreadsheet_id, range))
            .bearer_auth(&self.access_token)
            .query(&[("valueInputOption", "RAW")])
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SheetError::Api { status, body });
        }
        Ok(())
    }
}
