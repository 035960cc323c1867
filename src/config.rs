use std::env;

use anyhow::Result;
use blob_store::{BlobStorageConfig, DiskStorageConfig};
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::sync::UrlPolicy;

pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";

fn default_sheets_base_url() -> String {
    DEFAULT_SHEETS_BASE_URL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// Bearer token for the Sheets API, supplied at startup.
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_sheets_base_url")]
    pub base_url: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            base_url: default_sheets_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sheets: SheetsConfig,
    #[serde(default)]
    pub blob_storage: BlobStorageConfig,
    #[serde(default)]
    pub url_policy: UrlPolicy,
    #[serde(default)]
    pub structured_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        let blob_path = env::current_dir()
            .unwrap()
            .join("sheetlift_storage/blobs");
        Config {
            sheets: SheetsConfig::default(),
            blob_storage: BlobStorageConfig {
                s3: None,
                disk: Some(DiskStorageConfig {
                    path: blob_path.to_str().unwrap().to_string(),
                }),
                public_domain: None,
            },
            url_policy: UrlPolicy::default(),
            structured_logging: false,
        }
    }
}

impl Config {
    pub fn from_path(path: &str) -> Result<Config> {
        let config_str = std::fs::read_to_string(path)?;
        let config: Config = Figment::new().merge(Yaml::string(&config_str)).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.blob_storage.s3.is_some() && self.blob_storage.disk.is_some() {
            return Err(anyhow::anyhow!(
                "cannot specify both s3 and disk blob storage"
            ));
        }
        if self.blob_storage.s3.is_none() && self.blob_storage.disk.is_none() {
            return Err(anyhow::anyhow!(
                "must specify one of s3 or disk blob storage"
            ));
        }
        if self.sheets.access_token.trim().is_empty() {
            return Err(anyhow::anyhow!("sheets access token is required"));
        }
        if Url::parse(&self.sheets.base_url).is_err() {
            return Err(anyhow::anyhow!(
                "invalid sheets base url: {}",
                self.sheets.base_url
            ));
        }
        Ok(())
    }
}
