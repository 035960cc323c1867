//! Object-storage seam: validated bucket names, per-upload key generation,
//! and a `put` that returns the externally addressable URL of the stored
//! object.

use std::{env, sync::Arc};

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use object_store::{
    aws::AmazonS3Builder,
    local::LocalFileSystem,
    path::Path,
    Attribute,
    Attributes,
    ObjectStore,
    PutOptions,
    PutPayload,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_STORE_HOST: &str = "s3.amazonaws.com";

fn default_store_host() -> String {
    DEFAULT_STORE_HOST.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub region: String,
    /// Host used to build bucket-endpoint result URLs
    /// (`https://{bucket}.{host}/{key}`).
    #[serde(default = "default_store_host")]
    pub store_host: String,
    /// Endpoint override for minio/localstack style deployments. The
    /// `AWS_ENDPOINT_URL` environment variable takes precedence.
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskStorageConfig {
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlobStorageConfig {
    #[serde(default)]
    pub s3: Option<S3Config>,
    #[serde(default)]
    pub disk: Option<DiskStorageConfig>,
    /// Fixed public domain for result URLs (`https://{domain}/{key}`).
    /// Overrides the bucket-endpoint form for every upload of the run.
    #[serde(default)]
    pub public_domain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BucketNameError {
    #[error("bucket name {name:?} is too short ({len} characters, minimum is 3)")]
    TooShort { name: String, len: usize },
    #[error("bucket name {name:?} is too long ({len} characters, maximum is 63)")]
    TooLong { name: String, len: usize },
    #[error("bucket name {name:?} must start with a lowercase letter or digit")]
    InvalidStart { name: String },
    #[error("bucket name {name:?} must end with a lowercase letter or digit")]
    InvalidEnd { name: String },
    #[error("bucket name {name:?} contains illegal character {ch:?}")]
    IllegalCharacter { name: String, ch: char },
}

/// A bucket/container name that has passed the storage backend's naming
/// grammar: 3-63 characters, lowercase alphanumerics plus `.`, `-` and `_`,
/// first and last characters alphanumeric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketName(String);

impl BucketName {
    pub fn parse(name: &str) -> Result<Self, BucketNameError> {
        let len = name.chars().count();
        if len < 3 {
            return Err(BucketNameError::TooShort {
                name: name.to_string(),
                len,
            });
        }
        if len > 63 {
            return Err(BucketNameError::TooLong {
                name: name.to_string(),
                len,
            });
        }
        let alnum = |ch: char| ch.is_ascii_lowercase() || ch.is_ascii_digit();
        for ch in name.chars() {
            if !alnum(ch) && ch != '.' && ch != '-' && ch != '_' {
                return Err(BucketNameError::IllegalCharacter {
                    name: name.to_string(),
                    ch,
                });
            }
        }
        // Grammar is ASCII-only past this point, so byte indexing is safe.
        if !alnum(name.as_bytes()[0] as char) {
            return Err(BucketNameError::InvalidStart {
                name: name.to_string(),
            });
        }
        if !alnum(name.as_bytes()[name.len() - 1] as char) {
            return Err(BucketNameError::InvalidEnd {
                name: name.to_string(),
            });
        }
        Ok(BucketName(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BucketName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Freshly random key for one upload. Keys are never derived from the source
/// data, so re-running a batch stores new copies under new keys.
pub fn generate_key() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Error)]
#[error("store failed for key {key:?}: {source}")]
pub struct StoreError {
    pub key: String,
    #[source]
    pub source: object_store::Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    S3,
    Disk,
}

#[derive(Debug, Clone)]
enum UrlBase {
    /// `https://{domain}/{key}` when a fixed public domain is configured.
    Domain(String),
    /// `https://{bucket}.{host}/{key}`, the bucket-endpoint form.
    BucketHost { bucket: String, host: String },
    /// `file://{root}/{key}` for the local disk backend.
    FileRoot(String),
}

#[derive(Clone)]
pub struct BlobStorage {
    object_store: Arc<dyn ObjectStore>,
    url_base: UrlBase,
    backend: Backend,
}

impl BlobStorage {
    pub fn new(bucket: &BucketName, config: &BlobStorageConfig) -> Result<Self> {
        let backends = (&config.s3, &config.disk);
        let (object_store, url_base, backend): (Arc<dyn ObjectStore>, _, _) = match backends {
            (Some(s3), None) => {
                let mut builder = AmazonS3Builder::from_env()
                    .with_region(&s3.region)
                    .with_bucket_name(bucket.as_str());
                // Endpoint override for localstack/minio; plain-http endpoints
                // are only reachable with allow_http.
                let endpoint = env::var("AWS_ENDPOINT_URL").ok().or_else(|| s3.endpoint.clone());
                if let Some(endpoint) = endpoint {
                    builder = builder.with_endpoint(endpoint.clone());
                    if endpoint.starts_with("http://") {
                        builder = builder.with_allow_http(true);
                    }
                }
                let store = builder
                    .build()
                    .context("error building S3 object store client")?;
                (
                    Arc::new(store),
                    UrlBase::BucketHost {
                        bucket: bucket.to_string(),
                        host: s3.store_host.clone(),
                    },
                    Backend::S3,
                )
            }
            (None, Some(disk)) => {
                std::fs::create_dir_all(&disk.path)
                    .with_context(|| format!("error creating blob directory {}", disk.path))?;
                let store = LocalFileSystem::new_with_prefix(&disk.path)
                    .context("error building local object store")?;
                info!("using blob store path: {}", disk.path);
                (
                    Arc::new(store),
                    UrlBase::FileRoot(disk.path.trim_end_matches('/').to_string()),
                    Backend::Disk,
                )
            }
            _ => return Err(anyhow!("must specify exactly one of s3 or disk blob storage")),
        };

        let url_base = match &config.public_domain {
            Some(domain) => UrlBase::Domain(domain.clone()),
            None => url_base,
        };

        Ok(Self {
            object_store,
            url_base,
            backend,
        })
    }

    /// Externally addressable URL for an object stored under `key`.
    pub fn object_url(&self, key: &str) -> String {
        match &self.url_base {
            UrlBase::Domain(domain) => format!("https://{}/{}", domain, key),
            UrlBase::BucketHost { bucket, host } => {
                format!("https://{}.{}/{}", bucket, host, key)
            }
            UrlBase::FileRoot(root) => format!("file://{}/{}", root, key),
        }
    }

    /// Stores `data` under `key`, forwarding the declared content type, and
    /// returns the object's externally addressable URL.
    pub async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let opts: PutOptions = match self.backend {
            Backend::S3 => {
                let mut attributes = Attributes::new();
                attributes.insert(Attribute::ContentType, content_type.to_string().into());
                attributes.into()
            }
            // LocalFileSystem rejects object attributes.
            Backend::Disk => PutOptions::default(),
        };
        let path = Path::from(key);
        self.object_store
            .put_opts(&path, PutPayload::from(data), opts)
            .await
            .map_err(|source| StoreError {
                key: key.to_string(),
                source,
            })?;
        Ok(self.object_url(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk_config(path: &str) -> BlobStorageConfig {
        BlobStorageConfig {
            s3: None,
            disk: Some(DiskStorageConfig {
                path: path.to_string(),
            }),
            public_domain: None,
        }
    }

    #[test]
    fn bucket_grammar_accepts_valid_names() {
        assert!(BucketName::parse("my-bucket.01").is_ok());
        assert!(BucketName::parse("abc").is_ok());
        assert!(BucketName::parse("a_b-c.9").is_ok());
    }

    #[test]
    fn bucket_grammar_rejects_invalid_names() {
        assert!(matches!(
            BucketName::parse("ab"),
            Err(BucketNameError::TooShort { len: 2, .. })
        ));
        assert!(matches!(
            BucketName::parse("-bucket"),
            Err(BucketNameError::InvalidStart { .. })
        ));
        assert!(matches!(
            BucketName::parse("bucket-"),
            Err(BucketNameError::InvalidEnd { .. })
        ));
        assert!(matches!(
            BucketName::parse("MyBucket"),
            Err(BucketNameError::IllegalCharacter { ch: 'M', .. })
        ));
        assert!(matches!(
            BucketName::parse("buck/et"),
            Err(BucketNameError::IllegalCharacter { ch: '/', .. })
        ));
        let long = "a".repeat(64);
        assert!(matches!(
            BucketName::parse(&long),
            Err(BucketNameError::TooLong { len: 64, .. })
        ));
    }

    #[test]
    fn keys_are_fresh_per_call() {
        let a = generate_key();
        let b = generate_key();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn object_url_uses_bucket_endpoint_form() {
        let bucket = BucketName::parse("media-assets").unwrap();
        let config = BlobStorageConfig {
            s3: Some(S3Config {
                region: "us-east-1".to_string(),
                store_host: default_store_host(),
                endpoint: None,
            }),
            disk: None,
            public_domain: None,
        };
        let storage = BlobStorage::new(&bucket, &config).unwrap();
        assert_eq!(
            storage.object_url("k1"),
            "https://media-assets.s3.amazonaws.com/k1"
        );
    }

    #[test]
    fn object_url_prefers_public_domain() {
        let dir = tempfile::TempDir::new().unwrap();
        let bucket = BucketName::parse("media-assets").unwrap();
        let mut config = disk_config(dir.path().to_str().unwrap());
        config.public_domain = Some("media.example".to_string());
        let storage = BlobStorage::new(&bucket, &config).unwrap();
        assert_eq!(storage.object_url("k1"), "https://media.example/k1");
    }

    #[tokio::test]
    async fn disk_put_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let bucket = BucketName::parse("local-bucket").unwrap();
        let config = disk_config(dir.path().to_str().unwrap());
        let storage = BlobStorage::new(&bucket, &config).unwrap();

        let key = generate_key();
        let url = storage
            .put(&key, Bytes::from_static(b"payload"), "image/png")
            .await
            .unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with(&key));

        let stored = std::fs::read(dir.path().join(&key)).unwrap();
        assert_eq!(stored, b"payload");
    }

    #[test]
    fn rejects_ambiguous_backend_config() {
        let bucket = BucketName::parse("abc").unwrap();
        let config = BlobStorageConfig::default();
        assert!(BlobStorage::new(&bucket, &config).is_err());
    }
}
