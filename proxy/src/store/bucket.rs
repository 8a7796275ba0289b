use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use s3::serde_types::ListBucketResult;
use s3::Bucket;
use tracing::{debug, info};

use super::{base_name, dir_prefix, ByteRange, Entry, EntryKind, ObjectStore, StoreError};
use crate::config::StorageConfig;
use crate::http_date;

/// `ObjectStore` over an S3 bucket.
pub struct S3Store {
    bucket: Bucket,
}

impl S3Store {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse::<Region>()
                .with_context(|| format!("Invalid region {:?}", config.region))?,
        };

        let credentials = Credentials::default().context("Failed to load storage credentials")?;
        Self::with_credentials(config, region, credentials)
    }

    fn with_credentials(config: &StorageConfig, region: Region, credentials: Credentials) -> Result<Self> {
        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .with_context(|| format!("Failed to create client for bucket {}", config.bucket))?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self { bucket: *bucket })
    }

    /// Make one authenticated request so bad credentials fail at startup
    /// rather than on the first file request.
    pub async fn verify_access(&self) -> Result<()> {
        let (_, code) = self
            .bucket
            .list_page(String::new(), Some("/".to_string()), None, None, Some(1))
            .await
            .with_context(|| format!("Failed to access bucket {}", self.bucket.name()))?;

        if !is_success(code) {
            anyhow::bail!(
                "Access check for bucket {} failed with status {}",
                self.bucket.name(),
                code
            );
        }

        info!("Storage access verified for bucket {}", self.bucket.name());
        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<ListBucketResult>, StoreError> {
        self.bucket
            .list(prefix.to_string(), Some("/".to_string()))
            .await
            .map_err(|e| map_error(prefix, e))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn stat(&self, key: &str) -> Result<Entry, StoreError> {
        if key.is_empty() {
            return Ok(Entry::directory(""));
        }

        if !key.ends_with('/') {
            let code = match self.bucket.head_object(key).await {
                Ok((head, code)) if is_success(code) => {
                    return Ok(Entry {
                        name: base_name(key).to_string(),
                        kind: EntryKind::File,
                        size: head.content_length.unwrap_or(0).max(0) as u64,
                        modified: head
                            .last_modified
                            .as_deref()
                            .and_then(http_date::parse_timestamp),
                        etag: head.e_tag,
                        content_type: head.content_type,
                    });
                }
                Ok((_, code)) => code,
                Err(S3Error::HttpFailWithBody(code, _)) => code,
                Err(e) => return Err(map_error(key, e)),
            };
            if code != 404 {
                return Err(status_error(key, code));
            }
        }

        // No object under the key itself; it may still be a directory. One
        // key is enough to tell.
        debug!("Checking {} for children", key);
        let prefix = dir_prefix(key);
        let (page, code) = self
            .bucket
            .list_page(prefix.clone(), Some("/".to_string()), None, None, Some(1))
            .await
            .map_err(|e| map_error(&prefix, e))?;
        if !is_success(code) {
            return Err(status_error(&prefix, code));
        }
        let has_children = !page.contents.is_empty()
            || page
                .common_prefixes
                .as_ref()
                .map(|p| !p.is_empty())
                .unwrap_or(false);

        if has_children {
            Ok(Entry::directory(base_name(key)))
        } else {
            Err(StoreError::NotFound(key.to_string()))
        }
    }

    async fn read(&self, key: &str, range: Option<ByteRange>) -> Result<Bytes, StoreError> {
        let response = match range {
            Some(r) => self.bucket.get_object_range(key, r.start, Some(r.end)).await,
            None => self.bucket.get_object(key).await,
        }
        .map_err(|e| map_error(key, e))?;

        let code = response.status_code();
        if !is_success(code) {
            return Err(status_error(key, code));
        }

        Ok(Bytes::copy_from_slice(response.bytes()))
    }

    async fn list(&self, dir: &str) -> Result<Vec<Entry>, StoreError> {
        let prefix = dir_prefix(dir);
        let results = self.list_prefix(&prefix).await?;

        let mut entries = Vec::new();
        for page in results {
            for common in page.common_prefixes.into_iter().flatten() {
                let name = base_name(&common.prefix);
                if !name.is_empty() {
                    entries.push(Entry::directory(name));
                }
            }
            for object in page.contents {
                // Directory marker objects ("dir/") describe the listing itself.
                if object.key == prefix || object.key.ends_with('/') {
                    continue;
                }
                entries.push(Entry {
                    name: base_name(&object.key).to_string(),
                    kind: EntryKind::File,
                    size: object.size,
                    modified: http_date::parse_timestamp(&object.last_modified),
                    etag: object.e_tag,
                    content_type: None,
                });
            }
        }

        Ok(entries)
    }
}

fn is_success(code: u16) -> bool {
    (200..300).contains(&code)
}

fn status_error(key: &str, code: u16) -> StoreError {
    match code {
        404 => StoreError::NotFound(key.to_string()),
        401 | 403 => StoreError::Forbidden(key.to_string()),
        c => StoreError::Backend(format!("{} returned status {}", key, c)),
    }
}

fn map_error(key: &str, err: S3Error) -> StoreError {
    match err {
        S3Error::HttpFailWithBody(code, _) => status_error(key, code),
        other => StoreError::Backend(format!("{}: {}", key, other)),
    }
}
