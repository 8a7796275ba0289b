use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use time::OffsetDateTime;

use super::{base_name, dir_prefix, ByteRange, Entry, EntryKind, ObjectStore, StoreError};

/// In-process bucket for handler and listener tests.
#[derive(Default)]
pub struct MemoryStore {
    objects: BTreeMap<String, (Bytes, OffsetDateTime)>,
    denied: BTreeSet<String>,
    broken: BTreeSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, key: &str, body: &str, modified: OffsetDateTime) -> Self {
        self.objects
            .insert(key.to_string(), (Bytes::from(body.to_string()), modified));
        self
    }

    pub fn with_denied(mut self, key: &str) -> Self {
        self.denied.insert(key.to_string());
        self
    }

    pub fn with_broken(mut self, key: &str) -> Self {
        self.broken.insert(key.to_string());
        self
    }

    fn check(&self, key: &str) -> Result<(), StoreError> {
        if self.denied.contains(key) {
            return Err(StoreError::Forbidden(key.to_string()));
        }
        if self.broken.contains(key) {
            return Err(StoreError::Backend(format!("{}: connection reset", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn stat(&self, key: &str) -> Result<Entry, StoreError> {
        self.check(key)?;
        if key.is_empty() {
            return Ok(Entry::directory(""));
        }
        if let Some((body, modified)) = self.objects.get(key) {
            return Ok(Entry {
                name: base_name(key).to_string(),
                kind: EntryKind::File,
                size: body.len() as u64,
                modified: Some(*modified),
                etag: Some(format!("\"{}-{}\"", body.len(), modified.unix_timestamp())),
                content_type: None,
            });
        }
        let prefix = dir_prefix(key);
        if self.objects.keys().any(|k| k.starts_with(&prefix)) {
            return Ok(Entry::directory(base_name(key)));
        }
        Err(StoreError::NotFound(key.to_string()))
    }

    async fn read(&self, key: &str, range: Option<ByteRange>) -> Result<Bytes, StoreError> {
        self.check(key)?;
        let (body, _) = self
            .objects
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        Ok(match range {
            Some(r) => body.slice(r.start as usize..=r.end as usize),
            None => body.clone(),
        })
    }

    async fn list(&self, dir: &str) -> Result<Vec<Entry>, StoreError> {
        let prefix = dir_prefix(dir);
        let mut dirs = BTreeSet::new();
        let mut entries = Vec::new();

        for key in self.objects.keys().filter(|k| k.starts_with(&prefix)) {
            let rest = &key[prefix.len()..];
            match rest.split_once('/') {
                Some((child, _)) => {
                    dirs.insert(child.to_string());
                }
                None => entries.push(self.stat(key).await?),
            }
        }

        entries.extend(dirs.into_iter().map(Entry::directory));
        Ok(entries)
    }
}
