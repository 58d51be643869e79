//! On-device store.
//!
//! Both collections live in one JSON blob, so the entry write and the
//! profile write of a single save land in one file replace — effectively
//! atomic. The blob keeps only the most recent `LOCAL_RETENTION_CAP`
//! entries to bound storage size.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::warn;

use crate::domain::{JournalEntry, UserProfile};

use super::{
    parse_import, ExportDocument, JournalStore, StoreCapabilities, StoreError,
    LOCAL_RETENTION_CAP,
};

use async_trait::async_trait;

/// Combined on-disk state
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Blob {
    version: u32,
    entries: Vec<JournalEntry>,
    profile: Option<UserProfile>,
}

impl Default for Blob {
    fn default() -> Self {
        Self {
            version: 1,
            entries: Vec::new(),
            profile: None,
        }
    }
}

/// JSON-blob backed store
pub struct LocalStore {
    blob_path: PathBuf,

    /// Serializes read-modify-write cycles within this process
    guard: Mutex<()>,

    /// Advisory lock against a second process opening the same blob
    _lock: std::fs::File,
}

impl LocalStore {
    /// Open a store at an explicit blob path.
    pub fn open(blob_path: impl Into<PathBuf>) -> Result<Self> {
        let blob_path = blob_path.into();

        if let Some(parent) = blob_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create store directory: {}", parent.display()))?;
        }

        let lock_path = blob_path.with_extension("lock");
        let lock = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;
        lock.try_lock_exclusive()
            .with_context(|| format!("Journal is in use by another process: {}", blob_path.display()))?;

        Ok(Self {
            blob_path,
            guard: Mutex::new(()),
            _lock: lock,
        })
    }

    /// Open the store at the configured default location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::config::journal_path()?)
    }

    pub fn blob_path(&self) -> &Path {
        &self.blob_path
    }

    /// Read the blob. Any failure degrades to the empty default.
    async fn load(&self) -> Blob {
        if !self.blob_path.exists() {
            return Blob::default();
        }

        let content = match fs::read_to_string(&self.blob_path).await {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %self.blob_path.display(), error = %e, "journal read failed, using empty state");
                return Blob::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(path = %self.blob_path.display(), error = %e, "journal blob is malformed, using empty state");
                Blob::default()
            }
        }
    }

    /// Replace the blob on disk in one write.
    async fn persist(&self, blob: &Blob) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(blob)
            .map_err(|e| StoreError::Write(e.to_string()))?;

        fs::write(&self.blob_path, content)
            .await
            .map_err(|e| StoreError::Write(format!("{}: {e}", self.blob_path.display())))
    }

    /// Order most-recent-first and drop anything past the retention cap.
    fn normalize(entries: &mut Vec<JournalEntry>) {
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(LOCAL_RETENTION_CAP);
    }
}

#[async_trait]
impl JournalStore for LocalStore {
    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            atomic_writes: true,
            retention_cap: Some(LOCAL_RETENTION_CAP),
            full_wipe: true,
        }
    }

    async fn save_entry(&self, entry: &JournalEntry) -> Result<(), StoreError> {
        let _guard = self.guard.lock().await;
        let mut blob = self.load().await;

        if let Some(existing) = blob.entries.iter_mut().find(|e| e.id == entry.id) {
            *existing = entry.clone();
        } else {
            blob.entries.push(entry.clone());
        }

        Self::normalize(&mut blob.entries);
        self.persist(&blob).await
    }

    async fn entries(&self) -> Vec<JournalEntry> {
        let mut entries = self.load().await.entries;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries
    }

    async fn profile(&self) -> UserProfile {
        self.load()
            .await
            .profile
            .unwrap_or_else(UserProfile::empty)
    }

    async fn update_profile(&self, new_facts: &[String]) -> Result<(), StoreError> {
        if new_facts.is_empty() {
            return Ok(());
        }

        let _guard = self.guard.lock().await;
        let mut blob = self.load().await;

        let mut profile = blob.profile.take().unwrap_or_else(UserProfile::empty);
        profile.apply_facts(new_facts);
        blob.profile = Some(profile);

        self.persist(&blob).await
    }

    async fn clear_history(&self) -> Result<(), StoreError> {
        let _guard = self.guard.lock().await;
        self.persist(&Blob::default()).await
    }

    async fn export_data(&self) -> Result<ExportDocument, StoreError> {
        let _guard = self.guard.lock().await;
        let blob = self.load().await;

        let mut entries = blob.entries;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(ExportDocument::new(
            entries,
            blob.profile.unwrap_or_else(UserProfile::empty),
        ))
    }

    async fn import_data(&self, document: &serde_json::Value) -> Result<(), StoreError> {
        let parts = parse_import(document)?;

        let _guard = self.guard.lock().await;
        let mut blob = self.load().await;

        if let Some(mut entries) = parts.entries {
            Self::normalize(&mut entries);
            blob.entries = entries;
        }
        if let Some(profile) = parts.profile {
            blob.profile = Some(profile);
        }

        self.persist(&blob).await
    }
}
