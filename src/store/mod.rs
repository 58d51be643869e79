//! Entry and profile persistence.
//!
//! Two interchangeable backends sit behind one trait: the on-device
//! JSON-blob store and the per-user remote collection. They are equivalent
//! in behavior only up to the capability matrix each one reports — callers
//! that care about atomicity, retention, or wipe guarantees must consult
//! `capabilities()` instead of assuming.

pub mod local;
pub mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{monotonic_now_ms, JournalEntry, UserProfile};

// Re-export the backends
pub use local::LocalStore;
pub use remote::RemoteStore;

/// Retention cap enforced by the on-device backend
pub const LOCAL_RETENTION_CAP: usize = 100;

/// Errors surfaced by store writes.
///
/// Reads never raise: a failed read degrades to an empty default and is
/// only logged.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage write failed: {0}")]
    Write(String),

    #[error("import document rejected: {0}")]
    Import(String),
}

/// What a backend actually guarantees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCapabilities {
    /// Entry write and profile write land atomically together
    pub atomic_writes: bool,

    /// Oldest entries beyond this count are dropped
    pub retention_cap: Option<usize>,

    /// `clear_history` removes everything synchronously; when false the
    /// wipe is best-effort and a partial result surfaces as an error
    pub full_wipe: bool,
}

/// Serialized backup/restore bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub entries: Vec<JournalEntry>,
    pub profile: UserProfile,
    pub exported_at: i64,
}

impl ExportDocument {
    pub fn new(entries: Vec<JournalEntry>, profile: UserProfile) -> Self {
        Self {
            entries,
            profile,
            exported_at: monotonic_now_ms(),
        }
    }
}

/// Validated parts of an import document. A missing field means that part
/// of state is left unchanged.
#[derive(Debug)]
pub struct ImportParts {
    pub entries: Option<Vec<JournalEntry>>,
    pub profile: Option<UserProfile>,
}

/// Validate an interchange document before anything is applied.
///
/// Malformed input is rejected wholesale; callers apply the parts only
/// after this returns.
pub fn parse_import(value: &serde_json::Value) -> Result<ImportParts, StoreError> {
    let Some(object) = value.as_object() else {
        return Err(StoreError::Import(
            "import document must be a JSON object".to_string(),
        ));
    };

    let entries = match object.get("entries") {
        None => None,
        Some(raw) => Some(
            serde_json::from_value::<Vec<JournalEntry>>(raw.clone())
                .map_err(|e| StoreError::Import(format!("invalid entries: {e}")))?,
        ),
    };

    let profile = match object.get("profile") {
        None => None,
        Some(raw) => Some(
            serde_json::from_value::<UserProfile>(raw.clone())
                .map_err(|e| StoreError::Import(format!("invalid profile: {e}")))?,
        ),
    };

    if entries.is_none() && profile.is_none() {
        return Err(StoreError::Import(
            "import document contains neither entries nor profile".to_string(),
        ));
    }

    Ok(ImportParts { entries, profile })
}

/// Persistence contract shared by both backends
#[async_trait]
pub trait JournalStore: Send + Sync {
    /// What this backend guarantees
    fn capabilities(&self) -> StoreCapabilities;

    /// Persist one entry, keyed by its id. Saving the same id again
    /// replaces the stored copy. This does NOT touch the profile — the
    /// pipeline sequences the profile merge as an explicit second step so
    /// a failure between the two is a named outcome.
    async fn save_entry(&self, entry: &JournalEntry) -> Result<(), StoreError>;

    /// All entries, most recent first. Read failures degrade to empty.
    async fn entries(&self) -> Vec<JournalEntry>;

    /// Current profile, or an empty default when none exists or the read
    /// fails.
    async fn profile(&self) -> UserProfile;

    /// Merge new facts into the profile via read-modify-write. No-op when
    /// `new_facts` is empty. Concurrent calls are serialized (locally) or
    /// retried on conflict (remotely), so disjoint merges lose nothing.
    async fn update_profile(&self, new_facts: &[String]) -> Result<(), StoreError>;

    /// Remove all entries and the profile. Guarantees differ per backend;
    /// see `capabilities().full_wipe`.
    async fn clear_history(&self) -> Result<(), StoreError>;

    /// Serialize the full state into one interchange document.
    async fn export_data(&self) -> Result<ExportDocument, StoreError>;

    /// Restore state from an interchange document. Validation happens
    /// before any write; malformed input leaves existing state untouched.
    async fn import_data(&self, document: &serde_json::Value) -> Result<(), StoreError>;
}
