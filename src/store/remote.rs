//! Remote store.
//!
//! Entries and the profile live in a per-user collection behind a REST
//! API. Entry save and profile merge are two sequential network writes
//! with no transaction — a crash between them leaves the entry persisted
//! without its facts merged, which the pipeline surfaces as a named
//! partial-failure outcome.
//!
//! Profile merges use optimistic concurrency: the write is conditional on
//! the revision read at the start of the cycle and retried on conflict, so
//! two concurrent merges cannot silently drop facts.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{JournalEntry, UserProfile};

use super::{parse_import, ExportDocument, JournalStore, StoreCapabilities, StoreError};

/// Attempts before a contended profile merge gives up
const MERGE_RETRIES: u32 = 3;

/// REST-backed per-user store
pub struct RemoteStore {
    base_url: String,
    user_id: String,
    api_key: String,
    client: reqwest::Client,
}

impl RemoteStore {
    pub fn new(
        base_url: impl Into<String>,
        user_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id: user_id.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn entries_url(&self) -> String {
        format!("{}/users/{}/entries", self.base_url, self.user_id)
    }

    fn entry_url(&self, id: Uuid) -> String {
        format!("{}/users/{}/entries/{}", self.base_url, self.user_id, id)
    }

    fn profile_url(&self) -> String {
        format!("{}/users/{}/profile", self.base_url, self.user_id)
    }

    /// Read the profile along with whether one exists at all. Transport
    /// failures abort the caller's write cycle instead of degrading, so a
    /// merge never clobbers state it could not see.
    async fn fetch_profile(&self) -> Result<Option<UserProfile>, StoreError> {
        let response = self
            .client
            .get(self.profile_url())
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = response
            .error_for_status()
            .map_err(|e| StoreError::Write(e.to_string()))?;

        let profile = response
            .json::<UserProfile>()
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;

        Ok(Some(profile))
    }

    /// Conditionally replace the profile. `expect` is the revision
    /// (lastUpdated) read at the start of the cycle; 0 means "no profile
    /// existed". The server answers 409 when the revision moved.
    async fn put_profile(&self, profile: &UserProfile, expect: Option<i64>) -> Result<StatusCode, StoreError> {
        let mut request = self
            .client
            .put(self.profile_url())
            .bearer_auth(&self.api_key)
            .json(profile);

        if let Some(revision) = expect {
            request = request.query(&[("expect", revision.to_string())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::CONFLICT {
            response
                .error_for_status()
                .map_err(|e| StoreError::Write(e.to_string()))?;
        }

        Ok(status)
    }
}

#[async_trait]
impl JournalStore for RemoteStore {
    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            atomic_writes: false,
            retention_cap: None,
            full_wipe: false,
        }
    }

    async fn save_entry(&self, entry: &JournalEntry) -> Result<(), StoreError> {
        self.client
            .put(self.entry_url(entry.id))
            .bearer_auth(&self.api_key)
            .json(entry)
            .send()
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?
            .error_for_status()
            .map_err(|e| StoreError::Write(e.to_string()))?;

        debug!(entry_id = %entry.id, "entry persisted remotely");
        Ok(())
    }

    async fn entries(&self) -> Vec<JournalEntry> {
        let result = async {
            self.client
                .get(self.entries_url())
                .bearer_auth(&self.api_key)
                .send()
                .await?
                .error_for_status()?
                .json::<Vec<JournalEntry>>()
                .await
        }
        .await;

        match result {
            Ok(mut entries) => {
                entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                entries
            }
            Err(e) => {
                warn!(error = %e, "remote entry read failed, returning empty history");
                Vec::new()
            }
        }
    }

    async fn profile(&self) -> UserProfile {
        match self.fetch_profile().await {
            Ok(Some(profile)) => profile,
            Ok(None) => UserProfile::empty(),
            Err(e) => {
                warn!(error = %e, "remote profile read failed, returning empty profile");
                UserProfile::empty()
            }
        }
    }

    async fn update_profile(&self, new_facts: &[String]) -> Result<(), StoreError> {
        if new_facts.is_empty() {
            return Ok(());
        }

        for attempt in 1..=MERGE_RETRIES {
            let existing = self.fetch_profile().await?;
            let revision = existing.as_ref().map(|p| p.last_updated).unwrap_or(0);

            let mut profile = existing.unwrap_or_else(UserProfile::empty);
            profile.apply_facts(new_facts);

            match self.put_profile(&profile, Some(revision)).await? {
                StatusCode::CONFLICT => {
                    warn!(attempt, "profile merge conflicted, re-reading");
                    continue;
                }
                _ => return Ok(()),
            }
        }

        Err(StoreError::Write(format!(
            "profile merge still contended after {MERGE_RETRIES} attempts"
        )))
    }

    async fn clear_history(&self) -> Result<(), StoreError> {
        // Best-effort wipe: the collection cannot be dropped in one call,
        // so the profile and each entry are deleted individually and a
        // partial result is reported, never swallowed.
        let mut failures = 0usize;

        let profile_response = self
            .client
            .delete(self.profile_url())
            .bearer_auth(&self.api_key)
            .send()
            .await;
        match profile_response {
            Ok(response)
                if response.status().is_success()
                    || response.status() == StatusCode::NOT_FOUND => {}
            Ok(response) => {
                warn!(status = %response.status(), "profile delete failed");
                failures += 1;
            }
            Err(e) => {
                warn!(error = %e, "profile delete failed");
                failures += 1;
            }
        }

        let entries = self.entries().await;
        let total = entries.len();
        for entry in &entries {
            let result = self
                .client
                .delete(self.entry_url(entry.id))
                .bearer_auth(&self.api_key)
                .send()
                .await;

            let ok = matches!(&result, Ok(response) if response.status().is_success()
                || response.status() == StatusCode::NOT_FOUND);
            if !ok {
                warn!(entry_id = %entry.id, "entry delete failed");
                failures += 1;
            }
        }

        if failures > 0 {
            return Err(StoreError::Write(format!(
                "partial wipe: {failures} of {} deletes failed, remainder left behind",
                total + 1
            )));
        }

        Ok(())
    }

    async fn export_data(&self) -> Result<ExportDocument, StoreError> {
        let entries = self.entries().await;
        let profile = self.profile().await;
        Ok(ExportDocument::new(entries, profile))
    }

    async fn import_data(&self, document: &serde_json::Value) -> Result<(), StoreError> {
        let parts = parse_import(document)?;

        // Sequential writes, not a transaction: a failure mid-way leaves
        // whatever was already written.
        if let Some(entries) = parts.entries {
            for entry in &entries {
                self.save_entry(entry).await?;
            }
        }

        if let Some(profile) = parts.profile {
            self.put_profile(&profile, None).await?;
        }

        Ok(())
    }
}
