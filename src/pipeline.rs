//! Entry-creation and historical-query orchestration.
//!
//! One entry flow is strictly sequential: capture → extract → validate →
//! save entry → merge profile. The caller hears back only after every step
//! finished or one failed. The two store writes are sequenced here, not
//! inside the store, so a failure between them is the named outcome
//! `PipelineError::ProfileMerge` with the entry already persisted (and not
//! rolled back).

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::{validate_metadata, AnalysisClient, AnalysisError, EntryContext, EntrySnapshot};
use crate::capture::{AudioCaptureController, AudioSource, CaptureContext, CaptureError, Clip};
use crate::domain::JournalEntry;
use crate::store::{JournalStore, StoreError};

/// Answer returned for a query over an empty history, without any client
/// call being made
pub const EMPTY_HISTORY_GUIDANCE: &str =
    "No journal entries yet. Record a first entry, then ask again.";

/// Answer returned when the query call fails; this path is advisory, so a
/// raw error never reaches the user
pub const QUERY_APOLOGY: &str =
    "Sorry, I couldn't look through your journal just now. Please try again in a moment.";

/// Failures of one entry-creation flow
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("entry could not be persisted: {0}")]
    EntryWrite(#[source] StoreError),

    /// The entry IS persisted; only the profile merge failed
    #[error("entry {entry_id} persisted but profile merge failed: {source}")]
    ProfileMerge {
        entry_id: Uuid,
        #[source]
        source: StoreError,
    },
}

/// Orchestrates capture, analysis, and persistence
pub struct JournalPipeline {
    client: Arc<dyn AnalysisClient>,
    store: Arc<dyn JournalStore>,
}

impl JournalPipeline {
    pub fn new(client: Arc<dyn AnalysisClient>, store: Arc<dyn JournalStore>) -> Self {
        Self { client, store }
    }

    pub fn store(&self) -> &Arc<dyn JournalStore> {
        &self.store
    }

    /// Drive a full recording session on the controller and process the
    /// resulting clip. The controller is back in `Idle` when this returns,
    /// whatever the outcome.
    pub async fn record<S: AudioSource>(
        &self,
        controller: &mut AudioCaptureController<S>,
        context: &CaptureContext,
    ) -> Result<JournalEntry, PipelineError> {
        let result = self.drive(controller, context).await;
        controller.reset();
        result
    }

    async fn drive<S: AudioSource>(
        &self,
        controller: &mut AudioCaptureController<S>,
        context: &CaptureContext,
    ) -> Result<JournalEntry, PipelineError> {
        controller.start().await?;
        while controller.pump().await? {}
        let clip = controller.stop().await?;

        self.process_clip(&clip, context).await
    }

    /// Analyze a finished clip and persist the resulting entry.
    ///
    /// No store write happens unless extraction succeeded and the metadata
    /// validated; a range-violating response is rejected before any entry
    /// exists.
    pub async fn process_clip(
        &self,
        clip: &Clip,
        context: &CaptureContext,
    ) -> Result<JournalEntry, PipelineError> {
        let entry_context = EntryContext {
            location: context.composite_label(),
            timestamp: Utc::now().to_rfc3339(),
        };

        let metadata = self.client.extract(clip, &entry_context).await?;
        validate_metadata(&metadata)?;

        let entry = JournalEntry::new(entry_context.location, context.coordinates, metadata);

        self.store
            .save_entry(&entry)
            .await
            .map_err(PipelineError::EntryWrite)?;

        self.store
            .update_profile(&entry.metadata.extracted_facts)
            .await
            .map_err(|source| PipelineError::ProfileMerge {
                entry_id: entry.id,
                source,
            })?;

        info!(
            entry_id = %entry.id,
            facts = entry.metadata.extracted_facts.len(),
            "entry created"
        );

        Ok(entry)
    }

    /// Answer a free-text question over the accumulated history.
    ///
    /// An empty history short-circuits to a fixed guidance message with
    /// zero client calls. A failed call degrades to a fixed apology.
    pub async fn query_history(&self, question: &str) -> String {
        let entries = self.store.entries().await;
        if entries.is_empty() {
            return EMPTY_HISTORY_GUIDANCE.to_string();
        }

        let projection: Vec<EntrySnapshot> = entries.iter().map(EntrySnapshot::from).collect();
        let profile = self.store.profile().await;

        match self
            .client
            .query(&projection, &profile.core_memories, question)
            .await
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "history query failed");
                QUERY_APOLOGY.to_string()
            }
        }
    }
}
