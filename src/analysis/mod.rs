//! Analysis client interfaces.
//!
//! The language-understanding service is an opaque remote dependency and
//! is modeled as a typed client: a success payload that validated against
//! the exact expected shape, or a classified failure. Pipeline tests mock
//! this trait.

pub mod http;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::capture::Clip;
use crate::domain::{JournalEntry, MaslowLevel, ProcessedMetadata};

// Re-export the HTTP client
pub use http::HttpAnalysisClient;

/// Errors from extraction and query calls
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The service returned no payload at all
    #[error("analysis service returned no payload")]
    EmptyResponse,

    /// The payload did not match the expected shape or violated a range
    /// invariant
    #[error("analysis payload failed validation: {0}")]
    Schema(String),

    /// The request itself failed
    #[error("analysis request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Situational context sent with every extraction request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryContext {
    /// Composite location string, e.g. "Work (Office/Work)"
    pub location: String,

    /// ISO 8601 capture time
    pub timestamp: String,
}

/// Compact projection of one entry, sent with historical queries
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySnapshot {
    pub date: String,
    pub location: String,
    pub summary: String,
    pub key_events: Vec<String>,
    pub valence: f64,
    pub arousal: f64,
    pub cbt_distortions: Vec<String>,
    pub maslow_level: MaslowLevel,
}

impl From<&JournalEntry> for EntrySnapshot {
    fn from(entry: &JournalEntry) -> Self {
        let metrics = &entry.metadata.psychometrics;
        Self {
            date: entry.date_str.clone(),
            location: entry.location_name.clone(),
            summary: entry.metadata.summary.clone(),
            key_events: entry.metadata.key_events.clone(),
            valence: metrics.valence,
            arousal: metrics.arousal,
            cbt_distortions: metrics.cbt_distortions.clone(),
            maslow_level: metrics.maslow_level,
        }
    }
}

/// Typed client for the extraction/query service
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Turn a clip plus context into structured metadata.
    async fn extract(
        &self,
        clip: &Clip,
        context: &EntryContext,
    ) -> Result<ProcessedMetadata, AnalysisError>;

    /// Answer a free-text question over the accumulated history.
    ///
    /// The answer is expected to mirror the question's language; that
    /// policy belongs to the service and is not enforced here.
    async fn query(
        &self,
        history: &[EntrySnapshot],
        profile_facts: &[String],
        question: &str,
    ) -> Result<String, AnalysisError>;
}

/// Reject metadata that violates the psychometric range invariants.
///
/// Runs on every extraction result, including mocked ones, before any entry
/// is built.
pub fn validate_metadata(metadata: &ProcessedMetadata) -> Result<(), AnalysisError> {
    let metrics = &metadata.psychometrics;
    if !metrics.in_range() {
        return Err(AnalysisError::Schema(format!(
            "psychometrics out of range: valence={}, arousal={}",
            metrics.valence, metrics.arousal
        )));
    }
    Ok(())
}
