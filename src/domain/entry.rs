//! Journal entry data model.
//!
//! A JournalEntry is created once by the pipeline after a successful
//! analysis call and is never mutated afterwards; only a bulk wipe
//! removes it.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// GPS fix attached to an entry when geolocation was available
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Overall sentiment classification for one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Anxious,
    Excited,
    Stressed,
}

/// Dominant motivational-need category for one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaslowLevel {
    Physiological,
    Safety,
    Belonging,
    Esteem,
    #[serde(rename = "Self-Actualization")]
    SelfActualization,
}

/// Structured affect/cognition reading attached to each entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PsychMetrics {
    /// Pleasantness, -1.0 (most negative) to 1.0 (most positive)
    pub valence: f64,

    /// Activation level, 0.0 (calm) to 1.0 (highly activated)
    pub arousal: f64,

    /// CBT distortion labels detected in the entry, in detection order
    pub cbt_distortions: Vec<String>,

    /// Single dominant Maslow level
    pub maslow_level: MaslowLevel,
}

impl PsychMetrics {
    /// Check the range invariants: valence ∈ [-1, 1], arousal ∈ [0, 1].
    pub fn in_range(&self) -> bool {
        (-1.0..=1.0).contains(&self.valence) && (0.0..=1.0).contains(&self.arousal)
    }
}

/// One complete analysis result for a clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedMetadata {
    /// Verbatim transcript. Code-mixed speech is preserved as spoken;
    /// the remaining fields are normalized to one working language.
    pub transcript: String,

    /// Short prose summary
    pub summary: String,

    /// Overall sentiment
    pub sentiment: Sentiment,

    /// Topic tags (set-like, no meaning in order)
    pub tags: Vec<String>,

    /// Notable events mentioned in the entry
    pub key_events: Vec<String>,

    /// Durable facts about the user extracted from this entry.
    /// Usually 0-3; may be empty.
    pub extracted_facts: Vec<String>,

    /// Affect/cognition reading
    pub psychometrics: PsychMetrics,
}

/// One recorded journal session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    /// Globally unique, immutable identifier
    pub id: Uuid,

    /// Creation time in epoch milliseconds, monotonically assigned
    pub timestamp: i64,

    /// Human-readable date (YYYY-MM-DD)
    pub date_str: String,

    /// Composite location string, e.g. "Work (Office/Work)"
    pub location_name: String,

    /// GPS fix, absent when geolocation was unavailable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,

    /// Analysis result for this session
    pub metadata: ProcessedMetadata,
}

impl JournalEntry {
    /// Build a new entry with a fresh id and a monotonic timestamp.
    pub fn new(
        location_name: impl Into<String>,
        coordinates: Option<Coordinates>,
        metadata: ProcessedMetadata,
    ) -> Self {
        let timestamp = monotonic_now_ms();
        Self {
            id: Uuid::new_v4(),
            timestamp,
            date_str: Utc::now().format("%Y-%m-%d").to_string(),
            location_name: location_name.into(),
            coordinates,
            metadata,
        }
    }
}

/// Last timestamp handed out, in epoch ms
static LAST_TIMESTAMP: AtomicI64 = AtomicI64::new(0);

/// Current wall-clock time in epoch ms, bumped past the previous value so
/// two entries created in the same millisecond never share or invert
/// timestamps.
pub fn monotonic_now_ms() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut prev = LAST_TIMESTAMP.load(Ordering::Relaxed);
    loop {
        let next = if now > prev { now } else { prev + 1 };
        match LAST_TIMESTAMP.compare_exchange_weak(prev, next, Ordering::SeqCst, Ordering::Relaxed)
        {
            Ok(_) => return next,
            Err(observed) => prev = observed,
        }
    }
}
