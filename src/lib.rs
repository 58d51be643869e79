//! vocalog - Voice journal with psychometric analysis
//!
//! Records short spoken journal entries, has them transcribed and
//! annotated by a language-understanding service, and accumulates a
//! durable personal profile alongside a queryable entry history.
//!
//! # Architecture
//!
//! One entry flows capture → analyze → persist:
//! - Capture owns the recording state machine and produces a finished clip
//! - Analysis turns the clip plus context into typed metadata
//! - The store persists the entry, then merges extracted facts into the
//!   profile as an explicit second step
//!
//! # Modules
//!
//! - `capture`: Recording state machine, audio sources, location context
//! - `analysis`: Typed client for the extraction/query service
//! - `store`: Entry/profile persistence (on-device and remote backends)
//! - `pipeline`: Orchestration and the historical-query path
//! - `domain`: Data structures (JournalEntry, UserProfile, PsychMetrics)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Record an entry
//! vocalog record memo.m4a --tag work
//!
//! # Ask over the history
//! vocalog ask "how did last week feel?"
//!
//! # Back up and restore
//! vocalog export -o backup.json
//! vocalog import backup.json
//! ```

pub mod analysis;
pub mod capture;
pub mod cli;
pub mod config;
pub mod domain;
pub mod pipeline;
pub mod store;

// Re-export main types at crate root for convenience
pub use analysis::{AnalysisClient, AnalysisError, EntryContext, EntrySnapshot, HttpAnalysisClient};
pub use capture::{
    AudioCaptureController, AudioSource, CaptureContext, CaptureError, Clip, ContextTag,
    FileSource, RecorderState,
};
pub use domain::{
    Coordinates, JournalEntry, MaslowLevel, ProcessedMetadata, PsychMetrics, Sentiment,
    UserProfile,
};
pub use pipeline::{JournalPipeline, PipelineError, EMPTY_HISTORY_GUIDANCE, QUERY_APOLOGY};
pub use store::{
    ExportDocument, JournalStore, LocalStore, RemoteStore, StoreCapabilities, StoreError,
    LOCAL_RETENTION_CAP,
};
