//! Audio capture.
//!
//! This module turns a capture device into a finished clip:
//!
//! 1. **Source**: device abstraction + encoding negotiation
//! 2. **Controller**: the recording state machine
//! 3. **Location**: situational context resolved alongside the recording
//!
//! ```text
//! AudioSource → Controller (Idle→Recording→Processing) → Clip
//! ```
//!
//! Capture failures are non-fatal: the caller can retry immediately, and
//! no partial entry is ever persisted for a failed capture.

pub mod controller;
pub mod location;
pub mod source;

use thiserror::Error;

// Re-export key types
pub use controller::{AudioCaptureController, RecorderState};
pub use location::{resolve_label, CaptureContext, ContextTag};
pub use source::{negotiate_media_type, AudioSource, AudioStream, Clip, FileSource};

/// Errors from the capture layer
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("capture device not found: {0}")]
    DeviceNotFound(String),

    #[error("recording produced no audio data")]
    EmptyRecording,

    #[error("capture device error: {0}")]
    Device(String),

    #[error("recorder is {actual:?}, operation requires {expected}")]
    InvalidState {
        expected: &'static str,
        actual: RecorderState,
    },
}
