//! Recording state machine.
//!
//! The controller owns one capture session at a time:
//!
//! ```text
//! Idle → Initializing → Recording → Stopping → Processing → Idle
//!             ↓                                    ↓
//!           Error ←────────────────────────────────┘
//! ```
//!
//! The acquired device is held in a guard that releases it exactly once on
//! every exit path from `Recording`, including drops mid-error.

use std::time::Instant;

use tracing::{debug, warn};

use super::source::{negotiate_media_type, AudioSource, AudioStream, Clip};
use super::CaptureError;

/// Current state of the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Initializing,
    Recording,
    Stopping,
    Processing,
    Error,
}

/// Guard around an acquired stream. Releases the device on drop unless it
/// was already released explicitly.
struct StreamGuard {
    stream: Option<Box<dyn AudioStream>>,
}

impl StreamGuard {
    fn new(stream: Box<dyn AudioStream>) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
        match self.stream.as_mut() {
            Some(stream) => stream.next_chunk().await,
            None => Ok(None),
        }
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
        }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Owns the capture state machine for one source
pub struct AudioCaptureController<S: AudioSource> {
    source: S,
    state: RecorderState,
    stream: Option<StreamGuard>,
    chunks: Vec<Vec<u8>>,
    media_type: Option<String>,
    recording_since: Option<Instant>,
}

impl<S: AudioSource> AudioCaptureController<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: RecorderState::Idle,
            stream: None,
            chunks: Vec::new(),
            media_type: None,
            recording_since: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Whole seconds since recording started. UI-only; not used for
    /// correctness anywhere.
    pub fn elapsed_secs(&self) -> u64 {
        self.recording_since
            .map(|since| since.elapsed().as_secs())
            .unwrap_or(0)
    }

    /// Acquire the device and begin recording. Valid only from `Idle`.
    ///
    /// On failure the classified error is returned, the state moves to
    /// `Error`, and no resource is held.
    pub async fn start(&mut self) -> Result<(), CaptureError> {
        if self.state != RecorderState::Idle {
            return Err(CaptureError::InvalidState {
                expected: "Idle",
                actual: self.state,
            });
        }

        self.state = RecorderState::Initializing;

        let stream = match self.source.acquire().await {
            Ok(stream) => stream,
            Err(e) => {
                self.state = RecorderState::Error;
                return Err(e);
            }
        };

        let media_type = negotiate_media_type(&self.source);
        debug!(%media_type, "recording started");

        self.stream = Some(StreamGuard::new(stream));
        self.media_type = Some(media_type);
        self.chunks.clear();
        self.recording_since = Some(Instant::now());
        self.state = RecorderState::Recording;

        Ok(())
    }

    /// Pull the next chunk into the buffer. Valid only while `Recording`.
    ///
    /// Returns `false` once the source is drained. A device failure
    /// releases the device and moves the recorder to `Error`.
    pub async fn pump(&mut self) -> Result<bool, CaptureError> {
        if self.state != RecorderState::Recording {
            return Err(CaptureError::InvalidState {
                expected: "Recording",
                actual: self.state,
            });
        }

        let Some(guard) = self.stream.as_mut() else {
            return Ok(false);
        };

        match guard.next_chunk().await {
            Ok(Some(chunk)) => {
                self.chunks.push(chunk);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => {
                warn!(error = %e, "device failed mid-recording");
                if let Some(mut guard) = self.stream.take() {
                    guard.release();
                }
                self.recording_since = None;
                self.state = RecorderState::Error;
                Err(e)
            }
        }
    }

    /// Stop recording and produce the finished clip. Valid only from
    /// `Recording`. The device is released before the clip is assembled.
    ///
    /// A zero-length clip fails with `EmptyRecording`; nothing downstream
    /// sees it.
    pub async fn stop(&mut self) -> Result<Clip, CaptureError> {
        if self.state != RecorderState::Recording {
            return Err(CaptureError::InvalidState {
                expected: "Recording",
                actual: self.state,
            });
        }

        self.state = RecorderState::Stopping;

        if let Some(mut guard) = self.stream.take() {
            guard.release();
        }
        self.recording_since = None;

        let data: Vec<u8> = self.chunks.drain(..).flatten().collect();
        let media_type = self
            .media_type
            .take()
            .unwrap_or_else(|| self.source.default_type());

        self.state = RecorderState::Processing;

        if data.is_empty() {
            self.state = RecorderState::Error;
            return Err(CaptureError::EmptyRecording);
        }

        let clip = Clip { data, media_type };
        debug!(fingerprint = %clip.fingerprint(), bytes = clip.data.len(), "clip assembled");
        Ok(clip)
    }

    /// Return to `Idle` once the pipeline result for the current clip is
    /// known, or to recover from `Error`.
    pub fn reset(&mut self) {
        if let Some(mut guard) = self.stream.take() {
            guard.release();
        }
        self.chunks.clear();
        self.media_type = None;
        self.recording_since = None;
        self.state = RecorderState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;

    /// Source that serves a scripted set of chunks and counts releases
    struct ScriptedSource {
        chunks: Vec<Vec<u8>>,
        releases: Arc<AtomicUsize>,
        fail_acquire: Option<CaptureError>,
    }

    impl ScriptedSource {
        fn new(chunks: Vec<Vec<u8>>) -> (Self, Arc<AtomicUsize>) {
            let releases = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    chunks,
                    releases: releases.clone(),
                    fail_acquire: None,
                },
                releases,
            )
        }
    }

    struct ScriptedStream {
        chunks: std::vec::IntoIter<Vec<u8>>,
        releases: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AudioSource for ScriptedSource {
        fn supported_types(&self) -> Vec<String> {
            vec!["audio/webm".to_string()]
        }

        fn default_type(&self) -> String {
            "audio/webm".to_string()
        }

        async fn acquire(&self) -> Result<Box<dyn AudioStream>, CaptureError> {
            if let Some(err) = &self.fail_acquire {
                return Err(match err {
                    CaptureError::PermissionDenied(s) => {
                        CaptureError::PermissionDenied(s.clone())
                    }
                    CaptureError::DeviceNotFound(s) => CaptureError::DeviceNotFound(s.clone()),
                    _ => CaptureError::Device("scripted".to_string()),
                });
            }
            Ok(Box::new(ScriptedStream {
                chunks: self.chunks.clone().into_iter(),
                releases: self.releases.clone(),
            }))
        }
    }

    #[async_trait]
    impl AudioStream for ScriptedStream {
        async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
            Ok(self.chunks.next())
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_full_recording_cycle() {
        let (source, releases) = ScriptedSource::new(vec![b"ab".to_vec(), b"cd".to_vec()]);
        let mut controller = AudioCaptureController::new(source);

        assert_eq!(controller.state(), RecorderState::Idle);

        controller.start().await.unwrap();
        assert_eq!(controller.state(), RecorderState::Recording);

        while controller.pump().await.unwrap() {}

        let clip = controller.stop().await.unwrap();
        assert_eq!(clip.data, b"abcd");
        assert_eq!(clip.media_type, "audio/webm");
        assert_eq!(controller.state(), RecorderState::Processing);

        controller.reset();
        assert_eq!(controller.state(), RecorderState::Idle);

        // Device released exactly once
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_start_invalid_outside_idle() {
        let (source, _) = ScriptedSource::new(vec![b"x".to_vec()]);
        let mut controller = AudioCaptureController::new(source);

        controller.start().await.unwrap();
        let err = controller.start().await.unwrap_err();
        assert!(matches!(err, CaptureError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_stop_invalid_from_idle() {
        let (source, _) = ScriptedSource::new(vec![]);
        let mut controller = AudioCaptureController::new(source);

        let err = controller.stop().await.unwrap_err();
        assert!(matches!(err, CaptureError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_empty_recording_fails() {
        let (source, releases) = ScriptedSource::new(vec![]);
        let mut controller = AudioCaptureController::new(source);

        controller.start().await.unwrap();
        assert!(!controller.pump().await.unwrap());

        let err = controller.stop().await.unwrap_err();
        assert!(matches!(err, CaptureError::EmptyRecording));
        assert_eq!(controller.state(), RecorderState::Error);

        // Still released exactly once despite the failure
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        controller.reset();
        assert_eq!(controller.state(), RecorderState::Idle);
    }

    #[tokio::test]
    async fn test_acquire_failure_moves_to_error_without_resource() {
        let (mut source, releases) = ScriptedSource::new(vec![]);
        source.fail_acquire = Some(CaptureError::PermissionDenied("mic".to_string()));
        let mut controller = AudioCaptureController::new(source);

        let err = controller.start().await.unwrap_err();
        assert!(matches!(err, CaptureError::PermissionDenied(_)));
        assert_eq!(controller.state(), RecorderState::Error);
        assert_eq!(releases.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reset_mid_recording_releases_device() {
        let (source, releases) = ScriptedSource::new(vec![b"x".to_vec()]);
        let mut controller = AudioCaptureController::new(source);

        controller.start().await.unwrap();
        controller.reset();

        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state(), RecorderState::Idle);
    }
}
