//! Audio source abstraction and encoding negotiation.
//!
//! A source stands in for the capture device: acquiring it yields a stream
//! of encoded byte chunks. The production source reads a finished recording
//! from disk; tests script their own.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use super::CaptureError;

/// Encodings to try during negotiation, most preferred first.
/// The first one the source supports wins; otherwise the source default
/// is used.
pub const CODEC_PREFERENCES: &[&str] = &[
    "audio/webm;codecs=opus",
    "audio/webm",
    "audio/mp4",
    "audio/ogg;codecs=opus",
    "audio/mpeg",
    "audio/wav",
];

/// Pick the negotiated media type for a source.
pub fn negotiate_media_type(source: &dyn AudioSource) -> String {
    let supported = source.supported_types();
    CODEC_PREFERENCES
        .iter()
        .find(|preferred| supported.iter().any(|s| s == *preferred))
        .map(|s| s.to_string())
        .unwrap_or_else(|| source.default_type())
}

/// A capture device that can be acquired for one recording session
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Media types this source can produce
    fn supported_types(&self) -> Vec<String>;

    /// Fallback media type when no preference matches
    fn default_type(&self) -> String;

    /// Acquire the device. Failures are classified into the capture error
    /// taxonomy and leave no resource held.
    async fn acquire(&self) -> Result<Box<dyn AudioStream>, CaptureError>;
}

/// An acquired device producing ordered chunks of encoded audio
#[async_trait]
pub trait AudioStream: Send {
    /// Next chunk, or `None` once the source is drained
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, CaptureError>;

    /// Release the device. The controller guarantees this runs exactly once
    /// per acquisition, on every exit path.
    fn release(&mut self);
}

impl std::fmt::Debug for dyn AudioStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn AudioStream")
    }
}

/// A finished, in-memory recording produced by one capture session
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    /// Encoded audio bytes
    pub data: Vec<u8>,

    /// Negotiated media type, e.g. "audio/mp4"
    pub media_type: String,
}

impl Clip {
    /// Short content hash (12 hex chars) used to correlate log lines
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.data);
        let digest = hasher.finalize();
        hex::encode(&digest[..6])
    }
}

/// Source backed by a recording on disk.
///
/// The supported media type is derived from the file extension, so
/// negotiation either lands on that exact type or falls back to it.
pub struct FileSource {
    path: PathBuf,
    chunk_size: usize,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            chunk_size: 64 * 1024,
        }
    }

    /// Media type for a file path, by extension
    fn media_type_for(path: &Path) -> String {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match ext.as_str() {
            "m4a" | "mp4" => "audio/mp4",
            "webm" => "audio/webm",
            "ogg" | "oga" => "audio/ogg;codecs=opus",
            "mp3" => "audio/mpeg",
            "wav" => "audio/wav",
            _ => "application/octet-stream",
        }
        .to_string()
    }
}

#[async_trait]
impl AudioSource for FileSource {
    fn supported_types(&self) -> Vec<String> {
        vec![Self::media_type_for(&self.path)]
    }

    fn default_type(&self) -> String {
        Self::media_type_for(&self.path)
    }

    async fn acquire(&self) -> Result<Box<dyn AudioStream>, CaptureError> {
        let file = File::open(&self.path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => CaptureError::DeviceNotFound(self.path.display().to_string()),
            ErrorKind::PermissionDenied => {
                CaptureError::PermissionDenied(self.path.display().to_string())
            }
            _ => CaptureError::Device(e.to_string()),
        })?;

        Ok(Box::new(FileStream {
            file: Some(file),
            chunk_size: self.chunk_size,
        }))
    }
}

struct FileStream {
    file: Option<File>,
    chunk_size: usize,
}

#[async_trait]
impl AudioStream for FileStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
        let Some(file) = self.file.as_mut() else {
            return Ok(None);
        };

        let mut buf = vec![0u8; self.chunk_size];
        let read = file
            .read(&mut buf)
            .await
            .map_err(|e| CaptureError::Device(e.to_string()))?;

        if read == 0 {
            return Ok(None);
        }

        buf.truncate(read);
        Ok(Some(buf))
    }

    fn release(&mut self) {
        self.file = None;
    }
}
