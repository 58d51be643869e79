//! Pipeline Integration Tests
//!
//! Drives the capture → analyze → persist flow against a mocked analysis
//! client and instrumented stores.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use vocalog::analysis::{AnalysisClient, AnalysisError, EntryContext, EntrySnapshot};
use vocalog::capture::{
    AudioCaptureController, AudioSource, AudioStream, CaptureError, Clip,
};
use vocalog::domain::{
    JournalEntry, MaslowLevel, ProcessedMetadata, PsychMetrics, Sentiment, UserProfile,
};
use vocalog::pipeline::{JournalPipeline, PipelineError, EMPTY_HISTORY_GUIDANCE, QUERY_APOLOGY};
use vocalog::store::{
    ExportDocument, JournalStore, LocalStore, StoreCapabilities, StoreError,
};
use vocalog::{CaptureContext, ContextTag};

// ---------------------------------------------------------------------------
// Mocks
// ---------------------------------------------------------------------------

fn sample_metadata(facts: &[&str]) -> ProcessedMetadata {
    ProcessedMetadata {
        transcript: "Busy day, presented the quarterly numbers.".to_string(),
        summary: "A demanding but satisfying workday".to_string(),
        sentiment: Sentiment::Stressed,
        tags: vec!["work".to_string()],
        key_events: vec!["quarterly presentation".to_string()],
        extracted_facts: facts.iter().map(|s| s.to_string()).collect(),
        psychometrics: PsychMetrics {
            valence: -0.2,
            arousal: 0.8,
            cbt_distortions: vec!["catastrophizing".to_string()],
            maslow_level: MaslowLevel::Esteem,
        },
    }
}

/// Scripted analysis client with call counters
struct MockClient {
    extract_calls: AtomicUsize,
    query_calls: AtomicUsize,
    metadata: ProcessedMetadata,
    fail_query: bool,
}

impl MockClient {
    fn returning(metadata: ProcessedMetadata) -> Self {
        Self {
            extract_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
            metadata,
            fail_query: false,
        }
    }
}

#[async_trait]
impl AnalysisClient for MockClient {
    async fn extract(
        &self,
        _clip: &Clip,
        _context: &EntryContext,
    ) -> Result<ProcessedMetadata, AnalysisError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.metadata.clone())
    }

    async fn query(
        &self,
        _history: &[EntrySnapshot],
        _profile_facts: &[String],
        _question: &str,
    ) -> Result<String, AnalysisError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_query {
            return Err(AnalysisError::EmptyResponse);
        }
        Ok("You sounded stressed but engaged.".to_string())
    }
}

/// Store wrapper that counts every write-path invocation
struct CountingStore {
    inner: LocalStore,
    writes: AtomicUsize,
}

impl CountingStore {
    fn new(inner: LocalStore) -> Self {
        Self {
            inner,
            writes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl JournalStore for CountingStore {
    fn capabilities(&self) -> StoreCapabilities {
        self.inner.capabilities()
    }

    async fn save_entry(&self, entry: &JournalEntry) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.save_entry(entry).await
    }

    async fn entries(&self) -> Vec<JournalEntry> {
        self.inner.entries().await
    }

    async fn profile(&self) -> UserProfile {
        self.inner.profile().await
    }

    async fn update_profile(&self, new_facts: &[String]) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update_profile(new_facts).await
    }

    async fn clear_history(&self) -> Result<(), StoreError> {
        self.inner.clear_history().await
    }

    async fn export_data(&self) -> Result<ExportDocument, StoreError> {
        self.inner.export_data().await
    }

    async fn import_data(&self, document: &serde_json::Value) -> Result<(), StoreError> {
        self.inner.import_data(document).await
    }
}

/// Store whose profile merge always fails, entry saves succeed
struct BrokenMergeStore {
    inner: LocalStore,
}

#[async_trait]
impl JournalStore for BrokenMergeStore {
    fn capabilities(&self) -> StoreCapabilities {
        self.inner.capabilities()
    }

    async fn save_entry(&self, entry: &JournalEntry) -> Result<(), StoreError> {
        self.inner.save_entry(entry).await
    }

    async fn entries(&self) -> Vec<JournalEntry> {
        self.inner.entries().await
    }

    async fn profile(&self) -> UserProfile {
        self.inner.profile().await
    }

    async fn update_profile(&self, _new_facts: &[String]) -> Result<(), StoreError> {
        Err(StoreError::Write("profile collection unavailable".to_string()))
    }

    async fn clear_history(&self) -> Result<(), StoreError> {
        self.inner.clear_history().await
    }

    async fn export_data(&self) -> Result<ExportDocument, StoreError> {
        self.inner.export_data().await
    }

    async fn import_data(&self, document: &serde_json::Value) -> Result<(), StoreError> {
        self.inner.import_data(document).await
    }
}

/// Audio source serving scripted chunks
struct ScriptedSource {
    chunks: Vec<Vec<u8>>,
}

struct ScriptedStream {
    chunks: std::vec::IntoIter<Vec<u8>>,
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
        Ok(Box::new(ScriptedStream {
            chunks: self.chunks.clone().into_iter(),
        }))
    }
}

#[async_trait]
impl AudioStream for ScriptedStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
        Ok(self.chunks.next())
    }

    fn release(&mut self) {}
}

fn test_context() -> CaptureContext {
    CaptureContext {
        tag: ContextTag::Work,
        label: "Office/Work".to_string(),
        coordinates: None,
    }
}

fn local_store(temp: &TempDir) -> LocalStore {
    LocalStore::open(temp.path().join("journal.json")).unwrap()
}

// ---------------------------------------------------------------------------
// Entry creation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_full_flow_persists_entry_and_facts() {
    let temp = TempDir::new().unwrap();
    let client = Arc::new(MockClient::returning(sample_metadata(&[
        "dreads public speaking",
    ])));
    let store = Arc::new(CountingStore::new(local_store(&temp)));
    let pipeline = JournalPipeline::new(client.clone(), store.clone());

    let mut controller = AudioCaptureController::new(ScriptedSource {
        chunks: vec![b"audio".to_vec()],
    });

    let entry = pipeline
        .record(&mut controller, &test_context())
        .await
        .unwrap();

    assert_eq!(entry.location_name, "Work (Office/Work)");
    assert_eq!(client.extract_calls.load(Ordering::SeqCst), 1);

    // Entry persisted and facts merged, as two writes
    assert_eq!(store.writes.load(Ordering::SeqCst), 2);
    assert_eq!(store.entries().await.len(), 1);
    assert_eq!(
        store.profile().await.core_memories,
        vec!["dreads public speaking".to_string()]
    );
}

#[tokio::test]
async fn test_zero_byte_capture_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let client = Arc::new(MockClient::returning(sample_metadata(&[])));
    let store = Arc::new(CountingStore::new(local_store(&temp)));
    let pipeline = JournalPipeline::new(client.clone(), store.clone());

    let mut controller = AudioCaptureController::new(ScriptedSource { chunks: vec![] });

    let err = pipeline
        .record(&mut controller, &test_context())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Capture(CaptureError::EmptyRecording)
    ));

    // No analysis call and zero store writes
    assert_eq!(client.extract_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_out_of_range_metadata_rejected_before_entry() {
    let temp = TempDir::new().unwrap();
    let mut metadata = sample_metadata(&["fact"]);
    metadata.psychometrics.valence = 1.7;

    let client = Arc::new(MockClient::returning(metadata));
    let store = Arc::new(CountingStore::new(local_store(&temp)));
    let pipeline = JournalPipeline::new(client, store.clone());

    let clip = Clip {
        data: b"audio".to_vec(),
        media_type: "audio/webm".to_string(),
    };

    let err = pipeline
        .process_clip(&clip, &test_context())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Analysis(AnalysisError::Schema(_))
    ));
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_merge_is_named_and_entry_survives() {
    let temp = TempDir::new().unwrap();
    let client = Arc::new(MockClient::returning(sample_metadata(&["fact"])));
    let store = Arc::new(BrokenMergeStore {
        inner: local_store(&temp),
    });
    let pipeline = JournalPipeline::new(client, store.clone());

    let clip = Clip {
        data: b"audio".to_vec(),
        media_type: "audio/webm".to_string(),
    };

    let err = pipeline
        .process_clip(&clip, &test_context())
        .await
        .unwrap_err();

    let entries = store.entries().await;
    assert_eq!(entries.len(), 1, "entry write is not rolled back");

    match err {
        PipelineError::ProfileMerge { entry_id, .. } => {
            assert_eq!(entry_id, entries[0].id);
        }
        other => panic!("expected ProfileMerge, got {other:?}"),
    }
}

#[tokio::test]
async fn test_entry_without_facts_skips_merge_write() {
    let temp = TempDir::new().unwrap();
    let client = Arc::new(MockClient::returning(sample_metadata(&[])));
    let store = Arc::new(CountingStore::new(local_store(&temp)));
    let pipeline = JournalPipeline::new(client, store.clone());

    let clip = Clip {
        data: b"audio".to_vec(),
        media_type: "audio/webm".to_string(),
    };

    pipeline.process_clip(&clip, &test_context()).await.unwrap();

    // update_profile is invoked but a no-op; the profile stays absent
    assert!(store.profile().await.core_memories.is_empty());
    assert_eq!(store.entries().await.len(), 1);
}

// ---------------------------------------------------------------------------
// Historical queries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_empty_history_query_skips_client() {
    let temp = TempDir::new().unwrap();
    let client = Arc::new(MockClient::returning(sample_metadata(&[])));
    let store = Arc::new(CountingStore::new(local_store(&temp)));
    let pipeline = JournalPipeline::new(client.clone(), store);

    let answer = pipeline.query_history("how was my week?").await;

    assert_eq!(answer, EMPTY_HISTORY_GUIDANCE);
    assert_eq!(client.query_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_query_over_history_reaches_client() {
    let temp = TempDir::new().unwrap();
    let client = Arc::new(MockClient::returning(sample_metadata(&["fact"])));
    let store = Arc::new(CountingStore::new(local_store(&temp)));
    let pipeline = JournalPipeline::new(client.clone(), store);

    let clip = Clip {
        data: b"audio".to_vec(),
        media_type: "audio/webm".to_string(),
    };
    pipeline.process_clip(&clip, &test_context()).await.unwrap();

    let answer = pipeline.query_history("how was my week?").await;

    assert_eq!(answer, "You sounded stressed but engaged.");
    assert_eq!(client.query_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_query_failure_degrades_to_apology() {
    let temp = TempDir::new().unwrap();
    let mut client = MockClient::returning(sample_metadata(&[]));
    client.fail_query = true;
    let client = Arc::new(client);
    let store = Arc::new(CountingStore::new(local_store(&temp)));
    let pipeline = JournalPipeline::new(client, store);

    let clip = Clip {
        data: b"audio".to_vec(),
        media_type: "audio/webm".to_string(),
    };
    pipeline.process_clip(&clip, &test_context()).await.unwrap();

    let answer = pipeline.query_history("anything").await;
    assert_eq!(answer, QUERY_APOLOGY);
}
