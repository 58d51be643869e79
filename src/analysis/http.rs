//! HTTP analysis client.
//!
//! Talks to the extraction/query service over REST: the clip goes up as a
//! multipart upload with a JSON context part, queries as a plain JSON body.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capture::Clip;
use crate::domain::ProcessedMetadata;

use super::{validate_metadata, AnalysisClient, AnalysisError, EntryContext, EntrySnapshot};

/// Client for the remote analysis service
pub struct HttpAnalysisClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

/// Query request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    history_projection: &'a [EntrySnapshot],
    profile_facts: &'a [String],
    query: &'a str,
}

/// Query response body
#[derive(Debug, Deserialize)]
struct QueryResponse {
    answer: String,
}

impl HttpAnalysisClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    async fn extract(
        &self,
        clip: &Clip,
        context: &EntryContext,
    ) -> Result<ProcessedMetadata, AnalysisError> {
        debug!(
            fingerprint = %clip.fingerprint(),
            media_type = %clip.media_type,
            "sending clip for extraction"
        );

        let audio_part = Part::bytes(clip.data.clone())
            .file_name("clip")
            .mime_str(&clip.media_type)?;

        let context_json = serde_json::to_string(context)
            .map_err(|e| AnalysisError::Schema(format!("context serialization: {e}")))?;

        let form = Form::new()
            .part("audio", audio_part)
            .text("context", context_json);

        let response = self
            .client
            .post(self.endpoint("v1/extract"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(AnalysisError::EmptyResponse);
        }

        let metadata: ProcessedMetadata = serde_json::from_str(&body)
            .map_err(|e| AnalysisError::Schema(e.to_string()))?;

        validate_metadata(&metadata)?;
        Ok(metadata)
    }

    async fn query(
        &self,
        history: &[EntrySnapshot],
        profile_facts: &[String],
        question: &str,
    ) -> Result<String, AnalysisError> {
        let request = QueryRequest {
            history_projection: history,
            profile_facts,
            query: question,
        };

        let response = self
            .client
            .post(self.endpoint("v1/query"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(AnalysisError::EmptyResponse);
        }

        let parsed: QueryResponse =
            serde_json::from_str(&body).map_err(|e| AnalysisError::Schema(e.to_string()))?;

        Ok(parsed.answer)
    }
}
