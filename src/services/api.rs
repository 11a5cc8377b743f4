use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde_json::json;

use crate::editor::event::{ApiOutcome, ApiPayload, ApiRequest};
use crate::editor::pipeline::Stage;
use crate::editor::segment::{AnalysisPatch, Segment, TtsOptions};

/// Remote failures, normalized at the client boundary. An authorization
/// failure is just a `Status` here; the controller treats it like any other
/// transient remote error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("request failed: {0}")]
    Network(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl ApiError {
    /// The message worth showing the user; servers put theirs in `detail`.
    pub fn message(&self) -> &str {
        match self {
            Self::Status { message, .. } => message,
            Self::Network(message) => message,
        }
    }
}

/// HTTP client for the external processing service. Every stage endpoint
/// returns the full updated segment.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Map a non-success response to `ApiError::Status`, pulling the
    /// service's `detail` body when present.
    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.json::<serde_json::Value>().await {
            Ok(body) => body
                .get("detail")
                .and_then(|d| d.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string()),
            Err(_) => status.to_string(),
        };
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn segment_from(response: Response) -> Result<Segment, ApiError> {
        Ok(Self::check(response).await?.json::<Segment>().await?)
    }

    pub async fn create_segment(
        &self,
        project_id: &str,
        start_time: f64,
        end_time: f64,
    ) -> Result<Segment, ApiError> {
        let response = self
            .auth(self.client.post(self.url(&format!("/projects/{project_id}/segments"))))
            .json(&json!({ "start_time": start_time, "end_time": end_time }))
            .send()
            .await?;
        Self::segment_from(response).await
    }

    pub async fn list_segments(&self, project_id: &str) -> Result<Vec<Segment>, ApiError> {
        let response = self
            .auth(self.client.get(self.url(&format!("/projects/{project_id}/segments"))))
            .send()
            .await?;
        Ok(Self::check(response).await?.json::<Vec<Segment>>().await?)
    }

    pub async fn delete_segment(&self, segment_id: &str) -> Result<(), ApiError> {
        let response = self
            .auth(self.client.delete(self.url(&format!("/segments/{segment_id}"))))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn extract_segment(&self, segment_id: &str) -> Result<Segment, ApiError> {
        let response = self
            .auth(self.client.post(self.url(&format!("/segments/{segment_id}/extract"))))
            .send()
            .await?;
        Self::segment_from(response).await
    }

    pub async fn analyze_segment(&self, segment_id: &str) -> Result<Segment, ApiError> {
        let response = self
            .auth(self.client.post(self.url(&format!("/segments/{segment_id}/analyze"))))
            .send()
            .await?;
        Self::segment_from(response).await
    }

    pub async fn update_translation(
        &self,
        segment_id: &str,
        translated_text: &str,
    ) -> Result<Segment, ApiError> {
        let response = self
            .auth(self.client.put(self.url(&format!("/segments/{segment_id}/translation"))))
            .json(&json!({ "translated_text": translated_text }))
            .send()
            .await?;
        Self::segment_from(response).await
    }

    pub async fn update_analysis(
        &self,
        segment_id: &str,
        patch: &AnalysisPatch,
    ) -> Result<Segment, ApiError> {
        let response = self
            .auth(self.client.put(self.url(&format!("/segments/{segment_id}/analysis"))))
            .json(patch)
            .send()
            .await?;
        Self::segment_from(response).await
    }

    pub async fn generate_tts(
        &self,
        segment_id: &str,
        options: &TtsOptions,
    ) -> Result<Segment, ApiError> {
        let response = self
            .auth(self.client.post(self.url(&format!("/segments/{segment_id}/generate-tts"))))
            .json(options)
            .send()
            .await?;
        Self::segment_from(response).await
    }

    /// Authorized byte fetch for a derived audio artifact.
    pub async fn fetch_media(
        &self,
        project_id: &str,
        category: &str,
        filename: &str,
    ) -> Result<Vec<u8>, ApiError> {
        let response = self
            .auth(
                self.client
                    .get(self.url(&format!("/files/{project_id}/{category}/{filename}"))),
            )
            .send()
            .await?;
        Ok(Self::check(response).await?.bytes().await?.to_vec())
    }

    /// Execute a controller-issued request and wrap the result for the
    /// event loop.
    pub async fn execute(&self, request: ApiRequest) -> ApiOutcome {
        let seq = request.seq();
        let origin = request.origin();
        let result = match request {
            ApiRequest::CreateSegment {
                project_id,
                start_time,
                end_time,
                ..
            } => self
                .create_segment(&project_id, start_time, end_time)
                .await
                .map(ApiPayload::Segment),
            ApiRequest::RefreshSegments { project_id, .. } => self
                .list_segments(&project_id)
                .await
                .map(ApiPayload::Segments),
            ApiRequest::DeleteSegment { segment_id, .. } => self
                .delete_segment(&segment_id)
                .await
                .map(|_| ApiPayload::Deleted),
            ApiRequest::RunStage {
                segment_id,
                stage,
                tts,
                ..
            } => match stage {
                Stage::Extract => self.extract_segment(&segment_id).await,
                Stage::Analyze => self.analyze_segment(&segment_id).await,
                Stage::GenerateTts => {
                    let options = tts.unwrap_or_default();
                    self.generate_tts(&segment_id, &options).await
                }
            }
            .map(ApiPayload::Segment),
            ApiRequest::UpdateTranslation {
                segment_id, text, ..
            } => self
                .update_translation(&segment_id, &text)
                .await
                .map(ApiPayload::Segment),
            ApiRequest::UpdateAnalysis {
                segment_id, patch, ..
            } => self
                .update_analysis(&segment_id, &patch)
                .await
                .map(ApiPayload::Segment),
        };
        ApiOutcome { seq, origin, result }
    }
}
