use futures_util::StreamExt;
use gcp_auth::TokenProvider;
use reqwest::{Client, RequestBuilder};
use std::sync::Arc;
use std::time::Duration;

use super::types::*;
use crate::accumulator::ResponseAccumulator;
use crate::provider::GenerationClient;
use crate::sse_stream::{SseEvent, SseStreamExt};
use crate::types::{FinishReason, GenerationConfig, Usage};
use crate::{Error, Prompt, Response, StreamEvent};

const PROVIDER: &str = "Gemini";
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Finish reasons that mean the output was withheld rather than completed.
const BLOCKING_FINISH_REASONS: &[&str] =
    &["SAFETY", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII", "RECITATION"];

/// Authentication method for the Gemini provider.
#[derive(Debug, Clone)]
pub enum GeminiAuth {
    /// Gemini Developer API key, sent as `x-goog-api-key`.
    ApiKey(String),
    /// Vertex AI with an access token (passed as Bearer header).
    VertexAccessToken {
        project_id: String,
        location: String,
        access_token: String,
    },
    /// Vertex AI with Application Default Credentials (ADC).
    VertexApplicationDefault { project_id: String, location: String },
}

/// Gemini generation client over the Developer API or Vertex AI.
pub struct GeminiProvider {
    client: Client,
    auth: GeminiAuth,
    auth_manager: Option<Arc<dyn TokenProvider>>,
    config: GenerationConfig,
    base_url: Option<String>,
}

impl GeminiProvider {
    /// Create a provider authenticated with a Gemini API key.
    pub fn with_api_key(api_key: String, config: GenerationConfig) -> Result<Self, Error> {
        Self::with_auth(GeminiAuth::ApiKey(api_key), config)
    }

    /// Create a provider for Vertex AI with an access token.
    pub fn vertex(
        project_id: String,
        location: String,
        access_token: String,
        config: GenerationConfig,
    ) -> Result<Self, Error> {
        Self::with_auth(
            GeminiAuth::VertexAccessToken {
                project_id,
                location,
                access_token,
            },
            config,
        )
    }

    /// Create a provider for Vertex AI with Application Default Credentials.
    pub async fn vertex_with_adc(
        project_id: String,
        location: String,
        config: GenerationConfig,
    ) -> Result<Self, Error> {
        let mut provider = Self::build(
            GeminiAuth::VertexApplicationDefault {
                project_id,
                location,
            },
            config,
        )?;
        provider.auth_manager = Some(gcp_auth::provider().await.map_err(|e| {
            Error::auth(format!("Failed to create auth manager: {e}"))
        })?);
        Ok(provider)
    }

    /// Create a provider with a static credential (sync; ADC needs `vertex_with_adc`).
    pub fn with_auth(auth: GeminiAuth, config: GenerationConfig) -> Result<Self, Error> {
        if matches!(auth, GeminiAuth::VertexApplicationDefault { .. }) {
            return Err(Error::config(
                "Use vertex_with_adc() for Application Default Credentials",
            ));
        }
        Self::build(auth, config)
    }

    /// Point the provider at a different host (for testing).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build(auth: GeminiAuth, config: GenerationConfig) -> Result<Self, Error> {
        // Only connecting is bounded here; generation time is the relay's concern.
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;

        Ok(Self {
            client,
            auth,
            auth_manager: None,
            config,
            base_url: None,
        })
    }

    /// Get the API endpoint for the configured model.
    fn get_endpoint(&self, stream: bool) -> String {
        let method = if stream {
            "streamGenerateContent"
        } else {
            "generateContent"
        };
        let sse_param = if stream { "?alt=sse" } else { "" };
        let model = &self.config.model;

        match &self.auth {
            GeminiAuth::ApiKey(_) => {
                let base = self.base_url.as_deref().unwrap_or(GEMINI_API_BASE);
                format!(
                    "{}/v1beta/models/{}:{}{}",
                    base.trim_end_matches('/'),
                    model,
                    method,
                    sse_param
                )
            }
            GeminiAuth::VertexAccessToken {
                project_id,
                location,
                ..
            }
            | GeminiAuth::VertexApplicationDefault {
                project_id,
                location,
            } => {
                let base = match &self.base_url {
                    Some(base_url) => base_url.trim_end_matches('/').to_string(),
                    None => format!("https://{location}-aiplatform.googleapis.com"),
                };
                format!(
                    "{base}/v1/projects/{project_id}/locations/{location}/publishers/google/models/{model}:{method}{sse_param}"
                )
            }
        }
    }

    /// Attach credentials based on the authentication method.
    async fn authorize(&self, request_builder: RequestBuilder) -> Result<RequestBuilder, Error> {
        match &self.auth {
            GeminiAuth::ApiKey(api_key) => Ok(request_builder.header("x-goog-api-key", api_key)),
            GeminiAuth::VertexAccessToken { access_token, .. } => {
                Ok(request_builder.header("Authorization", format!("Bearer {access_token}")))
            }
            GeminiAuth::VertexApplicationDefault { .. } => {
                let auth_manager = self
                    .auth_manager
                    .as_ref()
                    .ok_or_else(|| Error::auth("Auth manager not initialized for ADC"))?;

                let token = auth_manager
                    .token(&[CLOUD_PLATFORM_SCOPE])
                    .await
                    .map_err(|e| Error::auth(format!("Failed to get ADC token: {e}")))?;

                Ok(request_builder.header("Authorization", format!("Bearer {}", token.as_str())))
            }
        }
    }

    /// Send the prompt and return the raw response once the status is known good.
    async fn send(&self, prompt: &Prompt, stream: bool) -> Result<reqwest::Response, Error> {
        let body = GeminiRequest::user_text(prompt.as_str(), &self.config);
        let request_builder = self
            .client
            .post(self.get_endpoint(stream))
            .header("Content-Type", "application/json")
            .json(&body);

        let response = self.authorize(request_builder).await?.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::provider(
                PROVIDER,
                format!("API error ({status}): {error_text}"),
            ));
        }

        Ok(response)
    }

    /// Decode one SSE event into zero or more stream events.
    fn convert_sse_event(
        sse_event: &SseEvent,
        state: &mut GeminiStreamState,
    ) -> Vec<Result<StreamEvent, Error>> {
        let data = sse_event.data.trim();
        if sse_event.is_done() || data.is_empty() {
            return vec![];
        }

        match serde_json::from_str::<GeminiResponse>(data) {
            Ok(response) => Self::convert_response(response, state),
            Err(e) => vec![Err(Error::provider(
                PROVIDER,
                format!("Failed to parse SSE event: {e}"),
            ))],
        }
    }

    /// Map one Gemini response onto stream events. Nothing is emitted after the
    /// first terminal event.
    fn convert_response(
        response: GeminiResponse,
        state: &mut GeminiStreamState,
    ) -> Vec<Result<StreamEvent, Error>> {
        if state.finished {
            return vec![];
        }

        if let Some(feedback) = &response.prompt_feedback {
            if let Some(reason) = &feedback.block_reason {
                state.finished = true;
                return vec![Err(Error::provider(
                    PROVIDER,
                    format!(
                        "prompt blocked: {reason}{}",
                        describe_ratings(feedback.safety_ratings.as_deref())
                    ),
                ))];
            }
        }

        let usage: Usage = response
            .usage_metadata
            .map(Into::into)
            .unwrap_or_default();

        let Some(candidate) = response.candidates.first() else {
            // A usage-only chunk closes the stream.
            if usage != Usage::default() {
                state.finished = true;
                return vec![Ok(StreamEvent::Done {
                    finish_reason: FinishReason::Stop,
                    usage,
                })];
            }
            return vec![];
        };

        let mut events: Vec<Result<StreamEvent, Error>> = candidate
            .texts()
            .filter(|text| !text.is_empty())
            .map(|text| {
                Ok(StreamEvent::ContentDelta {
                    delta: text.to_string(),
                })
            })
            .collect();

        if let Some(reason) = candidate.finish_reason.as_deref() {
            state.finished = true;
            if BLOCKING_FINISH_REASONS.contains(&reason) {
                events.push(Err(Error::provider(
                    PROVIDER,
                    format!(
                        "generation stopped: {reason}{}",
                        describe_ratings(candidate.safety_ratings.as_deref())
                    ),
                )));
            } else {
                let finish_reason = match reason {
                    "MAX_TOKENS" => FinishReason::Length,
                    _ => FinishReason::Stop, // Default to Stop for unknown reasons
                };
                events.push(Ok(StreamEvent::Done {
                    finish_reason,
                    usage,
                }));
            }
        }

        events
    }
}

/// Per-stream decoding state.
#[derive(Debug, Default)]
struct GeminiStreamState {
    /// A terminal event has been emitted.
    finished: bool,
}

fn describe_ratings(ratings: Option<&[ijson::IValue]>) -> String {
    match ratings {
        Some(ratings) if !ratings.is_empty() => {
            format!("; safety ratings: {}", serde_json::to_string(ratings).unwrap_or_default())
        }
        _ => String::new(),
    }
}

#[async_trait::async_trait]
impl GenerationClient for GeminiProvider {
    async fn generate(&self, prompt: &Prompt) -> Result<String, Error> {
        let response: GeminiResponse = self.send(prompt, false).await?.json().await?;

        let mut accumulator = ResponseAccumulator::new();
        let mut state = GeminiStreamState::default();
        for event in Self::convert_response(response, &mut state) {
            accumulator.process_event(event?)?;
        }

        Ok(accumulator.finalize()?.text)
    }

    async fn generate_stream(&self, prompt: &Prompt) -> Result<Response, Error> {
        let response = self.send(prompt, true).await?;

        let mut state = GeminiStreamState::default();

        let event_stream = response
            .bytes_stream()
            .sse_events()
            .map(move |sse_result| match sse_result {
                Ok(sse_event) => Self::convert_sse_event(&sse_event, &mut state),
                Err(e) => vec![Err(e)],
            })
            .map(|events| futures_util::stream::iter(events.into_iter()))
            .flatten();

        Ok(Response::from_stream(event_stream))
    }
}
