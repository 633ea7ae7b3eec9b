use crate::types::{GenerationConfig, Usage};
use ijson::IValue;
use serde::{Deserialize, Serialize};

/// Gemini `generateContent` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiGenerationConfig>,
}

impl GeminiRequest {
    /// A single user turn carrying the whole prompt.
    pub fn user_text(text: impl Into<String>, config: &GenerationConfig) -> Self {
        Self {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart { text: text.into() }],
            }],
            generation_config: GeminiGenerationConfig::from_config(config),
        }
    }
}

/// Gemini content (message) format.
#[derive(Debug, Clone, Serialize)]
pub struct GeminiContent {
    pub role: String, // "user", "model"
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeminiPart {
    pub text: String,
}

/// Gemini generation configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl GeminiGenerationConfig {
    /// `None` when every sampling knob is left to the model's defaults.
    fn from_config(config: &GenerationConfig) -> Option<Self> {
        if config.temperature.is_none()
            && config.max_output_tokens.is_none()
            && config.top_p.is_none()
        {
            return None;
        }

        Some(Self {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            top_p: config.top_p,
        })
    }
}

/// Gemini API response; each SSE event carries one of these.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    pub prompt_feedback: Option<GeminiPromptFeedback>,
    pub usage_metadata: Option<GeminiUsageMetadata>,
}

/// Gemini response candidate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    pub content: Option<GeminiCandidateContent>,
    pub finish_reason: Option<String>,
    pub safety_ratings: Option<Vec<IValue>>,
}

impl GeminiCandidate {
    /// Text parts in order; non-text parts are skipped.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.content
            .iter()
            .flat_map(|content| &content.parts)
            .filter_map(|part| part.text.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiCandidateContent {
    #[serde(default)]
    pub parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiCandidatePart {
    pub text: Option<String>,
}

/// Present when the prompt itself was refused.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPromptFeedback {
    pub block_reason: Option<String>,
    pub safety_ratings: Option<Vec<IValue>>,
}

/// Gemini usage metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiUsageMetadata {
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
    pub total_token_count: Option<u32>,
}

impl From<GeminiUsageMetadata> for Usage {
    fn from(metadata: GeminiUsageMetadata) -> Self {
        Usage {
            input_tokens: metadata.prompt_token_count.unwrap_or(0),
            output_tokens: metadata.candidates_token_count.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let config = GenerationConfig::default().temperature(0.4);
        let request = GeminiRequest::user_text("Hello", &config);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Hello");
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.4).abs() < 1e-6);
        assert!(json["generationConfig"].get("topP").is_none());
    }

    #[test]
    fn test_generation_config_omitted_when_unset() {
        let request = GeminiRequest::user_text("Hello", &GenerationConfig::default());
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_response_tolerates_missing_fields() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":3}}"#,
        )
        .unwrap();

        let candidate = &response.candidates[0];
        assert_eq!(candidate.texts().count(), 0);
        assert_eq!(candidate.finish_reason.as_deref(), Some("STOP"));

        let usage: Usage = response.usage_metadata.unwrap().into();
        assert_eq!(usage.input_tokens, 3);
        assert_eq!(usage.output_tokens, 0);
    }

    #[test]
    fn test_blocked_prompt_response() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"promptFeedback":{"blockReason":"SAFETY","safetyRatings":[{"category":"HARM_CATEGORY_DANGEROUS_CONTENT","probability":"HIGH"}]}}"#,
        )
        .unwrap();

        assert!(response.candidates.is_empty());
        let feedback = response.prompt_feedback.unwrap();
        assert_eq!(feedback.block_reason.as_deref(), Some("SAFETY"));
        assert_eq!(feedback.safety_ratings.unwrap().len(), 1);
    }
}
