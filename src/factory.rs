use std::sync::Arc;

use crate::providers::{GeminiAuth, GeminiProvider};
use crate::{Error, GenerationClient, GenerationConfig, DEFAULT_MODEL};

/// Region used for Vertex AI when `GOOGLE_CLOUD_REGION` is unset.
pub const DEFAULT_VERTEX_REGION: &str = "europe-west1";

/// Configuration for creating the generation client.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub auth: GeminiAuth,
    pub generation: GenerationConfig,
    /// Overrides the provider host (for testing or proxies).
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// Gemini Developer API with an API key.
    pub fn api_key(api_key: String) -> Self {
        Self::with_auth(GeminiAuth::ApiKey(api_key))
    }

    /// Vertex AI with an access token.
    pub fn vertex(project_id: String, location: String, access_token: String) -> Self {
        Self::with_auth(GeminiAuth::VertexAccessToken {
            project_id,
            location,
            access_token,
        })
    }

    /// Vertex AI with Application Default Credentials.
    pub fn vertex_with_adc(project_id: String, location: String) -> Self {
        Self::with_auth(GeminiAuth::VertexApplicationDefault {
            project_id,
            location,
        })
    }

    fn with_auth(auth: GeminiAuth) -> Self {
        Self {
            auth,
            generation: GenerationConfig::default(),
            base_url: None,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.generation.model = model.into();
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve credentials and model settings through `lookup`.
    ///
    /// `GEMINI_API_KEY` wins; otherwise `GOOGLE_CLOUD_PROJECT` selects Vertex
    /// AI, using `VERTEX_ACCESS_TOKEN` when set and ADC when not. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let config = if let Some(api_key) = var("GEMINI_API_KEY") {
            Self::api_key(api_key)
        } else if let Some(project_id) = var("GOOGLE_CLOUD_PROJECT") {
            let location =
                var("GOOGLE_CLOUD_REGION").unwrap_or_else(|| DEFAULT_VERTEX_REGION.to_string());
            match var("VERTEX_ACCESS_TOKEN") {
                Some(access_token) => Self::vertex(project_id, location, access_token),
                None => Self::vertex_with_adc(project_id, location),
            }
        } else {
            return Err(Error::config(
                "No Gemini credentials found in environment. Set GEMINI_API_KEY, or GOOGLE_CLOUD_PROJECT for Vertex AI",
            ));
        };

        let mut config = config.model(var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()));
        config.base_url = var("GEMINI_BASE_URL");
        Ok(config)
    }
}

/// Factory for creating generation clients.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a client from configuration.
    pub async fn create(config: &ProviderConfig) -> Result<Arc<dyn GenerationClient>, Error> {
        let provider = match &config.auth {
            GeminiAuth::VertexApplicationDefault {
                project_id,
                location,
            } => {
                GeminiProvider::vertex_with_adc(
                    project_id.clone(),
                    location.clone(),
                    config.generation.clone(),
                )
                .await?
            }
            auth => GeminiProvider::with_auth(auth.clone(), config.generation.clone())?,
        };

        let provider = match &config.base_url {
            Some(base_url) => provider.with_base_url(base_url.clone()),
            None => provider,
        };

        tracing::info!(model = provider.model(), "generation client ready");
        Ok(Arc::new(provider))
    }

    /// Create a client from environment variables.
    pub async fn from_env() -> Result<Arc<dyn GenerationClient>, Error> {
        let config = ProviderConfig::from_env()?;
        Self::create(&config).await
    }
}
