use crate::{Error, Prompt, Response};

/// The capability the relay needs from a generative-model backend.
///
/// `generate_stream` hands back a lazy, ordered event stream that ends with
/// `StreamEvent::Done`; a failure inside the stream arrives as an `Err` item or
/// `StreamEvent::Error`, never as `Done`.
#[async_trait::async_trait]
pub trait GenerationClient: Send + Sync + 'static {
    /// Buffered generation: the full text, or the provider's error.
    async fn generate(&self, prompt: &Prompt) -> Result<String, Error> {
        self.generate_stream(prompt).await?.text().await
    }

    /// Streaming generation.
    async fn generate_stream(&self, prompt: &Prompt) -> Result<Response, Error>;
}
