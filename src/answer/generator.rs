//! Generative model collaborator boundary.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};

use crate::types::RagError;

/// Ordered fragments of a streamed answer. Dropping the stream cancels the
/// underlying generation call.
pub type FragmentStream = BoxStream<'static, Result<String, RagError>>;

/// Fixed generation policy for grounded answering.
///
/// These are not caller-tunable: a low temperature favors low-variance
/// grounded output, the token ceiling is hard cost control enforced by the
/// call itself, and `top_k` bounds token-selection breadth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_k: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_output_tokens: 1100,
            top_k: 40,
        }
    }
}

/// Collaborator boundary for the generative model.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// One generation call constrained to `schema`; returns the raw model
    /// output for the caller to parse.
    async fn generate(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        params: &GenerationParams,
    ) -> Result<String, RagError>;

    /// One generation call delivering incremental text fragments in order.
    async fn generate_stream(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<FragmentStream, RagError>;
}

/// Scripted provider for tests and demos.
///
/// Returns a fixed reply, streams fixed fragments, and counts calls so tests
/// can assert that short-circuit paths never reach the model.
pub struct MockCompletionProvider {
    response: String,
    fragments: Vec<String>,
    calls: AtomicUsize,
}

impl MockCompletionProvider {
    pub fn new(response: impl Into<String>) -> Self {
        let response = response.into();
        Self {
            fragments: vec![response.clone()],
            response,
            calls: AtomicUsize::new(0),
        }
    }

    /// Overrides the fragment sequence used in streaming mode.
    #[must_use]
    pub fn with_fragments(mut self, fragments: Vec<String>) -> Self {
        self.fragments = fragments;
        self
    }

    /// Number of generation calls made so far (both modes).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn generate(
        &self,
        _prompt: &str,
        _schema: &serde_json::Value,
        _params: &GenerationParams,
    ) -> Result<String, RagError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }

    async fn generate_stream(
        &self,
        _prompt: &str,
        _params: &GenerationParams,
    ) -> Result<FragmentStream, RagError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(stream::iter(self.fragments.clone().into_iter().map(Ok)).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_streams_fragments_in_order() {
        let provider = MockCompletionProvider::new("full answer")
            .with_fragments(vec!["full ".to_string(), "answer".to_string()]);

        let mut stream = provider
            .generate_stream("prompt", &GenerationParams::default())
            .await
            .unwrap();

        let mut collected = Vec::new();
        while let Some(fragment) = stream.next().await {
            collected.push(fragment.unwrap());
        }
        assert_eq!(collected, vec!["full ", "answer"]);
        assert_eq!(provider.calls(), 1);
    }
}
