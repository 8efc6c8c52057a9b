//! REST-backed completion provider.
//!
//! Targets chat-completions style endpoints: single-shot calls constrain the
//! reply with a `json_schema` response format, streamed calls read `data:`
//! lines off the response body and forward each delta as one fragment.
//! Dropping the fragment stream drops the HTTP response, which closes the
//! connection and stops the generation call.

use async_trait::async_trait;
use futures_util::{StreamExt, future, stream};
use serde::Deserialize;
use url::Url;

use crate::types::RagError;

use super::generator::{CompletionProvider, FragmentStream, GenerationParams};

/// Generative model reached over HTTP.
#[derive(Clone, Debug)]
pub struct HttpCompletionProvider {
    client: reqwest::Client,
    endpoint: Url,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

impl HttpCompletionProvider {
    pub fn new(endpoint: Url, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            model: model.into(),
            api_key: None,
        }
    }

    /// Sends `Authorization: Bearer <key>` with every call.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Reuses an existing client (connection pooling, TLS settings).
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn request_body(
        &self,
        prompt: &str,
        params: &GenerationParams,
        stream: bool,
    ) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": params.temperature,
            "max_tokens": params.max_output_tokens,
            "top_k": params.top_k,
            "stream": stream,
        })
    }

    fn post(&self, body: &serde_json::Value) -> reqwest::RequestBuilder {
        let mut request = self.client.post(self.endpoint.clone()).json(body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }
        request
    }
}

#[async_trait]
impl CompletionProvider for HttpCompletionProvider {
    async fn generate(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        params: &GenerationParams,
    ) -> Result<String, RagError> {
        let mut body = self.request_body(prompt, params, false);
        body["response_format"] = serde_json::json!({
            "type": "json_schema",
            "json_schema": {"name": "grounded_answer", "schema": schema},
        });

        let response: CompletionResponse = self
            .post(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| RagError::Generation("completion reply held no choices".to_string()))
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<FragmentStream, RagError> {
        let body = self.request_body(prompt, params, true);
        let response = self.post(&body).send().await?.error_for_status()?;

        let fragments = response
            .bytes_stream()
            .map(Some)
            .chain(stream::iter([None]))
            .scan(String::new(), |buffer, next| {
                let emitted = match next {
                    Some(Ok(bytes)) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                        drain_sse_fragments(buffer)
                    }
                    Some(Err(err)) => vec![Err(RagError::Http(err))],
                    // Body ended: a residual unterminated line is still a line.
                    None => {
                        if !buffer.is_empty() {
                            buffer.push('\n');
                        }
                        drain_sse_fragments(buffer)
                    }
                };
                future::ready(Some(stream::iter(emitted)))
            })
            .flatten()
            .boxed();

        Ok(fragments)
    }
}

/// Pulls complete `data:` lines out of the buffer and maps each delta to a
/// fragment. Partial lines stay buffered for the next read.
fn drain_sse_fragments(buffer: &mut String) -> Vec<Result<String, RagError>> {
    let mut fragments = Vec::new();
    while let Some(newline) = buffer.find('\n') {
        let line: String = buffer.drain(..=newline).collect();
        let line = line.trim();
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        if data == "[DONE]" {
            break;
        }
        match serde_json::from_str::<StreamChunk>(data) {
            Ok(chunk) => {
                let content = chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta.content);
                if let Some(content) = content {
                    if !content.is_empty() {
                        fragments.push(Ok(content));
                    }
                }
            }
            Err(err) => fragments.push(Err(RagError::Generation(err.to_string()))),
        }
    }
    fragments
}
