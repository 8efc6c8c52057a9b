//! Grounded answer synthesis from retrieved context.
//!
//! The answerer never invents evidence: with no retrieved context it returns
//! the canonical no-context [`Answer`] without touching the model, and with
//! context it constrains the model to a fixed JSON schema whose output is
//! machine-checked before being returned. A reply that fails the check is a
//! fatal error for that query, never silently repaired or retried.
//!
//! Streaming mode trades the schema for latency: fragments of the answer
//! text are forwarded as they arrive and no sources/confidence are available
//! to a streaming consumer.

pub mod generator;
pub mod http;

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;

use crate::types::{Answer, ContextSnippet, RagError};

pub use generator::{CompletionProvider, FragmentStream, GenerationParams, MockCompletionProvider};
pub use http::HttpCompletionProvider;

/// Soft response-length guideline communicated to the model inside the
/// schema. The hard ceiling is `GenerationParams::max_output_tokens`.
pub const RESPONSE_CHAR_LIMIT: usize = 1000;

const SYSTEM_PROMPT: &str = "\
You are a helpful assistant that answers questions based ONLY on the provided context from a vector database

Rules:
1. Do not invent facts
2. Only answer the questions using the context. If the query cannot be answered using the context, say you dont know
3. Cite sources for your answer (by using the filename in the context metadata) in the form [\"file1.txt\", \"file2.pdf\"...]
4. Answer in json format as per the answer format instructions below";

/// JSON schema the generation call is constrained to.
pub fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "description": "json response schema for model",
        "properties": {
            "response": {
                "type": "string",
                "description": "Answer to the users question based on the context",
                "maxLength": RESPONSE_CHAR_LIMIT,
            },
            "sources": {
                "type": "array",
                "items": {"type": "string"},
                "description": "List of source filenames used",
                "minItems": 0,
            },
            "confidence": {
                "type": "number",
                "description": "Confidence in answer (0.0-1.0)",
                "minimum": 0.0,
                "maximum": 1.0,
            }
        },
        "required": ["response", "sources", "confidence"]
    })
}

/// Grounding prompt: system rules, the question, and the serialized evidence.
pub fn build_prompt(query: &str, context: &[ContextSnippet]) -> String {
    let context_json =
        serde_json::to_string(context).unwrap_or_else(|_| "[]".to_string());
    format!("{SYSTEM_PROMPT}\n\nquestion: {query}\n\ncontext: {context_json}")
}

/// Result of a streamed query.
pub enum StreamedAnswer {
    /// Retrieval found nothing; the canonical answer, no generation call made.
    NoContext(Answer),
    /// Incremental fragments of the answer text, in delivery order.
    Fragments(FragmentStream),
}

#[derive(Debug, Deserialize)]
struct AnswerPayload {
    response: String,
    sources: Vec<String>,
    confidence: f32,
}

/// Turns a query plus retrieved context into a grounded answer.
pub struct Answerer {
    provider: Arc<dyn CompletionProvider>,
    params: GenerationParams,
}

impl Answerer {
    /// Generation parameters are fixed policy, not caller-tunable.
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            params: GenerationParams::default(),
        }
    }

    /// Single-shot mode: one generation call, parsed and validated against
    /// the answer schema.
    pub async fn answer(
        &self,
        query: &str,
        context: &[ContextSnippet],
    ) -> Result<Answer, RagError> {
        if context.is_empty() {
            tracing::debug!("no retrieved context, returning canonical answer");
            return Ok(Answer::no_context());
        }

        let prompt = build_prompt(query, context);
        let raw = self
            .provider
            .generate(&prompt, &response_schema(), &self.params)
            .await?;
        parse_answer(&raw, context)
    }

    /// Streaming mode: fragments are forwarded as produced, with no schema
    /// parsing. Dropping the returned stream cancels the generation call.
    pub async fn answer_stream(
        &self,
        query: &str,
        context: &[ContextSnippet],
    ) -> Result<StreamedAnswer, RagError> {
        if context.is_empty() {
            tracing::debug!("no retrieved context, returning canonical answer");
            return Ok(StreamedAnswer::NoContext(Answer::no_context()));
        }

        let prompt = build_prompt(query, context);
        let fragments = self.provider.generate_stream(&prompt, &self.params).await?;
        Ok(StreamedAnswer::Fragments(fragments))
    }
}

/// Parses and validates a raw generation reply.
///
/// Rejections: unparsable JSON, missing fields, confidence outside
/// `[0.0, 1.0]`, or a cited source absent from the supplied context.
fn parse_answer(raw: &str, context: &[ContextSnippet]) -> Result<Answer, RagError> {
    let payload: AnswerPayload =
        serde_json::from_str(raw).map_err(|err| RagError::AnswerSchema(err.to_string()))?;

    if !(0.0..=1.0).contains(&payload.confidence) {
        return Err(RagError::AnswerSchema(format!(
            "confidence {} outside [0.0, 1.0]",
            payload.confidence
        )));
    }

    let known: HashSet<&str> = context
        .iter()
        .map(|snippet| snippet.filename.as_str())
        .collect();
    for source in &payload.sources {
        if !known.contains(source.as_str()) {
            return Err(RagError::AnswerSchema(format!(
                "cited source '{source}' is not in the retrieved context"
            )));
        }
    }

    Ok(Answer {
        response: payload.response,
        sources: payload.sources,
        confidence: payload.confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NO_CONTEXT_RESPONSE;
    use futures_util::StreamExt;

    fn snippet(filename: &str) -> ContextSnippet {
        ContextSnippet {
            text: format!("content of {filename}"),
            filename: filename.to_string(),
            source_uri: format!("mem://bucket/{filename}"),
        }
    }

    #[tokio::test]
    async fn empty_context_short_circuits_without_generation() {
        let provider = Arc::new(MockCompletionProvider::new("{}"));
        let answerer = Answerer::new(provider.clone());

        let answer = answerer.answer("anything?", &[]).await.unwrap();
        assert_eq!(answer.response, NO_CONTEXT_RESPONSE);
        assert!(answer.sources.is_empty());
        assert_eq!(answer.confidence, 0.0);
        assert_eq!(provider.calls(), 0);

        let streamed = answerer.answer_stream("anything?", &[]).await.unwrap();
        assert!(matches!(streamed, StreamedAnswer::NoContext(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn well_formed_reply_parses_into_an_answer() {
        let reply = serde_json::json!({
            "response": "Chunking splits documents.",
            "sources": ["guide.txt"],
            "confidence": 0.9
        })
        .to_string();
        let answerer = Answerer::new(Arc::new(MockCompletionProvider::new(reply)));

        let answer = answerer
            .answer("what is chunking?", &[snippet("guide.txt")])
            .await
            .unwrap();
        assert_eq!(answer.response, "Chunking splits documents.");
        assert_eq!(answer.sources, vec!["guide.txt"]);
        assert_eq!(answer.confidence, 0.9);
    }

    #[tokio::test]
    async fn malformed_reply_is_a_schema_error() {
        let answerer = Answerer::new(Arc::new(MockCompletionProvider::new("not json at all")));
        let err = answerer
            .answer("q", &[snippet("guide.txt")])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::AnswerSchema(_)));
    }

    #[tokio::test]
    async fn out_of_range_confidence_is_rejected() {
        let reply = serde_json::json!({
            "response": "sure",
            "sources": [],
            "confidence": 1.4
        })
        .to_string();
        let answerer = Answerer::new(Arc::new(MockCompletionProvider::new(reply)));

        let err = answerer
            .answer("q", &[snippet("guide.txt")])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::AnswerSchema(_)));
    }

    #[tokio::test]
    async fn citation_outside_context_is_rejected() {
        let reply = serde_json::json!({
            "response": "made up",
            "sources": ["elsewhere.pdf"],
            "confidence": 0.5
        })
        .to_string();
        let answerer = Answerer::new(Arc::new(MockCompletionProvider::new(reply)));

        let err = answerer
            .answer("q", &[snippet("guide.txt")])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::AnswerSchema(_)));
    }

    #[tokio::test]
    async fn streaming_forwards_fragments_in_order() {
        let provider = Arc::new(MockCompletionProvider::new("whole").with_fragments(vec![
            "The ".to_string(),
            "grounded ".to_string(),
            "answer.".to_string(),
        ]));
        let answerer = Answerer::new(provider);

        let streamed = answerer
            .answer_stream("q", &[snippet("guide.txt")])
            .await
            .unwrap();
        let StreamedAnswer::Fragments(mut fragments) = streamed else {
            panic!("expected fragments");
        };

        let mut collected = String::new();
        while let Some(fragment) = fragments.next().await {
            collected.push_str(&fragment.unwrap());
        }
        assert_eq!(collected, "The grounded answer.");
    }

    #[test]
    fn prompt_embeds_rules_question_and_context() {
        let prompt = build_prompt("what is retrieval?", &[snippet("guide.txt")]);
        assert!(prompt.contains("ONLY on the provided context"));
        assert!(prompt.contains("question: what is retrieval?"));
        assert!(prompt.contains("guide.txt"));
    }
}
