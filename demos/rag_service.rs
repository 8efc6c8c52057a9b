//! Demo: the pipeline behind a small Axum service.
//!
//! Runs entirely on in-process collaborators (memory blob store, memory
//! vector store, deterministic mock embeddings, scripted completions), so it
//! starts with no credentials and no network dependencies.
//!
//! Run with:
//!   cargo run --example rag_service
//!
//! Then, in another terminal:
//!   curl -s localhost:3000/health
//!   curl -s -X POST localhost:3000/ingest -H 'content-type: application/json' \
//!     -d '{"files":[{"filename":"notes.txt","text":"Chunking splits documents."}]}'
//!   curl -s -X POST localhost:3000/query -H 'content-type: application/json' \
//!     -d '{"text":"what does chunking do?"}'
//!   curl -N -X POST localhost:3000/query/stream -H 'content-type: application/json' \
//!     -d '{"text":"what does chunking do?"}'

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::sse::{Event as SseEvent, Sse},
    routing::{get, post},
};
use futures_util::{StreamExt, stream};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt};

use ragforge::answer::MockCompletionProvider;
use ragforge::blob::MemoryBlobStore;
use ragforge::embeddings::{EmbeddingProvider, MockEmbeddingProvider};
use ragforge::ingestion::Utf8Extractor;
use ragforge::stores::MemoryVectorStore;
use ragforge::{Answer, IngestFile, IngestSummary, Query, RagError, RagPipeline, StreamedAnswer};

#[derive(Deserialize)]
struct IngestRequest {
    files: Vec<FilePayload>,
}

#[derive(Deserialize)]
struct FilePayload {
    filename: String,
    text: String,
}

async fn health() -> &'static str {
    "ok"
}

async fn ingest(
    State(pipeline): State<Arc<RagPipeline>>,
    Json(request): Json<IngestRequest>,
) -> Json<IngestSummary> {
    let files = request
        .files
        .into_iter()
        .map(|file| IngestFile::new(file.filename, file.text.into_bytes()))
        .collect();
    Json(pipeline.ingest(files).await)
}

async fn query(
    State(pipeline): State<Arc<RagPipeline>>,
    Json(query): Json<Query>,
) -> Result<Json<Answer>, (StatusCode, String)> {
    pipeline.query(&query).await.map(Json).map_err(status_for)
}

async fn query_stream(
    State(pipeline): State<Arc<RagPipeline>>,
    Json(query): Json<Query>,
) -> Result<Sse<impl futures_util::Stream<Item = Result<SseEvent, Infallible>>>, (StatusCode, String)>
{
    let fragments = match pipeline.query_stream(&query).await.map_err(status_for)? {
        StreamedAnswer::NoContext(answer) => stream::iter(vec![Ok(answer.response)]).boxed(),
        StreamedAnswer::Fragments(fragments) => fragments,
    };

    let events = fragments.map(|fragment| {
        let event = match fragment {
            Ok(text) => SseEvent::default().data(text),
            Err(err) => SseEvent::default().event("error").data(err.to_string()),
        };
        Ok(event)
    });
    Ok(Sse::new(events))
}

fn status_for(err: RagError) -> (StatusCode, String) {
    let status = match err {
        RagError::EmptyQuery => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

fn build_pipeline() -> RagPipeline {
    let embedder = Arc::new(MockEmbeddingProvider::new());
    let store = Arc::new(MemoryVectorStore::new(embedder.dimensions()));
    // Scripted reply citing no sources, so it passes the citation check for
    // any retrieved context.
    let reply = serde_json::json!({
        "response": "Based on the indexed documents, chunking splits them into overlapping segments.",
        "sources": [],
        "confidence": 0.7
    })
    .to_string();

    RagPipeline::builder()
        .blob_store(Arc::new(MemoryBlobStore::new("demo-bucket")))
        .extractor(Arc::new(Utf8Extractor))
        .embedding_provider(embedder)
        .vector_store(store)
        .completion_provider(Arc::new(MockCompletionProvider::new(reply)))
        .build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let pipeline = Arc::new(build_pipeline());

    let router = Router::new()
        .route("/health", get(health))
        .route("/ingest", post(ingest))
        .route("/query", post(query))
        .route("/query/stream", post(query_stream))
        .with_state(pipeline);

    let addr: SocketAddr = "127.0.0.1:3000".parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Serving on http://{addr}");
    axum::serve(listener, router.into_make_service()).await?;

    Ok(())
}
