mod config;
mod pipeline;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use config::AppConfig;
use corpus::{CaseCorpus, EmbeddingClient, SimilarCaseRetriever, VectorCorpus};
use extract::{Extractor, OllamaClient};
use pipeline::{FileAnalysis, Pipeline};
use segment::{Chunker, ChunkerConfig, Taxonomy};

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

struct AppState {
    pipeline: Pipeline,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    status: String,
    data: Vec<FileResult>,
}

#[derive(Serialize)]
struct FileResult {
    filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<FileAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();
    info!(?config, "Starting case analysis service");

    let embedder = EmbeddingClient::new(config.ollama_url.clone(), config.embed_model.clone());
    let corpus: Arc<dyn CaseCorpus> = Arc::new(VectorCorpus::new(
        config.qdrant_url.clone(),
        config.collection.clone(),
        embedder,
    ));

    // A dead store degrades retrieval to empty context; the service still
    // comes up.
    if let Err(e) = corpus.initialize().await {
        warn!(error = %e, "Corpus initialization failed; retrieval will return no context");
    }

    let retriever = Arc::new(SimilarCaseRetriever::new(
        Arc::clone(&corpus),
        Chunker::new(ChunkerConfig::default()),
    ));
    let extractor = Arc::new(Extractor::new(
        OllamaClient::new(config.ollama_url.clone()),
        config.models.clone(),
    ));

    let pipeline = Pipeline::new(
        Taxonomy::default(),
        retriever,
        extractor,
        corpus,
        config.concurrency.max_concurrent_cases,
        config.retrieval.n_similar,
    );

    let state = Arc::new(AppState { pipeline });

    let app = Router::new()
        .route("/analyze", post(analyze))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listener");

    info!(addr = %config.bind_addr, "Server listening");

    axum::serve(listener, app).await.expect("Server failed");
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Accepts one or more uploaded documents and returns a best-effort
/// analysis per file. A file that fails (unreadable, no content) reports
/// its error inline; the batch always completes.
async fn analyze(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, StatusCode> {
    let mut results = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let filename = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "upload".to_string());

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(filename, error = %e, "Failed to read uploaded file");
                results.push(FileResult {
                    filename,
                    analysis: None,
                    error: Some("failed to read upload".to_string()),
                });
                continue;
            }
        };

        let pages = pages_from_bytes(&bytes);

        match state.pipeline.process_file(&filename, &pages).await {
            Ok(analysis) => results.push(FileResult {
                filename,
                analysis: Some(analysis),
                error: None,
            }),
            Err(e) => {
                warn!(filename, error = %e, "Document processing failed");
                results.push(FileResult {
                    filename,
                    analysis: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    if results.is_empty() {
        // No input at all is the one precondition that fails the request.
        return Err(StatusCode::BAD_REQUEST);
    }

    Ok(Json(AnalyzeResponse {
        status: "success".to_string(),
        data: results,
    }))
}

/// Decode an upload as text and split it into pages of lines. Form feeds
/// mark page boundaries, matching what text extraction frontends emit.
fn pages_from_bytes(bytes: &[u8]) -> Vec<Vec<String>> {
    let text = String::from_utf8_lossy(bytes);

    text.split('\u{0C}')
        .map(|page| page.lines().map(|l| l.trim().to_string()).collect::<Vec<_>>())
        .filter(|lines: &Vec<String>| !lines.is_empty())
        .collect()
}
