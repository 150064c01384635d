//! The HTTP surface: thin glue between clients and the retrieval engine.
//!
//! One question endpoint, a welcome page, and a health probe. Every error
//! from the taxonomy is recovered here into a `{"error": ...}` JSON body
//! with a non-2xx status; nothing is downgraded to an empty answer.

use crate::generate::{AnswerGenerator, GenerateError};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use quill_retriever::{RetrievalEngine, RetrievalError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const WELCOME: &str = "Welcome to the quill document QA API!";

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RetrievalEngine>,
    pub generator: Arc<dyn AnswerGenerator>,
    pub k: usize,
    pub request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
    pub context: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
enum AskError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error(transparent)]
    Generation(#[from] GenerateError),
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health))
        .route("/ask", post(ask))
        .with_state(state)
}

async fn welcome() -> &'static str {
    WELCOME
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "index": state.engine.index_stats(),
    }))
}

async fn ask(State(state): State<AppState>, Json(request): Json<AskRequest>) -> Response {
    let question = request.question.trim().to_string();
    if question.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "question must not be empty");
    }

    match tokio::time::timeout(state.request_timeout, answer_question(&state, &question)).await {
        Ok(Ok(response)) => Json(response).into_response(),
        Ok(Err(err)) => {
            error!("failed to answer question: {err}");
            let (status, message) = map_error(&err);
            error_response(status, &message)
        }
        Err(_) => {
            error!("question timed out after {:?}", state.request_timeout);
            error_response(StatusCode::GATEWAY_TIMEOUT, "request timed out")
        }
    }
}

async fn answer_question(state: &AppState, question: &str) -> Result<AskResponse, AskError> {
    let hits = state.engine.query(question, state.k).await?;
    info!("retrieved {} passages for question", hits.len());

    let context: Vec<String> = hits.into_iter().map(|hit| hit.text).collect();
    let answer = state.generator.answer(question, &context).await?;

    Ok(AskResponse {
        question: question.to_string(),
        answer,
        context,
    })
}

/// Map the error taxonomy onto HTTP statuses. Upstream services (embedding
/// provider, generator) surface as bad gateways; everything wrong with our
/// own state is an internal error, except a document with no content,
/// which the client can actually act on.
fn map_error(err: &AskError) -> (StatusCode, String) {
    let status = match err {
        AskError::Retrieval(retrieval) => match retrieval {
            RetrievalError::Embedding { .. } => StatusCode::BAD_GATEWAY,
            RetrievalError::EmptyDocument => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
        AskError::Generation(_) => StatusCode::BAD_GATEWAY,
    };
    (status, err.to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use half::f16;
    use quill_embed::{EmbedError, EmbeddingProvider, EmbeddingResult};
    use quill_retriever::{InMemoryLoader, RetrievalConfig};
    use tempfile::tempdir;

    /// Projects text onto a single "attention-ness" axis plus a constant
    /// component, so any text embeds to a valid unit vector.
    struct StubProvider;

    impl StubProvider {
        fn embed(text: &str) -> Vec<f16> {
            let weight = text.to_lowercase().matches("attention").count() as f32;
            let raw = [1.0, weight];
            let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
            raw.iter().map(|x| f16::from_f32(x / norm)).collect()
        }
    }

    #[async_trait]
    impl EmbeddingProvider for StubProvider {
        async fn embed_batch(&self, texts: &[String]) -> Result<EmbeddingResult, EmbedError> {
            Ok(EmbeddingResult::new(
                texts.iter().map(|t| Self::embed(t)).collect(),
            ))
        }
        async fn embed_one(&self, text: &str) -> Result<Vec<f16>, EmbedError> {
            Ok(Self::embed(text))
        }
        fn dimension(&self) -> usize {
            2
        }
        fn provider_name(&self) -> &str {
            "stub"
        }
    }

    /// Echoes the top passage back, or fails on demand.
    struct StubGenerator {
        fail: bool,
    }

    #[async_trait]
    impl AnswerGenerator for StubGenerator {
        async fn answer(
            &self,
            _question: &str,
            context: &[String],
        ) -> Result<String, GenerateError> {
            if self.fail {
                return Err(GenerateError::MalformedResponse {
                    detail: "stub failure".to_string(),
                });
            }
            Ok(context.first().cloned().unwrap_or_default())
        }
        fn generator_name(&self) -> &str {
            "stub"
        }
    }

    fn state(dir: &std::path::Path, fail_generation: bool) -> AppState {
        let loader = Arc::new(InMemoryLoader::from_pages(vec![
            "Self attention lets every token see every other token.",
            "An unrelated paragraph about typesetting conventions.",
        ]));
        let engine = RetrievalEngine::new(
            RetrievalConfig::new("test", dir)
                .with_chunking(quill_context::ChunkConfig::new(60, 10)),
            loader,
            Arc::new(StubProvider),
        )
        .unwrap();
        AppState {
            engine: Arc::new(engine),
            generator: Arc::new(StubGenerator {
                fail: fail_generation,
            }),
            k: 2,
            request_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn welcome_is_static() {
        assert_eq!(welcome().await, WELCOME);
    }

    #[tokio::test]
    async fn ask_returns_question_answer_and_context() {
        let dir = tempdir().unwrap();
        let state = state(dir.path(), false);

        let response = answer_question(&state, "How does attention work?")
            .await
            .unwrap();
        assert_eq!(response.question, "How does attention work?");
        assert_eq!(response.context.len(), 2);
        assert!(response.context[0].contains("attention"));
        // The stub generator echoes the top passage.
        assert_eq!(response.answer, response.context[0]);
    }

    #[tokio::test]
    async fn empty_question_is_bad_request() {
        let dir = tempdir().unwrap();
        let state = state(dir.path(), false);

        let response = ask(
            State(state),
            Json(AskRequest {
                question: "   ".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn generation_failure_maps_to_bad_gateway() {
        let dir = tempdir().unwrap();
        let state = state(dir.path(), true);

        let response = ask(
            State(state),
            Json(AskRequest {
                question: "How does attention work?".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn corrupt_index_maps_to_internal_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("test.db"), b"garbage").unwrap();
        let state = state(dir.path(), false);

        let response = ask(
            State(state),
            Json(AskRequest {
                question: "anything".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn health_reports_index_once_built() {
        let dir = tempdir().unwrap();
        let state = state(dir.path(), false);

        let before = health(State(state.clone())).await;
        assert!(before.0["index"].is_null());

        state.engine.prebuild().await.unwrap();
        let after = health(State(state)).await;
        assert_eq!(after.0["index"]["name"], "test");
    }
}
