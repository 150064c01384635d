//! # quill-server
//!
//! The HTTP front of the quill question-answering pipeline. This crate is
//! deliberately thin glue: it wires a document loader, an embedding
//! provider, the retrieval engine, and an answer generator together at
//! startup, then exposes three routes:
//!
//! - `GET /`: static welcome
//! - `GET /health`: liveness plus index stats once built
//! - `POST /ask`: `{"question": ...}` in,
//!   `{"question", "answer", "context"}` out, or `{"error": ...}` with a
//!   non-2xx status
//!
//! The index builds lazily on the first question (or eagerly with
//! `--prebuild`, through the same single-flight path). Provider and
//! generator credentials are read from the environment once at startup and
//! missing ones fail fast.

pub mod generate;
pub mod server;

use anyhow::Result;
use generate::AnswerGenerator;
use quill_retriever::RetrievalEngine;
use server::{AppState, router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Runtime configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_addr: SocketAddr,
    /// Passages retrieved per question.
    pub k: usize,
    /// Ceiling for one question's embedding + generation work.
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([127, 0, 0, 1], 8000).into(),
            k: 3,
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Serve until the listener fails or the process is stopped.
pub async fn run_server(
    config: ServerConfig,
    engine: Arc<RetrievalEngine>,
    generator: Arc<dyn AnswerGenerator>,
) -> Result<()> {
    let state = AppState {
        engine,
        generator,
        k: config.k,
        request_timeout: config.request_timeout,
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("quill server listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
