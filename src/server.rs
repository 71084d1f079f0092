//! MCP server initialization for stdio and SSE transports.
//!
//! [`serve_stdio`] and [`serve_sse`] wire the embedding client, the index,
//! the shared background cache, and the hosted model clients into the MCP
//! tool handler.

use std::sync::Arc;

use anyhow::Result;
use rmcp::ServiceExt;

use ekphrasis::collaborators::groq::GroqClient;
use ekphrasis::config::EkphrasisConfig;
use ekphrasis::embedding::{self, EmbeddingClient};
use ekphrasis::index;
use ekphrasis::retrieval::background::BackgroundSampleCache;
use ekphrasis::retrieval::RetrievalCoordinator;

use crate::tools::EkphrasisTools;

/// Process-wide state. Every MCP session gets its own pipeline, but they all
/// draw from one background cache.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<EkphrasisConfig>,
    pub retrieval: RetrievalCoordinator,
    pub background: Arc<BackgroundSampleCache>,
    /// `None` when no Groq key is configured; captioning and composing are
    /// then unavailable but retrieval still works.
    pub groq: Option<Arc<GroqClient>>,
}

/// Build the retrieval stack from config.
pub fn build_retrieval(config: &EkphrasisConfig) -> Result<RetrievalCoordinator> {
    let client = embedding::create_client(&config.embedding)?;
    let embedding: Arc<dyn EmbeddingClient> = Arc::from(client);

    let index = index::create_index(config)?;
    tracing::info!(
        provider = %config.index.provider,
        dimensions = embedding.dimensions(),
        "retrieval ready"
    );

    Ok(RetrievalCoordinator::new(embedding, index))
}

pub fn setup_shared_state(config: EkphrasisConfig) -> Result<SharedState> {
    let retrieval = build_retrieval(&config)?;
    let background = Arc::new(BackgroundSampleCache::new(
        retrieval.clone(),
        config.retrieval.background_query.clone(),
        config.retrieval.background_top_k,
    ));

    let groq = match GroqClient::new(&config.generation) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!(error = %e, "hosted model client unavailable, caption and compose disabled");
            None
        }
    };

    Ok(SharedState {
        config: Arc::new(config),
        retrieval,
        background,
        groq,
    })
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: EkphrasisConfig) -> Result<()> {
    tracing::info!("starting Ekphrasis MCP server on stdio");

    let state = setup_shared_state(config)?;
    let tools = EkphrasisTools::new(state);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over Streamable HTTP (SSE) transport.
pub async fn serve_sse(config: EkphrasisConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %bind_addr, "starting Ekphrasis MCP server on SSE/HTTP");

    let state = setup_shared_state(config)?;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(EkphrasisTools::new(state.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down SSE server");
        })
        .await?;

    Ok(())
}
