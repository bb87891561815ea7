//! Study assistant server binary
//!
//! Run with: cargo run -p study-rag --bin study-rag-server

use study_rag::{config::RagConfig, logging::init_logging, server::StudyServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RagConfig::load()?;
    init_logging(&config.logging)?;

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                 Personalized Study Assistant              ║
║        Ask questions about your course materials          ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    tracing::info!("Configuration loaded");
    tracing::info!("  - Gemini model: {}", config.llm.model);
    tracing::info!(
        "  - Embeddings: {:?} ({})",
        config.embeddings.provider,
        config.embeddings.model
    );
    tracing::info!(
        "  - Chunk size: {} (overlap {})",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!(
        "  - Collection: {}",
        config.vector_store.collection_path().display()
    );

    if config.llm.has_api_key() {
        tracing::info!("GOOGLE_API_KEY set; new sessions are initialized with it");
    } else {
        tracing::warn!("GOOGLE_API_KEY not set; sessions need a key via POST /api/sessions/:id/key");
    }

    let server = StudyServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/sessions            - Start a study session");
    println!("  POST /api/ingest              - Upload documents");
    println!("  POST /api/sessions/:id/ask    - Ask questions");
    println!("  GET  /api/documents           - List documents");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
