use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use newsdesk::channel::{ChatGateway, ChatRequest, ClientEvent, ServerEvent};
use newsdesk::config::AppConfig;
use newsdesk::corpus::{CorpusCache, FeedSource, RssFeedSource};
use newsdesk::embeddings::{Embedder, JinaEmbedder, MockEmbedder};
use newsdesk::generation::{GeminiGenerator, Generator};
use newsdesk::services::ingest::IngestService;
use newsdesk::services::rag::RagEngine;
use newsdesk::services::AppState;
use newsdesk::sessions::SessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    dotenvy::dotenv().ok();
    let config = AppConfig::build()?;

    // 2. Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.server.rust_log))
        .init();

    tracing::info!(version = newsdesk::VERSION, "Starting newsdesk...");

    // 3. Providers: a missing embedding key selects the offline mock
    let embedder: Arc<dyn Embedder> = if config.embedding.api_key.is_empty() {
        tracing::warn!("no embedding API key configured, using deterministic mock embedder");
        Arc::new(MockEmbedder::new(config.embedding.dimension))
    } else {
        Arc::new(JinaEmbedder::new(config.embedding.clone()))
    };
    let generator: Arc<dyn Generator> = Arc::new(GeminiGenerator::new(config.generation.clone()));

    // 4. Corpus ingestion over the configured feeds
    let fetch_timeout = Duration::from_secs(config.ingest.fetch_timeout_secs);
    let sources: Vec<Arc<dyn FeedSource>> = config
        .ingest
        .feed_urls
        .iter()
        .map(|url| Arc::new(RssFeedSource::new(url.clone(), fetch_timeout)) as Arc<dyn FeedSource>)
        .collect();
    let ingest = IngestService::new(sources, CorpusCache::new(config.ingest.cache_path.clone()));

    // 5. Engine + shared session store
    let sessions = SessionStore::new(Duration::from_secs(config.session.ttl_secs));
    let engine = Arc::new(RagEngine::new(
        ingest,
        embedder,
        generator,
        sessions,
        config.retrieval.clone(),
        config.ingest.article_limit,
    ));

    // Eager warm-up. A transient provider failure here is tolerable: the
    // index build retries lazily on the first query. A broken deployment
    // contract is not.
    match engine.initialize().await {
        Ok(()) => tracing::info!(
            documents = engine.document_count().await,
            "RAG pipeline initialized successfully"
        ),
        Err(err) if err.is_fatal() => return Err(err.into()),
        Err(err) => {
            tracing::warn!(error = %err, "index warm-up failed, will retry on first query");
        }
    }

    // 6. Channel gateway
    let state = AppState::new(engine);
    let gateway = ChatGateway::new(state);
    let (requests, inbound) = mpsc::channel(64);
    tokio::spawn(gateway.run(inbound));

    // 7. Console transport on top of the channel boundary
    run_console(requests).await
}

/// Minimal line-oriented client: creates and joins a session, forwards
/// stdin lines as messages, prints broadcast events. `/reset` clears the
/// session history.
async fn run_console(requests: mpsc::Sender<ChatRequest>) -> anyhow::Result<()> {
    let (reply, mut events) = mpsc::channel::<ServerEvent>(64);

    requests
        .send(ChatRequest {
            event: ClientEvent::CreateSession,
            reply: reply.clone(),
        })
        .await?;
    let session_id = match events.recv().await {
        Some(ServerEvent::SessionCreated { session_id }) => session_id,
        other => anyhow::bail!("expected session-created, got {other:?}"),
    };

    requests
        .send(ChatRequest {
            event: ClientEvent::JoinSession { session_id },
            reply: reply.clone(),
        })
        .await?;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ServerEvent::BotResponse { bot_response, .. } => {
                    println!("newsdesk> {bot_response}\n");
                }
                ServerEvent::SessionHistory { messages } => {
                    for message in messages {
                        println!("you> {}\nnewsdesk> {}\n", message.user, message.bot);
                    }
                }
                ServerEvent::SessionReset => println!("(session reset)"),
                ServerEvent::Error { message } => eprintln!("error: {message}"),
                ServerEvent::SessionCreated { .. } => {}
            }
        }
    });

    println!("Ask about recent news (Ctrl-D to quit, /reset to clear the session):");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        let event = if line == "/reset" {
            ClientEvent::ResetSession { session_id }
        } else {
            ClientEvent::SendMessage {
                session_id,
                message: line,
            }
        };
        requests
            .send(ChatRequest {
                event,
                reply: reply.clone(),
            })
            .await?;
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}
