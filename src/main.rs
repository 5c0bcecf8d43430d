use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studyflow::api::router;
use studyflow::config::{AppConfig, StoreBackend};
use studyflow::db::{self, MemoryWorkspaceStore, SqliteWorkspaceStore, WorkspaceStore};
use studyflow::extraction::{ContentExtractor, GeminiHttpClient, NoopExtractor};
use studyflow::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "studyflow=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let store: Arc<dyn WorkspaceStore> = match config.store_backend {
        StoreBackend::Sqlite => {
            let pool = db::connect(&config.database_url).await?;
            Arc::new(SqliteWorkspaceStore::new(pool))
        }
        StoreBackend::Memory => {
            warn!("using in-memory store; workspaces are lost on restart");
            Arc::new(MemoryWorkspaceStore::new())
        }
    };

    let extractor: Arc<dyn ContentExtractor> = match config.gemini {
        Some(gemini) => {
            info!("content extraction via model {}", gemini.model);
            Arc::new(GeminiHttpClient::new(gemini)?)
        }
        None => {
            warn!("GEMINI_API_KEY not set; content extraction disabled");
            Arc::new(NoopExtractor)
        }
    };

    let state = AppState::new(store, extractor, config.grid);
    let sweep_every = (config.session_idle / 4).max(Duration::from_secs(30));
    tokio::spawn(state.sessions.clone().run_expiry(config.session_idle, sweep_every));

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
