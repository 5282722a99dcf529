use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use lembremed::advice::{AdviceProvider, DisabledAdvice, GeminiClient};
use lembremed::api::server::start_server;
use lembremed::config;
use lembremed::db;
use lembremed::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!(version = config::APP_VERSION, "{} starting", config::APP_NAME);

    // Apply migrations once up front so a broken schema fails fast.
    let db_path = config::database_path();
    db::open_database(&db_path)?;
    tracing::info!(path = %db_path.display(), "Database ready");

    let advice: Arc<dyn AdviceProvider> = match config::gemini_api_key() {
        Some(key) => Arc::new(GeminiClient::new(
            &config::gemini_base_url(),
            &config::gemini_model(),
            &key,
            config::ADVICE_TIMEOUT_SECS,
        )),
        None => {
            tracing::warn!("GEMINI_API_KEY not set; advice generation disabled");
            Arc::new(DisabledAdvice)
        }
    };

    let state = Arc::new(AppState::new(db_path, advice));
    let addr: SocketAddr = config::bind_addr().parse()?;

    let mut server = start_server(state, addr).await.map_err(std::io::Error::other)?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    server.shutdown();
    server.wait().await;

    Ok(())
}
