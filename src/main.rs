use anyhow::Context;
use clap::Parser;
use medscan_agent::config::{AppConfig, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_SECRETS_PATH, Secrets};
use medscan_agent::shell::{AppState, create_app};
use medscan_agent::upload::DEFAULT_PREVIEW_WIDTH;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

/// Web service for AI-assisted medical image analysis.
#[derive(Debug, Parser)]
#[command(name = "medscan-agent", version, about)]
struct Cli {
    /// TOML file holding SEARCH_API_KEY and SEARCH_ENGINE_ID
    #[arg(long, env = "MEDSCAN_SECRETS", default_value = DEFAULT_SECRETS_PATH)]
    secrets: PathBuf,

    /// Address the web page is served on
    #[arg(long, env = "MEDSCAN_BIND", default_value = "127.0.0.1:8501")]
    bind: SocketAddr,

    /// Gemini model used for reports
    #[arg(long, env = "MEDSCAN_MODEL")]
    model: Option<String>,

    /// Custom search engine id (overrides the secrets file)
    #[arg(long, env = "MEDSCAN_ENGINE_ID")]
    engine_id: Option<String>,

    /// Width of the preview shown after upload
    #[arg(long, env = "MEDSCAN_PREVIEW_WIDTH", default_value_t = DEFAULT_PREVIEW_WIDTH)]
    preview_width: u32,

    /// Largest accepted request body
    #[arg(long, env = "MEDSCAN_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,

    /// Timeout applied to each model and search request
    #[arg(long, env = "MEDSCAN_REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: Option<u64>,

    /// Timeout for establishing outbound connections
    #[arg(long, env = "MEDSCAN_CONNECT_TIMEOUT_SECS")]
    connect_timeout_secs: Option<u64>,

    /// Idle time after which a browser session is forgotten
    #[arg(long, env = "MEDSCAN_SESSION_TTL_SECS", default_value_t = 3600)]
    session_ttl_secs: u64,
}

impl Cli {
    fn into_config(self, secrets: Secrets) -> AppConfig {
        let mut config = AppConfig {
            bind: self.bind,
            preview_width: self.preview_width.max(1),
            max_upload_bytes: self.max_upload_bytes,
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
            connect_timeout: self.connect_timeout_secs.map(Duration::from_secs),
            session_ttl: Duration::from_secs(self.session_ttl_secs),
            secrets_path: self.secrets,
            ..AppConfig::default()
        }
        .with_secrets(secrets);

        if let Some(model) = self.model {
            config.model_id = model;
        }
        if let Some(engine_id) = self.engine_id {
            config.search_engine_id = engine_id;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let secrets = Secrets::load(&cli.secrets)?.with_overrides(
        std::env::var("SEARCH_API_KEY").ok(),
        std::env::var("SEARCH_ENGINE_ID").ok(),
    );
    let config = cli.into_config(secrets);

    if !config.has_search_key() {
        tracing::warn!(
            "No search API key configured; add SEARCH_API_KEY to '{}' or the environment",
            config.secrets_path.display()
        );
    }
    tracing::debug!("Configuration: {config:?}");

    let bind = config.bind;
    let state = AppState::from_config(config)?;

    let sessions = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(EVICTION_INTERVAL);
        loop {
            interval.tick().await;
            sessions.sessions().evict_idle().await;
        }
    });

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    tracing::info!(
        "Medical imaging agent listening on http://{}",
        listener.local_addr()?
    );

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
