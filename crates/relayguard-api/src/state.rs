//! Application state wiring all services together.
//!
//! `AppState` holds the core wiring (database, registry, router) used by the
//! CLI commands. `ServeState` adds the outbound clients and dispatcher and
//! is only built for the webhook server, so CLI commands work without the
//! Telegram or generator credentials.

use std::path::PathBuf;
use std::sync::Arc;

use secrecy::SecretString;

use relayguard_core::detector::LoopDetector;
use relayguard_core::router::MessageRouter;
use relayguard_core::service::OwnershipService;
use relayguard_infra::config::load_app_config;
use relayguard_infra::generator::OpenAiGenerator;
use relayguard_infra::sqlite::connection::SqliteConnectionRepository;
use relayguard_infra::sqlite::pool::DatabasePool;
use relayguard_infra::telegram::TelegramClient;
use relayguard_types::config::AppConfig;

use crate::dispatch::Dispatcher;

/// Concrete type aliases for the generics pinned to infra implementations.
pub type ConcreteRouter = MessageRouter<SqliteConnectionRepository>;
pub type ConcreteDispatcher =
    Dispatcher<SqliteConnectionRepository, OpenAiGenerator, TelegramClient>;

/// Core application state shared by CLI commands and the server.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ConcreteRouter>,
    pub config: Arc<AppConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: load config, connect to the
    /// database, wire registry and detector into the router.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_app_config(&data_dir).await;

        let db_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.join("relayguard.db").display()
        );
        let db_pool = DatabasePool::new(&db_url).await?;

        let ownership = OwnershipService::new(SqliteConnectionRepository::new(db_pool.clone()));
        let detector = LoopDetector::new(&config.detector, &config.signatures);
        let router = Arc::new(MessageRouter::new(ownership, detector));

        Ok(Self {
            router,
            config: Arc::new(config),
            data_dir,
            db_pool,
        })
    }
}

/// Server state: core state plus the outbound clients and dispatcher.
#[derive(Clone)]
pub struct ServeState {
    pub app: AppState,
    pub dispatcher: ConcreteDispatcher,
    pub telegram: Arc<TelegramClient>,
    pub webhook_secret: Option<String>,
}

impl ServeState {
    /// Build the server state from the environment.
    ///
    /// `TELEGRAM_BOT_TOKEN` is required. `OPENAI_API_KEY` is optional; when
    /// absent, every generation fails and the dispatcher serves the static
    /// fallback reply.
    pub fn build(app: AppState) -> anyhow::Result<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow::anyhow!("TELEGRAM_BOT_TOKEN is not set"))?;
        let telegram = Arc::new(TelegramClient::new(SecretString::from(token)));

        let api_key = match std::env::var("OPENAI_API_KEY") {
            Ok(key) => SecretString::from(key),
            Err(_) => {
                tracing::warn!("OPENAI_API_KEY is not set, replies degrade to the fallback text");
                SecretString::from(String::new())
            }
        };
        let generator = Arc::new(OpenAiGenerator::new(
            api_key,
            app.config.persona_prompt.clone(),
        ));

        let dispatcher = Dispatcher::new(
            Arc::clone(&app.router),
            generator,
            Arc::clone(&telegram),
            app.config.fallback_reply.clone(),
        );

        let webhook_secret = app.config.webhook.secret_token.clone();

        Ok(Self {
            app,
            dispatcher,
            telegram,
            webhook_secret,
        })
    }
}

/// Data directory: `RELAYGUARD_DATA_DIR` env var, falling back to
/// `~/.relayguard`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("RELAYGUARD_DATA_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".relayguard")
}
