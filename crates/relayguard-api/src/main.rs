//! Relayguard CLI and webhook server entry point.
//!
//! Binary name: `rguard`
//!
//! Parses CLI arguments, initializes the database and services, then either
//! starts the webhook server or runs an ops command.

mod cli;
mod dispatch;
mod http;
mod state;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use state::{AppState, ServeState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "info,relayguard_core=debug,relayguard_infra=debug,relayguard_api=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    // Initialize application state (config, DB, router)
    let app = AppState::init().await?;

    match cli.command {
        Commands::Serve { port, host } => {
            serve(app, &host, port).await?;
        }

        Commands::Status => {
            cli::connection::status(&app, cli.json).await?;
        }

        Commands::Connections => {
            cli::connection::connections(&app, cli.json).await?;
        }
    }

    Ok(())
}

async fn serve(app: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let state = ServeState::build(app)?;

    // Verify the bot token before accepting traffic
    match state.telegram.get_me().await {
        Ok(profile) => {
            tracing::info!(
                bot_id = profile.id,
                username = profile.username.as_deref().unwrap_or("?"),
                "bot token verified"
            );
        }
        Err(err) => {
            tracing::warn!(error = %err, "getMe failed, continuing anyway");
        }
    }

    // Auto-install the webhook when a public URL is configured
    let webhook_url = state
        .app
        .config
        .webhook
        .url
        .clone()
        .or_else(|| std::env::var("WEBHOOK_URL").ok());
    match webhook_url {
        Some(url) => {
            match state
                .telegram
                .set_webhook(&url, state.webhook_secret.as_deref())
                .await
            {
                Ok(()) => tracing::info!(url, "webhook installed"),
                Err(err) => tracing::error!(url, error = %err, "webhook installation failed"),
            }
        }
        None => {
            tracing::warn!("no webhook URL configured, skipping webhook installation");
        }
    }

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!(
        "  {} Relayguard webhook server listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
