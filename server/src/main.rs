mod auth;
mod bot;
mod config;
mod error;
mod notify;
mod router;
mod routes;
mod state;
mod village;
mod ws;

use std::sync::Arc;
use tokio::net::TcpListener;

use auth::{AccessKeyVerifier, HttpAccessKeyVerifier, StaticAccessKeys};
use bot::{BotResponder, EchoBot, HttpBot};
use config::{generate_config_template, Config};
use notify::{LogNotifier, Notifier, WebhookNotifier};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "village_server=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "village_server=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!("village-server v{} starting", env!("CARGO_PKG_VERSION"));

    // Wire the collaborators from config
    let access_keys: Arc<dyn AccessKeyVerifier> = match &config.verify_url {
        Some(url) => {
            tracing::info!(url = %url, "Access keys verified via HTTP endpoint");
            Arc::new(HttpAccessKeyVerifier::new(url.clone()))
        }
        None => {
            if config.access_keys.is_empty() {
                tracing::warn!(
                    "No access keys configured — every agent join will be rejected"
                );
            }
            Arc::new(StaticAccessKeys::new(config.access_keys.clone()))
        }
    };
    let bot: Arc<dyn BotResponder> = match &config.bot_url {
        Some(url) => {
            tracing::info!(url = %url, "Bot replies via HTTP endpoint");
            Arc::new(HttpBot::new(url.clone()))
        }
        None => Arc::new(EchoBot),
    };
    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => {
            tracing::info!(url = %url, "Consumer-join notifications via webhook");
            Arc::new(WebhookNotifier::new(url.clone()))
        }
        None => Arc::new(LogNotifier),
    };

    // Build application state: every registry constructed here, injected once
    let app_state = state::AppState {
        connections: ws::new_connection_registry(),
        groups: Arc::new(ws::VillageGroups::new()),
        villages: Arc::new(village::VillageRegistry::new()),
        states: router::new_connection_states(),
        access_keys,
        notifier,
        bot,
        default_village_name: config.default_village_name.clone(),
    };

    // Build router
    let app = routes::build_router(app_state);

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolve on SIGTERM or ctrl-c so in-flight handlers can finish.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Ctrl-C received, shutting down"),
        _ = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}
