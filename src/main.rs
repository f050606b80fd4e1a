mod bot;
mod config;
mod controller;
mod discord;
mod error;
mod model;
mod router;
mod scheduler;
mod service;
mod state;
mod store;
#[cfg(test)]
mod test_util;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::bot::Handler;
use crate::config::Config;
use crate::discord::api_client::ApiClient;
use crate::discord::rest::{DiscordApi, OAuthCredentials};
use crate::error::AppError;
use crate::scheduler::Reconciler;
use crate::service::oauth::DiscordAuthService;
use crate::state::AppState;
use crate::store::Store;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rolegate=info")),
        )
        .init();

    let config = Config::from_env()?;
    let store = Store::open(&config.data_dir).await?;

    // Redirects are disabled so credentialed requests cannot be bounced to
    // another host.
    let http = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let api = Arc::new(DiscordApi::new(
        ApiClient::new(http),
        config.discord_api_base.clone(),
        config.discord_bot_token.clone(),
        OAuthCredentials {
            client_id: config.discord_client_id.clone(),
            client_secret: config.discord_client_secret.clone(),
            redirect_url: config.discord_redirect_url.clone(),
        },
    ));

    let auth = DiscordAuthService::new(&config)?;
    let reconciler = Reconciler::new(api, store.clone());

    let app = router::router().with_state(AppState {
        store: store.clone(),
    });
    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    let handler = Handler {
        store,
        auth,
        reconciler: Arc::clone(&reconciler),
        owner_id: config.owner_id,
    };
    let mut client = bot::init_bot(&config, handler).await?;

    // Ctrl-C drains the reconciler and closes the gateway connection, which
    // in turn unblocks client.start below.
    let shard_manager = client.shard_manager.clone();
    let shutdown_reconciler = Arc::clone(&reconciler);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down");
            shutdown_reconciler.stop();
            shard_manager.shutdown_all().await;
        }
    });

    tracing::info!("Starting Discord bot...");
    client.start().await?;

    Ok(())
}
