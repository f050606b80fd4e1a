//! Test support: a fake Discord API served on a local listener.
//!
//! Pipeline tests point a `DiscordApi` at the returned base URL and assert
//! on the recorded requests instead of hitting the network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;

use crate::discord::api_client::ApiClient;
use crate::discord::rest::{DiscordApi, OAuthCredentials};

/// Serves a router on an ephemeral local port and returns its base URL.
pub async fn spawn_router(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A `DiscordApi` wired to a fake server base with fixed test credentials.
pub fn test_api(base: &str) -> DiscordApi {
    DiscordApi::new(
        ApiClient::new(reqwest::Client::new()),
        base.to_string(),
        "bot-token".to_string(),
        OAuthCredentials {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            redirect_url: "http://localhost/callback".to_string(),
        },
    )
}

/// Shared record of the method + path of every request the fake API saw.
#[derive(Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<String>>>);

impl RequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.lock().unwrap().iter().any(|e| e == entry)
    }

    pub fn count_matching(&self, prefix: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}

/// Behavior knobs for the canned fake Discord API.
pub struct FakeDiscordOptions {
    /// Guild ids returned by the authenticated membership listing.
    pub user_guilds: Vec<u64>,
    /// First token-exchange request answers 429 with `Retry-After: 1`.
    pub rate_limit_token_once: bool,
    /// Token exchange answers 400 (invalid code).
    pub fail_token_exchange: bool,
    /// Membership fetch answers 500.
    pub fail_guild_fetch: bool,
    /// Whether the target member still exists in the guild.
    pub member_exists: bool,
    /// Role grant answers 403 (missing permission).
    pub forbid_role_grant: bool,
    /// Kick answers 403 (missing permission).
    pub forbid_kick: bool,
}

impl Default for FakeDiscordOptions {
    fn default() -> Self {
        Self {
            user_guilds: Vec::new(),
            rate_limit_token_once: false,
            fail_token_exchange: false,
            fail_guild_fetch: false,
            member_exists: true,
            forbid_role_grant: false,
            forbid_kick: false,
        }
    }
}

/// Builds the fake Discord API router.
pub fn fake_discord(options: FakeDiscordOptions, log: RequestLog) -> Router {
    let FakeDiscordOptions {
        user_guilds,
        rate_limit_token_once,
        fail_token_exchange,
        fail_guild_fetch,
        member_exists,
        forbid_role_grant,
        forbid_kick,
    } = options;

    let token_hits = Arc::new(AtomicUsize::new(0));

    let token_log = log.clone();
    let guilds_log = log.clone();
    let member_log = log.clone();
    let role_log = log.clone();
    let kick_log = log.clone();
    let dm_log = log.clone();
    let message_log = log;

    Router::new()
        .route(
            "/oauth2/token",
            post(move || {
                let hits = Arc::clone(&token_hits);
                let log = token_log.clone();
                async move {
                    log.record("POST /oauth2/token");
                    if rate_limit_token_once && hits.fetch_add(1, Ordering::SeqCst) == 0 {
                        return (
                            StatusCode::TOO_MANY_REQUESTS,
                            [(header::RETRY_AFTER, "1")],
                            Json(json!({"message": "You are being rate limited."})),
                        )
                            .into_response();
                    }
                    if fail_token_exchange {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({"error": "invalid_grant"})),
                        )
                            .into_response();
                    }
                    Json(json!({"access_token": "tok1", "token_type": "Bearer"})).into_response()
                }
            }),
        )
        .route(
            "/users/@me/guilds",
            get(move || {
                let log = guilds_log.clone();
                let guilds = user_guilds.clone();
                async move {
                    log.record("GET /users/@me/guilds");
                    if fail_guild_fetch {
                        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                    }
                    let body: Vec<_> = guilds
                        .iter()
                        .map(|id| json!({"id": id.to_string(), "name": "guild"}))
                        .collect();
                    Json(body).into_response()
                }
            }),
        )
        .route(
            "/guilds/{guild}/members/{user}",
            get(move |Path((guild, user)): Path<(u64, u64)>| {
                let log = member_log.clone();
                async move {
                    log.record(format!("GET /guilds/{guild}/members/{user}"));
                    if member_exists {
                        Json(json!({"user": {"id": user.to_string()}})).into_response()
                    } else {
                        StatusCode::NOT_FOUND.into_response()
                    }
                }
            })
            .delete(move |Path((guild, user)): Path<(u64, u64)>| {
                let log = kick_log.clone();
                async move {
                    log.record(format!("DELETE /guilds/{guild}/members/{user}"));
                    if forbid_kick {
                        StatusCode::FORBIDDEN.into_response()
                    } else if member_exists {
                        StatusCode::NO_CONTENT.into_response()
                    } else {
                        StatusCode::NOT_FOUND.into_response()
                    }
                }
            }),
        )
        .route(
            "/guilds/{guild}/members/{user}/roles/{role}",
            put(move |Path((guild, user, role)): Path<(u64, u64, u64)>| {
                let log = role_log.clone();
                async move {
                    log.record(format!("PUT /guilds/{guild}/members/{user}/roles/{role}"));
                    if forbid_role_grant {
                        StatusCode::FORBIDDEN.into_response()
                    } else {
                        StatusCode::NO_CONTENT.into_response()
                    }
                }
            }),
        )
        .route(
            "/users/@me/channels",
            post(move || {
                let log = dm_log.clone();
                async move {
                    log.record("POST /users/@me/channels");
                    Json(json!({"id": "999"}))
                }
            }),
        )
        .route(
            "/channels/{channel}/messages",
            post(move |Path(channel): Path<u64>| {
                let log = message_log.clone();
                async move {
                    log.record(format!("POST /channels/{channel}/messages"));
                    Json(json!({"id": "1000"}))
                }
            }),
        )
}

/// Convenience: spawn the canned fake API and return its base URL.
pub async fn spawn_fake_discord(options: FakeDiscordOptions, log: RequestLog) -> String {
    spawn_router(fake_discord(options, log)).await
}
