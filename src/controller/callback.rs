//! The OAuth redirect endpoint.
//!
//! This is the only surface a remote party can reach. It validates and
//! correlates the callback, enqueues a pending verification and returns a
//! plain acknowledgement; every provider interaction happens later in the
//! reconciliation loop.

use axum::extract::{Query, State};
use serde::Deserialize;

use crate::error::AppError;
use crate::model::PendingVerification;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub state: String,
}

/// Handles the provider redirect after a user authorizes the application.
///
/// The `state` parameter carries the correlation key minted when the
/// authorization URL was built. A state naming a guild this deployment never
/// configured is treated the same as a garbled one; both are rejected
/// without touching the pending set.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<String, AppError> {
    if params.code.is_empty() {
        return Err(AppError::MalformedCallback(
            "Missing authorization code".to_string(),
        ));
    }

    let (user_id, guild_id) = parse_state(&params.state)?;

    if state.store.role_bindings().get(guild_id).await.is_none() {
        tracing::warn!(user_id, guild_id, "Callback for an unconfigured guild");
        return Err(AppError::MalformedCallback(
            "Unrecognized verification state".to_string(),
        ));
    }

    let replaced = state
        .store
        .pending()
        .upsert(PendingVerification::new(user_id, guild_id, params.code))
        .await?;
    if replaced.is_some() {
        tracing::info!(user_id, "Replaced an earlier pending verification");
    }
    tracing::info!(user_id, guild_id, "Queued verification");

    Ok("Thanks! Your verification is being processed. You can close this tab.".to_string())
}

/// Splits a `"{user_id}:{guild_id}"` correlation key into its parts.
fn parse_state(state: &str) -> Result<(u64, u64), AppError> {
    let malformed =
        || AppError::MalformedCallback("Unrecognized verification state".to_string());

    let (user, guild) = state.split_once(':').ok_or_else(malformed)?;
    let user_id = user.parse::<u64>().map_err(|_| malformed())?;
    let guild_id = guild.parse::<u64>().map_err(|_| malformed())?;

    Ok((user_id, guild_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    fn app_state() -> AppState {
        AppState {
            store: Store::in_memory(),
        }
    }

    fn query(code: &str, state: &str) -> Query<CallbackParams> {
        Query(CallbackParams {
            code: code.to_string(),
            state: state.to_string(),
        })
    }

    /// Tests the correlation-key parser against valid and hostile inputs.
    #[test]
    fn parses_correlation_state() {
        assert_eq!(parse_state("111:222").unwrap(), (111, 222));
        assert!(parse_state("").is_err());
        assert!(parse_state("111").is_err());
        assert!(parse_state("111:").is_err());
        assert!(parse_state(":222").is_err());
        assert!(parse_state("abc:222").is_err());
        assert!(parse_state("-1:222").is_err());
    }

    /// Tests that a well-formed callback for a configured guild queues a
    /// pending verification.
    ///
    /// Expected: Ok, one pending entry with the submitted code
    #[tokio::test]
    async fn valid_callback_queues_verification() {
        let state = app_state();
        state.store.role_bindings().set(222, 555).await.unwrap();

        let result = callback(State(state.clone()), query("abc", "111:222")).await;

        assert!(result.is_ok());
        let entry = state.store.pending().get(111).await.unwrap();
        assert_eq!(entry.guild_id, 222);
        assert_eq!(entry.authorization_code, "abc");
    }

    /// Tests rejection of a callback without an authorization code.
    ///
    /// Expected: MalformedCallback, nothing queued
    #[tokio::test]
    async fn missing_code_is_rejected() {
        let state = app_state();
        state.store.role_bindings().set(222, 555).await.unwrap();

        let result = callback(State(state.clone()), query("", "111:222")).await;

        assert!(matches!(result, Err(AppError::MalformedCallback(_))));
        assert!(state.store.pending().snapshot().await.is_empty());
    }

    /// Tests rejection of a state naming a guild with no configuration.
    ///
    /// Expected: MalformedCallback, nothing queued
    #[tokio::test]
    async fn unconfigured_guild_is_rejected() {
        let state = app_state();

        let result = callback(State(state.clone()), query("abc", "111:222")).await;

        assert!(matches!(result, Err(AppError::MalformedCallback(_))));
        assert!(state.store.pending().snapshot().await.is_empty());
    }

    /// Tests that a later callback for the same user wins.
    ///
    /// Expected: one entry carrying the newer code
    #[tokio::test]
    async fn newer_callback_replaces_older() {
        let state = app_state();
        state.store.role_bindings().set(222, 555).await.unwrap();
        state.store.role_bindings().set(333, 556).await.unwrap();

        callback(State(state.clone()), query("old", "111:222"))
            .await
            .unwrap();
        callback(State(state.clone()), query("new", "111:333"))
            .await
            .unwrap();

        let snapshot = state.store.pending().snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].authorization_code, "new");
        assert_eq!(snapshot[0].guild_id, 333);
    }
}
