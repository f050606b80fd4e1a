//! The verification pipeline: token exchange, membership audit, enforcement
//! and user notification.
//!
//! Every operation here absorbs its own failures into typed outcomes; nothing
//! in this module can crash the reconciliation loop.

pub mod enforce;
pub mod notify;

pub use enforce::EnforceOutcome;

use crate::discord::api_client::ApiOutcome;
use crate::discord::rest::DiscordApi;
use crate::model::{AccessToken, AuditVerdict, PendingVerification};
use crate::store::Store;

pub struct VerificationService<'a> {
    api: &'a DiscordApi,
    store: &'a Store,
}

impl<'a> VerificationService<'a> {
    pub fn new(api: &'a DiscordApi, store: &'a Store) -> Self {
        Self { api, store }
    }

    /// Drives one pending entry through exchange and audit.
    pub async fn evaluate(&self, entry: &PendingVerification) -> AuditVerdict {
        let Some(token) = self.exchange(&entry.authorization_code).await else {
            return AuditVerdict::ExchangeFailed;
        };

        self.audit(&token).await
    }

    /// Redeems an authorization code for an access token.
    ///
    /// Exactly one exchange attempt is made per code: the provider
    /// invalidates a code on first redemption regardless of outcome, so a
    /// failed exchange is terminal for the entry.
    pub async fn exchange(&self, code: &str) -> Option<AccessToken> {
        match self.api.exchange_code(code).await {
            Ok(ApiOutcome::Success(response)) => match response.access_token {
                Some(secret) => Some(AccessToken::new(secret)),
                None => {
                    tracing::warn!("Token exchange response carried no access token");
                    None
                }
            },
            Ok(ApiOutcome::NotFound) => {
                tracing::warn!("Token endpoint reported not found");
                None
            }
            Err(e) => {
                tracing::warn!("Token exchange failed: {}", e);
                None
            }
        }
    }

    /// Fetches the user's guild memberships and evaluates them against the
    /// denylist.
    ///
    /// Reports the first denylisted guild encountered in provider order;
    /// which match is reported does not matter, only that one exists.
    pub async fn audit(&self, token: &AccessToken) -> AuditVerdict {
        let guilds = match self.api.current_user_guilds(token).await {
            Ok(ApiOutcome::Success(guilds)) => guilds,
            Ok(ApiOutcome::NotFound) => {
                tracing::warn!("Membership listing reported not found");
                return AuditVerdict::FetchFailed;
            }
            Err(e) => {
                tracing::warn!("Membership fetch failed: {}", e);
                return AuditVerdict::FetchFailed;
            }
        };

        let denylist = self.store.denylist().all().await;
        match guilds.iter().find(|guild| denylist.contains(&guild.id)) {
            Some(guild) => AuditVerdict::Denylisted(guild.id),
            None => AuditVerdict::Clean,
        }
    }
}
