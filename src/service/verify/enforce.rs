//! Role grant and member removal, both best-effort.
//!
//! Partial failure here never rolls back the token exchange or re-queues the
//! entry; each failure kind is absorbed into a named outcome and logged.

use reqwest::StatusCode;

use crate::discord::api_client::{ApiError, ApiOutcome};
use crate::service::verify::VerificationService;

/// Outcome of one enforcement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforceOutcome {
    /// The platform mutation was applied.
    Applied,
    /// No role binding is configured for the guild; a configuration gap,
    /// not an error.
    NoBinding,
    /// The member already left the guild.
    MemberGone,
    /// The bot lacks the required permission; needs operator intervention.
    PermissionDenied,
    /// Any other provider failure.
    Failed,
}

impl VerificationService<'_> {
    /// Grants the guild's configured role to a verified member.
    ///
    /// # Arguments
    /// - `user_id`: Discord user ID of the verified member
    /// - `guild_id`: Guild the verification was initiated for
    pub async fn enforce_clean(&self, user_id: u64, guild_id: u64) -> EnforceOutcome {
        let Some(role_id) = self.store.role_bindings().get(guild_id).await else {
            tracing::info!(guild_id, "No role binding configured, skipping grant");
            return EnforceOutcome::NoBinding;
        };

        match self.api.get_guild_member(guild_id, user_id).await {
            Ok(ApiOutcome::Success(())) => {}
            Ok(ApiOutcome::NotFound) => {
                tracing::info!(user_id, guild_id, "Member left before the role grant");
                return EnforceOutcome::MemberGone;
            }
            Err(e) => {
                tracing::warn!(user_id, guild_id, "Member lookup failed: {}", e);
                return EnforceOutcome::Failed;
            }
        }

        match self.api.add_member_role(guild_id, user_id, role_id).await {
            Ok(ApiOutcome::Success(())) => {
                tracing::info!(user_id, guild_id, role_id, "Granted verification role");
                EnforceOutcome::Applied
            }
            Ok(ApiOutcome::NotFound) => {
                tracing::info!(user_id, guild_id, "Member gone before the role grant");
                EnforceOutcome::MemberGone
            }
            Err(ApiError::UnexpectedStatus { status, .. }) if status == StatusCode::FORBIDDEN => {
                tracing::error!(
                    user_id,
                    guild_id,
                    role_id,
                    "Missing permission to grant role; check the bot's role position and Manage Roles"
                );
                EnforceOutcome::PermissionDenied
            }
            Err(e) => {
                tracing::warn!(user_id, guild_id, "Role grant failed: {}", e);
                EnforceOutcome::Failed
            }
        }
    }

    /// Removes a denylisted member from the guild.
    pub async fn enforce_ban(&self, user_id: u64, guild_id: u64) -> EnforceOutcome {
        match self.api.remove_member(guild_id, user_id).await {
            Ok(ApiOutcome::Success(())) => {
                tracing::info!(user_id, guild_id, "Removed denylisted member");
                EnforceOutcome::Applied
            }
            Ok(ApiOutcome::NotFound) => {
                tracing::info!(user_id, guild_id, "Member already gone, nothing to remove");
                EnforceOutcome::MemberGone
            }
            Err(ApiError::UnexpectedStatus { status, .. }) if status == StatusCode::FORBIDDEN => {
                tracing::error!(
                    user_id,
                    guild_id,
                    "Missing permission to remove member; check Kick Members"
                );
                EnforceOutcome::PermissionDenied
            }
            Err(e) => {
                tracing::warn!(user_id, guild_id, "Member removal failed: {}", e);
                EnforceOutcome::Failed
            }
        }
    }
}
