//! Best-effort direct-message notification.

use crate::discord::api_client::ApiOutcome;
use crate::service::verify::VerificationService;

impl VerificationService<'_> {
    /// Sends a direct message to a user after enforcement has completed.
    ///
    /// Users can close their DMs to bots, so every failure here is expected
    /// and swallowed; the enforcement outcome already happened and stands.
    pub async fn notify(&self, user_id: u64, content: &str) {
        let channel = match self.api.create_dm_channel(user_id).await {
            Ok(ApiOutcome::Success(channel)) => channel,
            Ok(ApiOutcome::NotFound) => {
                tracing::debug!(user_id, "No DM channel available");
                return;
            }
            Err(e) => {
                tracing::debug!(user_id, "Opening DM channel failed: {}", e);
                return;
            }
        };

        match self.api.create_message(channel.id, content).await {
            Ok(ApiOutcome::Success(())) => {
                tracing::debug!(user_id, "Sent verification notice");
            }
            Ok(ApiOutcome::NotFound) => {
                tracing::debug!(user_id, "DM channel vanished before send");
            }
            Err(e) => {
                tracing::debug!(user_id, "Sending verification notice failed: {}", e);
            }
        }
    }
}
