//! Typed Discord REST surface over the rate-limited client.
//!
//! Covers exactly the endpoints the verification pipeline needs: the OAuth
//! token exchange, the authenticated membership listing, and the member
//! mutations (role grant, kick, direct message).

use reqwest::header;
use serde::Deserialize;
use serde_json::json;

use crate::discord::api_client::{ApiClient, ApiError, ApiOutcome};
use crate::model::AccessToken;

/// OAuth application credentials for the token exchange.
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

/// Response body of the authorization-code token exchange.
///
/// `access_token` stays optional: a 2xx body without a token field is an
/// exchange failure, not a deserialization error.
#[derive(Debug, Deserialize)]
pub struct TokenExchangeResponse {
    pub access_token: Option<String>,
}

/// One entry of the authenticated user's guild listing.
#[derive(Debug, Deserialize)]
pub struct UserGuild {
    #[serde(deserialize_with = "crate::model::snowflake")]
    pub id: u64,
}

/// A direct-message channel opened with a user.
#[derive(Debug, Deserialize)]
pub struct DmChannel {
    #[serde(deserialize_with = "crate::model::snowflake")]
    pub id: u64,
}

pub struct DiscordApi {
    client: ApiClient,
    api_base: String,
    bot_token: String,
    oauth: OAuthCredentials,
}

impl DiscordApi {
    pub fn new(
        client: ApiClient,
        api_base: String,
        bot_token: String,
        oauth: OAuthCredentials,
    ) -> Self {
        Self {
            client,
            api_base,
            bot_token,
            oauth,
        }
    }

    /// Redeems an authorization code for an access token.
    ///
    /// Form-encoded POST per the provider's OAuth contract. Invalid or
    /// already-redeemed codes come back as a non-2xx status, surfaced as
    /// `ApiError::UnexpectedStatus`.
    pub async fn exchange_code(
        &self,
        code: &str,
    ) -> Result<ApiOutcome<TokenExchangeResponse>, ApiError> {
        let form = [
            ("client_id", self.oauth.client_id.as_str()),
            ("client_secret", self.oauth.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.oauth.redirect_url.as_str()),
        ];

        let request = self
            .client
            .http()
            .post(format!("{}/oauth2/token", self.api_base))
            .form(&form);

        self.client.request_json(request).await
    }

    /// Lists the guilds the token's user belongs to.
    pub async fn current_user_guilds(
        &self,
        token: &AccessToken,
    ) -> Result<ApiOutcome<Vec<UserGuild>>, ApiError> {
        let request = self
            .client
            .http()
            .get(format!("{}/users/@me/guilds", self.api_base))
            .bearer_auth(token.secret());

        self.client.request_json(request).await
    }

    /// Checks whether a user is currently a member of a guild.
    pub async fn get_guild_member(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<ApiOutcome<()>, ApiError> {
        let request = self
            .client
            .http()
            .get(format!(
                "{}/guilds/{guild_id}/members/{user_id}",
                self.api_base
            ))
            .header(header::AUTHORIZATION, self.bot_auth());

        self.client.request_unit(request).await
    }

    /// Grants a role to a guild member.
    pub async fn add_member_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> Result<ApiOutcome<()>, ApiError> {
        let request = self
            .client
            .http()
            .put(format!(
                "{}/guilds/{guild_id}/members/{user_id}/roles/{role_id}",
                self.api_base
            ))
            .header(header::AUTHORIZATION, self.bot_auth());

        self.client.request_unit(request).await
    }

    /// Removes (kicks) a member from a guild.
    pub async fn remove_member(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<ApiOutcome<()>, ApiError> {
        let request = self
            .client
            .http()
            .delete(format!(
                "{}/guilds/{guild_id}/members/{user_id}",
                self.api_base
            ))
            .header(header::AUTHORIZATION, self.bot_auth());

        self.client.request_unit(request).await
    }

    /// Opens (or reuses) the direct-message channel with a user.
    pub async fn create_dm_channel(&self, user_id: u64) -> Result<ApiOutcome<DmChannel>, ApiError> {
        let request = self
            .client
            .http()
            .post(format!("{}/users/@me/channels", self.api_base))
            .header(header::AUTHORIZATION, self.bot_auth())
            .json(&json!({ "recipient_id": user_id.to_string() }));

        self.client.request_json(request).await
    }

    /// Sends a message to a channel.
    pub async fn create_message(
        &self,
        channel_id: u64,
        content: &str,
    ) -> Result<ApiOutcome<()>, ApiError> {
        let request = self
            .client
            .http()
            .post(format!("{}/channels/{channel_id}/messages", self.api_base))
            .header(header::AUTHORIZATION, self.bot_auth())
            .json(&json!({ "content": content }));

        self.client.request_unit(request).await
    }

    fn bot_auth(&self) -> String {
        format!("Bot {}", self.bot_token)
    }
}
