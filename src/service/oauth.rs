//! OAuth2 authorization-URL construction for Discord.

use oauth2::basic::{BasicClient, BasicErrorResponseType, BasicTokenType};
use oauth2::{
    AuthUrl, Client, ClientId, CsrfToken, EmptyExtraTokenFields, EndpointNotSet, EndpointSet,
    RedirectUrl, RevocationErrorResponseType, Scope, StandardErrorResponse, StandardRevocableToken,
    StandardTokenIntrospectionResponse, StandardTokenResponse,
};
use url::Url;

use crate::{config::Config, error::AppError};

/// Type alias for the OAuth2 client configured for Discord authentication.
///
/// Only the authorization endpoint is set. The code -> token exchange is a
/// provider call like any other and goes through the rate-limited API client
/// instead, so one retry policy covers all outbound traffic.
pub(crate) type OAuth2Client = Client<
    StandardErrorResponse<BasicErrorResponseType>,
    StandardTokenResponse<EmptyExtraTokenFields, BasicTokenType>,
    StandardTokenIntrospectionResponse<EmptyExtraTokenFields, BasicTokenType>,
    StandardRevocableToken,
    StandardErrorResponse<RevocationErrorResponseType>,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
>;

#[derive(Clone)]
pub struct DiscordAuthService {
    oauth_client: OAuth2Client,
}

impl DiscordAuthService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let oauth_client = BasicClient::new(ClientId::new(config.discord_client_id.clone()))
            .set_auth_uri(AuthUrl::new(config.discord_auth_url.clone())?)
            .set_redirect_uri(RedirectUrl::new(config.discord_redirect_url.clone())?);

        Ok(Self { oauth_client })
    }

    /// Builds the authorization URL a user follows to begin verification.
    ///
    /// The correlation key rides in the `state` parameter as
    /// `"{user_id}:{guild_id}"`; the callback endpoint decodes it to tie the
    /// returned authorization code back to the requesting user and guild.
    pub fn authorize_url(&self, user_id: u64, guild_id: u64) -> Url {
        let (url, _state) = self
            .oauth_client
            .authorize_url(|| CsrfToken::new(format!("{user_id}:{guild_id}")))
            .add_scope(Scope::new("identify".to_string()))
            .add_scope(Scope::new("guilds".to_string()))
            .url();

        url
    }
}
