use std::sync::Arc;

use serenity::all::{Client, Command, Context, EventHandler, GatewayIntents, Interaction, Ready};
use serenity::async_trait;

use crate::bot::commands;
use crate::config::Config;
use crate::error::AppError;
use crate::scheduler::Reconciler;
use crate::service::oauth::DiscordAuthService;
use crate::store::Store;

/// Discord bot event handler
pub struct Handler {
    pub store: Store,
    pub auth: DiscordAuthService,
    pub reconciler: Arc<Reconciler>,
    pub owner_id: u64,
}

#[async_trait]
impl EventHandler for Handler {
    /// Called when the bot is ready and connected to Discord
    ///
    /// Registers the global slash commands and starts the reconciliation
    /// loop. The gateway can emit this event again after a reconnect;
    /// re-registering commands is harmless and the reconciler start is
    /// guarded.
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!("{} is connected to Discord!", ready.user.name);

        if let Err(e) = Command::set_global_commands(&ctx.http, commands::definitions()).await {
            tracing::error!("Failed to register slash commands: {:?}", e);
        }

        if self.reconciler.start() {
            tracing::info!("Reconciler started");
        }
    }

    /// Called for every interaction; only slash commands are handled
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            commands::dispatch(self, &ctx, &command).await;
        }
    }
}

/// Builds the Discord bot client.
///
/// The returned client has not been started; the caller owns the blocking
/// `start` call so it can keep a handle to the shard manager for shutdown.
///
/// # Arguments
/// - `config` - Application configuration
/// - `handler` - Event handler carrying the store and services
pub async fn init_bot(config: &Config, handler: Handler) -> Result<Client, AppError> {
    // Slash commands and their responses need no privileged intents.
    let intents = GatewayIntents::GUILDS;

    let client = Client::builder(&config.discord_bot_token, intents)
        .event_handler(handler)
        .await?;

    Ok(client)
}
