//! Slash command definitions and handlers.
//!
//! Commands only read and write local state or hand out an authorization
//! URL; nothing here calls the provider REST API directly. The admin-facing
//! commands are gated twice: Discord-side through default member
//! permissions, and for the denylist additionally to the configured owner.

use serenity::all::{
    Command, CommandInteraction, CommandOptionType, Context, CreateActionRow, CreateButton,
    CreateCommand, CreateCommandOption, CreateInteractionResponse, CreateInteractionResponseMessage,
    Permissions, ResolvedOption, ResolvedValue,
};

use crate::bot::Handler;
use crate::error::AppError;

/// The global slash command set registered on ready.
pub fn definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("verify")
            .description("Verify your server memberships to gain access")
            .dm_permission(false),
        CreateCommand::new("set_auth_role")
            .description("Set the role granted to verified members of this server")
            .dm_permission(false)
            .default_member_permissions(Permissions::ADMINISTRATOR)
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Role,
                    "role",
                    "Role to grant on successful verification",
                )
                .required(true),
            ),
        CreateCommand::new("denylist")
            .description("Manage the list of blocked servers")
            .dm_permission(false)
            .default_member_permissions(Permissions::ADMINISTRATOR)
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::SubCommand,
                    "add",
                    "Block a server by id",
                )
                .add_sub_option(
                    CreateCommandOption::new(
                        CommandOptionType::String,
                        "guild_id",
                        "Id of the server to block",
                    )
                    .required(true),
                ),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::SubCommand,
                    "remove",
                    "Unblock a server by id",
                )
                .add_sub_option(
                    CreateCommandOption::new(
                        CommandOptionType::String,
                        "guild_id",
                        "Id of the server to unblock",
                    )
                    .required(true),
                ),
            )
            .add_option(CreateCommandOption::new(
                CommandOptionType::SubCommand,
                "list",
                "List blocked server ids",
            )),
    ]
}

/// Routes a command interaction to its handler and logs any failure.
pub async fn dispatch(handler: &Handler, ctx: &Context, command: &CommandInteraction) {
    let name = command.data.name.as_str();
    let result = match name {
        "verify" => verify(handler, ctx, command).await,
        "set_auth_role" => set_auth_role(handler, ctx, command).await,
        "denylist" => denylist(handler, ctx, command).await,
        other => {
            tracing::warn!("Received unknown command: {}", other);
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!("Command /{} failed: {}", name, e);
    }
}

/// Handles `/verify`: replies with a personal authorization link.
async fn verify(
    handler: &Handler,
    ctx: &Context,
    command: &CommandInteraction,
) -> Result<(), AppError> {
    let Some(guild_id) = command.guild_id else {
        return reply(ctx, command, "This command can only be used in a server.").await;
    };

    let url = handler
        .auth
        .authorize_url(command.user.id.get(), guild_id.get());

    let message = CreateInteractionResponseMessage::new()
        .content("Click the button below to verify your server memberships.")
        .components(vec![CreateActionRow::Buttons(vec![CreateButton::new_link(
            url.to_string(),
        )
        .label("Verify")])])
        .ephemeral(true);

    command
        .create_response(&ctx.http, CreateInteractionResponse::Message(message))
        .await?;

    Ok(())
}

/// Handles `/set_auth_role`: binds the verification role for this guild.
async fn set_auth_role(
    handler: &Handler,
    ctx: &Context,
    command: &CommandInteraction,
) -> Result<(), AppError> {
    let Some(guild_id) = command.guild_id else {
        return reply(ctx, command, "This command can only be used in a server.").await;
    };

    let Some(role) = command.data.options().iter().find_map(|o| match &o.value {
        ResolvedValue::Role(role) => Some(role.id.get()),
        _ => None,
    }) else {
        return reply(ctx, command, "A role is required.").await;
    };

    handler
        .store
        .role_bindings()
        .set(guild_id.get(), role)
        .await?;
    tracing::info!(guild_id = guild_id.get(), role_id = role, "Role binding updated");

    reply(
        ctx,
        command,
        &format!("Verified members will now receive <@&{role}>."),
    )
    .await
}

/// Handles `/denylist add|remove|list`, restricted to the bot owner.
async fn denylist(
    handler: &Handler,
    ctx: &Context,
    command: &CommandInteraction,
) -> Result<(), AppError> {
    if command.user.id.get() != handler.owner_id {
        return reply(ctx, command, "Only the bot owner can manage the denylist.").await;
    }

    let options = command.data.options();
    let Some(ResolvedOption {
        name,
        value: ResolvedValue::SubCommand(sub_options),
        ..
    }) = options.first()
    else {
        return reply(ctx, command, "Unknown denylist subcommand.").await;
    };

    match *name {
        "add" => {
            let Some(guild_id) = sub_guild_id(sub_options) else {
                return reply(ctx, command, "That is not a valid server id.").await;
            };
            let added = handler.store.denylist().add(guild_id).await?;
            let message = if added {
                format!("Blocked server `{guild_id}`.")
            } else {
                format!("Server `{guild_id}` is already blocked.")
            };
            reply(ctx, command, &message).await
        }
        "remove" => {
            let Some(guild_id) = sub_guild_id(sub_options) else {
                return reply(ctx, command, "That is not a valid server id.").await;
            };
            let removed = handler.store.denylist().remove(guild_id).await?;
            let message = if removed {
                format!("Unblocked server `{guild_id}`.")
            } else {
                format!("Server `{guild_id}` was not blocked.")
            };
            reply(ctx, command, &message).await
        }
        "list" => {
            let entries = handler.store.denylist().all().await;
            let message = if entries.is_empty() {
                "No servers are blocked.".to_string()
            } else {
                let ids: Vec<String> = entries.iter().map(|id| format!("`{id}`")).collect();
                format!("Blocked servers: {}", ids.join(", "))
            };
            reply(ctx, command, &message).await
        }
        other => {
            tracing::warn!("Unknown denylist subcommand: {}", other);
            reply(ctx, command, "Unknown denylist subcommand.").await
        }
    }
}

/// Pulls the `guild_id` string option out of a subcommand and parses it.
fn sub_guild_id(options: &[ResolvedOption]) -> Option<u64> {
    options.iter().find_map(|o| match &o.value {
        ResolvedValue::String(value) => value.parse::<u64>().ok(),
        _ => None,
    })
}

/// Sends an ephemeral text reply to an interaction.
async fn reply(ctx: &Context, command: &CommandInteraction, content: &str) -> Result<(), AppError> {
    let message = CreateInteractionResponseMessage::new()
        .content(content)
        .ephemeral(true);

    command
        .create_response(&ctx.http, CreateInteractionResponse::Message(message))
        .await?;

    Ok(())
}
