pub mod moderation;
mod options;
#[cfg(test)]
mod testing;
pub mod utility;

use std::sync::Arc;

use tracing::{debug, info};
use twilight_http::Client;
use twilight_model::{
    application::{command::Command, interaction::InteractionData},
    gateway::payload::incoming::{InteractionCreate, MessageCreate},
    guild::Permissions,
    id::{
        Id,
        marker::{ApplicationMarker, UserMarker},
    },
};

use moderation::{changenick, sendms};
use steward_core::{Context, clock::SystemClock};
use steward_utils::{COMMAND_PREFIX, platform::InteractionPlatform};

// Name and description shared by a command's schema and its router arm
pub struct CommandMeta {
    pub name: &'static str,
    pub desc: &'static str,
}

/// Who invoked a slash command, as far as authorization cares.
#[derive(Clone, Debug)]
pub struct Invoker {
    pub user_id: Id<UserMarker>,
    pub name: String,
    /// Guild-level permissions; `None` outside a guild.
    pub permissions: Option<Permissions>,
}

impl Invoker {
    fn from_interaction(interaction: &InteractionCreate) -> Option<Self> {
        let user = interaction.author()?;
        let permissions = interaction
            .member
            .as_ref()
            .and_then(|member| member.permissions);

        Some(Self {
            user_id: user.id,
            name: user.name.clone(),
            permissions,
        })
    }
}

/// Slash command schemas registered with the platform.
pub fn slash_commands() -> anyhow::Result<Vec<Command>> {
    Ok(vec![sendms::command()?, changenick::command()?])
}

/// Replace the global slash commands and return how many the platform now holds.
pub async fn sync_commands(
    http: &Client,
    application_id: Id<ApplicationMarker>,
) -> anyhow::Result<usize> {
    let commands = slash_commands()?;
    let synced = http
        .interaction(application_id)
        .set_global_commands(&commands)
        .await?
        .model()
        .await?;

    Ok(synced.len())
}

/// Extract the lowercased command word from a prefixed message.
fn parse_prefix_command(content: &str) -> Option<String> {
    let content = content.trim().strip_prefix(COMMAND_PREFIX)?.trim_start();
    let cmd = content.split_whitespace().next()?;

    Some(cmd.to_ascii_lowercase())
}

pub async fn handle_message(ctx: Context, msg: Box<MessageCreate>) -> anyhow::Result<()> {
    if msg.author.bot {
        return Ok(());
    }

    let Some(cmd) = parse_prefix_command(&msg.content) else {
        return Ok(());
    };

    match cmd.as_str() {
        name if name == utility::ping::META.name => utility::ping::run(ctx.clone(), msg).await?,
        // Add new commands here
        _ => {}
    }

    Ok(())
}

pub async fn handle_interaction(
    ctx: Context,
    interaction: Box<InteractionCreate>,
) -> anyhow::Result<()> {
    let Some(InteractionData::ApplicationCommand(data)) = interaction.data.as_ref() else {
        return Ok(());
    };

    let Some(invoker) = Invoker::from_interaction(&interaction) else {
        debug!(command = %data.name, "interaction without an author");
        return Ok(());
    };

    let platform = InteractionPlatform::new(Arc::clone(&ctx.http), &interaction);
    let clock = SystemClock;

    match data.name.as_str() {
        name if name == sendms::META.name => {
            let channel_id = interaction.channel.as_ref().map(|channel| channel.id);
            let outcome = sendms::run(
                &platform,
                &clock,
                &ctx.cooldowns,
                &invoker,
                interaction.guild_id,
                channel_id,
                sendms::SendmsArgs::from_options(&data.options),
            )
            .await?;

            info!(user_id = invoker.user_id.get(), ?outcome, "sendms handled");
        }
        name if name == changenick::META.name => {
            let outcome = changenick::run(
                &platform,
                &clock,
                ctx.bot_user_id,
                &invoker,
                interaction.guild_id,
                interaction.app_permissions,
                changenick::ChangenickArgs::from_options(&data.options),
            )
            .await?;

            if let changenick::ChangenickOutcome::Rejected(reason) = outcome {
                info!(user_id = invoker.user_id.get(), reason, "changenick rejected");
            }
        }
        other => debug!(command = other, "ignoring unknown command"),
    }

    Ok(())
}
