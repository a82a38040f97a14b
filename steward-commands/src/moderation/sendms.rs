use tokio::time::Duration;
use tracing::{error, warn};
use twilight_model::{
    application::{
        command::{Command, CommandType},
        interaction::application_command::CommandDataOption,
    },
    id::{
        Id,
        marker::{ChannelMarker, GuildMarker},
    },
};
use twilight_util::builder::command::{CommandBuilder, StringBuilder};

use crate::options::string_option;
use crate::{CommandMeta, Invoker};
use steward_core::{
    clock::Clock,
    cooldown::{CooldownRejection, CooldownScope, Cooldowns},
    platform::Platform,
};
use steward_utils::parse::normalize_payloads;

pub const META: CommandMeta = CommandMeta {
    name: "sendms",
    desc: "Send up to 3 messages to this channel (safe limits and cooldowns).",
};

/// Wait between consecutive sends of one relay.
const SEND_PACING: Duration = Duration::from_millis(700);

const GUILD_COOLDOWN_MESSAGE: &str = "Server is handling requests. Try again in a moment.";
const NO_CONTENT_MESSAGE: &str = "No valid messages provided.";
const NO_CHANNEL_MESSAGE: &str = "This command must be used in a channel.";
const ACK_MESSAGE: &str = "Sending message(s)...";
const FORBIDDEN_MESSAGE: &str = "I don't have permission to send messages in that channel.";

/// Raw `/sendms` arguments as delivered by the platform.
#[derive(Clone, Debug, Default)]
pub struct SendmsArgs {
    pub m1: Option<String>,
    pub m2: Option<String>,
    pub m3: Option<String>,
}

impl SendmsArgs {
    pub fn from_options(options: &[CommandDataOption]) -> Self {
        Self {
            m1: string_option(options, "m1").map(ToOwned::to_owned),
            m2: string_option(options, "m2").map(ToOwned::to_owned),
            m3: string_option(options, "m3").map(ToOwned::to_owned),
        }
    }
}

/// How a relay invocation ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SendmsOutcome {
    CoolingDown(CooldownRejection),
    NoContent,
    NoChannel,
    /// Every payload was delivered.
    Sent(usize),
    /// Delivery stopped early; `sent` payloads went out before the failure.
    Aborted { sent: usize, forbidden: bool },
}

/// Slash command schema.
pub fn command() -> anyhow::Result<Command> {
    let command = CommandBuilder::new(META.name, META.desc, CommandType::ChatInput)
        .option(StringBuilder::new("m1", "Message 1 (required)").required(true))
        .option(StringBuilder::new("m2", "Message 2 (optional)"))
        .option(StringBuilder::new("m3", "Message 3 (optional)"))
        .validate()?
        .build();

    Ok(command)
}

fn cooldown_message(rejection: CooldownRejection) -> String {
    match rejection.scope {
        CooldownScope::User => format!(
            "You're doing that too often — try again in {}s.",
            rejection.remaining_secs
        ),
        CooldownScope::Guild => GUILD_COOLDOWN_MESSAGE.to_owned(),
    }
}

/// Relay up to three payloads into the invoking channel, in order.
///
/// Cooldowns are only started once every payload was sent; sends that already
/// happened are never retracted when a later one fails.
pub async fn run<P, C>(
    platform: &P,
    clock: &C,
    cooldowns: &Cooldowns,
    invoker: &Invoker,
    guild_id: Option<Id<GuildMarker>>,
    channel_id: Option<Id<ChannelMarker>>,
    args: SendmsArgs,
) -> anyhow::Result<SendmsOutcome>
where
    P: Platform,
    C: Clock,
{
    let guild_key = guild_id.map_or(0, Id::get);
    let permit = match cooldowns.acquire(invoker.user_id.get(), guild_key, clock.now()) {
        Ok(permit) => permit,
        Err(rejection) => {
            platform.respond(&cooldown_message(rejection), true).await?;
            return Ok(SendmsOutcome::CoolingDown(rejection));
        }
    };

    let payloads = normalize_payloads([
        args.m1.as_deref(),
        args.m2.as_deref(),
        args.m3.as_deref(),
    ]);

    if payloads.is_empty() {
        platform.respond(NO_CONTENT_MESSAGE, true).await?;
        return Ok(SendmsOutcome::NoContent);
    }

    let Some(channel_id) = channel_id else {
        platform.respond(NO_CHANNEL_MESSAGE, true).await?;
        return Ok(SendmsOutcome::NoChannel);
    };

    platform.respond(ACK_MESSAGE, true).await?;

    for (index, content) in payloads.iter().enumerate() {
        if let Err(source) = platform.send_message(channel_id, content).await {
            let forbidden = source.is_forbidden();
            let reply = if forbidden {
                warn!(channel_id = channel_id.get(), "relay send forbidden");
                FORBIDDEN_MESSAGE.to_owned()
            } else {
                error!(?source, channel_id = channel_id.get(), "relay send failed");
                format!("Failed to send messages: {source}")
            };

            platform.followup(&reply, true).await?;
            return Ok(SendmsOutcome::Aborted {
                sent: index,
                forbidden,
            });
        }

        if index + 1 < payloads.len() {
            clock.sleep(SEND_PACING).await;
        }
    }

    permit.commit(clock.now());

    let confirmation = format!("✅ Sent {} message(s).", payloads.len());
    platform.followup(&confirmation, true).await?;

    Ok(SendmsOutcome::Sent(payloads.len()))
}
