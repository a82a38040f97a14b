use tokio::time::Duration;
use tracing::{error, info, warn};
use twilight_model::{
    application::{
        command::{Command, CommandType},
        interaction::application_command::CommandDataOption,
    },
    guild::Permissions,
    id::{
        Id,
        marker::{GuildMarker, UserMarker},
    },
};
use twilight_util::builder::command::{BooleanBuilder, CommandBuilder, StringBuilder, UserBuilder};

use crate::options::{bool_option, string_option, user_option};
use crate::{CommandMeta, Invoker};
use steward_core::{
    clock::Clock,
    platform::{GuildMember, Platform, PlatformError},
};
use steward_utils::{
    batch::BatchResult,
    parse::{MAX_MESSAGE_CHARS, truncate_chars},
    permissions::can_manage_nicknames,
};

pub const META: CommandMeta = CommandMeta {
    name: "changenick",
    desc: "Change a user's nickname or change multiple members (safe, limited).",
};

/// Most members a single `change_many` run will touch.
pub const MAX_BATCH_TARGETS: usize = 50;
/// Wait after each target of one batch.
const TARGET_PACING: Duration = Duration::from_millis(250);
const SUMMARY_SUCCEEDED_LIMIT: usize = 20;
const SUMMARY_FAILED_LIMIT: usize = 40;

const GUILD_ONLY_MESSAGE: &str = "This command must be used in a server.";
const INVOKER_DENIED_MESSAGE: &str =
    "You must have Manage Nicknames (or be server owner) to use this command.";
const BOT_DENIED_MESSAGE: &str = "I need the Manage Nicknames permission to do this.";
const NO_TARGET_MESSAGE: &str = "You must specify a member unless change_many is true.";

pub const OWNER_REASON: &str = "owner, cannot change";
pub const HIERARCHY_REASON: &str = "role equal or higher than bot";
pub const FORBIDDEN_REASON: &str = "Forbidden";

/// Raw `/changenick` arguments as delivered by the platform.
#[derive(Clone, Debug, Default)]
pub struct ChangenickArgs {
    pub nickname: String,
    pub member: Option<Id<UserMarker>>,
    pub change_many: bool,
}

impl ChangenickArgs {
    pub fn from_options(options: &[CommandDataOption]) -> Self {
        Self {
            nickname: string_option(options, "nickname")
                .unwrap_or_default()
                .to_owned(),
            member: user_option(options, "member"),
            change_many: bool_option(options, "change_many").unwrap_or(false),
        }
    }
}

/// How a nickname invocation ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ChangenickOutcome {
    /// Refused before anything was acknowledged or changed.
    Rejected(&'static str),
    /// Target resolution failed after the request was acknowledged.
    Failed(String),
    Completed(BatchResult),
}

/// Slash command schema.
pub fn command() -> anyhow::Result<Command> {
    let command = CommandBuilder::new(META.name, META.desc, CommandType::ChatInput)
        .option(StringBuilder::new("nickname", "The new nickname to apply").required(true))
        .option(UserBuilder::new(
            "member",
            "(Optional) member to change. Required unless change_many is true.",
        ))
        .option(BooleanBuilder::new(
            "change_many",
            "If true, change multiple members (limited to a safe max)",
        ))
        .validate()?
        .build();

    Ok(command)
}

/// Everything the batch loop needs to know about the guild.
struct BatchContext<'a> {
    guild_id: Id<GuildMarker>,
    owner_id: Id<UserMarker>,
    bot: &'a GuildMember,
    nickname: &'a str,
    reason: &'a str,
}

/// Rename one member or up to [`MAX_BATCH_TARGETS`] members of the invoking guild.
///
/// Each target is tried in order and recorded as succeeded or failed; a
/// failure never stops the batch and earlier renames are never undone.
pub async fn run<P, C>(
    platform: &P,
    clock: &C,
    bot_user_id: Id<UserMarker>,
    invoker: &Invoker,
    guild_id: Option<Id<GuildMarker>>,
    bot_permissions: Option<Permissions>,
    args: ChangenickArgs,
) -> anyhow::Result<ChangenickOutcome>
where
    P: Platform,
    C: Clock,
{
    let Some(guild_id) = guild_id else {
        return reject(platform, GUILD_ONLY_MESSAGE).await;
    };

    let owner_id = match platform.guild_owner(guild_id).await {
        Ok(owner_id) => owner_id,
        Err(source) => {
            error!(?source, guild_id = guild_id.get(), "guild owner lookup failed");
            let reply = failure_message(&source);
            platform.respond(&reply, true).await?;
            return Ok(ChangenickOutcome::Failed(reply));
        }
    };

    if !can_manage_nicknames(invoker.permissions) && invoker.user_id != owner_id {
        return reject(platform, INVOKER_DENIED_MESSAGE).await;
    }

    if !can_manage_nicknames(bot_permissions) {
        return reject(platform, BOT_DENIED_MESSAGE).await;
    }

    if !args.change_many && args.member.is_none() {
        return reject(platform, NO_TARGET_MESSAGE).await;
    }

    platform.defer(false).await?;

    let resolved = resolve(platform, guild_id, bot_user_id, &args).await;
    let (bot, targets) = match resolved {
        Ok(resolved) => resolved,
        Err(source) => {
            error!(?source, guild_id = guild_id.get(), "nickname target resolution failed");
            let reply = failure_message(&source);
            platform.followup(&reply, true).await?;
            return Ok(ChangenickOutcome::Failed(reply));
        }
    };

    let reason = format!("Changed by {}", invoker.name);
    let batch = BatchContext {
        guild_id,
        owner_id,
        bot: &bot,
        nickname: &args.nickname,
        reason: &reason,
    };
    let result = apply(platform, clock, &batch, &targets).await;

    info!(
        guild_id = guild_id.get(),
        succeeded = result.succeeded.len(),
        failed = result.failed.len(),
        "nickname batch finished"
    );

    platform.followup(&summary(&result), false).await?;

    Ok(ChangenickOutcome::Completed(result))
}

async fn reject<P: Platform>(
    platform: &P,
    message: &'static str,
) -> anyhow::Result<ChangenickOutcome> {
    platform.respond(message, true).await?;
    Ok(ChangenickOutcome::Rejected(message))
}

fn failure_message(source: &PlatformError) -> String {
    format!("Failed to change nicknames: {source}")
}

/// Fetch the bot's own member and the ordered target set.
async fn resolve<P: Platform>(
    platform: &P,
    guild_id: Id<GuildMarker>,
    bot_user_id: Id<UserMarker>,
    args: &ChangenickArgs,
) -> Result<(GuildMember, Vec<GuildMember>), PlatformError> {
    let bot = platform.member(guild_id, bot_user_id).await?;

    let targets = match args.member {
        Some(user_id) if !args.change_many => vec![platform.member(guild_id, user_id).await?],
        _ => select_targets(platform.members(guild_id).await?, bot_user_id),
    };

    Ok((bot, targets))
}

/// Humans other than the bot, in listing order, capped at [`MAX_BATCH_TARGETS`].
///
/// Members past the cap are left out entirely rather than reported.
fn select_targets(members: Vec<GuildMember>, bot_user_id: Id<UserMarker>) -> Vec<GuildMember> {
    members
        .into_iter()
        .filter(|member| !member.bot && member.user_id != bot_user_id)
        .take(MAX_BATCH_TARGETS)
        .collect()
}

async fn apply<P, C>(
    platform: &P,
    clock: &C,
    batch: &BatchContext<'_>,
    targets: &[GuildMember],
) -> BatchResult
where
    P: Platform,
    C: Clock,
{
    let mut result = BatchResult::new();

    for target in targets {
        if target.user_id == batch.owner_id {
            result.record_failure(&target.display_name, OWNER_REASON);
        } else if batch.bot.role_rank <= target.role_rank {
            result.record_failure(&target.display_name, HIERARCHY_REASON);
        } else {
            let outcome = platform
                .set_nickname(batch.guild_id, target.user_id, batch.nickname, batch.reason)
                .await;

            match outcome {
                Ok(()) => result.record_success(&target.display_name),
                Err(source) if source.is_forbidden() => {
                    warn!(user_id = target.user_id.get(), "nickname change forbidden");
                    result.record_failure(&target.display_name, FORBIDDEN_REASON);
                }
                Err(source) => {
                    warn!(?source, user_id = target.user_id.get(), "nickname change failed");
                    result.record_failure(&target.display_name, format!("Error: {source}"));
                }
            }
        }

        clock.sleep(TARGET_PACING).await;
    }

    result
}

/// Final report: counts, then a clipped list of successes and failures.
fn summary(result: &BatchResult) -> String {
    let mut out = format!(
        "✅ Done. Changed {} nickname(s). Failed: {}.\n",
        result.succeeded.len(),
        result.failed.len()
    );

    if !result.succeeded.is_empty() {
        out.push_str("Changed: ");
        out.push_str(&result.succeeded_preview(SUMMARY_SUCCEEDED_LIMIT).join(", "));
        out.push('\n');
    }

    if !result.failed.is_empty() {
        out.push_str("Failed:\n");
        let lines: Vec<String> = result
            .failed_preview(SUMMARY_FAILED_LIMIT)
            .iter()
            .map(|(name, reason)| format!("- {name} — {reason}"))
            .collect();
        out.push_str(&lines.join("\n"));
    }

    truncate_chars(&out, MAX_MESSAGE_CHARS).to_owned()
}
