use std::process::ExitCode;
use std::sync::Arc;

use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use twilight_gateway::{EventTypeFlags, Intents, Shard, ShardId, StreamExt as _};
use twilight_http::Client;
use twilight_model::gateway::event::Event;

use rustls::crypto::ring::default_provider;

use steward_commands::{handle_interaction, handle_message, sync_commands};
use steward_core::{Context, config::Config, cooldown::Cooldowns};
use steward_utils::diagnostics::ErrorLog;

/// How often expired cooldown entries are forgotten.
const COOLDOWN_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(source) => {
            error!(%source, "Error: startup configuration is incomplete");
            return ExitCode::FAILURE;
        }
    };

    let errors = ErrorLog::new(&config.error_log_path);
    errors.install_panic_hook();

    match run(config, errors.clone()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(source) => {
            errors.record_error("startup", &source);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config, errors: ErrorLog) -> anyhow::Result<()> {
    default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls ring provider"))?;

    // Create a single shared HTTP Client
    let http = Arc::new(Client::new(config.token.clone()));
    let bot_user = http.current_user().await?.model().await?;
    let ctx = Context::new(Arc::clone(&http), bot_user.id);

    spawn_cooldown_sweeper(Arc::clone(&ctx.cooldowns));

    // Member listing needs GUILD_MEMBERS; `!ping` needs MESSAGE_CONTENT
    let intents = Intents::GUILDS
        | Intents::GUILD_MEMBERS
        | Intents::GUILD_MESSAGES
        | Intents::MESSAGE_CONTENT;
    let mut shard = Shard::new(ShardId::new(0, 1), config.token, intents);

    info!("Steward is connecting...");

    loop {
        let item = tokio::select! {
            item = shard.next_event(EventTypeFlags::all()) => item,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                break;
            }
        };

        let Some(item) = item else {
            warn!("gateway stream ended");
            break;
        };

        let event = match item {
            Ok(event) => event,
            Err(source) => {
                error!(?source, "gateway event stream error");
                continue;
            }
        };

        match event {
            Event::Ready(ready) => {
                info!(
                    user = %ready.user.name,
                    id = ready.user.id.get(),
                    "Logged in"
                );

                let http = Arc::clone(&http);
                let application_id = ready.application.id;
                tokio::spawn(async move {
                    match sync_commands(&http, application_id).await {
                        Ok(count) => info!(count, "Synced slash commands"),
                        Err(source) => error!(?source, "Sync error"),
                    }
                });
            }
            Event::MessageCreate(msg) => {
                errors.spawn("message", handle_message(ctx.clone(), msg));
            }
            Event::InteractionCreate(interaction) => {
                errors.spawn("interaction", handle_interaction(ctx.clone(), interaction));
            }
            _ => {} // Ignore unused events
        }
    }

    Ok(())
}

fn spawn_cooldown_sweeper(cooldowns: Arc<Cooldowns>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(COOLDOWN_SWEEP_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let removed = cooldowns.sweep(Instant::now());
            if removed > 0 {
                info!(removed, "swept expired cooldown entries");
            }
        }
    });
}
