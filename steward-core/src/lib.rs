use std::sync::Arc;

use twilight_http::Client;
use twilight_model::id::{Id, marker::UserMarker};

/// Time source used for cooldown timestamps and pacing delays.
pub mod clock;
/// Process configuration loaded from the environment.
pub mod config;
/// Per-user and per-guild cooldown windows.
pub mod cooldown;
/// The seam between command logic and the chat platform.
pub mod platform;

use cooldown::Cooldowns;

/// Shared application context passed into command handlers.
///
/// Cheap to clone because it only stores reference-counted shared state.
#[derive(Clone)]
pub struct Context {
    pub http: Arc<Client>,
    pub cooldowns: Arc<Cooldowns>,
    pub bot_user_id: Id<UserMarker>,
}

impl Context {
    /// Create a new application context.
    pub fn new(http: Arc<Client>, bot_user_id: Id<UserMarker>) -> Self {
        Self {
            http,
            cooldowns: Arc::new(Cooldowns::new()),
            bot_user_id,
        }
    }
}
