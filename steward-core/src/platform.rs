//! Everything command logic needs from the chat platform.
//!
//! Handlers are generic over [`Platform`] so they can run against the live
//! twilight client or an in-memory recorder.

use thiserror::Error;
use twilight_http::{api_error::ApiError, error::ErrorType, response::DeserializeBodyError};
use twilight_model::id::{
    Id,
    marker::{ChannelMarker, GuildMarker, UserMarker},
};

/// Discord JSON codes that mean the bot is not allowed to do something.
const MISSING_ACCESS: u64 = 50001;
const MISSING_PERMISSIONS: u64 = 50013;

#[derive(Debug, Error)]
pub enum PlatformError {
    /// The platform refused the call for lack of permissions.
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Request(String),
}

impl PlatformError {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }

    /// Classify a failed call by its HTTP status and Discord error code.
    ///
    /// `status` is `None` when no response was received at all.
    fn classify(status: Option<u16>, code: Option<u64>, message: String) -> Self {
        match status {
            Some(status) if is_permission_denial(status, code) => Self::Forbidden(message),
            _ => Self::Request(message),
        }
    }
}

/// HTTP 403, or a Discord missing access/permissions code on any status.
pub fn is_permission_denial(status: u16, code: Option<u64>) -> bool {
    status == 403 || matches!(code, Some(MISSING_ACCESS | MISSING_PERMISSIONS))
}

impl From<twilight_http::Error> for PlatformError {
    fn from(source: twilight_http::Error) -> Self {
        let (status, code) = match source.kind() {
            ErrorType::Response { error, status, .. } => {
                let code = match error {
                    ApiError::General(general) => Some(general.code),
                    _ => None,
                };
                (Some(status.get()), code)
            }
            _ => (None, None),
        };

        Self::classify(status, code, source.to_string())
    }
}

impl From<DeserializeBodyError> for PlatformError {
    fn from(source: DeserializeBodyError) -> Self {
        Self::Request(source.to_string())
    }
}

/// A guild member as seen by authorization checks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GuildMember {
    pub user_id: Id<UserMarker>,
    pub display_name: String,
    /// Highest position among the member's roles, `0` when it has none.
    pub role_rank: i64,
    pub bot: bool,
}

/// Operations against the platform on behalf of one interaction.
#[allow(async_fn_in_trait)]
pub trait Platform: Send + Sync {
    /// Send the initial interaction response.
    async fn respond(&self, content: &str, ephemeral: bool) -> Result<(), PlatformError>;

    /// Acknowledge the interaction with a "thinking" indicator.
    async fn defer(&self, ephemeral: bool) -> Result<(), PlatformError>;

    /// Send a follow-up message after the interaction was acknowledged.
    async fn followup(&self, content: &str, ephemeral: bool) -> Result<(), PlatformError>;

    /// Post a plain message into a channel.
    async fn send_message(
        &self,
        channel_id: Id<ChannelMarker>,
        content: &str,
    ) -> Result<(), PlatformError>;

    async fn guild_owner(&self, guild_id: Id<GuildMarker>) -> Result<Id<UserMarker>, PlatformError>;

    async fn member(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<GuildMember, PlatformError>;

    /// All guild members in the platform's enumeration order.
    async fn members(&self, guild_id: Id<GuildMarker>) -> Result<Vec<GuildMember>, PlatformError>;

    /// Change a member's guild nickname, attaching an audit log reason.
    async fn set_nickname(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        nickname: &str,
        reason: &str,
    ) -> Result<(), PlatformError>;
}
