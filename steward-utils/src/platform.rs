//! [`Platform`] backed by the twilight HTTP client.

use std::{collections::HashMap, sync::Arc};

use steward_core::platform::{GuildMember, Platform, PlatformError};
use twilight_http::{Client, request::AuditLogReason as _};
use twilight_model::{
    application::interaction::Interaction,
    channel::message::MessageFlags,
    guild::Member,
    http::interaction::{InteractionResponse, InteractionResponseType},
    id::{
        Id,
        marker::{
            ApplicationMarker, ChannelMarker, GuildMarker, InteractionMarker, RoleMarker,
            UserMarker,
        },
    },
};
use twilight_util::builder::InteractionResponseDataBuilder;

use crate::permissions::role_rank;

/// Largest page the member listing endpoint returns.
const MEMBER_PAGE_SIZE: u16 = 1000;

/// Platform calls bound to a single inbound interaction.
pub struct InteractionPlatform {
    http: Arc<Client>,
    application_id: Id<ApplicationMarker>,
    interaction_id: Id<InteractionMarker>,
    token: String,
}

impl InteractionPlatform {
    pub fn new(http: Arc<Client>, interaction: &Interaction) -> Self {
        Self {
            http,
            application_id: interaction.application_id,
            interaction_id: interaction.id,
            token: interaction.token.clone(),
        }
    }

    async fn create_response(&self, response: &InteractionResponse) -> Result<(), PlatformError> {
        self.http
            .interaction(self.application_id)
            .create_response(self.interaction_id, &self.token, response)
            .await?;

        Ok(())
    }

    async fn role_positions(
        &self,
        guild_id: Id<GuildMarker>,
    ) -> Result<HashMap<Id<RoleMarker>, i64>, PlatformError> {
        let roles = self.http.roles(guild_id).await?.model().await?;

        Ok(roles.into_iter().map(|role| (role.id, role.position)).collect())
    }
}

impl Platform for InteractionPlatform {
    async fn respond(&self, content: &str, ephemeral: bool) -> Result<(), PlatformError> {
        let mut data = InteractionResponseDataBuilder::new().content(content);
        if ephemeral {
            data = data.flags(MessageFlags::EPHEMERAL);
        }

        let response = InteractionResponse {
            kind: InteractionResponseType::ChannelMessageWithSource,
            data: Some(data.build()),
        };

        self.create_response(&response).await
    }

    async fn defer(&self, ephemeral: bool) -> Result<(), PlatformError> {
        let data = ephemeral.then(|| {
            InteractionResponseDataBuilder::new()
                .flags(MessageFlags::EPHEMERAL)
                .build()
        });

        let response = InteractionResponse {
            kind: InteractionResponseType::DeferredChannelMessageWithSource,
            data,
        };

        self.create_response(&response).await
    }

    async fn followup(&self, content: &str, ephemeral: bool) -> Result<(), PlatformError> {
        let client = self.http.interaction(self.application_id);
        let mut request = client.create_followup(&self.token).content(content);
        if ephemeral {
            request = request.flags(MessageFlags::EPHEMERAL);
        }

        request.await?;

        Ok(())
    }

    async fn send_message(
        &self,
        channel_id: Id<ChannelMarker>,
        content: &str,
    ) -> Result<(), PlatformError> {
        self.http.create_message(channel_id).content(content).await?;

        Ok(())
    }

    async fn guild_owner(
        &self,
        guild_id: Id<GuildMarker>,
    ) -> Result<Id<UserMarker>, PlatformError> {
        let guild = self.http.guild(guild_id).await?.model().await?;

        Ok(guild.owner_id)
    }

    async fn member(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<GuildMember, PlatformError> {
        let member = self
            .http
            .guild_member(guild_id, user_id)
            .await?
            .model()
            .await?;
        let positions = self.role_positions(guild_id).await?;

        Ok(to_guild_member(&member, &positions))
    }

    async fn members(&self, guild_id: Id<GuildMarker>) -> Result<Vec<GuildMember>, PlatformError> {
        let positions = self.role_positions(guild_id).await?;
        let mut listed = Vec::new();
        let mut after: Option<Id<UserMarker>> = None;

        loop {
            let response = match after {
                Some(after_id) => {
                    self.http
                        .guild_members(guild_id)
                        .after(after_id)
                        .limit(MEMBER_PAGE_SIZE)
                        .await?
                }
                None => {
                    self.http
                        .guild_members(guild_id)
                        .limit(MEMBER_PAGE_SIZE)
                        .await?
                }
            };

            let page = response.model().await?;
            let page_len = page.len();
            after = page.last().map(|member| member.user.id);
            listed.extend(page.iter().map(|member| to_guild_member(member, &positions)));

            if page_len < usize::from(MEMBER_PAGE_SIZE) {
                break;
            }
        }

        Ok(listed)
    }

    async fn set_nickname(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        nickname: &str,
        reason: &str,
    ) -> Result<(), PlatformError> {
        self.http
            .update_guild_member(guild_id, user_id)
            .nick(Some(nickname))
            .reason(reason)
            .await?;

        Ok(())
    }
}

fn to_guild_member(member: &Member, positions: &HashMap<Id<RoleMarker>, i64>) -> GuildMember {
    GuildMember {
        user_id: member.user.id,
        display_name: display_name(
            member.nick.as_deref(),
            member.user.global_name.as_deref(),
            &member.user.name,
        ),
        role_rank: role_rank(&member.roles, positions),
        bot: member.user.bot,
    }
}

/// Guild nickname, then global name, then username.
pub fn display_name(nick: Option<&str>, global_name: Option<&str>, username: &str) -> String {
    nick.or(global_name).unwrap_or(username).to_owned()
}
