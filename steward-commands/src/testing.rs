//! In-memory platform and clock for handler tests.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use steward_core::{
    clock::Clock,
    platform::{GuildMember, Platform, PlatformError},
};
use tokio::time::{Duration, Instant};
use twilight_model::id::{
    Id,
    marker::{ChannelMarker, GuildMarker, UserMarker},
};

use crate::Invoker;

/// One recorded platform call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Call {
    Respond { content: String, ephemeral: bool },
    Defer { ephemeral: bool },
    Followup { content: String, ephemeral: bool },
    Send { channel_id: u64, content: String },
    GuildOwner,
    Member(u64),
    Members,
    SetNickname { user_id: u64, nickname: String, reason: String },
}

#[derive(Clone, Copy, Debug)]
pub enum Failure {
    Forbidden,
    Other(&'static str),
}

impl Failure {
    fn error(self) -> PlatformError {
        match self {
            Self::Forbidden => PlatformError::Forbidden("Missing Permissions".to_owned()),
            Self::Other(detail) => PlatformError::Request(detail.to_owned()),
        }
    }
}

#[derive(Default)]
struct MockState {
    calls: Vec<Call>,
    sends: usize,
}

/// Records every call; failures are scripted up front.
#[derive(Default)]
pub struct MockPlatform {
    owner_id: u64,
    members: Vec<GuildMember>,
    send_failures: HashMap<usize, Failure>,
    nickname_failures: HashMap<u64, Failure>,
    fail_listing: bool,
    state: Mutex<MockState>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_owner(mut self, owner_id: u64) -> Self {
        self.owner_id = owner_id;
        self
    }

    pub fn with_members(mut self, members: Vec<GuildMember>) -> Self {
        self.members = members;
        self
    }

    /// Fail the zero-based `index`-th channel send.
    pub fn fail_send(mut self, index: usize, failure: Failure) -> Self {
        self.send_failures.insert(index, failure);
        self
    }

    pub fn fail_nickname(mut self, user_id: u64, failure: Failure) -> Self {
        self.nickname_failures.insert(user_id, failure);
        self
    }

    pub fn fail_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Channel sends that went through.
    pub fn sent_messages(&self) -> Vec<(u64, String)> {
        let failed: Vec<usize> = self.send_failures.keys().copied().collect();
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Send {
                    channel_id,
                    content,
                } => Some((channel_id, content)),
                _ => None,
            })
            .enumerate()
            .filter(|(index, _)| !failed.contains(index))
            .map(|(_, sent)| sent)
            .collect()
    }

    pub fn followups(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Followup { content, .. } => Some(content),
                _ => None,
            })
            .collect()
    }

    /// Users whose nickname change went through, in call order.
    pub fn renamed_users(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SetNickname { user_id, .. } => Some(user_id),
                _ => None,
            })
            .filter(|user_id| !self.nickname_failures.contains_key(user_id))
            .collect()
    }

    fn record(&self, call: Call) {
        self.state.lock().calls.push(call);
    }
}

impl Platform for MockPlatform {
    async fn respond(&self, content: &str, ephemeral: bool) -> Result<(), PlatformError> {
        self.record(Call::Respond {
            content: content.to_owned(),
            ephemeral,
        });
        Ok(())
    }

    async fn defer(&self, ephemeral: bool) -> Result<(), PlatformError> {
        self.record(Call::Defer { ephemeral });
        Ok(())
    }

    async fn followup(&self, content: &str, ephemeral: bool) -> Result<(), PlatformError> {
        self.record(Call::Followup {
            content: content.to_owned(),
            ephemeral,
        });
        Ok(())
    }

    async fn send_message(
        &self,
        channel_id: Id<ChannelMarker>,
        content: &str,
    ) -> Result<(), PlatformError> {
        let index = {
            let mut state = self.state.lock();
            state.calls.push(Call::Send {
                channel_id: channel_id.get(),
                content: content.to_owned(),
            });
            state.sends += 1;
            state.sends - 1
        };

        match self.send_failures.get(&index) {
            Some(failure) => Err(failure.error()),
            None => Ok(()),
        }
    }

    async fn guild_owner(
        &self,
        _guild_id: Id<GuildMarker>,
    ) -> Result<Id<UserMarker>, PlatformError> {
        self.record(Call::GuildOwner);
        Ok(Id::new(self.owner_id.max(1)))
    }

    async fn member(
        &self,
        _guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<GuildMember, PlatformError> {
        self.record(Call::Member(user_id.get()));
        self.members
            .iter()
            .find(|member| member.user_id == user_id)
            .cloned()
            .ok_or_else(|| PlatformError::Request("Unknown Member".to_owned()))
    }

    async fn members(&self, _guild_id: Id<GuildMarker>) -> Result<Vec<GuildMember>, PlatformError> {
        self.record(Call::Members);
        if self.fail_listing {
            return Err(PlatformError::Request("Missing Access".to_owned()));
        }
        Ok(self.members.clone())
    }

    async fn set_nickname(
        &self,
        _guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        nickname: &str,
        reason: &str,
    ) -> Result<(), PlatformError> {
        self.record(Call::SetNickname {
            user_id: user_id.get(),
            nickname: nickname.to_owned(),
            reason: reason.to_owned(),
        });

        match self.nickname_failures.get(&user_id.get()) {
            Some(failure) => Err(failure.error()),
            None => Ok(()),
        }
    }
}

/// Virtual clock: `sleep` returns at once and advances time by the requested amount.
#[derive(Clone)]
pub struct MockClock {
    inner: Arc<Mutex<MockClockInner>>,
}

struct MockClockInner {
    current: Instant,
    sleeps: Vec<Duration>,
}

impl MockClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockClockInner {
                current: Instant::now(),
                sleeps: Vec::new(),
            })),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.inner.lock().current += duration;
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.inner.lock().sleeps.clone()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.inner.lock().current
    }

    async fn sleep(&self, duration: Duration) {
        let mut inner = self.inner.lock();
        inner.current += duration;
        inner.sleeps.push(duration);
    }
}

pub fn invoker(user_id: u64) -> Invoker {
    Invoker {
        user_id: Id::new(user_id),
        name: format!("user{user_id}"),
        permissions: None,
    }
}

pub fn member(user_id: u64, display_name: &str, role_rank: i64, bot: bool) -> GuildMember {
    GuildMember {
        user_id: Id::new(user_id),
        display_name: display_name.to_owned(),
        role_rank,
        bot,
    }
}
