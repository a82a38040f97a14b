//! Cooldown windows keyed by user and guild id.
//!
//! A tracker only remembers when a scope key last acted. Checking is a pure
//! peek; the timestamp moves only when a guarded action has fully succeeded.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use tokio::time::{Duration, Instant};

/// How long a single user waits between relays.
pub const USER_COOLDOWN: Duration = Duration::from_secs(20);
/// How long a guild waits between relays from any of its members.
pub const GUILD_COOLDOWN: Duration = Duration::from_secs(5);

/// Last-action timestamps for one scope namespace.
#[derive(Debug)]
pub struct CooldownTracker {
    window: Duration,
    last_action: HashMap<u64, Instant>,
}

impl CooldownTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_action: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Remaining whole seconds (rounded up) before `key` may act, or `None` if clear.
    pub fn check(&self, key: u64, now: Instant) -> Option<u64> {
        let last = self.last_action.get(&key)?;
        let elapsed = now.saturating_duration_since(*last);
        let remaining = self.window.checked_sub(elapsed)?;

        if remaining.is_zero() {
            return None;
        }

        Some(ceil_secs(remaining))
    }

    /// Record a completed action. Timestamps never move backwards.
    pub fn record(&mut self, key: u64, now: Instant) {
        self.last_action
            .entry(key)
            .and_modify(|last| {
                if now > *last {
                    *last = now;
                }
            })
            .or_insert(now);
    }

    /// Drop entries whose window has fully elapsed and return how many were removed.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.last_action.len();
        let window = self.window;
        self.last_action
            .retain(|_, last| now.saturating_duration_since(*last) < window);
        before - self.last_action.len()
    }

    pub fn len(&self) -> usize {
        self.last_action.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_action.is_empty()
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CooldownScope {
    User,
    Guild,
}

/// Why an action was refused, and for how long.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CooldownRejection {
    pub scope: CooldownScope,
    pub remaining_secs: u64,
}

#[derive(Debug)]
struct CooldownState {
    users: CooldownTracker,
    guilds: CooldownTracker,
    users_in_flight: HashSet<u64>,
    guilds_in_flight: HashSet<u64>,
}

/// The user and guild scopes, guarded together.
///
/// Handlers run as parallel tasks, so a check and the later record are tied
/// together by a [`CooldownPermit`]: while a permit is alive its keys read as
/// fully on cooldown to every other caller.
#[derive(Debug)]
pub struct Cooldowns {
    state: Mutex<CooldownState>,
}

impl Default for Cooldowns {
    fn default() -> Self {
        Self::new()
    }
}

impl Cooldowns {
    pub fn new() -> Self {
        Self::with_windows(USER_COOLDOWN, GUILD_COOLDOWN)
    }

    pub fn with_windows(user_window: Duration, guild_window: Duration) -> Self {
        Self {
            state: Mutex::new(CooldownState {
                users: CooldownTracker::new(user_window),
                guilds: CooldownTracker::new(guild_window),
                users_in_flight: HashSet::new(),
                guilds_in_flight: HashSet::new(),
            }),
        }
    }

    /// Peek both scopes without reserving anything. The user scope is reported first.
    pub fn check(&self, user_id: u64, guild_id: u64, now: Instant) -> Option<CooldownRejection> {
        let state = self.state.lock();
        state.rejection(user_id, guild_id, now)
    }

    /// Reserve both scopes for one action if neither is on cooldown or in flight.
    pub fn acquire(
        &self,
        user_id: u64,
        guild_id: u64,
        now: Instant,
    ) -> Result<CooldownPermit<'_>, CooldownRejection> {
        let mut state = self.state.lock();
        if let Some(rejection) = state.rejection(user_id, guild_id, now) {
            return Err(rejection);
        }

        state.users_in_flight.insert(user_id);
        state.guilds_in_flight.insert(guild_id);

        Ok(CooldownPermit {
            cooldowns: self,
            user_id,
            guild_id,
        })
    }

    /// Record an action for both scopes directly.
    pub fn record(&self, user_id: u64, guild_id: u64, now: Instant) {
        let mut state = self.state.lock();
        state.users.record(user_id, now);
        state.guilds.record(guild_id, now);
    }

    /// Forget expired entries in both scopes. Returns the number removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut state = self.state.lock();
        state.users.sweep(now) + state.guilds.sweep(now)
    }

    /// Number of (user, guild) entries currently remembered.
    pub fn tracked(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.users.len(), state.guilds.len())
    }

    fn release(&self, user_id: u64, guild_id: u64, recorded_at: Option<Instant>) {
        let mut state = self.state.lock();
        if let Some(now) = recorded_at {
            state.users.record(user_id, now);
            state.guilds.record(guild_id, now);
        }
        state.users_in_flight.remove(&user_id);
        state.guilds_in_flight.remove(&guild_id);
    }
}

impl CooldownState {
    fn rejection(&self, user_id: u64, guild_id: u64, now: Instant) -> Option<CooldownRejection> {
        let user_remaining = if self.users_in_flight.contains(&user_id) {
            Some(ceil_secs(self.users.window()))
        } else {
            self.users.check(user_id, now)
        };
        if let Some(remaining_secs) = user_remaining {
            return Some(CooldownRejection {
                scope: CooldownScope::User,
                remaining_secs,
            });
        }

        let guild_remaining = if self.guilds_in_flight.contains(&guild_id) {
            Some(ceil_secs(self.guilds.window()))
        } else {
            self.guilds.check(guild_id, now)
        };
        guild_remaining.map(|remaining_secs| CooldownRejection {
            scope: CooldownScope::Guild,
            remaining_secs,
        })
    }
}

/// An in-flight reservation on a user and guild scope.
///
/// Call [`CooldownPermit::commit`] once the guarded action succeeded; dropping
/// the permit without committing leaves both scopes as they were.
#[must_use = "dropping a permit without committing records nothing"]
pub struct CooldownPermit<'a> {
    cooldowns: &'a Cooldowns,
    user_id: u64,
    guild_id: u64,
}

impl CooldownPermit<'_> {
    /// Start both cooldown windows at `now`.
    pub fn commit(self, now: Instant) {
        self.cooldowns.release(self.user_id, self.guild_id, Some(now));
        std::mem::forget(self);
    }
}

impl Drop for CooldownPermit<'_> {
    fn drop(&mut self) {
        self.cooldowns.release(self.user_id, self.guild_id, None);
    }
}
