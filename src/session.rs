use std::{collections::HashMap, fmt};

use chrono::{DateTime, Duration, Utc};
use serenity::all::{ChannelId, UserId};
use tokio_util::sync::CancellationToken;

use crate::{error::BotError, registry::CategoryRef};

/// Identifies one session inside a guild. Encoded into component custom ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Anything that is bound to the user that started it
pub trait Session {
    fn initiator(&self) -> UserId;
}

/// An administrator choosing which categories are available
#[derive(Debug)]
pub struct SelectionSession {
    pub initiator: UserId,
    /// The guild's categories when the session was opened
    pub categories: Vec<CategoryRef>,
}

impl Session for SelectionSession {
    fn initiator(&self) -> UserId {
        self.initiator
    }
}

/// A member that joined the sentinel and is filling in the setup form
#[derive(Debug)]
pub struct SetupSession {
    pub member: UserId,
    pub categories: Vec<CategoryRef>,
    /// The category picked in the dropdown, if the member touched it
    pub chosen: Option<ChannelId>,
    /// Cancels the delayed follow-up message
    pub follow_up: CancellationToken,
}

impl SetupSession {
    pub fn new(member: UserId, categories: Vec<CategoryRef>) -> Self {
        Self {
            member,
            categories,
            chosen: None,
            follow_up: CancellationToken::new(),
        }
    }

    /// The category the channel will be created in. Falls back to the first
    /// approved category when nothing was picked.
    pub fn target_category(&self) -> Option<&CategoryRef> {
        match self.chosen {
            Some(id) => self.categories.iter().find(|c| c.id == id),
            None => self.categories.first(),
        }
    }
}

impl Session for SetupSession {
    fn initiator(&self) -> UserId {
        self.member
    }
}

#[derive(Debug)]
struct Entry<T> {
    session: T,
    expires_at: DateTime<Utc>,
}

/// A store of sessions that expire after a fixed time to live.
///
/// Expired sessions are pruned whenever the store is touched, so a control
/// pressed after its session expired fails instead of touching stale state.
#[derive(Debug)]
pub struct Sessions<T> {
    next_id: u64,
    ttl: Duration,
    entries: HashMap<SessionId, Entry<T>>,
}

impl<T: Session> Sessions<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            // seeded from the clock so controls left over from a previous run
            // don't resolve to a fresh session
            next_id: Utc::now().timestamp_millis().unsigned_abs(),
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, session: T, now: DateTime<Utc>) -> SessionId {
        self.prune(now);

        let id = SessionId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        self.entries.insert(
            id,
            Entry {
                session,
                expires_at: now + self.ttl,
            },
        );

        id
    }

    /// The guard every session-bound control goes through. Fails without
    /// touching anything if the session is gone or the actor isn't the user
    /// that started it.
    pub fn authorize(
        &mut self,
        id: SessionId,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<&mut T, BotError> {
        self.prune(now);

        let entry = self.entries.get_mut(&id).ok_or(BotError::SessionExpired)?;

        if entry.session.initiator() != actor {
            return Err(BotError::Unauthorized);
        }

        Ok(&mut entry.session)
    }

    /// Like [`Sessions::authorize`] but takes the session out of the store
    pub fn take(&mut self, id: SessionId, actor: UserId, now: DateTime<Utc>) -> Result<T, BotError> {
        self.authorize(id, actor, now)?;

        self.entries
            .remove(&id)
            .map(|entry| entry.session)
            .ok_or(BotError::SessionExpired)
    }

    pub fn sessions_of(&self, user_id: UserId) -> impl Iterator<Item = &T> {
        self.entries
            .values()
            .map(|entry| &entry.session)
            .filter(move |session| session.initiator() == user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);

        let pruned = before - self.entries.len();
        if pruned > 0 {
            trace!(pruned, "evicted expired sessions");
        }
    }
}
