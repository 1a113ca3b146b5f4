use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serenity::all::{ChannelId, GuildId, UserId};
use tokio_util::sync::CancellationToken;

use crate::{
    directory::TemporaryChannelDirectory,
    error::BotError,
    registry::{CategoryRef, CategoryRegistry},
    session::{SelectionSession, SessionId, Sessions, SetupSession},
};

/// All in-memory state, split per guild. Nothing here survives a restart.
#[derive(Debug)]
pub struct State {
    session_ttl: Duration,
    guilds: HashMap<GuildId, GuildState>,
}

impl State {
    pub fn new(session_ttl: Duration) -> Self {
        Self {
            session_ttl,
            guilds: HashMap::new(),
        }
    }

    /// Get the state for a guild, creating it on first use
    pub fn guild(&mut self, guild_id: GuildId) -> &mut GuildState {
        let ttl = self.session_ttl;

        self.guilds
            .entry(guild_id)
            .or_insert_with(|| GuildState::new(ttl))
    }
}

/// A category button and whether it is currently selected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryButton {
    pub category: CategoryRef,
    pub active: bool,
}

/// The setup a member is about to start, returned by [`GuildState::begin_setup`]
#[derive(Debug)]
pub struct PendingSetup {
    pub session: SessionId,
    pub categories: Vec<CategoryRef>,
    pub follow_up: CancellationToken,
}

#[derive(Debug)]
pub struct GuildState {
    pub registry: CategoryRegistry,
    pub directory: TemporaryChannelDirectory,
    pub selections: Sessions<SelectionSession>,
    pub setups: Sessions<SetupSession>,
}

impl GuildState {
    pub fn new(session_ttl: Duration) -> Self {
        Self {
            registry: CategoryRegistry::default(),
            directory: TemporaryChannelDirectory::default(),
            selections: Sessions::new(session_ttl),
            setups: Sessions::new(session_ttl),
        }
    }

    /// Start a category selection for an administrator. Categories already
    /// approved by them are drawn as active.
    pub fn open_selection(
        &mut self,
        initiator: UserId,
        categories: Vec<CategoryRef>,
        now: DateTime<Utc>,
    ) -> (SessionId, Vec<CategoryButton>) {
        let buttons = self.render(initiator, &categories);
        let id = self.selections.insert(
            SelectionSession {
                initiator,
                categories,
            },
            now,
        );

        (id, buttons)
    }

    pub fn toggle_category(
        &mut self,
        session: SessionId,
        actor: UserId,
        category_id: ChannelId,
        now: DateTime<Utc>,
    ) -> Result<Vec<CategoryButton>, BotError> {
        let session = self.selections.authorize(session, actor, now)?;

        let category = session
            .categories
            .iter()
            .find(|c| c.id == category_id)
            .ok_or_else(|| BotError::InvalidInput("That category is no longer offered.".into()))?;

        let toggled = self.registry.toggle(actor, category);
        trace!(%actor, category = %category.name, ?toggled, "toggled category");

        let categories = session.categories.clone();
        Ok(self.render(actor, &categories))
    }

    /// Close a selection session. Fails while the administrator has nothing
    /// selected, leaving the session open.
    pub fn finish_selection(
        &mut self,
        session: SessionId,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<CategoryRef>, BotError> {
        self.selections.authorize(session, actor, now)?;

        let chosen = self.registry.finish(actor)?.to_vec();
        self.selections.take(session, actor, now)?;

        Ok(chosen)
    }

    /// Open a setup session for a member that joined the sentinel. Returns
    /// `None` if they have no approved categories.
    pub fn begin_setup(&mut self, member: UserId, now: DateTime<Utc>) -> Option<PendingSetup> {
        let categories = self.registry.selections(member).to_vec();

        if categories.is_empty() {
            return None;
        }

        let setup = SetupSession::new(member, categories.clone());
        let follow_up = setup.follow_up.clone();
        let session = self.setups.insert(setup, now);

        Some(PendingSetup {
            session,
            categories,
            follow_up,
        })
    }

    pub fn choose_category(
        &mut self,
        session: SessionId,
        actor: UserId,
        category_id: ChannelId,
        now: DateTime<Utc>,
    ) -> Result<(), BotError> {
        let session = self.setups.authorize(session, actor, now)?;

        if !session.categories.iter().any(|c| c.id == category_id) {
            return Err(BotError::InvalidInput(
                "That category is no longer offered.".into(),
            ));
        }

        session.chosen = Some(category_id);

        Ok(())
    }

    /// The category the setup form will create the channel in
    pub fn setup_target(
        &mut self,
        session: SessionId,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<CategoryRef, BotError> {
        let session = self.setups.authorize(session, actor, now)?;

        session
            .target_category()
            .cloned()
            .ok_or_else(|| BotError::InvalidInput("That category is no longer offered.".into()))
    }

    /// Close a setup session after its channel was created
    pub fn complete_setup(
        &mut self,
        session: SessionId,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), BotError> {
        let session = self.setups.take(session, actor, now)?;
        session.follow_up.cancel();

        Ok(())
    }

    /// Cancel the pending follow-up messages of a member. Their sessions stay
    /// open until they expire.
    pub fn cancel_follow_ups(&self, member: UserId) -> usize {
        self.setups
            .sessions_of(member)
            .filter(|session| !session.follow_up.is_cancelled())
            .inspect(|session| session.follow_up.cancel())
            .count()
    }

    fn render(&self, user_id: UserId, categories: &[CategoryRef]) -> Vec<CategoryButton> {
        categories
            .iter()
            .map(|category| CategoryButton {
                category: category.clone(),
                active: self.registry.is_selected(user_id, category.id),
            })
            .collect()
    }
}
