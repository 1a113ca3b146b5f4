//! The Discord operations the channel lifecycle needs, behind a trait so the
//! lifecycle can run against an in-memory guild in tests.

use poise::serenity_prelude::async_trait;
use serenity::all::{ChannelId, ChannelType, GuildChannel, GuildId, UserId};

use crate::{error::BotError, registry::CategoryRef, session::SessionId};

pub mod discord;
#[cfg(test)]
pub mod fake;

pub use discord::DiscordPlatform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Category,
    Text,
    Voice,
    Other,
}

impl From<ChannelType> for ChannelKind {
    fn from(kind: ChannelType) -> Self {
        match kind {
            ChannelType::Category => ChannelKind::Category,
            ChannelType::Text => ChannelKind::Text,
            ChannelType::Voice => ChannelKind::Voice,
            _ => ChannelKind::Other,
        }
    }
}

/// The parts of a guild channel the lifecycle looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
    pub parent: Option<ChannelId>,
    pub position: u16,
}

impl From<&GuildChannel> for ChannelInfo {
    fn from(channel: &GuildChannel) -> Self {
        Self {
            id: channel.id,
            name: channel.name.clone(),
            kind: channel.kind.into(),
            parent: channel.parent_id,
            position: channel.position,
        }
    }
}

/// Find a channel by name and kind, optionally restricted to a category
pub fn find_channel<'a>(
    channels: &'a [ChannelInfo],
    name: &str,
    kind: ChannelKind,
    parent: Option<ChannelId>,
) -> Option<&'a ChannelInfo> {
    channels.iter().find(|channel| {
        channel.kind == kind
            && channel.name == name
            && (parent.is_none() || channel.parent == parent)
    })
}

/// Who a permission overwrite targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteTarget {
    Everyone,
    Member(UserId),
}

/// Allow or deny connecting to a voice channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOverwrite {
    pub target: OverwriteTarget,
    pub allow: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChannel {
    pub name: String,
    pub kind: ChannelKind,
    pub parent: Option<ChannelId>,
    /// Zero means unlimited
    pub user_limit: u32,
    pub overwrites: Vec<ConnectOverwrite>,
}

impl NewChannel {
    pub fn new(name: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            user_limit: 0,
            overwrites: Vec::new(),
        }
    }

    pub fn parent(mut self, parent: ChannelId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// The prompt posted when a member joins the sentinel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupPrompt {
    pub session: SessionId,
    pub member: UserId,
    pub categories: Vec<CategoryRef>,
}

#[async_trait]
pub trait Platform: Send + Sync {
    async fn channels(&self, guild_id: GuildId) -> Result<Vec<ChannelInfo>, BotError>;

    async fn create_channel(
        &self,
        guild_id: GuildId,
        channel: NewChannel,
    ) -> Result<ChannelId, BotError>;

    async fn delete_channel(&self, channel_id: ChannelId) -> Result<(), BotError>;

    async fn move_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        channel_id: ChannelId,
    ) -> Result<(), BotError>;

    /// Delete up to `limit` of the most recent messages, returning how many
    /// were deleted
    async fn purge_messages(&self, channel_id: ChannelId, limit: u8) -> Result<usize, BotError>;

    async fn send_message(&self, channel_id: ChannelId, content: String) -> Result<(), BotError>;

    async fn send_setup_prompt(
        &self,
        channel_id: ChannelId,
        prompt: SetupPrompt,
    ) -> Result<(), BotError>;

    /// Direct message a member about their unfinished setup
    async fn send_follow_up(&self, guild_id: GuildId, user_id: UserId) -> Result<(), BotError>;

    /// How many members are connected to a voice channel, or `None` if that
    /// can't be told
    fn voice_occupancy(&self, guild_id: GuildId, channel_id: ChannelId) -> Option<usize>;
}
