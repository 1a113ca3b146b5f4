use std::collections::HashMap;

use serenity::all::{ChannelId, UserId};

use crate::error::BotError;

/// The record of every voice channel the bot created and must delete once it
/// is empty. A channel that is not in here is never deleted automatically.
#[derive(Debug, Default)]
pub struct TemporaryChannelDirectory {
    /// Mapping of temporary channel IDs to the user that created them
    channels: HashMap<ChannelId, UserId>,
    /// The sentinel voice channel, once it is known
    sentinel: Option<ChannelId>,
}

impl TemporaryChannelDirectory {
    pub fn sentinel(&self) -> Option<ChannelId> {
        self.sentinel
    }

    /// Remember which channel is the sentinel so it can never be recorded
    pub fn set_sentinel(&mut self, channel_id: ChannelId) {
        if self.channels.remove(&channel_id).is_some() {
            warn!(%channel_id, "sentinel channel was recorded as temporary, dropping it");
        }

        self.sentinel = Some(channel_id);
    }

    /// Record a temporary channel. Recording the same channel twice replaces
    /// the owner.
    pub fn record(&mut self, channel_id: ChannelId, owner: UserId) -> Result<(), BotError> {
        if self.sentinel == Some(channel_id) {
            return Err(BotError::SentinelChannel);
        }

        if let Some(previous) = self.channels.insert(channel_id, owner) {
            warn!(%channel_id, %previous, %owner, "temporary channel recorded twice");
        }

        Ok(())
    }

    pub fn is_temporary(&self, channel_id: ChannelId) -> bool {
        self.channels.contains_key(&channel_id)
    }

    pub fn owner_of(&self, channel_id: ChannelId) -> Option<UserId> {
        self.channels.get(&channel_id).copied()
    }

    pub fn remove(&mut self, channel_id: ChannelId) -> Option<UserId> {
        self.channels.remove(&channel_id)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
