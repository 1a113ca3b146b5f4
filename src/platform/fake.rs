//! An in-memory guild for exercising the lifecycle without Discord

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};

use poise::serenity_prelude::async_trait;
use serenity::all::{ChannelId, GuildId, UserId};

use super::{ChannelInfo, ChannelKind, NewChannel, Platform, SetupPrompt};
use crate::error::BotError;

#[derive(Debug, Default)]
struct FakeGuild {
    next_id: u64,
    channels: Vec<ChannelInfo>,
    created: Vec<NewChannel>,
    deleted: Vec<ChannelId>,
    moves: Vec<(UserId, ChannelId)>,
    purged: Vec<ChannelId>,
    messages: Vec<(ChannelId, String)>,
    prompts: Vec<(ChannelId, SetupPrompt)>,
    follow_ups: Vec<UserId>,
    occupancy: HashMap<ChannelId, usize>,
    vanished: HashSet<ChannelId>,
    denied: HashSet<&'static str>,
}

#[derive(Debug, Clone, Default)]
pub struct FakePlatform {
    guild: Arc<Mutex<FakeGuild>>,
}

impl FakePlatform {
    fn guild(&self) -> MutexGuard<'_, FakeGuild> {
        self.guild.lock().unwrap()
    }

    fn check(&self, action: &'static str) -> Result<(), BotError> {
        if self.guild().denied.contains(action) {
            return Err(BotError::PermissionDenied(action));
        }

        Ok(())
    }

    /// Make every call of `action` fail with a permission error
    pub fn deny(&self, action: &'static str) {
        self.guild().denied.insert(action);
    }

    pub fn add_channel(&self, name: &str, kind: ChannelKind, parent: Option<ChannelId>) -> ChannelId {
        let mut guild = self.guild();
        guild.next_id += 1;

        let id = ChannelId::new(1000 + guild.next_id);
        let position = guild.next_id as u16;
        guild.channels.push(ChannelInfo {
            id,
            name: name.to_string(),
            kind,
            parent,
            position,
        });

        id
    }

    /// Delete a channel behind the bot's back
    pub fn vanish(&self, channel_id: ChannelId) {
        let mut guild = self.guild();
        guild.channels.retain(|c| c.id != channel_id);
        guild.vanished.insert(channel_id);
    }

    pub fn set_occupancy(&self, channel_id: ChannelId, members: usize) {
        self.guild().occupancy.insert(channel_id, members);
    }

    pub fn channel_list(&self) -> Vec<ChannelInfo> {
        self.guild().channels.clone()
    }

    pub fn created(&self) -> Vec<NewChannel> {
        self.guild().created.clone()
    }

    pub fn deleted(&self) -> Vec<ChannelId> {
        self.guild().deleted.clone()
    }

    pub fn moves(&self) -> Vec<(UserId, ChannelId)> {
        self.guild().moves.clone()
    }

    pub fn purged(&self) -> Vec<ChannelId> {
        self.guild().purged.clone()
    }

    pub fn messages(&self) -> Vec<(ChannelId, String)> {
        self.guild().messages.clone()
    }

    pub fn prompts(&self) -> Vec<(ChannelId, SetupPrompt)> {
        self.guild().prompts.clone()
    }

    pub fn follow_ups(&self) -> Vec<UserId> {
        self.guild().follow_ups.clone()
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn channels(&self, _guild_id: GuildId) -> Result<Vec<ChannelInfo>, BotError> {
        self.check("list channels")?;

        Ok(self.channel_list())
    }

    async fn create_channel(
        &self,
        _guild_id: GuildId,
        channel: NewChannel,
    ) -> Result<ChannelId, BotError> {
        self.check("create channel")?;

        let id = self.add_channel(&channel.name, channel.kind, channel.parent);
        self.guild().created.push(channel);

        Ok(id)
    }

    async fn delete_channel(&self, channel_id: ChannelId) -> Result<(), BotError> {
        self.check("delete channel")?;

        let mut guild = self.guild();
        if guild.vanished.contains(&channel_id) {
            return Err(BotError::NotFound("delete channel"));
        }

        guild.channels.retain(|c| c.id != channel_id);
        guild.deleted.push(channel_id);

        Ok(())
    }

    async fn move_member(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        channel_id: ChannelId,
    ) -> Result<(), BotError> {
        self.check("move member")?;

        self.guild().moves.push((user_id, channel_id));

        Ok(())
    }

    async fn purge_messages(&self, channel_id: ChannelId, _limit: u8) -> Result<usize, BotError> {
        self.check("purge messages")?;

        self.guild().purged.push(channel_id);

        Ok(0)
    }

    async fn send_message(&self, channel_id: ChannelId, content: String) -> Result<(), BotError> {
        self.check("send message")?;

        self.guild().messages.push((channel_id, content));

        Ok(())
    }

    async fn send_setup_prompt(
        &self,
        channel_id: ChannelId,
        prompt: SetupPrompt,
    ) -> Result<(), BotError> {
        self.check("send message")?;

        self.guild().prompts.push((channel_id, prompt));

        Ok(())
    }

    async fn send_follow_up(&self, _guild_id: GuildId, user_id: UserId) -> Result<(), BotError> {
        self.check("send direct message")?;

        self.guild().follow_ups.push(user_id);

        Ok(())
    }

    fn voice_occupancy(&self, _guild_id: GuildId, channel_id: ChannelId) -> Option<usize> {
        Some(self.guild().occupancy.get(&channel_id).copied().unwrap_or(0))
    }
}
