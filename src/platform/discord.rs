use chrono::Utc;
use poise::serenity_prelude::async_trait;
use serenity::all::{
    ChannelId, ChannelType, Context, CreateChannel, CreateEmbed, CreateMessage, GetMessages,
    GuildId, MessageId, PermissionOverwrite, PermissionOverwriteType, Permissions, RoleId, UserId,
};

use super::{
    ChannelInfo, ChannelKind, ConnectOverwrite, NewChannel, OverwriteTarget, Platform,
    SetupPrompt,
};
use crate::{component, data::Data, error::BotError};

/// How old a message may be and still be bulk deleted, with a minute of slack
const BULK_DELETE_MAX_AGE: i64 = 14 * 24 * 60 * 60 - 60;

/// Split message ids into those young enough for bulk deletion and the rest
fn split_by_age(ids: &[MessageId], now: i64) -> (Vec<MessageId>, Vec<MessageId>) {
    ids.iter()
        .partition(|id| now - id.created_at().unix_timestamp() < BULK_DELETE_MAX_AGE)
}

/// [`Platform`] backed by serenity's HTTP client and cache
#[derive(Clone)]
pub struct DiscordPlatform {
    ctx: Context,
    data: Data,
}

impl DiscordPlatform {
    pub fn new(ctx: Context, data: Data) -> Self {
        Self { ctx, data }
    }

    fn permission_overwrite(guild_id: GuildId, overwrite: &ConnectOverwrite) -> PermissionOverwrite {
        let kind = match overwrite.target {
            // the @everyone role shares its id with the guild
            OverwriteTarget::Everyone => PermissionOverwriteType::Role(RoleId::new(guild_id.get())),
            OverwriteTarget::Member(user_id) => PermissionOverwriteType::Member(user_id),
        };

        let (allow, deny) = if overwrite.allow {
            (Permissions::CONNECT, Permissions::empty())
        } else {
            (Permissions::empty(), Permissions::CONNECT)
        };

        PermissionOverwrite { allow, deny, kind }
    }
}

#[async_trait]
impl Platform for DiscordPlatform {
    async fn channels(&self, guild_id: GuildId) -> Result<Vec<ChannelInfo>, BotError> {
        let cached = self
            .ctx
            .cache
            .guild(guild_id)
            .map(|guild| guild.channels.values().map(ChannelInfo::from).collect::<Vec<_>>());

        if let Some(channels) = cached {
            return Ok(channels);
        }

        trace!(%guild_id, "guild not cached, fetching channels");
        let channels = guild_id
            .channels(&self.ctx.http)
            .await
            .map_err(|err| BotError::platform("list channels", err))?;

        Ok(channels.values().map(ChannelInfo::from).collect())
    }

    async fn create_channel(
        &self,
        guild_id: GuildId,
        channel: NewChannel,
    ) -> Result<ChannelId, BotError> {
        let kind = match channel.kind {
            ChannelKind::Category => ChannelType::Category,
            ChannelKind::Text => ChannelType::Text,
            ChannelKind::Voice | ChannelKind::Other => ChannelType::Voice,
        };

        let permissions: Vec<PermissionOverwrite> = channel
            .overwrites
            .iter()
            .map(|overwrite| Self::permission_overwrite(guild_id, overwrite))
            .collect();

        let mut builder = CreateChannel::new(channel.name)
            .kind(kind)
            .permissions(permissions)
            .audit_log_reason("reaper channel");

        if let Some(parent) = channel.parent {
            builder = builder.category(parent);
        }

        if kind == ChannelType::Voice {
            builder = builder.user_limit(channel.user_limit);
        }

        let created = guild_id
            .create_channel(&self.ctx, builder)
            .await
            .map_err(|err| BotError::platform("create channel", err))?;

        Ok(created.id)
    }

    async fn delete_channel(&self, channel_id: ChannelId) -> Result<(), BotError> {
        channel_id
            .delete(&self.ctx)
            .await
            .map_err(|err| BotError::platform("delete channel", err))?;

        Ok(())
    }

    async fn move_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        channel_id: ChannelId,
    ) -> Result<(), BotError> {
        guild_id
            .move_member(&self.ctx, user_id, channel_id)
            .await
            .map_err(|err| BotError::platform("move member", err))?;

        Ok(())
    }

    async fn purge_messages(&self, channel_id: ChannelId, limit: u8) -> Result<usize, BotError> {
        let messages = channel_id
            .messages(&self.ctx, GetMessages::new().limit(limit))
            .await
            .map_err(|err| BotError::platform("read messages", err))?;

        let ids: Vec<MessageId> = messages.iter().map(|message| message.id).collect();
        let (recent, old) = split_by_age(&ids, Utc::now().timestamp());

        if !recent.is_empty() {
            channel_id
                .delete_messages(&self.ctx, &recent)
                .await
                .map_err(|err| BotError::platform("delete messages", err))?;
        }

        // bulk deletion refuses anything older than two weeks
        for id in &old {
            channel_id
                .delete_message(&self.ctx, *id)
                .await
                .map_err(|err| BotError::platform("delete messages", err))?;
        }

        Ok(ids.len())
    }

    async fn send_message(&self, channel_id: ChannelId, content: String) -> Result<(), BotError> {
        channel_id
            .say(&self.ctx, content)
            .await
            .map_err(|err| BotError::platform("send message", err))?;

        Ok(())
    }

    async fn send_setup_prompt(
        &self,
        channel_id: ChannelId,
        prompt: SetupPrompt,
    ) -> Result<(), BotError> {
        let message = CreateMessage::new()
            .content(format!(
                "<@{}> is setting up a temporary channel.",
                prompt.member
            ))
            .components(component::setup_prompt_rows(
                prompt.session,
                &prompt.categories,
            ));

        channel_id
            .send_message(&self.ctx, message)
            .await
            .map_err(|err| BotError::platform("send message", err))?;

        Ok(())
    }

    async fn send_follow_up(&self, guild_id: GuildId, user_id: UserId) -> Result<(), BotError> {
        let follow_up = &self.data.config.follow_up;

        let mut embed = CreateEmbed::new()
            .title(&follow_up.title)
            .description(&follow_up.description)
            .color(follow_up.color);

        let icon = self
            .ctx
            .cache
            .guild(guild_id)
            .and_then(|guild| guild.icon_url());

        if let Some(thumbnail) = icon.or_else(|| follow_up.thumbnail_url.clone()) {
            embed = embed.thumbnail(thumbnail);
        }

        if let Some(invite_url) = &follow_up.invite_url {
            embed = embed.field(
                "Discord Server",
                format!("[Join our Discord]({invite_url})"),
                false,
            );
        }

        let dm = user_id
            .create_dm_channel(&self.ctx)
            .await
            .map_err(|err| BotError::platform("open direct message", err))?;

        dm.send_message(&self.ctx, CreateMessage::new().embed(embed))
            .await
            .map_err(|err| BotError::platform("send direct message", err))?;

        Ok(())
    }

    fn voice_occupancy(&self, guild_id: GuildId, channel_id: ChannelId) -> Option<usize> {
        self.ctx.cache.guild(guild_id).map(|guild| {
            guild
                .voice_states
                .values()
                .filter(|state| state.channel_id == Some(channel_id))
                .count()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The id of a message sent at `unix` seconds
    fn message_at(unix: i64) -> MessageId {
        const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;
        MessageId::new(((unix * 1000 - DISCORD_EPOCH_MS) as u64) << 22)
    }

    #[test]
    fn messages_older_than_two_weeks_are_deleted_one_by_one() {
        let now = 1_700_000_000;
        let day = 24 * 60 * 60;
        let fresh = message_at(now - 60);
        let week_old = message_at(now - 7 * day);
        let month_old = message_at(now - 30 * day);

        let (recent, old) = split_by_age(&[fresh, month_old, week_old], now);

        assert_eq!(recent, vec![fresh, week_old]);
        assert_eq!(old, vec![month_old]);
    }
}
