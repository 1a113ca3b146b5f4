use color_eyre::eyre::Result;
use poise::BoxFuture;
use serenity::all::{Context, FullEvent};

use crate::{
    data::{Data, FrameworkContext},
    interaction,
    platform::DiscordPlatform,
    watcher::{self, VoiceTransition},
};

pub fn event_handler<'a>(
    ctx: &'a Context,
    event: &'a FullEvent,
    _framework: FrameworkContext<'a>,
    data: &'a Data,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        match event {
            FullEvent::VoiceStateUpdate { old, new } => {
                let Some(transition) = VoiceTransition::from_update(old.as_ref(), new) else {
                    return Ok(());
                };

                let platform = DiscordPlatform::new(ctx.clone(), data.clone());
                watcher::on_voice_state_update(&platform, data, transition).await;
            }
            FullEvent::InteractionCreate { interaction } => {
                interaction::dispatch(ctx, data, interaction).await?;
            }
            FullEvent::ChannelDelete { channel, .. } => {
                // keep the directory limited to channels that still exist
                let removed = data
                    .state
                    .lock()
                    .await
                    .guild(channel.guild_id)
                    .directory
                    .remove(channel.id);

                if let Some(owner) = removed {
                    debug!(channel_id = %channel.id, %owner, "temporary channel deleted externally");
                }
            }
            _ => {}
        }

        Ok(())
    })
}
