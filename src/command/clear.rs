use color_eyre::eyre::Result;
use poise::CreateReply;

use crate::{
    data::Context,
    platform::{DiscordPlatform, Platform},
};

super::command! {
    true;
    /// Delete the most recent messages in this channel
    pub async fn clear(ctx: Context<'_>) -> Result<()> {
        ctx.defer_ephemeral().await?;

        let data = ctx.data();
        let channel_id = ctx.channel_id();
        let platform = DiscordPlatform::new(ctx.serenity_context().clone(), data.clone());

        let purged = platform
            .purge_messages(channel_id, data.config.purge_limit)
            .await?;

        let name = channel_id
            .name(ctx)
            .await
            .unwrap_or_else(|_| channel_id.to_string());
        info!(user = %ctx.author().name, channel = %name, purged, "cleared channel");

        ctx.send(
            CreateReply::default()
                .content(format!("Channel '{name}' has been cleared."))
                .ephemeral(true),
        )
        .await?;

        Ok(())
    }
}
