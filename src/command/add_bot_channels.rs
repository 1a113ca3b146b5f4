use color_eyre::eyre::{OptionExt, Result};

use crate::{
    bootstrap::{self, Resource},
    data::Context,
    platform::DiscordPlatform,
};

super::command! {
    true;
    /// Create the category, setup channel and voice channel the bot works from
    pub async fn add_bot_channels(ctx: Context<'_>) -> Result<()> {
        let guild_id = ctx.guild_id().ok_or_eyre("guild only command")?;
        ctx.defer().await?;

        let data = ctx.data();
        let names = &data.config.channels;
        let platform = DiscordPlatform::new(ctx.serenity_context().clone(), data.clone());

        let report = bootstrap::ensure_bot_channels(&platform, guild_id, names).await;

        if let Some(sentinel) = report
            .provisioned
            .iter()
            .find(|p| p.resource == Resource::SentinelChannel)
        {
            data.state
                .lock()
                .await
                .guild(guild_id)
                .directory
                .set_sentinel(sentinel.id);
        }

        for provisioned in &report.provisioned {
            ctx.say(provisioned.describe(names)).await?;
        }

        match report.failure {
            Some(err) => Err(err.into()),
            None => {
                info!(%guild_id, user = %ctx.author().name, "bot channels ready");
                Ok(())
            }
        }
    }
}
