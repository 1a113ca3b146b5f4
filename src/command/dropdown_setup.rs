use chrono::Utc;
use color_eyre::eyre::{OptionExt, Result};
use poise::CreateReply;

use crate::{
    bootstrap::BotChannels,
    component::{self, MAX_CATEGORY_BUTTONS},
    data::Context,
    platform::{ChannelInfo, ChannelKind, DiscordPlatform, Platform},
    registry::CategoryRef,
};

super::command! {
    true;
    /// Choose which categories members can create temporary channels in
    pub async fn dropdown_setup(ctx: Context<'_>) -> Result<()> {
        let guild_id = ctx.guild_id().ok_or_eyre("guild only command")?;

        let data = ctx.data();
        let platform = DiscordPlatform::new(ctx.serenity_context().clone(), data.clone());
        let channels = platform.channels(guild_id).await?;

        let categories = selectable_categories(&channels, &BotChannels::resolve(&channels, &data.config.channels));

        if categories.is_empty() {
            ctx.say("No categories exist in this server.").await?;
            return Ok(());
        }

        let (session, buttons) = data.state.lock().await.guild(guild_id).open_selection(
            ctx.author().id,
            categories,
            Utc::now(),
        );
        debug!(%session, categories = buttons.len(), "opened category selection");

        ctx.say(format!(
            "⚠️ **Join '{}' voice channel to test the setup process!** ⚠️",
            data.config.channels.sentinel
        ))
        .await?;

        ctx.send(
            CreateReply::default()
                .content("Select the categories members can create channels in:")
                .components(component::selection_rows(session, &buttons)),
        )
        .await?;

        Ok(())
    }
}

/// Every category except the bot's own, in guild order
fn selectable_categories(channels: &[ChannelInfo], bot: &BotChannels) -> Vec<CategoryRef> {
    let mut categories: Vec<_> = channels
        .iter()
        .filter(|c| c.kind == ChannelKind::Category && Some(c.id) != bot.category)
        .collect();
    categories.sort_by_key(|c| (c.position, c.id));

    if categories.len() > MAX_CATEGORY_BUTTONS {
        warn!(
            total = categories.len(),
            "too many categories, only the first {} can be selected", MAX_CATEGORY_BUTTONS
        );
        categories.truncate(MAX_CATEGORY_BUTTONS);
    }

    categories
        .into_iter()
        .map(|c| CategoryRef {
            id: c.id,
            name: c.name.clone(),
        })
        .collect()
}
