//! Routes component and modal interactions to the session they belong to.

use chrono::Utc;
use color_eyre::eyre::{OptionExt, Result};
use serenity::all::{
    ChannelId, ComponentInteraction, ComponentInteractionDataKind, Context,
    CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse,
    Interaction, ModalInteraction,
};

use crate::{
    component::{self, ComponentId},
    data::Data,
    error::BotError,
    form,
    platform::DiscordPlatform,
};

pub async fn dispatch(ctx: &Context, data: &Data, interaction: &Interaction) -> Result<()> {
    match interaction {
        Interaction::Component(component) => handle_component(ctx, data, component).await,
        Interaction::Modal(modal) => handle_modal(ctx, data, modal).await,
        _ => Ok(()),
    }
}

async fn handle_component(
    ctx: &Context,
    data: &Data,
    interaction: &ComponentInteraction,
) -> Result<()> {
    let Some(id) = ComponentId::parse(&interaction.data.custom_id) else {
        return Ok(());
    };

    let guild_id = interaction
        .guild_id
        .ok_or_eyre("component used outside of a guild")?;
    let actor = interaction.user.id;
    let now = Utc::now();
    trace!(%actor, %id, "component interaction");

    let result = match id {
        ComponentId::Toggle { session, category } => data
            .state
            .lock()
            .await
            .guild(guild_id)
            .toggle_category(session, actor, category, now)
            .map(|buttons| {
                CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::new()
                        .components(component::selection_rows(session, &buttons)),
                )
            }),
        ComponentId::Finish { session } => data
            .state
            .lock()
            .await
            .guild(guild_id)
            .finish_selection(session, actor, now)
            .map(|chosen| {
                let names: Vec<_> = chosen.iter().map(|c| c.name.as_str()).collect();
                info!(user = %interaction.user.name, ?names, "selected categories");

                CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::new()
                        .content(format!(
                            "**Setup complete. Waiting for user to join the '{}' voice channel...**",
                            data.config.channels.sentinel
                        ))
                        .components(Vec::new()),
                )
            }),
        ComponentId::Pick { session } => {
            let category = match &interaction.data.kind {
                ComponentInteractionDataKind::StringSelect { values } => values
                    .first()
                    .and_then(|value| value.parse::<u64>().ok())
                    .filter(|&id| id != 0)
                    .map(ChannelId::new),
                _ => None,
            };

            match category {
                Some(category) => data
                    .state
                    .lock()
                    .await
                    .guild(guild_id)
                    .choose_category(session, actor, category, now)
                    .map(|()| CreateInteractionResponse::Acknowledge),
                None => Err(BotError::InvalidInput("Please choose a category.".into())),
            }
        }
        ComponentId::Continue { session } => data
            .state
            .lock()
            .await
            .guild(guild_id)
            .setup_target(session, actor, now)
            .map(|_| CreateInteractionResponse::Modal(component::setup_modal(session))),
        // only ever the id of a modal
        ComponentId::Form { .. } => return Ok(()),
    };

    let response = match result {
        Ok(response) => response,
        Err(err) => CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .content(rejection(&err))
                .ephemeral(true),
        ),
    };

    interaction.create_response(ctx, response).await?;

    Ok(())
}

async fn handle_modal(ctx: &Context, data: &Data, interaction: &ModalInteraction) -> Result<()> {
    let Some(ComponentId::Form { session }) = ComponentId::parse(&interaction.data.custom_id)
    else {
        return Ok(());
    };

    let guild_id = interaction
        .guild_id
        .ok_or_eyre("modal submitted outside of a guild")?;

    // creating and moving can take longer than the interaction deadline
    interaction.defer_ephemeral(ctx).await?;

    let raw = component::read_form(&interaction.data.components);
    let platform = DiscordPlatform::new(ctx.clone(), data.clone());

    let content = match form::submit(&platform, data, guild_id, interaction.user.id, session, &raw)
        .await
    {
        Ok(_) => "Temporary channel created and you have been moved.".to_string(),
        Err(err) => rejection(&err),
    };

    interaction
        .edit_response(ctx, EditInteractionResponse::new().content(content))
        .await?;

    Ok(())
}

/// The private message shown to a user whose interaction failed
fn rejection(err: &BotError) -> String {
    if err.is_user_facing() {
        debug!("interaction rejected: {}", err);
        return err.to_string();
    }

    error!("interaction failed: {:?}", err);
    match err {
        BotError::PermissionDenied(action) => {
            format!("I'm missing the permissions to {action}. Please contact an administrator.")
        }
        _ => "Something went wrong, please try again.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_mistakes_are_shown_as_is() {
        assert_eq!(
            rejection(&BotError::Unauthorized),
            "You're not authorized to use this setup."
        );
        assert_eq!(
            rejection(&BotError::EmptySelection),
            "No categories selected. Please select at least one category."
        );
        assert_eq!(
            rejection(&BotError::SessionExpired),
            "This setup has expired. Please start again."
        );
        assert_eq!(
            rejection(&BotError::InvalidInput("The channel name can't be empty.".into())),
            "The channel name can't be empty."
        );
    }

    #[test]
    fn bot_failures_are_not_leaked() {
        assert_eq!(
            rejection(&BotError::PermissionDenied("move member")),
            "I'm missing the permissions to move member. Please contact an administrator."
        );
        assert_eq!(
            rejection(&BotError::SentinelChannel),
            "Something went wrong, please try again."
        );
        assert_eq!(
            rejection(&BotError::NotFound("delete channel")),
            "Something went wrong, please try again."
        );
    }
}
