use color_eyre::eyre::Result;
use poise::{BoxFuture, CreateReply};
use serenity::{http::HttpError, model::error::Error as ModelError};
use thiserror::Error;

use crate::data::FrameworkError;

/// Failures of the channel lifecycle
#[derive(Debug, Error)]
pub enum BotError {
    /// Someone other than the session's initiator pressed one of its controls
    #[error("You're not authorized to use this setup.")]
    Unauthorized,
    #[error("No categories selected. Please select at least one category.")]
    EmptySelection,
    #[error("This setup has expired. Please start again.")]
    SessionExpired,
    #[error("{0}")]
    InvalidInput(String),
    #[error("the sentinel channel can't be a temporary channel")]
    SentinelChannel,
    #[error("The bot channels are missing. Please ask an administrator to run `/add_bot_channels`.")]
    NotBootstrapped,
    #[error("missing permissions to {0}")]
    PermissionDenied(&'static str),
    /// The target of the action is already gone
    #[error("failed to {0}: not found")]
    NotFound(&'static str),
    #[error("failed to {action}: {source}")]
    Platform {
        action: &'static str,
        #[source]
        source: serenity::Error,
    },
}

impl BotError {
    /// Sort a serenity error into [`BotError::PermissionDenied`],
    /// [`BotError::NotFound`] or [`BotError::Platform`]
    pub fn platform(action: &'static str, source: serenity::Error) -> Self {
        match &source {
            serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => {
                match response.status_code.as_u16() {
                    403 => BotError::PermissionDenied(action),
                    404 => BotError::NotFound(action),
                    _ => BotError::Platform { action, source },
                }
            }
            serenity::Error::Model(ModelError::InvalidPermissions { .. }) => {
                BotError::PermissionDenied(action)
            }
            _ => BotError::Platform { action, source },
        }
    }

    /// Errors that are the acting user's to fix and are shown to them as-is
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            BotError::Unauthorized
                | BotError::EmptySelection
                | BotError::SessionExpired
                | BotError::InvalidInput(_)
                | BotError::NotBootstrapped
        )
    }
}

/// A custom error handler to improve upon some of the builtin error handling
/// behavior. Falls back to the builtins for most cases.
async fn handle_error_inner(err: FrameworkError<'_>) -> Result<()> {
    match err {
        FrameworkError::Setup { error, .. } => {
            error!("setup error: {:?}", error);
        }
        FrameworkError::EventHandler { error, event, .. } => {
            error!(event = event.snake_case_name(), "event handler error: {:?}", error);
        }
        FrameworkError::Command { error, ctx, .. } => {
            error!(command = %ctx.command().name, "command error: {:?}", error);
            ctx.send(
                CreateReply::default()
                    .content(format!("Error: {:#}", error))
                    .ephemeral(true),
            )
            .await?;
        }
        FrameworkError::MissingUserPermissions { ctx, .. } => {
            warn!(user = %ctx.author().name, command = %ctx.command().name, "rejected non-admin");
            ctx.send(
                CreateReply::default()
                    .content("You need administrator permissions to use this command.")
                    .ephemeral(true),
            )
            .await?;
        }
        FrameworkError::MissingBotPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            error!("missing bot permissions: {}", missing_permissions);
            ctx.send(
                CreateReply::default()
                    .content(format!("Missing bot permissions: {}", missing_permissions))
                    .ephemeral(true),
            )
            .await?;
        }
        _ => {
            poise::builtins::on_error(err).await?;
        }
    }

    Ok(())
}

pub fn handle_error(err: FrameworkError<'_>) -> BoxFuture<()> {
    Box::pin(async move {
        if let Err(err) = handle_error_inner(err).await {
            error!("error handling error: {:?}", err);
        }
    })
}
