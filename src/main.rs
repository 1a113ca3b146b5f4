use color_eyre::eyre::Result;
use poise::{Framework, FrameworkOptions};
use serenity::all::{ActivityData, ClientBuilder, GatewayIntents};
use tracing_subscriber::prelude::*;

#[macro_use]
extern crate tracing;

pub mod bootstrap;
pub mod command;
pub mod component;
pub mod data;
pub mod directory;
pub mod error;
pub mod form;
pub mod handler;
pub mod interaction;
pub mod platform;
pub mod registry;
pub mod session;
pub mod watcher;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_error::ErrorLayer::default())
        .init();

    color_eyre::install()?;

    let data = data::load()?;
    let token = data.config.token.clone();

    let intents =
        // allow creating/deleting channels in guilds
        GatewayIntents::GUILDS
        // allow watching members join and leave voice channels
        | GatewayIntents::GUILD_VOICE_STATES;

    debug!(?intents, "Starting bot");
    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: command::commands(&data.config),
            on_error: error::handle_error,
            event_handler: handler::event_handler,
            // we don't use the owner system so just disable it entirely
            initialize_owners: false,
            skip_checks_for_owners: false,
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                trace!("registering commands");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                ctx.set_activity(Some(ActivityData::watching("the voice channels")));

                Ok(data)
            })
        })
        .build();

    debug!("Creating client");
    let mut client = ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting up");
    client.start().await?;

    Ok(())
}
