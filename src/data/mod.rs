use std::sync::Arc;

use color_eyre::eyre::{Report, Result, WrapErr};
use tokio::sync::Mutex;

pub mod config;
pub mod state;

/// The main data struct that contains the config and the in-memory state.
#[derive(Debug)]
pub struct DataInner {
    pub config: config::AppConfig,
    pub state: Mutex<state::State>,
}

pub fn load() -> Result<Data> {
    debug!("Loading configuration");
    let config = config::AppConfig::load()?;

    from_config(config)
}

pub fn from_config(config: config::AppConfig) -> Result<Data> {
    let session_ttl = chrono::Duration::from_std(config.sessions.timeout)
        .wrap_err("session timeout is out of range")?;

    let data = DataInner {
        config,
        state: Mutex::new(state::State::new(session_ttl)),
    };

    Ok(Arc::new(data))
}

pub type Data = Arc<DataInner>;
pub type Error = Report;

// a collection of type aliases for various poise types that take both of these
// type parameters
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type Command = poise::Command<Data, Error>;
pub type FrameworkContext<'a> = poise::FrameworkContext<'a, Data, Error>;
pub type FrameworkError<'a> = poise::FrameworkError<'a, Data, Error>;

#[cfg(test)]
pub fn test_data() -> Data {
    from_config(config::AppConfig::with_token("test-token")).unwrap()
}
