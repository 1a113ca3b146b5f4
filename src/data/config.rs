use std::{ops::Deref, path::PathBuf, time::Duration};

use color_eyre::eyre::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use serenity::all::Permissions;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(transparent)]
pub struct AdminPermissions(pub Permissions);

impl Default for AdminPermissions {
    fn default() -> Self {
        AdminPermissions(Permissions::ADMINISTRATOR)
    }
}

impl Deref for AdminPermissions {
    type Target = Permissions;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// The Discord token used to authenticate the bot
    pub token: String,
    /// The permissions required for usage of the admin commands
    ///
    /// See [Discord permissions](https://discord.com/developers/docs/topics/permissions)
    #[serde(default)]
    pub admin_permissions: AdminPermissions,
    /// Names of the channels created by `/add_bot_channels`
    #[serde(default)]
    pub channels: ChannelNames,
    /// Timings for setup sessions
    #[serde(default)]
    pub sessions: SessionConfig,
    /// How many messages are purged from the setup channel after a channel is
    /// created, and by `/clear`
    #[serde(default = "default_purge_limit")]
    pub purge_limit: u8,
    /// The direct message sent to members that linger in the sentinel channel
    #[serde(default)]
    pub follow_up: FollowUpConfig,
}

/// The most messages Discord returns for a single history request
pub const MAX_PURGE_LIMIT: u8 = 100;

fn default_purge_limit() -> u8 {
    MAX_PURGE_LIMIT
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelNames {
    /// The category holding the bot's own channels
    #[serde(default = "default_category_name")]
    pub category: String,
    /// The text channel setup prompts are posted in
    #[serde(default = "default_setup_name")]
    pub setup: String,
    /// The voice channel that starts the setup flow when joined
    #[serde(default = "default_sentinel_name")]
    pub sentinel: String,
}

fn default_category_name() -> String {
    "Custom Channel".to_string()
}

fn default_setup_name() -> String {
    "setup".to_string()
}

fn default_sentinel_name() -> String {
    "ADD NEW".to_string()
}

impl Default for ChannelNames {
    fn default() -> Self {
        Self {
            category: default_category_name(),
            setup: default_setup_name(),
            sentinel: default_sentinel_name(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// How long (in seconds) interactive controls stay usable
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_session_timeout")]
    pub timeout: Duration,
    /// How long (in seconds) after joining the sentinel the follow-up DM is sent
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_follow_up_delay")]
    pub follow_up_delay: Duration,
}

fn default_session_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_follow_up_delay() -> Duration {
    Duration::from_secs(30)
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: default_session_timeout(),
            follow_up_delay: default_follow_up_delay(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FollowUpConfig {
    #[serde(default = "default_follow_up_title")]
    pub title: String,
    #[serde(default = "default_follow_up_description")]
    pub description: String,
    #[serde(default = "default_follow_up_color")]
    pub color: u32,
    /// An invite link added to the embed if present
    #[serde(default)]
    pub invite_url: Option<String>,
    /// Thumbnail used when the guild has no icon
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

fn default_follow_up_title() -> String {
    "Setup Complete!".to_string()
}

fn default_follow_up_description() -> String {
    "Thank you for using Reaper! Feedback is always welcome on our Discord server.".to_string()
}

fn default_follow_up_color() -> u32 {
    0x1ABC9C
}

impl Default for FollowUpConfig {
    fn default() -> Self {
        Self {
            title: default_follow_up_title(),
            description: default_follow_up_description(),
            color: default_follow_up_color(),
            invite_url: None,
            thumbnail_url: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config_file = match std::env::var("REAPER_CONFIG") {
            Ok(path) => PathBuf::from(path),
            Err(_) => {
                let mut path = std::env::current_dir()?;
                path.push("reaper.toml");
                path
            }
        };
        trace!("Loading configuration from {:?}", config_file);

        let mut config = Figment::new()
            .merge(Toml::file(config_file))
            // older deployments only set DISCORD_TOKEN
            .merge(Env::raw().only(&["DISCORD_TOKEN"]).map(|_| "token".into()))
            .merge(Env::prefixed("REAPER_").split("__"))
            .extract::<AppConfig>()?;

        if config.purge_limit > MAX_PURGE_LIMIT {
            warn!(
                purge_limit = config.purge_limit,
                "purge limit is above what Discord allows, using {}", MAX_PURGE_LIMIT
            );
            config.purge_limit = MAX_PURGE_LIMIT;
        }

        Ok(config)
    }

    /// A config with every optional value at its default
    #[cfg(test)]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            admin_permissions: AdminPermissions::default(),
            channels: ChannelNames::default(),
            sessions: SessionConfig::default(),
            purge_limit: default_purge_limit(),
            follow_up: FollowUpConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn defaults_fill_everything_but_the_token() {
        Jail::expect_with(|jail| {
            jail.set_env("REAPER_TOKEN", "abc");
            jail.set_env("REAPER_CONFIG", "missing.toml");

            let config = AppConfig::load().map_err(|err| err.to_string())?;

            assert_eq!(config.token, "abc");
            assert_eq!(*config.admin_permissions, Permissions::ADMINISTRATOR);
            assert_eq!(config.channels.sentinel, "ADD NEW");
            assert_eq!(config.sessions.timeout, Duration::from_secs(300));
            assert_eq!(config.sessions.follow_up_delay, Duration::from_secs(30));
            assert_eq!(config.purge_limit, 100);
            assert_eq!(config.follow_up.title, "Setup Complete!");
            assert_eq!(config.follow_up.invite_url, None);

            Ok(())
        });
    }

    #[test]
    fn discord_token_is_accepted() {
        Jail::expect_with(|jail| {
            jail.set_env("DISCORD_TOKEN", "legacy");
            jail.set_env("REAPER_CONFIG", "missing.toml");

            let config = AppConfig::load().map_err(|err| err.to_string())?;
            assert_eq!(config.token, "legacy");

            // the prefixed variable wins when both are set
            jail.set_env("REAPER_TOKEN", "abc");
            let config = AppConfig::load().map_err(|err| err.to_string())?;
            assert_eq!(config.token, "abc");

            Ok(())
        });
    }

    #[test]
    fn purge_limit_is_capped() {
        Jail::expect_with(|jail| {
            jail.set_env("REAPER_TOKEN", "abc");
            jail.set_env("REAPER_CONFIG", "missing.toml");
            jail.set_env("REAPER_PURGE_LIMIT", "250");

            let config = AppConfig::load().map_err(|err| err.to_string())?;
            assert_eq!(config.purge_limit, MAX_PURGE_LIMIT);

            Ok(())
        });
    }

    #[test]
    fn toml_and_nested_env_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "reaper.toml",
                r#"
                token = "from-file"

                [channels]
                sentinel = "New Room"

                [sessions]
                timeout = 60
                "#,
            )?;
            jail.set_env("REAPER_CONFIG", "reaper.toml");
            jail.set_env("REAPER_SESSIONS__FOLLOW_UP_DELAY", "5");

            let config = AppConfig::load().map_err(|err| err.to_string())?;

            assert_eq!(config.token, "from-file");
            assert_eq!(config.channels.sentinel, "New Room");
            assert_eq!(config.channels.setup, "setup");
            assert_eq!(config.sessions.timeout, Duration::from_secs(60));
            assert_eq!(config.sessions.follow_up_delay, Duration::from_secs(5));

            Ok(())
        });
    }
}
