use chrono::Utc;
use serenity::all::{ChannelId, GuildId, UserId};

use crate::{
    bootstrap::BotChannels,
    data::Data,
    error::BotError,
    platform::{ChannelKind, ConnectOverwrite, NewChannel, OverwriteTarget, Platform},
    session::SessionId,
};

pub const MAX_NAME_LENGTH: usize = 100;

/// The setup modal's fields as typed by the member
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSetupForm {
    pub name: String,
    pub limit: String,
    pub privacy: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privacy {
    Public,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupFormInput {
    pub name: String,
    /// Zero means unlimited
    pub user_limit: u32,
    pub privacy: Privacy,
}

impl SetupFormInput {
    /// Validate the raw fields.
    ///
    /// Only the name can fail. A user limit that isn't one or two digits is
    /// read as 0 (unlimited) and any privacy other than "private" is public.
    pub fn parse(raw: &RawSetupForm) -> Result<Self, BotError> {
        let name = raw.name.trim();

        if name.is_empty() {
            return Err(BotError::InvalidInput(
                "The channel name can't be empty.".into(),
            ));
        }

        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(BotError::InvalidInput(format!(
                "The channel name can be at most {MAX_NAME_LENGTH} characters."
            )));
        }

        let limit = raw.limit.trim();
        let user_limit = if (1..=2).contains(&limit.len()) && limit.bytes().all(|b| b.is_ascii_digit()) {
            limit.parse().unwrap_or_default()
        } else {
            0
        };

        let privacy = if raw.privacy.trim().eq_ignore_ascii_case("private") {
            Privacy::Private
        } else {
            Privacy::Public
        };

        Ok(Self {
            name: name.to_string(),
            user_limit,
            privacy,
        })
    }

    /// The connect overwrites for the new channel. The owner can always
    /// connect; everyone else only if the channel is public.
    pub fn overwrites(&self, owner: UserId) -> Vec<ConnectOverwrite> {
        vec![
            ConnectOverwrite {
                target: OverwriteTarget::Everyone,
                allow: self.privacy == Privacy::Public,
            },
            ConnectOverwrite {
                target: OverwriteTarget::Member(owner),
                allow: true,
            },
        ]
    }
}

/// Create a member's temporary channel from a submitted setup form, move them
/// into it and record it for cleanup.
pub async fn submit(
    platform: &impl Platform,
    data: &Data,
    guild_id: GuildId,
    actor: UserId,
    session: SessionId,
    raw: &RawSetupForm,
) -> Result<ChannelId, BotError> {
    let category = data
        .state
        .lock()
        .await
        .guild(guild_id)
        .setup_target(session, actor, Utc::now())?;

    let input = SetupFormInput::parse(raw)?;
    debug!(%actor, ?input, category = %category.name, "creating temporary channel");

    let new_channel = NewChannel {
        name: input.name.clone(),
        kind: ChannelKind::Voice,
        parent: Some(category.id),
        user_limit: input.user_limit,
        overwrites: input.overwrites(actor),
    };

    let channel_id = platform.create_channel(guild_id, new_channel).await?;

    let recorded = data
        .state
        .lock()
        .await
        .guild(guild_id)
        .directory
        .record(channel_id, actor);

    if let Err(err) = recorded {
        // not tracked so it would never be cleaned up
        discard_channel(platform, data, guild_id, channel_id).await;
        return Err(err);
    }

    if let Err(err) = platform.move_member(guild_id, actor, channel_id).await {
        warn!(%actor, %channel_id, "failed to move member, removing their channel");
        discard_channel(platform, data, guild_id, channel_id).await;
        return Err(err);
    }

    data.state
        .lock()
        .await
        .guild(guild_id)
        .complete_setup(session, actor, Utc::now())
        .unwrap_or_else(|err| debug!("setup session closed early: {}", err));

    info!(%actor, %channel_id, name = %input.name, "temporary channel created and member moved");

    purge_setup_channel(platform, data, guild_id).await;

    Ok(channel_id)
}

async fn discard_channel(
    platform: &impl Platform,
    data: &Data,
    guild_id: GuildId,
    channel_id: ChannelId,
) {
    data.state
        .lock()
        .await
        .guild(guild_id)
        .directory
        .remove(channel_id);

    if let Err(err) = platform.delete_channel(channel_id).await {
        error!(%channel_id, "failed to delete discarded channel: {}", err);
    }
}

/// Clear the setup channel so the next member starts from a clean slate
async fn purge_setup_channel(platform: &impl Platform, data: &Data, guild_id: GuildId) {
    let setup_channel = match platform.channels(guild_id).await {
        Ok(channels) => BotChannels::resolve(&channels, &data.config.channels).setup,
        Err(err) => {
            warn!("failed to look up the setup channel: {}", err);
            return;
        }
    };

    let Some(setup_channel) = setup_channel else {
        return;
    };

    match platform
        .purge_messages(setup_channel, data.config.purge_limit)
        .await
    {
        Ok(purged) => trace!(purged, "cleared setup channel"),
        Err(err) => warn!("failed to clear setup channel: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::test_data,
        platform::fake::FakePlatform,
        registry::CategoryRef,
    };

    fn raw(name: &str, limit: &str, privacy: &str) -> RawSetupForm {
        RawSetupForm {
            name: name.to_string(),
            limit: limit.to_string(),
            privacy: privacy.to_string(),
        }
    }

    #[test]
    fn non_numeric_limit_means_unlimited() {
        let input = SetupFormInput::parse(&raw("Lounge", "abc", "public")).unwrap();
        assert_eq!(input.user_limit, 0);

        for limit in ["", "-1", "1.5", "100", "５"] {
            let input = SetupFormInput::parse(&raw("Lounge", limit, "public")).unwrap();
            assert_eq!(input.user_limit, 0, "{limit:?}");
        }

        let input = SetupFormInput::parse(&raw("Lounge", " 05 ", "public")).unwrap();
        assert_eq!(input.user_limit, 5);
        let input = SetupFormInput::parse(&raw("Lounge", "99", "public")).unwrap();
        assert_eq!(input.user_limit, 99);
    }

    #[test]
    fn only_private_means_private() {
        for privacy in ["private", "PRIVATE", " Private "] {
            let input = SetupFormInput::parse(&raw("Lounge", "5", privacy)).unwrap();
            assert_eq!(input.privacy, Privacy::Private, "{privacy:?}");
        }

        for privacy in ["public", "secret", "", "privat"] {
            let input = SetupFormInput::parse(&raw("Lounge", "5", privacy)).unwrap();
            assert_eq!(input.privacy, Privacy::Public, "{privacy:?}");
        }
    }

    #[test]
    fn name_must_be_present_and_bounded() {
        assert!(matches!(
            SetupFormInput::parse(&raw("   ", "5", "public")),
            Err(BotError::InvalidInput(_))
        ));
        assert!(matches!(
            SetupFormInput::parse(&raw(&"a".repeat(101), "5", "public")),
            Err(BotError::InvalidInput(_))
        ));

        let input = SetupFormInput::parse(&raw(&"é".repeat(100), "5", "public")).unwrap();
        assert_eq!(input.name.chars().count(), 100);
        let input = SetupFormInput::parse(&raw("  Lounge ", "5", "public")).unwrap();
        assert_eq!(input.name, "Lounge");
    }

    const GUILD: GuildId = GuildId::new(1);
    const MEMBER: UserId = UserId::new(7);

    async fn setup_for(platform: &FakePlatform, data: &Data, member: UserId) -> (CategoryRef, SessionId) {
        let gaming = platform.add_channel("Gaming", ChannelKind::Category, None);
        let category = CategoryRef {
            id: gaming,
            name: "Gaming".to_string(),
        };

        let mut state = data.state.lock().await;
        let guild = state.guild(GUILD);
        guild.registry.toggle(member, &category);
        let pending = guild.begin_setup(member, Utc::now()).unwrap();

        (category, pending.session)
    }

    #[tokio::test]
    async fn private_channel_is_created_recorded_and_joined() {
        let platform = FakePlatform::default();
        let data = test_data();
        let setup = platform.add_channel("setup", ChannelKind::Text, None);
        let (gaming, session) = setup_for(&platform, &data, MEMBER).await;

        let channel_id = submit(
            &platform,
            &data,
            GUILD,
            MEMBER,
            session,
            &raw("Lounge", "5", "private"),
        )
        .await
        .unwrap();

        let created = platform.created();
        assert_eq!(
            created,
            vec![NewChannel {
                name: "Lounge".to_string(),
                kind: ChannelKind::Voice,
                parent: Some(gaming.id),
                user_limit: 5,
                overwrites: vec![
                    ConnectOverwrite {
                        target: OverwriteTarget::Everyone,
                        allow: false,
                    },
                    ConnectOverwrite {
                        target: OverwriteTarget::Member(MEMBER),
                        allow: true,
                    },
                ],
            }]
        );
        assert_eq!(platform.moves(), vec![(MEMBER, channel_id)]);
        assert_eq!(platform.purged(), vec![setup]);

        let mut state = data.state.lock().await;
        let guild = state.guild(GUILD);
        assert_eq!(guild.directory.owner_of(channel_id), Some(MEMBER));
        assert!(guild.setups.is_empty());
    }

    #[tokio::test]
    async fn foreign_submission_creates_nothing() {
        let platform = FakePlatform::default();
        let data = test_data();
        let (_, session) = setup_for(&platform, &data, MEMBER).await;

        let result = submit(
            &platform,
            &data,
            GUILD,
            UserId::new(8),
            session,
            &raw("Lounge", "5", "public"),
        )
        .await;

        assert!(matches!(result, Err(BotError::Unauthorized)));
        assert!(platform.created().is_empty());
        assert_eq!(data.state.lock().await.guild(GUILD).setups.len(), 1);
    }

    #[tokio::test]
    async fn failed_move_removes_the_channel_again() {
        let platform = FakePlatform::default();
        platform.deny("move member");
        let data = test_data();
        let (_, session) = setup_for(&platform, &data, MEMBER).await;

        let result = submit(
            &platform,
            &data,
            GUILD,
            MEMBER,
            session,
            &raw("Lounge", "", "public"),
        )
        .await;

        assert!(matches!(result, Err(BotError::PermissionDenied("move member"))));
        let created = platform.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].user_limit, 0);
        assert_eq!(platform.deleted().len(), 1);
        assert!(data.state.lock().await.guild(GUILD).directory.is_empty());
    }
}
