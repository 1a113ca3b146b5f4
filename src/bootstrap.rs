use serenity::all::{ChannelId, GuildId};

use crate::{
    data::config::ChannelNames,
    error::BotError,
    platform::{find_channel, ChannelInfo, ChannelKind, NewChannel, Platform},
};

/// The category, setup text channel and sentinel voice channel, as far as
/// they exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BotChannels {
    pub category: Option<ChannelId>,
    pub setup: Option<ChannelId>,
    pub sentinel: Option<ChannelId>,
}

impl BotChannels {
    /// Look the bot channels up by name. The text and voice channels are
    /// searched inside the bot category when it exists, anywhere otherwise.
    pub fn resolve(channels: &[ChannelInfo], names: &ChannelNames) -> Self {
        let category = find_channel(channels, &names.category, ChannelKind::Category, None)
            .map(|c| c.id);

        Self {
            category,
            setup: find_channel(channels, &names.setup, ChannelKind::Text, category).map(|c| c.id),
            sentinel: find_channel(channels, &names.sentinel, ChannelKind::Voice, category)
                .map(|c| c.id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Category,
    SetupChannel,
    SentinelChannel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub resource: Resource,
    pub id: ChannelId,
    pub created: bool,
}

impl Provisioned {
    /// The line reported back to the administrator
    pub fn describe(&self, names: &ChannelNames) -> String {
        match (self.resource, self.created) {
            (Resource::Category, true) => format!("Category '{}' created.", names.category),
            (Resource::Category, false) => format!("Category '{}' already exists.", names.category),
            (Resource::SetupChannel, true) => format!(
                "Text channel '{}' created in '{}' category.",
                names.setup, names.category
            ),
            (Resource::SetupChannel, false) => {
                format!("Text channel '{}' already exists.", names.setup)
            }
            (Resource::SentinelChannel, true) => format!(
                "Voice channel '{}' created in '{}' category.",
                names.sentinel, names.category
            ),
            (Resource::SentinelChannel, false) => {
                format!("Voice channel '{}' already exists.", names.sentinel)
            }
        }
    }
}

/// What bootstrap found or created, and the error that stopped it early
#[derive(Debug)]
pub struct BootstrapReport {
    pub provisioned: Vec<Provisioned>,
    pub failure: Option<BotError>,
}

/// Make sure the bot category, setup channel and sentinel channel exist.
///
/// Each one is checked and created on its own. A failure stops the remaining
/// steps but keeps whatever was already created.
pub async fn ensure_bot_channels(
    platform: &impl Platform,
    guild_id: GuildId,
    names: &ChannelNames,
) -> BootstrapReport {
    let mut provisioned = Vec::with_capacity(3);
    let failure = ensure_all(platform, guild_id, names, &mut provisioned)
        .await
        .err();

    BootstrapReport {
        provisioned,
        failure,
    }
}

async fn ensure_all(
    platform: &impl Platform,
    guild_id: GuildId,
    names: &ChannelNames,
    report: &mut Vec<Provisioned>,
) -> Result<(), BotError> {
    let existing = BotChannels::resolve(&platform.channels(guild_id).await?, names);

    let category = ensure(
        platform,
        guild_id,
        existing.category,
        Resource::Category,
        NewChannel::new(&names.category, ChannelKind::Category),
    )
    .await?;
    let category_id = category.id;

    // a freshly created category can't contain anything yet
    let (setup, sentinel) = if category.created {
        (None, None)
    } else {
        (existing.setup, existing.sentinel)
    };
    report.push(category);

    report.push(
        ensure(
            platform,
            guild_id,
            setup,
            Resource::SetupChannel,
            NewChannel::new(&names.setup, ChannelKind::Text).parent(category_id),
        )
        .await?,
    );

    report.push(
        ensure(
            platform,
            guild_id,
            sentinel,
            Resource::SentinelChannel,
            NewChannel::new(&names.sentinel, ChannelKind::Voice).parent(category_id),
        )
        .await?,
    );

    Ok(())
}

async fn ensure(
    platform: &impl Platform,
    guild_id: GuildId,
    existing: Option<ChannelId>,
    resource: Resource,
    channel: NewChannel,
) -> Result<Provisioned, BotError> {
    if let Some(id) = existing {
        trace!(?resource, %id, "already exists");
        return Ok(Provisioned {
            resource,
            id,
            created: false,
        });
    }

    let name = channel.name.clone();
    let id = platform.create_channel(guild_id, channel).await?;
    info!(?resource, %id, %name, "created");

    Ok(Provisioned {
        resource,
        id,
        created: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::FakePlatform;

    const GUILD: GuildId = GuildId::new(1);

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let platform = FakePlatform::default();
        let names = ChannelNames::default();

        let first = ensure_bot_channels(&platform, GUILD, &names).await;
        assert!(first.failure.is_none());
        let first = first.provisioned;
        assert!(first.iter().all(|p| p.created));
        assert_eq!(
            first.iter().map(|p| p.describe(&names)).collect::<Vec<_>>(),
            vec![
                "Category 'Custom Channel' created.",
                "Text channel 'setup' created in 'Custom Channel' category.",
                "Voice channel 'ADD NEW' created in 'Custom Channel' category.",
            ]
        );

        let created = platform.created();
        assert_eq!(created.len(), 3);
        assert_eq!(created[1].parent, Some(first[0].id));
        assert_eq!(created[2].parent, Some(first[0].id));
        assert_eq!(created[2].kind, ChannelKind::Voice);

        let second = ensure_bot_channels(&platform, GUILD, &names).await.provisioned;
        assert!(second.iter().all(|p| !p.created));
        assert_eq!(
            second.iter().map(|p| p.id).collect::<Vec<_>>(),
            first.iter().map(|p| p.id).collect::<Vec<_>>()
        );
        assert_eq!(
            second[2].describe(&names),
            "Voice channel 'ADD NEW' already exists."
        );
        assert_eq!(platform.created().len(), 3);
    }

    #[tokio::test]
    async fn only_missing_resources_are_created() {
        let platform = FakePlatform::default();
        let names = ChannelNames::default();
        let category = platform.add_channel("Custom Channel", ChannelKind::Category, None);
        // a "setup" channel elsewhere in the guild doesn't count
        platform.add_channel("setup", ChannelKind::Text, None);
        platform.add_channel("ADD NEW", ChannelKind::Voice, Some(category));

        let report = ensure_bot_channels(&platform, GUILD, &names).await;

        let created: Vec<_> = report
            .provisioned
            .iter().map(|p| (p.resource, p.created)).collect();
        assert_eq!(
            created,
            vec![
                (Resource::Category, false),
                (Resource::SetupChannel, true),
                (Resource::SentinelChannel, false),
            ]
        );
        assert_eq!(platform.created()[0].parent, Some(category));
    }

    #[tokio::test]
    async fn failure_keeps_what_was_created() {
        let platform = FakePlatform::default();
        let names = ChannelNames::default();
        platform.add_channel("Custom Channel", ChannelKind::Category, None);
        platform.deny("create channel");

        let report = ensure_bot_channels(&platform, GUILD, &names).await;

        assert!(matches!(
            report.failure,
            Some(BotError::PermissionDenied("create channel"))
        ));
        // the existing category is still reported
        assert_eq!(report.provisioned.len(), 1);
        assert!(!report.provisioned[0].created);
        assert_eq!(platform.channel_list().len(), 1);
    }

    #[test]
    fn resolve_prefers_channels_in_the_bot_category() {
        let names = ChannelNames::default();
        let platform = FakePlatform::default();
        let stray = platform.add_channel("ADD NEW", ChannelKind::Voice, None);
        let category = platform.add_channel("Custom Channel", ChannelKind::Category, None);
        let sentinel = platform.add_channel("ADD NEW", ChannelKind::Voice, Some(category));

        let resolved = BotChannels::resolve(&platform.channel_list(), &names);

        assert_eq!(resolved.category, Some(category));
        assert_eq!(resolved.sentinel, Some(sentinel));
        assert_ne!(resolved.sentinel, Some(stray));
        assert_eq!(resolved.setup, None);
    }
}
