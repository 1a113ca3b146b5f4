//! Reacts to members moving between voice channels: starts the setup flow when
//! someone joins the sentinel channel and deletes temporary channels once the
//! last member leaves.

use std::time::Duration;

use chrono::Utc;
use serenity::all::{ChannelId, GuildId, UserId, VoiceState};
use tokio_util::sync::CancellationToken;

use crate::{
    bootstrap::BotChannels,
    data::Data,
    error::BotError,
    platform::{Platform, SetupPrompt},
};

pub const NO_CATEGORIES_MESSAGE: &str = "No categories have been approved for selection. \
    Please ask an administrator to run `/dropdown_setup`.";

/// A member's voice channel before and after a voice state update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceTransition {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub before: Option<ChannelId>,
    pub after: Option<ChannelId>,
}

impl VoiceTransition {
    /// Returns `None` for updates outside of a guild
    pub fn from_update(old: Option<&VoiceState>, new: &VoiceState) -> Option<Self> {
        Some(Self {
            guild_id: new.guild_id?,
            user_id: new.user_id,
            before: old.and_then(|state| state.channel_id),
            after: new.channel_id,
        })
    }
}

/// Handle one voice state update. Never fails: every error is logged and
/// dropped so one bad event can't take the watcher down.
pub async fn on_voice_state_update<P>(platform: &P, data: &Data, transition: VoiceTransition)
where
    P: Platform + Clone + 'static,
{
    if let Err(err) = tear_down(platform, data, &transition).await {
        log_failure(&transition, err);
    }

    if let Err(err) = handle_sentinel(platform, data, &transition).await {
        log_failure(&transition, err);
    }
}

fn log_failure(transition: &VoiceTransition, err: BotError) {
    let VoiceTransition {
        guild_id, user_id, ..
    } = transition;

    match err {
        BotError::PermissionDenied(action) => {
            error!(%guild_id, %user_id, "missing permissions to {} on voice state update", action);
        }
        err => {
            error!(%guild_id, %user_id, "unexpected error in voice state update: {:?}", err);
        }
    }
}

/// Delete the channel the member left if it is temporary and now empty
async fn tear_down(
    platform: &impl Platform,
    data: &Data,
    transition: &VoiceTransition,
) -> Result<(), BotError> {
    let Some(channel_id) = transition.before else {
        return Ok(());
    };

    if transition.after == Some(channel_id) {
        return Ok(());
    }

    // claim the record before deleting so concurrent updates for the same
    // channel delete it once
    let owner = {
        let mut state = data.state.lock().await;
        let directory = &mut state.guild(transition.guild_id).directory;

        if !directory.is_temporary(channel_id) {
            return Ok(());
        }

        match platform.voice_occupancy(transition.guild_id, channel_id) {
            Some(0) => {}
            Some(members) => {
                trace!(%channel_id, members, "temporary channel still in use");
                return Ok(());
            }
            None => {
                warn!(%channel_id, "voice occupancy unknown, not deleting");
                return Ok(());
            }
        }

        directory.remove(channel_id)
    };

    let Some(owner) = owner else {
        return Ok(());
    };

    match platform.delete_channel(channel_id).await {
        Ok(()) => {}
        Err(BotError::NotFound(_)) => {
            debug!(%channel_id, "temporary channel was already deleted");
            return Ok(());
        }
        Err(err) => {
            let restored = data
                .state
                .lock()
                .await
                .guild(transition.guild_id)
                .directory
                .record(channel_id, owner);

            if let Err(restore_err) = restored {
                warn!(%channel_id, "failed to restore temporary channel record: {}", restore_err);
            }

            return Err(err);
        }
    }

    info!(%channel_id, %owner, "temporary channel deleted after being empty");

    Ok(())
}

/// Start the setup flow when the member joined the sentinel, and cancel their
/// pending follow-up when they left it
async fn handle_sentinel<P>(
    platform: &P,
    data: &Data,
    transition: &VoiceTransition,
) -> Result<(), BotError>
where
    P: Platform + Clone + 'static,
{
    // mute/deafen updates keep the member in the same channel
    if transition.before == transition.after {
        return Ok(());
    }

    let VoiceTransition {
        guild_id, user_id, ..
    } = *transition;

    let channels = platform.channels(guild_id).await?;
    let bot_channels = BotChannels::resolve(&channels, &data.config.channels);

    let Some(sentinel) = bot_channels.sentinel else {
        return Ok(());
    };

    if transition.before != Some(sentinel) && transition.after != Some(sentinel) {
        return Ok(());
    }

    let pending = {
        let mut state = data.state.lock().await;
        let guild = state.guild(guild_id);

        if guild.directory.sentinel() != Some(sentinel) {
            guild.directory.set_sentinel(sentinel);
        }

        if transition.before == Some(sentinel) {
            let cancelled = guild.cancel_follow_ups(user_id);
            if cancelled > 0 {
                debug!(%user_id, cancelled, "member left the sentinel, cancelled follow-ups");
            }
        }

        if transition.after != Some(sentinel) {
            return Ok(());
        }

        info!(%user_id, "member joined the sentinel channel");
        guild.begin_setup(user_id, Utc::now())
    };

    let Some(setup_channel) = bot_channels.setup else {
        if let Some(pending) = pending {
            pending.follow_up.cancel();
        }
        return Err(BotError::NotBootstrapped);
    };

    let Some(pending) = pending else {
        debug!(%user_id, "member has no approved categories");
        return platform
            .send_message(setup_channel, NO_CATEGORIES_MESSAGE.to_string())
            .await;
    };

    let prompt = SetupPrompt {
        session: pending.session,
        member: user_id,
        categories: pending.categories,
    };

    if let Err(err) = platform.send_setup_prompt(setup_channel, prompt).await {
        pending.follow_up.cancel();
        return Err(err);
    }

    schedule_follow_up(
        platform.clone(),
        guild_id,
        user_id,
        pending.follow_up,
        data.config.sessions.follow_up_delay,
    );

    Ok(())
}

/// Direct message the member after `delay` unless `cancel` fires first
fn schedule_follow_up<P>(
    platform: P,
    guild_id: GuildId,
    user_id: UserId,
    cancel: CancellationToken,
    delay: Duration,
) where
    P: Platform + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {
                trace!(%user_id, "follow-up cancelled");
            }
            _ = tokio::time::sleep(delay) => {
                if let Err(err) = platform.send_follow_up(guild_id, user_id).await {
                    warn!(%user_id, "failed to send follow-up: {}", err);
                }
            }
        }
    });
}
