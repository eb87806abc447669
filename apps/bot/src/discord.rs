//! Discord-backed implementations of the tracker's platform traits.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{
    ChannelId, ChannelType, CreateChannel, CreateMessage, EditChannel, GuildId, Http,
    PermissionOverwrite, PermissionOverwriteType, Permissions, RoleId,
};
use serenity::http::HttpError;
use tracing::{debug, info};
use tracker::{Notifier, SlotDirectory, SlotError, SlotId};

use crate::Error;

/// Voice channels used as display slots.
pub struct DiscordSlots {
    http: Arc<Http>,
}

impl DiscordSlots {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SlotDirectory for DiscordSlots {
    async fn resolve(&self, slot: SlotId) -> Result<(), SlotError> {
        ChannelId::new(slot.get())
            .to_channel(&self.http)
            .await
            .map(|_| ())
            .map_err(slot_error)
    }

    async fn rename(&self, slot: SlotId, name: &str) -> Result<(), SlotError> {
        ChannelId::new(slot.get())
            .edit(&self.http, EditChannel::new().name(name))
            .await
            .map(|_| ())
            .map_err(slot_error)
    }
}

fn slot_error(err: serenity::Error) -> SlotError {
    if let serenity::Error::Http(HttpError::UnsuccessfulRequest(res)) = &err {
        if let Some(mapped) = slot_error_for_status(res.status_code.as_u16()) {
            return mapped;
        }
    }
    SlotError::Other(err.to_string())
}

/// Only `NotFound` makes the scheduler forget an entity.
fn slot_error_for_status(status: u16) -> Option<SlotError> {
    match status {
        404 => Some(SlotError::NotFound),
        403 => Some(SlotError::Forbidden),
        429 => Some(SlotError::RateLimited),
        _ => None,
    }
}

/// Text channel receiving feed notifications.
pub struct ChannelNotifier {
    http: Arc<Http>,
    channel: ChannelId,
}

impl ChannelNotifier {
    pub fn new(http: Arc<Http>, channel: ChannelId) -> Self {
        Self { http, channel }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, message: &str) -> Result<(), Error> {
        self.channel
            .send_message(&self.http, CreateMessage::new().content(message))
            .await?;
        Ok(())
    }
}

/// Create a voice channel members cannot join, that the bot may rename.
pub async fn create_display_slot(
    ctx: &serenity::all::Context,
    guild_id: GuildId,
    name: &str,
) -> Result<SlotId, Error> {
    let bot_id = ctx.cache.current_user().id;

    let overwrites = vec![
        PermissionOverwrite {
            allow: Permissions::empty(),
            deny: Permissions::CONNECT,
            kind: PermissionOverwriteType::Role(RoleId::new(guild_id.get())),
        },
        PermissionOverwrite {
            allow: Permissions::MANAGE_CHANNELS
                | Permissions::VIEW_CHANNEL
                | Permissions::CONNECT
                | Permissions::SPEAK,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Member(bot_id),
        },
    ];

    let channel = guild_id
        .create_channel(
            ctx,
            CreateChannel::new(name)
                .kind(ChannelType::Voice)
                .permissions(overwrites),
        )
        .await?;

    info!(guild_id = %guild_id, channel_id = %channel.id, name, "created display slot");
    Ok(SlotId(channel.id.get()))
}

/// Delete a display slot. A slot that is already gone counts as deleted.
pub async fn delete_display_slot(ctx: &serenity::all::Context, slot: SlotId) -> Result<(), Error> {
    match ChannelId::new(slot.get()).delete(ctx).await {
        Ok(_) => Ok(()),
        Err(e) => match slot_error(e) {
            SlotError::NotFound => {
                debug!(slot = %slot, "display slot already deleted");
                Ok(())
            }
            other => Err(other.into()),
        },
    }
}
