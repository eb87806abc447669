use poise::CreateReply;
use tracing::{info, warn};
use tracker::{EntityKey, SlotId};

use super::choice::{Asset, Quote};
use crate::discord::delete_display_slot;
use crate::{Context, Error};

#[poise::command(slash_command, guild_only)]
pub async fn remove_token(
    ctx: Context<'_>,
    #[description = "Tracked token"] token: Asset,
    #[description = "Quote currency"] currency: Quote,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let key = EntityKey::spot(token.as_str(), currency.as_str());
    let content = match ctx.data().scheduler.untrack(&key) {
        Some(slot) => {
            drop_slot(ctx, slot).await;
            format!("✅ Token {} removed.", key)
        }
        None => format!("Token {} is not being tracked.", key),
    };

    info!(
        "remove_token: completed user_id={} entity={}",
        ctx.author().id.get(),
        key
    );
    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

#[poise::command(slash_command, guild_only)]
pub async fn remove_gas(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let content = match ctx.data().scheduler.untrack(&EntityKey::network_fee()) {
        Some(slot) => {
            drop_slot(ctx, slot).await;
            "✅ Gwei channel removed.".to_string()
        }
        None => "No Gwei channel is being tracked.".to_string(),
    };

    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

/// The entity is already untracked; a leftover channel only loses its updates.
async fn drop_slot(ctx: Context<'_>, slot: SlotId) {
    if let Err(e) = delete_display_slot(ctx.serenity_context(), slot).await {
        warn!("delete display slot failed slot={} err={:?}", slot, e);
    }
}
