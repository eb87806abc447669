use anyhow::anyhow;
use poise::CreateReply;
use tracing::{info, warn};
use tracker::EntityKey;

use super::choice::{Asset, Quote};
use crate::discord::create_display_slot;
use crate::{Context, Error};

const GAS_PLACEHOLDER: &str = "⛽ Gwei: Carregando...";

#[poise::command(slash_command, guild_only)]
pub async fn add_token(
    ctx: Context<'_>,
    #[description = "Token to track"] token: Asset,
    #[description = "Quote currency"] currency: Quote,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let guild_id = ctx.guild_id().ok_or_else(|| anyhow!("Use this command in a server."))?;
    let user_id = ctx.author().id.get();
    info!(
        "add_token: invoked user_id={} token={} currency={}",
        user_id,
        token.as_str(),
        currency.as_str()
    );

    let placeholder = format!("{}-{}-loading", token.as_str(), currency.as_str());
    let slot = create_display_slot(ctx.serenity_context(), guild_id, &placeholder).await?;

    let key = EntityKey::spot(token.as_str(), currency.as_str());
    let content = match ctx.data().scheduler.track_spot(key, slot).await {
        Some(rendered) => format!(
            "✅ Token {}/{} added: {}",
            token.as_str(),
            currency.as_str(),
            rendered.label
        ),
        None => {
            warn!(
                "add_token: first price unavailable user_id={} token={} currency={}",
                user_id,
                token.as_str(),
                currency.as_str()
            );
            format!(
                "✅ Token {}/{} added. The price will show up on the next update.",
                token.as_str(),
                currency.as_str()
            )
        }
    };

    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

#[poise::command(slash_command, guild_only)]
pub async fn add_gas(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let guild_id = ctx.guild_id().ok_or_else(|| anyhow!("Use this command in a server."))?;
    info!("add_gas: invoked user_id={}", ctx.author().id.get());

    let slot = create_display_slot(ctx.serenity_context(), guild_id, GAS_PLACEHOLDER).await?;

    let content = match ctx.data().scheduler.track_gas(slot).await {
        Some(rendered) => format!("✅ Gwei channel added: {}", rendered.label),
        None => "✅ Gwei channel added. The fee will show up on the next update.".to_string(),
    };

    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}
