use poise::CreateReply;
use tracing::info;

use crate::{Context, Error};

#[poise::command(slash_command)]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Twitter username (without @)"] username: String,
) -> Result<(), Error> {
    let username = username.trim().trim_start_matches('@').to_string();

    let removed = ctx.data().profile_store.remove(&username).await?;
    info!(
        "twitter remove: completed user_id={} username={} removed={}",
        ctx.author().id.get(),
        username,
        removed
    );

    let content = if removed {
        format!("✅ Profile @{} removed.", username)
    } else {
        format!("Profile @{} is not being monitored.", username)
    };

    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}
