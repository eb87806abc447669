use poise::CreateReply;
use tracing::{debug, info};

use crate::{Context, Error};

#[poise::command(slash_command)]
pub async fn add(
    ctx: Context<'_>,
    #[description = "Twitter username (without @)"] username: String,
) -> Result<(), Error> {
    let user_id = ctx.author().id.get();
    let username = username.trim().trim_start_matches('@').to_string();
    info!("twitter add: invoked user_id={} username={}", user_id, username);

    if username.is_empty() {
        ctx.send(
            CreateReply::default()
                .content("No valid username provided.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let content = if ctx.data().profile_store.add(&username).await? {
        debug!("twitter add: added user_id={} username={}", user_id, username);
        format!("✅ Profile @{} is now monitored.", username)
    } else {
        debug!("twitter add: already_monitored user_id={} username={}", user_id, username);
        format!("Profile @{} is already monitored!", username)
    };

    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}
