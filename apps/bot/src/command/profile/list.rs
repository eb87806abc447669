use poise::CreateReply;

use crate::{Context, Error};

#[poise::command(slash_command)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let profiles = ctx.data().profile_store.load().await;

    let content = if profiles.is_empty() {
        "No profile is being monitored.".to_string()
    } else {
        let lines: Vec<String> = profiles.iter().map(|p| format!("- @{p}")).collect();
        format!("👀 Monitored profiles:\n{}", lines.join("\n"))
    };

    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}
