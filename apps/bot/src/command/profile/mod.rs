mod add;
mod list;
mod remove;

use crate::{Context, Error};
use add::add;
use list::list;
use remove::remove;

#[poise::command(
    slash_command,
    rename = "twitter",
    subcommands("add", "list", "remove")
)]
pub async fn profile_command(_: Context<'_>) -> Result<(), Error> {
    Ok(())
}
