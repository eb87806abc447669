use std::sync::Arc;

use tracker::{ProfileStore, Scheduler};

pub mod command;
pub mod config;
pub mod discord;

pub struct Data {
    pub scheduler: Arc<Scheduler>,
    pub profile_store: Arc<ProfileStore>,
}

pub type Error = anyhow::Error;
pub type Context<'a> = poise::Context<'a, Data, Error>;
