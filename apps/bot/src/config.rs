use std::{env::var, str::FromStr, time::Duration};

use anyhow::{Context, Result};

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub version: String,
    pub feed_channel_id: u64,
    pub etherscan_api_key: String,
    pub twitter_bearer_token: Option<String>,
    pub profiles_path: String,
    pub binance_api_url: String,
    pub etherscan_api_url: String,
    pub twitter_api_url: String,
    pub price_interval: Duration,
    pub gas_interval: Duration,
    pub feed_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let feed_channel_id: u64 = parsed("FEED_CHANNEL_ID", None)?;
        anyhow::ensure!(feed_channel_id != 0, "FEED_CHANNEL_ID must not be 0");

        Ok(Self {
            discord_token: required("DISCORD_BOT_TOKEN")?,
            version: var("APP_VERSION").unwrap_or_else(|_| "Unknown".to_string()),
            feed_channel_id,
            etherscan_api_key: required("ETHERSCAN_API_KEY")?,
            twitter_bearer_token: var("TWITTER_BEARER_TOKEN").ok().filter(|t| !t.is_empty()),
            profiles_path: or_default("PROFILES_PATH", "profiles.json"),
            binance_api_url: or_default("BINANCE_API_URL", "https://api.binance.com"),
            etherscan_api_url: or_default("ETHERSCAN_API_URL", "https://api.etherscan.io/v2/api"),
            twitter_api_url: or_default("TWITTER_API_URL", "https://api.twitter.com"),
            price_interval: Duration::from_secs(parsed("PRICE_INTERVAL_SECS", Some(320))?),
            gas_interval: Duration::from_secs(parsed("GAS_INTERVAL_SECS", Some(350))?),
            feed_interval: Duration::from_secs(parsed("FEED_INTERVAL_SECS", Some(180))?),
        })
    }
}

fn required(name: &str) -> Result<String> {
    var(name).with_context(|| format!("{name} not set"))
}

fn or_default(name: &str, default: &str) -> String {
    var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed<T>(name: &str, default: Option<T>) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match (var(name), default) {
        (Ok(raw), _) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} is not a valid number: {raw}")),
        (Err(_), Some(default)) => Ok(default),
        (Err(_), None) => anyhow::bail!("{name} not set"),
    }
}
