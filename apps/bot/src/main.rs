use std::{sync::Arc, time::Duration};

use anyhow::{Context as _, Result};
use bot::{
    Data,
    command::{
        profile::profile_command,
        token::{add_gas, add_token, remove_gas, remove_token},
    },
    config::Config,
    discord::{ChannelNotifier, DiscordSlots},
};
use poise::{Framework, FrameworkOptions};
use serenity::all::{ActivityData, ChannelId, ClientBuilder, GatewayIntents, Http};
use tokio_cron_scheduler::JobScheduler;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracker::{
    BinanceClient, EtherscanClient, FeedConfig, FeedWatcher, ProfileStore, ReadyGate, Registry,
    Scheduler, TwitterClient,
};

mod cycles;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let http = Arc::new(Http::new(&config.discord_token));
    let registry = Arc::new(Registry::new());
    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&registry),
        Arc::new(DiscordSlots::new(Arc::clone(&http))),
        Arc::new(
            BinanceClient::new(config.binance_api_url.clone())
                .context("init price client failed")?,
        ),
        Arc::new(
            EtherscanClient::new(
                config.etherscan_api_url.clone(),
                config.etherscan_api_key.clone(),
            )
            .context("init gas client failed")?,
        ),
    ));
    let profile_store = Arc::new(ProfileStore::new(config.profiles_path.clone()));
    let gate = Arc::new(ReadyGate::new());

    let intents = GatewayIntents::non_privileged();
    let commands = vec![
        add_token(),
        add_gas(),
        remove_token(),
        remove_gas(),
        profile_command(),
    ];

    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands,
            ..Default::default()
        })
        .setup({
            let scheduler = Arc::clone(&scheduler);
            let profile_store = Arc::clone(&profile_store);
            let gate = Arc::clone(&gate);
            let config = config.clone();

            move |ctx, ready, framework| {
                let scheduler = Arc::clone(&scheduler);
                let profile_store = Arc::clone(&profile_store);
                let gate = Arc::clone(&gate);
                let config = config.clone();

                Box::pin(async move {
                    info!(
                        "{} [{}] connected successfully!",
                        ready.user.name, ready.user.id
                    );

                    poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                    gate.open();

                    let ctx_clone = ctx.clone();
                    let registry = Arc::clone(scheduler.registry());
                    tokio::spawn(async move {
                        let mut show_version = true;
                        let mut tick = tokio::time::interval(Duration::from_secs(30));

                        loop {
                            tick.tick().await;

                            let text = if show_version {
                                if config.version.starts_with('v') {
                                    config.version.clone()
                                } else {
                                    format!("Version - {}", config.version)
                                }
                            } else {
                                let now = chrono::Local::now();
                                format!(
                                    "Tracking {} feeds - {}",
                                    registry.len(),
                                    now.format("%H:%M")
                                )
                            };

                            ctx_clone.set_activity(Some(ActivityData::custom(text)));
                            show_version = !show_version;
                        }
                    });

                    Ok(Data {
                        scheduler,
                        profile_store,
                    })
                })
            }
        })
        .build();

    let mut client = ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await
        .context("creating discord client failed")?;

    let mut sched = JobScheduler::new()
        .await
        .context("failed to create job scheduler")?;

    cycles::add_price_cycle(
        &sched,
        config.price_interval,
        Arc::clone(&gate),
        Arc::clone(&scheduler),
    )
    .await?;
    cycles::add_gas_cycle(
        &sched,
        config.gas_interval,
        Arc::clone(&gate),
        Arc::clone(&scheduler),
    )
    .await?;

    match &config.twitter_bearer_token {
        Some(token) => {
            let watcher = Arc::new(FeedWatcher::new(
                Arc::clone(&profile_store),
                Arc::new(
                    TwitterClient::new(config.twitter_api_url.clone(), token)
                        .context("init twitter client failed")?,
                ),
                Arc::new(ChannelNotifier::new(
                    Arc::clone(&http),
                    ChannelId::new(config.feed_channel_id),
                )),
                FeedConfig::default(),
            ));
            cycles::add_feed_cycle(&sched, config.feed_interval, Arc::clone(&gate), watcher)
                .await?;
        }
        None => warn!("TWITTER_BEARER_TOKEN not set, feed watcher disabled"),
    }

    sched.start().await?;

    // A bad token ends `start` with an error; that is fatal.
    tokio::select! {
        res = client.start() => res.context("discord client stopped")?,
        res = shutdown_signal() => res?,
    }

    sched.shutdown().await?;
    info!("Shutdown complete.");
    Ok(())
}

async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::{
            select,
            signal::unix::{SignalKind, signal},
        };
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv()  => {},
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
