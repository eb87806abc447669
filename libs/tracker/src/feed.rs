//! Social feed watcher.
//!
//! Polls every monitored profile for its newest post and announces posts it
//! has not seen. A rate-limit answer ends the tick and defers every further
//! upstream call until the cool-down deadline has passed.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::DateTime;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::error::FeedError;
use crate::feed_client::{FeedSource, post_url};
use crate::profile_store::ProfileStore;

/// Destination for feed notifications (a text channel on Discord).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), anyhow::Error>;
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Pause between two profiles of the same tick.
    pub profile_delay: Duration,
    /// Pause imposed after a rate-limit answer.
    pub cooldown: Duration,
    pub max_results: u8,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            profile_delay: Duration::from_secs(5),
            cooldown: Duration::from_secs(15 * 60),
            max_results: 5,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedReport {
    pub checked: usize,
    pub notified: usize,
    pub failed: usize,
    /// New posts whose announcement could not be delivered. They are not
    /// retried.
    pub send_failed: usize,
    pub rate_limited: bool,
    /// Tick skipped because a cool-down was still running.
    pub cooling_down: bool,
    pub overlapped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Check {
    Quiet,
    Announced,
    SendFailed,
}

pub struct FeedWatcher {
    store: Arc<ProfileStore>,
    source: Arc<dyn FeedSource>,
    notifier: Arc<dyn Notifier>,
    config: FeedConfig,
    last_seen: Mutex<HashMap<String, String>>,
    cooldown_until: Mutex<Option<Instant>>,
    running: tokio::sync::Mutex<()>,
}

impl FeedWatcher {
    pub fn new(
        store: Arc<ProfileStore>,
        source: Arc<dyn FeedSource>,
        notifier: Arc<dyn Notifier>,
        config: FeedConfig,
    ) -> Self {
        Self {
            store,
            source,
            notifier,
            config,
            last_seen: Mutex::new(HashMap::new()),
            cooldown_until: Mutex::new(None),
            running: tokio::sync::Mutex::new(()),
        }
    }

    pub fn last_seen(&self, username: &str) -> Option<String> {
        self.last_seen.lock().get(username).cloned()
    }

    /// Remaining cool-down, if one is active.
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        let until = (*self.cooldown_until.lock())?;
        let now = Instant::now();
        (until > now).then(|| until - now)
    }

    #[instrument(name = "feed_tick", skip(self))]
    pub async fn run_tick(&self) -> FeedReport {
        let Ok(_running) = self.running.try_lock() else {
            warn!("previous feed tick still running, skipping");
            return FeedReport {
                overlapped: true,
                ..FeedReport::default()
            };
        };

        if let Some(remaining) = self.cooldown_remaining() {
            debug!(remaining_secs = remaining.as_secs(), "feed cool-down active, skipping tick");
            return FeedReport {
                cooling_down: true,
                ..FeedReport::default()
            };
        }

        let profiles = self.store.load().await;
        debug!(profiles = profiles.len(), "starting feed tick");

        let mut report = FeedReport::default();
        for (i, username) in profiles.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.profile_delay).await;
            }

            report.checked += 1;
            match self.check_profile(username).await {
                Ok(Check::Announced) => report.notified += 1,
                Ok(Check::SendFailed) => report.send_failed += 1,
                Ok(Check::Quiet) => {}
                Err(FeedError::RateLimited { reset_at }) => {
                    let reset = reset_at
                        .and_then(|ts| DateTime::from_timestamp(ts, 0))
                        .map(|t| t.to_rfc3339());
                    warn!(
                        username = %username,
                        upstream_reset = ?reset,
                        cooldown_secs = self.config.cooldown.as_secs(),
                        "rate limited, pausing feed"
                    );
                    *self.cooldown_until.lock() = Some(Instant::now() + self.config.cooldown);
                    report.rate_limited = true;
                    break;
                }
                Err(e) => {
                    warn!(username = %username, error = %e, "feed check failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            checked = report.checked,
            notified = report.notified,
            failed = report.failed,
            send_failed = report.send_failed,
            rate_limited = report.rate_limited,
            "feed tick completed"
        );
        report
    }

    /// The newest post is marked as seen before it is announced.
    async fn check_profile(&self, username: &str) -> Result<Check, FeedError> {
        let user_id = self.source.user_id(username).await?;
        let posts = self
            .source
            .recent_posts(&user_id, self.config.max_results)
            .await?;

        let Some(latest) = posts.into_iter().next() else {
            debug!(username, "no posts");
            return Ok(Check::Quiet);
        };

        {
            let mut last_seen = self.last_seen.lock();
            if last_seen.get(username) == Some(&latest) {
                return Ok(Check::Quiet);
            }
            last_seen.insert(username.to_string(), latest.clone());
        }

        let message = format!(
            "📢 @{username} posted a new tweet!\n{}",
            post_url(username, &latest)
        );
        match self.notifier.notify(&message).await {
            Ok(()) => {
                info!(username, post_id = %latest, "announced new post");
                Ok(Check::Announced)
            }
            Err(e) => {
                warn!(username, post_id = %latest, error = ?e, "notification failed");
                Ok(Check::SendFailed)
            }
        }
    }
}
