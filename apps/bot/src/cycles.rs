use std::{future::Future, sync::Arc, time::Duration};

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info_span};
use tracing_futures::Instrument;
use tracker::{FeedWatcher, ReadyGate, Scheduler};

/// Register `run` as a repeated job that never starts before the gate opens.
/// The first run happens as soon as the gate opens, not one interval later.
async fn add_cycle<F, Fut>(
    sched: &JobScheduler,
    name: &'static str,
    every: Duration,
    gate: Arc<ReadyGate>,
    run: F,
) -> Result<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let run = Arc::new(run);
    let first = Arc::clone(&run);
    let first_gate = Arc::clone(&gate);

    sched
        .add(Job::new_repeated_async(every, move |_uuid, _l| {
            let gate = Arc::clone(&gate);
            let run = Arc::clone(&run);

            Box::pin(
                async move {
                    if !gate.is_open() {
                        debug!("waiting for gateway ready");
                        gate.wait().await;
                    }
                    run().await;
                }
                .instrument(info_span!("cycle", name)),
            )
        })?)
        .await?;

    spawn_first_run(name, first_gate, first);
    debug!(name, every_secs = every.as_secs(), "cycle registered");
    Ok(())
}

fn spawn_first_run<F, Fut>(
    name: &'static str,
    gate: Arc<ReadyGate>,
    run: Arc<F>,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(
        async move {
            gate.wait().await;
            run().await;
        }
        .instrument(info_span!("cycle", name, first_run = true)),
    )
}

pub async fn add_price_cycle(
    sched: &JobScheduler,
    every: Duration,
    gate: Arc<ReadyGate>,
    scheduler: Arc<Scheduler>,
) -> Result<()> {
    add_cycle(sched, "price", every, gate, move || {
        let scheduler = Arc::clone(&scheduler);
        async move {
            scheduler.run_price_tick().await;
        }
    })
    .await
}

pub async fn add_gas_cycle(
    sched: &JobScheduler,
    every: Duration,
    gate: Arc<ReadyGate>,
    scheduler: Arc<Scheduler>,
) -> Result<()> {
    add_cycle(sched, "gas", every, gate, move || {
        let scheduler = Arc::clone(&scheduler);
        async move {
            scheduler.run_gas_tick().await;
        }
    })
    .await
}

pub async fn add_feed_cycle(
    sched: &JobScheduler,
    every: Duration,
    gate: Arc<ReadyGate>,
    watcher: Arc<FeedWatcher>,
) -> Result<()> {
    add_cycle(sched, "feed", every, gate, move || {
        let watcher = Arc::clone(&watcher);
        async move {
            watcher.run_tick().await;
        }
    })
    .await
}
