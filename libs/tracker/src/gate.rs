use tokio::sync::watch;
use tracing::debug;

/// Startup gate opened once the chat platform connection is ready.
///
/// Cycles wait on the gate before their first tick; opening is permanent.
#[derive(Debug)]
pub struct ReadyGate {
    tx: watch::Sender<bool>,
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadyGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn open(&self) {
        if !self.tx.send_replace(true) {
            debug!("ready gate opened");
        }
    }

    pub fn is_open(&self) -> bool {
        *self.tx.borrow()
    }

    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|open| *open).await;
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;

    #[tokio::test]
    async fn wait_returns_immediately_when_open() {
        let gate = ReadyGate::new();
        gate.open();
        gate.wait().await;
        assert!(gate.is_open());
    }

    #[tokio::test]
    async fn wait_blocks_until_opened() {
        let gate = Arc::new(ReadyGate::new());
        let waiter = tokio::spawn({
            let gate = gate.clone();
            async move { gate.wait().await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        gate.open();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
