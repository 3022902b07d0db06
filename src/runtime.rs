// Real-time driver: runs a session or inbox against the wall clock on tokio.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex as TokioMutex};
use tokio::task::JoinHandle;

use crate::chat::{ConversationSession, Inbox};

/// Upper bound on how long the driver sleeps, so work queued from outside
/// (a message sent while idle) is picked up promptly.
const MAX_IDLE: Duration = Duration::from_millis(50);

/// Something with a timer queue that can be advanced to "now".
pub trait Ticker {
    fn tick(&mut self) -> usize;
    fn next_due(&self) -> Option<DateTime<Utc>>;
    fn now(&self) -> DateTime<Utc>;
    fn dispose(&mut self);
    fn is_disposed(&self) -> bool;
}

impl Ticker for ConversationSession {
    fn tick(&mut self) -> usize {
        ConversationSession::tick(self)
    }

    fn next_due(&self) -> Option<DateTime<Utc>> {
        ConversationSession::next_due(self)
    }

    fn now(&self) -> DateTime<Utc> {
        ConversationSession::now(self)
    }

    fn dispose(&mut self) {
        ConversationSession::dispose(self)
    }

    fn is_disposed(&self) -> bool {
        ConversationSession::is_disposed(self)
    }
}

impl Ticker for Inbox {
    fn tick(&mut self) -> usize {
        Inbox::tick(self)
    }

    fn next_due(&self) -> Option<DateTime<Utc>> {
        Inbox::next_due(self)
    }

    fn now(&self) -> DateTime<Utc> {
        Inbox::now(self)
    }

    fn dispose(&mut self) {
        Inbox::dispose(self)
    }

    fn is_disposed(&self) -> bool {
        Inbox::is_disposed(self)
    }
}

/// Owns the background task. Dropping it aborts the task; `shutdown`
/// stops it cleanly and disposes the target.
pub struct SessionDriver {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SessionDriver {
    pub fn spawn<T>(target: Arc<TokioMutex<T>>) -> Self
    where
        T: Ticker + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            info!("Session driver started");
            loop {
                let wait = {
                    let mut guard = target.lock().await;
                    if guard.is_disposed() {
                        debug!("Driver target disposed, exiting");
                        break;
                    }
                    let fired = guard.tick();
                    if fired > 0 {
                        debug!("Driver fired {} timer(s)", fired);
                    }
                    match guard.next_due() {
                        Some(due) => (due - guard.now()).to_std().unwrap_or(Duration::ZERO),
                        None => MAX_IDLE,
                    }
                };

                tokio::select! {
                    _ = &mut stop_rx => {
                        target.lock().await.dispose();
                        break;
                    }
                    _ = tokio::time::sleep(wait.min(MAX_IDLE)) => {}
                }
            }
            info!("Session driver stopped");
        });

        SessionDriver { stop_tx: Some(stop_tx), handle: Some(handle) }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    /// Stop the driver and dispose its target.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The task may already have exited after the target was disposed
            let _ = stop_tx.send(());
        }
        match self.handle.take() {
            Some(handle) => handle.await.map_err(|e| anyhow!("Session driver task failed: {}", e)),
            None => Ok(()),
        }
    }
}

impl Drop for SessionDriver {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
