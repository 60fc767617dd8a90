//! Polls an asset while its thumbnail is being produced.

use api_client::{Asset, DamBackend};
use preview::{resolve, ThumbnailState};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Give up after this many fetches. `None` polls until a terminal state.
    pub max_polls: Option<u32>,
}

impl PollConfig {
    pub fn new(interval: Duration, max_polls: Option<u32>) -> Self {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
            max_polls: max_polls.filter(|n| *n > 0),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A terminal state was observed.
    Settled(ThumbnailState),
    /// `max_polls` fetches went by without reaching a terminal state.
    Exhausted,
    Cancelled,
}

type UpdateFn = Box<dyn FnMut(Asset) + Send>;
type UpdateSlot = Arc<Mutex<Option<UpdateFn>>>;

/// Owner of a running poll. Dropping it cancels the poll.
pub struct PollHandle {
    asset_id: String,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<PollOutcome>>,
    slot: UpdateSlot,
    settled: Option<PollOutcome>,
}

impl PollHandle {
    fn finished_with(asset_id: String, outcome: PollOutcome) -> Self {
        Self {
            asset_id,
            shutdown: None,
            task: None,
            slot: Arc::new(Mutex::new(None)),
            settled: Some(outcome),
        }
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    /// Stop polling. Once this returns the update callback never runs again,
    /// and a fetch still in flight is dropped.
    pub fn cancel(&mut self) {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_active(&self) -> bool {
        let running = self.task.as_ref().map_or(false, |t| !t.is_finished());
        running && self.slot.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Wait for the poll to end and report why it ended.
    pub async fn finished(mut self) -> PollOutcome {
        match self.task.take() {
            Some(task) => task.await.unwrap_or(PollOutcome::Cancelled),
            None => self.settled.unwrap_or(PollOutcome::Cancelled),
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for PollHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollHandle")
            .field("asset_id", &self.asset_id)
            .field("active", &self.is_active())
            .finish()
    }
}

pub struct PollController;

impl PollController {
    /// Poll `initial.id` every `config.interval` until its thumbnail settles.
    ///
    /// Nothing is fetched when `initial` already resolves to a terminal
    /// state. Ticks are strictly sequential: the next sleep starts only after
    /// the previous fetch returned. Fetch errors are logged and skipped.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(backend, initial, on_update), fields(asset = %initial.id)))]
    pub fn start<F>(
        backend: Arc<dyn DamBackend>,
        initial: &Asset,
        ui_retry_count: u32,
        config: PollConfig,
        on_update: F,
    ) -> PollHandle
    where
        F: FnMut(Asset) + Send + 'static,
    {
        let asset_id = initial.id.clone();
        let resolved = resolve(initial, ui_retry_count);
        if resolved.is_terminal() {
            tracing::debug!(asset = %asset_id, state = %resolved.state, "thumbnail already settled, not polling");
            return PollHandle::finished_with(asset_id, PollOutcome::Settled(resolved.state));
        }

        let slot: UpdateSlot = Arc::new(Mutex::new(Some(Box::new(on_update))));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let task_slot = slot.clone();
        let task_id = asset_id.clone();
        let task = tokio::spawn(async move {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    tracing::debug!(asset = %task_id, "thumbnail poll cancelled");
                    PollOutcome::Cancelled
                }
                outcome = poll_loop(backend, task_id.clone(), ui_retry_count, config, task_slot) => outcome,
            }
        });

        PollHandle {
            asset_id,
            shutdown: Some(shutdown_tx),
            task: Some(task),
            slot,
            settled: None,
        }
    }
}

async fn poll_loop(
    backend: Arc<dyn DamBackend>,
    asset_id: String,
    ui_retry_count: u32,
    config: PollConfig,
    slot: UpdateSlot,
) -> PollOutcome {
    let mut polls = 0u32;
    loop {
        if config.max_polls.map_or(false, |max| polls >= max) {
            tracing::info!(asset = %asset_id, polls, "giving up on thumbnail poll");
            return PollOutcome::Exhausted;
        }
        sleep(config.interval).await;
        polls += 1;

        let asset = match backend.get_asset(&asset_id).await {
            Ok(asset) => asset,
            Err(e) => {
                tracing::warn!(asset = %asset_id, error = %e, "thumbnail poll failed");
                continue;
            }
        };
        let resolved = resolve(&asset, ui_retry_count);
        {
            let mut guard = slot.lock().unwrap_or_else(|e| e.into_inner());
            match guard.as_mut() {
                Some(on_update) => on_update(asset),
                None => return PollOutcome::Cancelled,
            }
        }
        if resolved.is_terminal() {
            tracing::debug!(asset = %asset_id, state = %resolved.state, polls, "thumbnail settled");
            return PollOutcome::Settled(resolved.state);
        }
    }
}
