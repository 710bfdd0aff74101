//! Button press aggregation.
//!
//! Several buzzers pressed at nearly the same time produce a burst of BPRS
//! notifications, each repeated by the radio. The aggregator waits for a
//! short debounce window, then resolves the burst into one batch ordered by
//! the press clock reported by each device. A single waiter consumes the
//! first press of each new batch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::PressError;
use crate::packet::{CommandName, InboundPacket};
use crate::store::CorrelationStore;

/// Default debounce window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// Coalesces press notifications into resolved batches.
pub struct PressAggregator {
    store: Arc<CorrelationStore>,
    debounce: Duration,
    /// Set while a debounce task is running
    active: AtomicBool,
    /// Most recent resolved batch, earliest press first
    last_seen: Mutex<Vec<InboundPacket>>,
    /// Bumped each time a new batch is recorded
    resolved: watch::Sender<u64>,
    /// Held by the single waiter
    waiter: tokio::sync::Mutex<()>,
}

impl PressAggregator {
    /// Create an aggregator reading press packets from `store`.
    pub fn new(store: Arc<CorrelationStore>, debounce: Duration) -> Self {
        let (resolved, _) = watch::channel(0);
        Self {
            store,
            debounce,
            active: AtomicBool::new(false),
            last_seen: Mutex::new(Vec::new()),
            resolved,
            waiter: tokio::sync::Mutex::new(()),
        }
    }

    /// Signal that a press notification arrived.
    ///
    /// Starts a debounce task unless one is already running, in which case
    /// the signal is absorbed by the running task.
    pub fn notify(self: &Arc<Self>) {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let this = self.clone();
        tokio::spawn(async move { this.aggregate().await });
        debug!("Press aggregation task started");
    }

    /// Whether a debounce task is running.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Most recent resolved batch, earliest press first.
    pub fn last_batch(&self) -> Vec<InboundPacket> {
        self.last_seen.lock().clone()
    }

    /// Wait for the next resolved batch and return its earliest press.
    ///
    /// Only batches resolved after this call starts count. `None` waits
    /// forever. Only one caller may wait at a time.
    pub async fn wait_for_next_press(
        &self,
        timeout: Option<Duration>,
    ) -> Result<InboundPacket, PressError> {
        let _waiter = self.waiter.try_lock().map_err(|_| PressError::WaiterBusy)?;

        // A fresh receiver has already seen the current batch, so earlier
        // signals cannot satisfy this wait.
        let mut resolved = self.resolved.subscribe();
        let changed = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, resolved.changed())
                .await
                .map_err(|_| PressError::Timeout)?,
            None => resolved.changed().await,
        };
        changed.map_err(|_| PressError::Empty)?;

        self.last_seen.lock().first().cloned().ok_or(PressError::Empty)
    }

    async fn aggregate(&self) {
        let store = &self.store;
        let active = &self.active;
        scopeguard::defer! {
            store.clear_by_name(CommandName::ButtonPress.as_str());
            active.store(false, Ordering::Release);
        }

        tokio::time::sleep(self.debounce).await;

        let candidates = store.query_by_name(CommandName::ButtonPress.as_str());
        let mut batch: Vec<(i64, InboundPacket)> = {
            let last_seen = self.last_seen.lock();
            candidates
                .into_iter()
                .filter(|p| !last_seen.contains(p))
                .filter_map(|p| match p.press_clock() {
                    Some(clock) => Some((clock, p)),
                    None => {
                        warn!("Dropping press with unreadable clock: {}", p);
                        None
                    }
                })
                .collect()
        };

        if batch.is_empty() {
            debug!("No new button press in burst");
            return;
        }

        batch.sort_by_key(|(clock, _)| *clock);
        let batch: Vec<InboundPacket> = batch.into_iter().map(|(_, p)| p).collect();

        info!(
            presses = batch.len(),
            first = batch[0].field(0).unwrap_or("?"),
            "Button press resolved"
        );

        *self.last_seen.lock() = batch;
        self.resolved.send_modify(|n| *n = n.wrapping_add(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Arc<CorrelationStore>, Arc<PressAggregator>) {
        let store = Arc::new(CorrelationStore::default());
        let presses = Arc::new(PressAggregator::new(store.clone(), DEFAULT_DEBOUNCE));
        (store, presses)
    }

    fn press(store: &CorrelationStore, presses: &Arc<PressAggregator>, raw: &[u8]) {
        store.insert(InboundPacket::parse(raw).unwrap());
        presses.notify();
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_ordered_by_press_clock() {
        let (store, presses) = setup();
        let waiter = {
            let presses = presses.clone();
            tokio::spawn(async move { presses.wait_for_next_press(None).await })
        };
        tokio::task::yield_now().await;

        press(&store, &presses, b"\x01BPRS 00:00:00:00:00:01 5");
        press(&store, &presses, b"\x02BPRS 00:00:00:00:00:02 2");
        press(&store, &presses, b"\x03BPRS 00:00:00:00:00:03 9");

        let first = waiter.await.unwrap().unwrap();
        assert_eq!(first.press_clock(), Some(2));

        let clocks: Vec<_> = presses
            .last_batch()
            .iter()
            .map(|p| p.press_clock().unwrap())
            .collect();
        assert_eq!(clocks, vec![2, 5, 9]);
        assert!(store.query_by_name("BPRS").is_empty());
        assert!(!presses.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_leaves_aggregator_usable() {
        let (store, presses) = setup();
        let err = presses
            .wait_for_next_press(Some(Duration::from_millis(500)))
            .await
            .unwrap_err();
        assert_eq!(err, PressError::Timeout);

        press(&store, &presses, b"\x01BPRS 00:00:00:00:00:01 5");
        tokio::time::sleep(Duration::from_millis(200)).await;

        // The batch resolved before the wait started, so it does not count
        let err = presses
            .wait_for_next_press(Some(Duration::from_millis(500)))
            .await
            .unwrap_err();
        assert_eq!(err, PressError::Timeout);
        assert_eq!(presses.last_batch().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_waiter_is_rejected() {
        let (_store, presses) = setup();
        let first = {
            let presses = presses.clone();
            tokio::spawn(async move {
                presses
                    .wait_for_next_press(Some(Duration::from_secs(1)))
                    .await
            })
        };
        tokio::task::yield_now().await;

        let err = presses.wait_for_next_press(None).await.unwrap_err();
        assert_eq!(err, PressError::WaiterBusy);
        assert_eq!(first.await.unwrap().unwrap_err(), PressError::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_clock_is_dropped() {
        let (store, presses) = setup();
        press(&store, &presses, b"\x01BPRS 00:00:00:00:00:01 soon");
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(presses.last_batch().is_empty());
        assert!(store.query_by_name("BPRS").is_empty());
        assert!(!presses.is_active());
    }
}
