//! Correlation store for received packets.
//!
//! Holds recently received packets so a caller can find out whether a given
//! command has been answered. Entries older than the horizon are evicted
//! before every query and are never returned.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::packet::{CommandName, InboundPacket};

/// Default retention of received packets.
pub const DEFAULT_HORIZON: Duration = Duration::from_secs(60);

#[derive(Default)]
struct StoreInner {
    /// Packets in insertion order
    entries: VecDeque<InboundPacket>,
    /// Raw bytes of every stored packet, for idempotent inserts
    seen: HashSet<Vec<u8>>,
}

impl StoreInner {
    fn evict(&mut self, now: Instant, horizon: Duration) {
        let seen = &mut self.seen;
        self.entries.retain(|p| {
            let keep = now.saturating_duration_since(p.arrival) <= horizon;
            if !keep {
                seen.remove(&p.raw);
            }
            keep
        });
    }

    fn matching(&self, pred: impl Fn(&InboundPacket) -> bool) -> Vec<InboundPacket> {
        self.entries.iter().filter(|p| pred(p)).cloned().collect()
    }
}

/// Time-bounded index of received packets, keyed by (command id, command name).
pub struct CorrelationStore {
    inner: Mutex<StoreInner>,
    horizon: Duration,
    /// Bumped on every successful insert
    inserted: watch::Sender<u64>,
}

impl CorrelationStore {
    /// Create a store with the given retention horizon.
    pub fn new(horizon: Duration) -> Self {
        let (inserted, _) = watch::channel(0);
        Self {
            inner: Mutex::new(StoreInner::default()),
            horizon,
            inserted,
        }
    }

    /// Retention horizon.
    pub fn horizon(&self) -> Duration {
        self.horizon
    }

    /// Insert a packet. Returns `false` if a packet with the same raw bytes
    /// is already stored.
    pub fn insert(&self, packet: InboundPacket) -> bool {
        let inserted = {
            let mut inner = self.inner.lock();
            inner.evict(Instant::now(), self.horizon);
            if inner.seen.insert(packet.raw.clone()) {
                inner.entries.push_back(packet);
                true
            } else {
                false
            }
        };

        if inserted {
            self.inserted.send_modify(|n| *n = n.wrapping_add(1));
        }
        inserted
    }

    /// All stored packets with the given command name.
    pub fn query_by_name(&self, name: &str) -> Vec<InboundPacket> {
        self.query(|p| p.command_name == name)
    }

    /// All stored packets with the given command id.
    pub fn query_by_id(&self, command_id: u8) -> Vec<InboundPacket> {
        self.query(|p| p.command_id == command_id)
    }

    /// All stored packets answering the given command.
    pub fn query_by_id_and_name(&self, command_id: u8, name: &str) -> Vec<InboundPacket> {
        self.query(|p| p.command_id == command_id && p.command_name == name)
    }

    /// Delete every packet with the given command name.
    pub fn clear_by_name(&self, name: &str) -> usize {
        let mut inner = self.inner.lock();
        inner.evict(Instant::now(), self.horizon);

        let before = inner.entries.len();
        let StoreInner { entries, seen } = &mut *inner;
        entries.retain(|p| {
            let keep = p.command_name != name;
            if !keep {
                seen.remove(&p.raw);
            }
            keep
        });
        before - inner.entries.len()
    }

    /// Number of packets currently queryable.
    pub fn len(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.evict(Instant::now(), self.horizon);
        inner.entries.len()
    }

    /// Whether no packet is currently queryable.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until the command `(command_id, name)` has at least one reply.
    ///
    /// In broadcast mode the full timeout always elapses, since an early
    /// reply does not mean every device has answered. Otherwise the wait
    /// ends as soon as a matching packet is inserted. Returns whether a
    /// match exists when the wait ends.
    pub async fn wait_for_at_least_one(
        &self,
        command_id: u8,
        name: CommandName,
        timeout: Duration,
        broadcast: bool,
    ) -> bool {
        let name = name.as_str();

        if broadcast {
            tokio::time::sleep(timeout).await;
            return !self.query_by_id_and_name(command_id, name).is_empty();
        }

        let deadline = Instant::now() + timeout;
        let mut inserted = self.inserted.subscribe();
        loop {
            if !self.query_by_id_and_name(command_id, name).is_empty() {
                return true;
            }
            match tokio::time::timeout_at(deadline, inserted.changed()).await {
                Ok(Ok(())) => continue,
                Ok(Err(_)) | Err(_) => {
                    return !self.query_by_id_and_name(command_id, name).is_empty();
                }
            }
        }
    }

    fn query(&self, pred: impl Fn(&InboundPacket) -> bool) -> Vec<InboundPacket> {
        let mut inner = self.inner.lock();
        inner.evict(Instant::now(), self.horizon);
        inner.matching(pred)
    }
}

impl Default for CorrelationStore {
    fn default() -> Self {
        Self::new(DEFAULT_HORIZON)
    }
}
