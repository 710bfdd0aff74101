//! Cache of the devices currently answering a broadcast PING.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::address::DeviceAddress;
use crate::commands::Commands;
use crate::error::LinkResult;

#[derive(Default)]
struct CacheState {
    addresses: Vec<DeviceAddress>,
    next_poll: Option<Instant>,
}

/// Connected-device list, refreshed at most once per TTL unless forced.
pub struct ConnectedCache {
    commands: Commands,
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl ConnectedCache {
    pub fn new(commands: Commands, ttl: Duration) -> Self {
        Self {
            commands,
            ttl,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Connected devices, pinging them first if the cache expired or
    /// `force` is set.
    pub async fn connected(&self, force: bool) -> LinkResult<Vec<DeviceAddress>> {
        let mut state = self.state.lock().await;

        let fresh = state.next_poll.is_some_and(|t| Instant::now() < t);
        if force || !fresh {
            debug!("Updating connected cache");
            let mut addresses = self.commands.ping_addresses(None).await?;
            addresses.sort();
            addresses.dedup();
            state.addresses = addresses;
            state.next_poll = Some(Instant::now() + self.ttl);
        }

        Ok(state.addresses.clone())
    }

    /// Whether `address` answered the latest ping.
    pub async fn contains(&self, address: &DeviceAddress) -> LinkResult<bool> {
        Ok(self.connected(false).await?.contains(address))
    }

    /// Forget the cached list so the next read pings again.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.addresses.clear();
        state.next_poll = None;
    }
}
