//! Connectivity monitor
//!
//! The single source of truth for whether the client is online. Platform
//! adapters (a health probe, OS network callbacks) feed [`PlatformSignal`]s
//! in; everything else reads [`ConnectivityMonitor::current`] or subscribes
//! to transitions.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use crate::time::{Clock, SystemClock};

const TRANSITION_CHANNEL_CAPACITY: usize = 64;

/// Coarse link quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionQuality {
    Good,
    Poor,
    Offline,
}

/// Online flag plus quality; `quality == Offline` exactly when offline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityState {
    is_online: bool,
    quality: ConnectionQuality,
}

impl ConnectivityState {
    /// Online with the given link quality
    ///
    /// `Offline` quality is not a valid online state and is promoted to
    /// `Poor`.
    pub const fn online(quality: ConnectionQuality) -> Self {
        let quality = match quality {
            ConnectionQuality::Offline => ConnectionQuality::Poor,
            other => other,
        };
        Self { is_online: true, quality }
    }

    pub const fn offline() -> Self {
        Self { is_online: false, quality: ConnectionQuality::Offline }
    }

    pub const fn is_online(&self) -> bool {
        self.is_online
    }

    pub const fn quality(&self) -> ConnectionQuality {
        self.quality
    }
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self::online(ConnectionQuality::Good)
    }
}

/// Link class reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkClass {
    Slow2g,
    TwoG,
    ThreeG,
    FourG,
    Wifi,
    Ethernet,
    #[default]
    Unknown,
}

impl LinkClass {
    /// Links too slow for comfortable use
    pub const fn is_low_bandwidth(self) -> bool {
        matches!(self, Self::Slow2g | Self::TwoG)
    }
}

/// Raw connectivity event from the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformSignal {
    Online,
    Offline,
    LinkChanged(LinkClass),
}

/// A change in reported connectivity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityTransition {
    pub previous: ConnectivityState,
    pub current: ConnectivityState,
    /// Milliseconds since the UNIX epoch
    pub at: u64,
}

impl ConnectivityTransition {
    /// Offline to online, the edge that triggers a queue drain
    pub const fn came_online(&self) -> bool {
        !self.previous.is_online && self.current.is_online
    }

    pub const fn went_offline(&self) -> bool {
        self.previous.is_online && !self.current.is_online
    }
}

#[derive(Debug)]
struct MonitorInner {
    online: bool,
    link: LinkClass,
}

impl MonitorInner {
    fn state(&self) -> ConnectivityState {
        if !self.online {
            ConnectivityState::offline()
        } else if self.link.is_low_bandwidth() {
            ConnectivityState::online(ConnectionQuality::Poor)
        } else {
            ConnectivityState::online(ConnectionQuality::Good)
        }
    }
}

/// Tracks connectivity and fans out transitions
pub struct ConnectivityMonitor {
    inner: Mutex<MonitorInner>,
    state_tx: watch::Sender<ConnectivityState>,
    transitions: broadcast::Sender<ConnectivityTransition>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityMonitor").field("state", &self.current()).finish_non_exhaustive()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivityMonitor {
    /// Create a monitor with the given initial online flag
    pub fn new(online: bool) -> Self {
        Self::with_clock(online, Arc::new(SystemClock))
    }

    pub fn with_clock(online: bool, clock: Arc<dyn Clock>) -> Self {
        let inner = MonitorInner { online, link: LinkClass::Unknown };
        let (state_tx, _) = watch::channel(inner.state());
        let (transitions, _) = broadcast::channel(TRANSITION_CHANNEL_CAPACITY);
        Self { inner: Mutex::new(inner), state_tx, transitions, clock }
    }

    pub fn current(&self) -> ConnectivityState {
        self.inner.lock().state()
    }

    pub fn is_online(&self) -> bool {
        self.inner.lock().online
    }

    /// Fold a platform signal into the state
    ///
    /// Returns the transition when the state actually changed.
    pub fn report(&self, signal: PlatformSignal) -> Option<ConnectivityTransition> {
        let mut inner = self.inner.lock();
        let previous = inner.state();

        match signal {
            PlatformSignal::Online => inner.online = true,
            PlatformSignal::Offline => inner.online = false,
            PlatformSignal::LinkChanged(link) => inner.link = link,
        }

        let current = inner.state();
        if current == previous {
            debug!(?signal, "connectivity signal did not change state");
            return None;
        }

        let transition =
            ConnectivityTransition { previous, current, at: self.clock.millis_since_epoch() };
        self.state_tx.send_replace(current);
        // No receivers is fine: nobody is listening yet.
        let _ = self.transitions.send(transition);
        drop(inner);

        info!(
            online = current.is_online(),
            quality = ?current.quality(),
            previous_online = previous.is_online(),
            "connectivity_transition"
        );
        Some(transition)
    }

    /// Shorthand for reporting `Online`/`Offline`
    pub fn set_online(&self, online: bool) -> Option<ConnectivityTransition> {
        self.report(if online { PlatformSignal::Online } else { PlatformSignal::Offline })
    }

    /// Receive every transition from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityTransition> {
        self.transitions.subscribe()
    }

    /// Receive the latest state
    pub fn watch(&self) -> watch::Receiver<ConnectivityState> {
        self.state_tx.subscribe()
    }
}
