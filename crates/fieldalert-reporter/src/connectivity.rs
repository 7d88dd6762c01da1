//! Network reachability observation.
//!
//! A screen registers for the whole of its lifetime and holds the returned
//! [`ConnectivityRegistration`]; dropping it unregisters on every exit path.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;
use tracing::{debug, info};

/// Reachability of the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Online => "online",
            Self::Offline => "offline",
        })
    }
}

/// Publishes connectivity changes to registered listeners.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    tx: watch::Sender<Connectivity>,
    listeners: Arc<AtomicUsize>,
}

impl ConnectivityMonitor {
    pub fn new(initial: Connectivity) -> Self {
        let (tx, _) = watch::channel(initial);
        Self {
            tx,
            listeners: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn current(&self) -> Connectivity {
        *self.tx.borrow()
    }

    /// Publish a new state. Returns `true` if it differs from the last one.
    pub fn set(&self, state: Connectivity) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        if changed {
            info!(state = %state, "Connectivity changed");
        }
        changed
    }

    /// Number of live registrations.
    pub fn listener_count(&self) -> usize {
        self.listeners.load(Ordering::SeqCst)
    }

    pub fn register(&self) -> ConnectivityRegistration {
        let count = self.listeners.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(listeners = count, "Connectivity listener registered");
        ConnectivityRegistration {
            rx: self.tx.subscribe(),
            listeners: Arc::clone(&self.listeners),
        }
    }
}

/// Scoped connectivity listener.
#[derive(Debug)]
pub struct ConnectivityRegistration {
    rx: watch::Receiver<Connectivity>,
    listeners: Arc<AtomicUsize>,
}

impl ConnectivityRegistration {
    pub fn current(&self) -> Connectivity {
        *self.rx.borrow()
    }

    /// Wait for the next change. `None` once the monitor is gone.
    pub async fn changed(&mut self) -> Option<Connectivity> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    /// Resolve as soon as the state is `Online`, including immediately.
    pub async fn wait_online(&mut self) -> Option<Connectivity> {
        self.rx
            .wait_for(|state| state.is_online())
            .await
            .ok()
            .map(|state| *state)
    }
}

impl Drop for ConnectivityRegistration {
    fn drop(&mut self) {
        let remaining = self.listeners.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        debug!(listeners = remaining, "Connectivity listener unregistered");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_released_on_drop() {
        let monitor = ConnectivityMonitor::new(Connectivity::Offline);
        let first = monitor.register();
        {
            let _second = monitor.register();
            assert_eq!(monitor.listener_count(), 2);
        }
        assert_eq!(monitor.listener_count(), 1);
        drop(first);
        assert_eq!(monitor.listener_count(), 0);
    }

    #[test]
    fn registration_is_released_on_error_path() {
        fn fails(monitor: &ConnectivityMonitor) -> Result<(), &'static str> {
            let _registration = monitor.register();
            Err("screen setup failed")
        }
        let monitor = ConnectivityMonitor::new(Connectivity::Online);
        assert!(fails(&monitor).is_err());
        assert_eq!(monitor.listener_count(), 0);
    }

    #[test]
    fn set_reports_only_real_changes() {
        let monitor = ConnectivityMonitor::new(Connectivity::Offline);
        assert!(!monitor.set(Connectivity::Offline));
        assert!(monitor.set(Connectivity::Online));
        assert_eq!(monitor.current(), Connectivity::Online);
    }

    #[tokio::test]
    async fn listener_observes_change() {
        let monitor = ConnectivityMonitor::new(Connectivity::Offline);
        let mut registration = monitor.register();
        assert_eq!(registration.current(), Connectivity::Offline);

        monitor.set(Connectivity::Online);
        assert_eq!(registration.changed().await, Some(Connectivity::Online));
        assert_eq!(registration.wait_online().await, Some(Connectivity::Online));
    }

    #[tokio::test]
    async fn changed_ends_when_monitor_is_dropped() {
        let monitor = ConnectivityMonitor::new(Connectivity::Offline);
        let mut registration = monitor.register();
        drop(monitor);
        assert_eq!(registration.changed().await, None);
    }
}
