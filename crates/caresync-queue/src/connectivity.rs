//! Connectivity monitor: translates the host's reachability signal into
//! online/offline transitions the drain loop can observe.
//!
//! The monitor is a thin wrapper around a tokio watch channel. The embedding
//! application feeds it whatever primitive the platform provides (a browser
//! `online` event, a netlink socket, a periodic probe); the queue consults
//! `is_online` before every transport call and re-arms its drain loop on
//! every transition to online.

use std::sync::Arc;

use tokio::sync::watch;

/// Shared online/offline flag with change notification.
///
/// Cheap to clone; all clones observe the same state.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    /// Create a monitor with the given initial state.
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self { tx: Arc::new(tx) }
    }

    /// Report that connectivity has returned.
    pub fn set_online(&self) {
        if !self.tx.send_replace(true) {
            tracing::info!("connectivity restored");
        }
    }

    /// Report that connectivity was lost.
    pub fn set_offline(&self) {
        if self.tx.send_replace(false) {
            tracing::info!("connectivity lost");
        }
    }

    /// Current state. Consulted by the drain loop before every send.
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Subscribe to transitions. Used by the queue's listener task.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transitions_are_observed() {
        let monitor = ConnectivityMonitor::new(true);
        let mut rx = monitor.watch();

        assert!(monitor.is_online());

        monitor.set_offline();
        rx.changed().await.unwrap();
        assert!(!*rx.borrow());
        assert!(!monitor.is_online());

        monitor.set_online();
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_redundant_sets_do_not_flip_state() {
        let monitor = ConnectivityMonitor::new(false);
        monitor.set_offline();
        monitor.set_offline();
        assert!(!monitor.is_online());
    }
}
