use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::server::config::ServerConfig;

/// Bounds the number of connections being served at once.
#[derive(Debug)]
pub struct ConnectionManager {
    active: AtomicUsize,
    max_connections: usize,
}

/// Held by a worker for the lifetime of one connection.
#[derive(Debug)]
pub struct ConnectionSlot {
    manager: Arc<ConnectionManager>,
}

impl ConnectionManager {
    pub fn new(max_connections: usize) -> Self {
        Self {
            active: AtomicUsize::new(0),
            max_connections,
        }
    }

    pub fn with_config(config: &ServerConfig) -> Self {
        Self::new(config.max_connections)
    }

    /// Claims a slot, or `None` when the limit is reached.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ConnectionSlot> {
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_connections).then_some(n + 1)
            })
            .ok()
            .map(|_| ConnectionSlot {
                manager: Arc::clone(self),
            })
    }

    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.manager.active.fetch_sub(1, Ordering::AcqRel);
    }
}
