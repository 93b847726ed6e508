//! Registry of live TCP connections.
//!
//! Each connection thread owns its `TcpStream`. The registry holds a cloned
//! handle to the same socket so shutdown can unblock a thread parked in
//! `read`, and its size is what the admission limit is checked against.

use slab::Slab;
use std::net::{Shutdown, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Shared slab of connection handles.
///
/// Provides O(1) insert and remove. Cloning shares the same registry.
#[derive(Clone)]
pub(crate) struct ConnectionRegistry {
    connections: Arc<Mutex<Slab<TcpStream>>>,
    /// Zero means unlimited.
    max_connections: usize,
}

impl ConnectionRegistry {
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: Arc::new(Mutex::new(Slab::new())),
            max_connections,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slab<TcpStream>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a connection handle.
    ///
    /// Returns `None` if the registry is at capacity.
    pub fn insert(&self, stream: TcpStream) -> Option<usize> {
        let mut connections = self.lock();
        if self.max_connections > 0 && connections.len() >= self.max_connections {
            return None;
        }
        Some(connections.insert(stream))
    }

    /// Drop the handle for a finished connection.
    pub fn remove(&self, id: usize) {
        self.lock().try_remove(id);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Shut down every registered socket in both directions.
    pub fn shutdown_all(&self) {
        let connections = self.lock();
        for (id, stream) in connections.iter() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                debug!(conn_id = id, error = %e, "Socket already closed");
            }
        }
    }
}
