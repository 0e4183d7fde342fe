//! Connection contract and its two-state handle.

use async_trait::async_trait;

use crate::{Error, Result};

/// Handle state owned by a connection wrapper.
#[derive(Debug, Clone)]
pub enum ConnectionState<H> {
    /// Never established, or closed.
    Disconnected,
    /// Live vendor handle.
    Connected(H),
}

impl<H> Default for ConnectionState<H> {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl<H> ConnectionState<H> {
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    pub fn into_handle(self) -> Result<H> {
        match self {
            Self::Connected(handle) => Ok(handle),
            Self::Disconnected => Err(Error::NotConnected),
        }
    }

    /// Take the handle out, leaving `Disconnected` behind.
    pub fn take(&mut self) -> Option<H> {
        match std::mem::replace(self, Self::Disconnected) {
            Self::Connected(handle) => Some(handle),
            Self::Disconnected => None,
        }
    }
}

/// A live connection to one store.
///
/// Implementations are built once from a validated config and never
/// reconnect: after [`Connection::close`] a new connection must be created.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Cheaply clonable vendor handle.
    type Handle: Clone + Send + Sync;

    fn state(&self) -> ConnectionState<Self::Handle>;

    fn handle(&self) -> Result<Self::Handle> {
        self.state().into_handle()
    }

    /// Liveness probe. Failures are logged and reported as `false`.
    async fn is_connected(&self) -> bool;

    /// Liveness probe that reports why the store is unreachable.
    async fn health_check(&self) -> Result<()>;

    /// Whether entities named `name` were registered with this connection.
    fn is_registered(&self, name: &str) -> bool;

    async fn close(&self);
}
