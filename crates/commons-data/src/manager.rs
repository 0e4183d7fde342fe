//! Data manager contract.

use async_trait::async_trait;

use crate::Result;
use crate::connection::Connection;
use crate::entity::Entity;

/// CRUD access to entities of type `T` through one connection.
#[async_trait]
pub trait DataManager<T: Entity>: Send + Sync {
    /// Insert or update `entity` by identity.
    ///
    /// An entity without identity is inserted and receives the identity
    /// assigned by the store.
    async fn save(&self, entity: &mut T) -> Result<()>;

    /// Point lookup by identity. `Ok(None)` when nothing matches.
    async fn get(&self, id: &T::Id) -> Result<Option<T>>;

    /// Remove `entity`, returning whether an existing record was removed.
    async fn delete(&self, entity: &T) -> Result<bool>;
}

/// Reject entity types the connection was not configured with.
pub(crate) fn ensure_registered<T: Entity, C: Connection + ?Sized>(connection: &C) -> Result<()> {
    if connection.is_registered(T::NAME) {
        Ok(())
    } else {
        Err(crate::Error::UnknownEntity(T::NAME))
    }
}
