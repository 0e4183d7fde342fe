//! Record manager running every write in its own transaction

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use sqlx::{MySql, MySqlPool, Transaction};

use super::connection::MySqlConnection;
use super::record::Record;
use super::statement::Statement;
use super::value::Value;
use crate::connection::Connection;
use crate::entity::Entity;
use crate::manager::{DataManager, ensure_registered};
use crate::{Error, Result};

/// Run `op` inside a transaction.
///
/// Commits on success. On failure the transaction is rolled back before the
/// error is returned; the session goes back to the pool on every path.
pub async fn transactional<R, F>(pool: &MySqlPool, op: F) -> Result<R>
where
    R: Send,
    F: for<'t> FnOnce(&'t mut Transaction<'static, MySql>) -> BoxFuture<'t, Result<R>> + Send,
{
    let mut tx = pool.begin().await?;
    match op(&mut tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(error = %rollback, "Rollback failed");
            }
            Err(e)
        }
    }
}

/// [`DataManager`] storing `T` as rows of the table `T::NAME`.
pub struct MySqlManager<T, C = MySqlConnection> {
    connection: Arc<C>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, C> MySqlManager<T, C>
where
    T: Record,
    C: Connection<Handle = MySqlPool>,
{
    /// Fails with [`Error::UnknownEntity`] unless `T` is registered with `connection`.
    pub fn new(connection: Arc<C>) -> Result<Self> {
        ensure_registered::<T, C>(connection.as_ref())?;
        Ok(Self {
            connection,
            _entity: PhantomData,
        })
    }

    #[must_use]
    pub const fn connection(&self) -> &Arc<C> {
        &self.connection
    }
}

impl<T: Entity, C> std::fmt::Debug for MySqlManager<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlManager")
            .field("entity", &T::NAME)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T, C> DataManager<T> for MySqlManager<T, C>
where
    T: Record,
    T::Id: Into<Value>,
    C: Connection<Handle = MySqlPool>,
{
    async fn save(&self, entity: &mut T) -> Result<()> {
        let pool = self.connection.handle()?;
        let id = entity.id();
        let statement = match &id {
            Some(id) => Statement::upsert(T::NAME, T::ID_COLUMN, id.clone().into(), entity.columns()),
            None => Statement::insert(T::NAME, entity.columns()),
        };

        let result = transactional(&pool, move |tx| {
            Box::pin(async move { statement.execute(&mut **tx).await })
        })
        .await;

        match result {
            Ok(done) => {
                if id.is_none() {
                    match T::id_from_generated(done.last_insert_id()) {
                        Some(generated) => entity.set_id(generated),
                        None => tracing::debug!(entity = T::NAME, "No generated identity to assign"),
                    }
                }
                tracing::debug!(entity = T::NAME, rows = done.rows_affected(), "Record saved");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(entity = T::NAME, error = %e, "MySQL save rolled back");
                Err(e)
            }
        }
    }

    async fn get(&self, id: &T::Id) -> Result<Option<T>> {
        let pool = self.connection.handle()?;
        let statement = Statement::select_by_id(T::NAME, T::ID_COLUMN, id.clone().into());
        let row = statement.fetch_optional(&pool).await.map_err(|e| {
            tracing::warn!(entity = T::NAME, id = ?id, error = %e, "MySQL lookup failed");
            e
        })?;
        row.map(|row| T::from_row(&row))
            .transpose()
            .map_err(Error::from)
    }

    async fn delete(&self, entity: &T) -> Result<bool> {
        let id = entity.id().ok_or(Error::MissingIdentity(T::NAME))?;
        let pool = self.connection.handle()?;
        let statement = Statement::delete_by_id(T::NAME, T::ID_COLUMN, id.into());

        let result = transactional(&pool, move |tx| {
            Box::pin(async move { statement.execute(&mut **tx).await })
        })
        .await;

        match result {
            Ok(done) => {
                tracing::debug!(entity = T::NAME, rows = done.rows_affected(), "Record delete finished");
                Ok(done.rows_affected() > 0)
            }
            Err(e) => {
                tracing::warn!(entity = T::NAME, error = %e, "MySQL delete rolled back");
                Err(e)
            }
        }
    }
}
