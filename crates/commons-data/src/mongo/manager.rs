//! Document manager backed by one MongoDB collection per entity

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use mongodb::Collection;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document, doc, from_bson, to_bson, to_document};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::connection::{Datastore, MongoConnection};
use crate::connection::Connection;
use crate::entity::Entity;
use crate::manager::{DataManager, ensure_registered};
use crate::{Error, Result};

/// [`DataManager`] storing `T` as documents keyed by `_id`.
///
/// Entities serialize their identity under `_id` and skip it while unset.
/// The first save assigns a fresh `ObjectId`, so `T::Id` must deserialize
/// from one:
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Player {
///     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
///     id: Option<ObjectId>,
///     name: String,
/// }
/// ```
pub struct MongoManager<T, C = MongoConnection> {
    connection: Arc<C>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, C> MongoManager<T, C>
where
    T: Entity,
    C: Connection<Handle = Datastore>,
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

    fn collection(&self) -> Result<Collection<T>> {
        Ok(self.connection.handle()?.collection(T::NAME))
    }
}

fn id_filter<I: Serialize>(id: &I) -> Result<Document> {
    let id: Bson = to_bson(id)?;
    Ok(doc! { "_id": id })
}

/// Document for a first insert with a client-generated `_id`.
///
/// The identity is converted to `I` before anything is written, so an id type
/// that cannot hold an `ObjectId` fails here and never leaves a stored document.
fn with_new_identity<T: Serialize, I: DeserializeOwned>(entity: &T) -> Result<(Document, I)> {
    let oid = Bson::ObjectId(ObjectId::new());
    let id: I = from_bson(oid.clone())?;
    let mut document = to_document(entity)?;
    document.insert("_id", oid);
    Ok((document, id))
}

impl<T: Entity, C> std::fmt::Debug for MongoManager<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoManager")
            .field("entity", &T::NAME)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T, C> DataManager<T> for MongoManager<T, C>
where
    T: Entity + Serialize + DeserializeOwned + Unpin,
    T::Id: Serialize + DeserializeOwned,
    C: Connection<Handle = Datastore>,
{
    async fn save(&self, entity: &mut T) -> Result<()> {
        let collection = self.collection()?;
        let result = match entity.id() {
            Some(id) => {
                let filter = id_filter(&id)?;
                collection
                    .replace_one(filter, &*entity)
                    .upsert(true)
                    .await
                    .map(|_| ())
                    .map_err(Error::from)
            }
            None => match with_new_identity::<T, T::Id>(entity) {
                Ok((document, id)) => collection
                    .clone_with_type::<Document>()
                    .insert_one(document)
                    .await
                    .map(|_| entity.set_id(id))
                    .map_err(Error::from),
                Err(e) => Err(e),
            },
        };

        if let Err(e) = &result {
            tracing::warn!(entity = T::NAME, error = %e, "MongoDB save failed");
        } else {
            tracing::debug!(entity = T::NAME, "Document saved");
        }
        result
    }

    async fn get(&self, id: &T::Id) -> Result<Option<T>> {
        let collection = self.collection()?;
        let filter = id_filter(id)?;
        collection.find_one(filter).await.map_err(|e| {
            tracing::warn!(entity = T::NAME, id = ?id, error = %e, "MongoDB lookup failed");
            Error::from(e)
        })
    }

    async fn delete(&self, entity: &T) -> Result<bool> {
        let id = entity.id().ok_or(Error::MissingIdentity(T::NAME))?;
        let collection = self.collection()?;
        let filter = id_filter(&id)?;
        match collection.delete_one(filter).await {
            Ok(result) => {
                tracing::debug!(
                    entity = T::NAME,
                    deleted = result.deleted_count,
                    "Document delete finished"
                );
                Ok(result.deleted_count > 0)
            }
            Err(e) => {
                tracing::warn!(entity = T::NAME, id = ?id, error = %e, "MongoDB delete failed");
                Err(Error::from(e))
            }
        }
    }
}
