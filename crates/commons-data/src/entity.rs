//! Entity contract shared by both backends.

use std::fmt::Debug;

/// A caller-supplied data type with an identity field.
///
/// `NAME` is the collection (MongoDB) or table (MySQL) the entity maps to and
/// is the key used when registering entities with a connection.
pub trait Entity: Send + Sync + Sized + 'static {
    type Id: Clone + Debug + Send + Sync;

    const NAME: &'static str;

    /// Identity, `None` until the store has assigned one.
    fn id(&self) -> Option<Self::Id>;

    fn set_id(&mut self, id: Self::Id);
}
