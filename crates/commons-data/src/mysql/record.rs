//! Row mapping for relational entities

use sqlx::FromRow;
use sqlx::mysql::MySqlRow;

use super::value::Value;
use crate::constants::DEFAULT_ID_COLUMN;
use crate::entity::Entity;

/// An [`Entity`] stored as one row of the table named by [`Entity::NAME`].
///
/// Rows are read back through [`FromRow`] (usually derived) and written from
/// [`Record::columns`].
///
/// ```ignore
/// #[derive(sqlx::FromRow)]
/// struct Player {
///     id: Option<i64>,
///     name: String,
/// }
///
/// impl Record for Player {
///     fn columns(&self) -> Vec<(&'static str, Value)> {
///         vec![("name", self.name.clone().into())]
///     }
///
///     fn id_from_generated(raw: u64) -> Option<i64> {
///         i64::try_from(raw).ok()
///     }
/// }
/// ```
pub trait Record: Entity + for<'r> FromRow<'r, MySqlRow> + Unpin {
    /// Primary key column.
    const ID_COLUMN: &'static str = DEFAULT_ID_COLUMN;

    /// Every persisted column except the identity, in a stable order.
    fn columns(&self) -> Vec<(&'static str, Value)>;

    /// Identity from the auto-increment value of an insert.
    ///
    /// Records whose identity is not generated by the table keep the default.
    fn id_from_generated(_raw: u64) -> Option<Self::Id> {
        None
    }
}
