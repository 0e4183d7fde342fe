//! MySQL / MariaDB backend
//!
//! Entities implement [`Record`] and live in the table named by
//! [`Entity::NAME`](crate::Entity::NAME). Writes run inside a transaction
//! per call.

mod config;
mod connection;
mod manager;
mod record;
mod statement;
mod value;

pub use config::{MySqlConfig, MySqlOptions, PoolSettings, SchemaCheck};
pub use connection::MySqlConnection;
pub use manager::{MySqlManager, transactional};
pub use record::Record;
pub use statement::{Statement, quote_ident};
pub use value::Value;
