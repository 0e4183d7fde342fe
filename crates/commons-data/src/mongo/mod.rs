//! MongoDB backend
//!
//! Entities are serde documents stored in the collection named by
//! [`Entity::NAME`](crate::Entity::NAME), keyed by `_id`.

mod config;
mod connection;
mod manager;

pub use config::{MongoConfig, MongoOptions};
pub use connection::{Datastore, MongoConnection};
pub use manager::MongoManager;
