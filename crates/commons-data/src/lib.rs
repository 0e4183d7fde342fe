//! Uniform connection and data-manager layer over MongoDB and MySQL
//!
//! Each backend turns an options record into a validated config, connects,
//! and hands the shared connection to one [`DataManager`] per entity type:
//!
//! ```no_run
//! # #[cfg(feature = "mongo")]
//! # async fn example() -> commons_data::Result<()> {
//! use std::sync::Arc;
//!
//! use commons_data::mongo::{MongoConfig, MongoConnection, MongoOptions};
//! use commons_data::Connection;
//!
//! let mut options = MongoOptions::new("localhost", "game");
//! options.entities.insert("players".to_string());
//!
//! let config = MongoConfig::new(options)?;
//! let connection = Arc::new(MongoConnection::connect(&config).await?);
//! assert!(connection.is_connected().await);
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod config;
pub mod connection;
mod constants;
pub mod credentials;
pub mod entity;
mod error;
pub mod manager;
#[cfg(feature = "mongo")]
pub mod mongo;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod observability;

pub use address::StoreAddress;
pub use config::{Settings, find_config_file, load_settings, load_settings_from_path};
pub use connection::{Connection, ConnectionState};
pub use credentials::{Credentials, Password};
pub use entity::Entity;
pub use error::{Error, Result};
pub use manager::DataManager;
pub use observability::{LoggingConfig, init_logging};
