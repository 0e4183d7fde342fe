//! MongoDB connection configuration

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::address::StoreAddress;
use crate::constants::{DEFAULT_AUTH_DATABASE, DEFAULT_MONGO_PORT};
use crate::credentials::{Credentials, Password};
use crate::entity::Entity;
use crate::{Error, Result};

/// Characters MongoDB rejects in database names
const INVALID_DATABASE_CHARS: &[char] = &['/', '\\', '.', ' ', '"', '$'];

/// Named MongoDB connection settings, validated by [`MongoConfig::new`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MongoOptions {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<Password>,
    /// Database holding the user, `admin` unless overridden.
    pub auth_database: Option<String>,
    pub tls: bool,
    /// Collections managers may be created for.
    pub entities: BTreeSet<String>,
    /// Driver options rendered into the connection string query.
    pub properties: BTreeMap<String, String>,
}

impl Default for MongoOptions {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_MONGO_PORT,
            database: String::new(),
            user: None,
            password: None,
            auth_database: Some(DEFAULT_AUTH_DATABASE.to_string()),
            tls: false,
            entities: BTreeSet::new(),
            properties: BTreeMap::new(),
        }
    }
}

impl MongoOptions {
    pub fn new(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Register `T` so managers can be created for it.
    pub fn register<T: Entity>(&mut self) -> &mut Self {
        self.entities.insert(T::NAME.to_string());
        self
    }
}

/// Immutable, validated MongoDB configuration.
#[derive(Debug, Clone)]
pub struct MongoConfig {
    address: StoreAddress,
    database: String,
    credentials: Option<Credentials>,
    auth_database: Option<String>,
    tls: bool,
    entities: BTreeSet<String>,
}

impl MongoConfig {
    pub fn new(options: MongoOptions) -> Result<Self> {
        let database = options.database.trim().to_string();
        if database.is_empty() {
            return Err(Error::config("database name must not be empty"));
        }
        if database.contains(INVALID_DATABASE_CHARS) {
            return Err(Error::config(format!(
                "invalid MongoDB database name: {database}"
            )));
        }

        let address = StoreAddress::new(
            "mongodb",
            &options.host,
            options.port,
            DEFAULT_MONGO_PORT,
            &database,
            &options.properties,
        )?;

        let credentials = match (options.user, options.password, &options.auth_database) {
            (Some(user), Some(password), Some(_)) => Some(Credentials {
                user,
                password: Some(password),
            }),
            (Some(user), _, _) => {
                tracing::warn!(
                    user = %user,
                    "MongoDB user configured without password or auth database; connecting unauthenticated"
                );
                None
            }
            _ => None,
        };

        Ok(Self {
            address,
            database,
            credentials,
            auth_database: options.auth_database,
            tls: options.tls,
            entities: options.entities,
        })
    }

    #[must_use]
    pub const fn address(&self) -> &StoreAddress {
        &self.address
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    #[must_use]
    pub const fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    #[must_use]
    pub fn auth_database(&self) -> Option<&str> {
        self.auth_database.as_deref()
    }

    #[must_use]
    pub const fn tls(&self) -> bool {
        self.tls
    }

    #[must_use]
    pub const fn entities(&self) -> &BTreeSet<String> {
        &self.entities
    }
}

impl TryFrom<MongoOptions> for MongoConfig {
    type Error = Error;

    fn try_from(options: MongoOptions) -> Result<Self> {
        Self::new(options)
    }
}
