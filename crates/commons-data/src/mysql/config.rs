//! MySQL connection configuration

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use sqlx::ConnectOptions;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};

use crate::address::StoreAddress;
use crate::constants::{DEFAULT_MYSQL_DRIVER, DEFAULT_MYSQL_PORT, SUPPORTED_MYSQL_DRIVERS};
use crate::credentials::{Credentials, Password};
use crate::entity::Entity;
use crate::{Error, Result};

/// Schema verification performed right after connecting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum SchemaCheck {
    #[default]
    None,
    /// Every registered table must exist in the connected database.
    Validate,
}

impl FromStr for SchemaCheck {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "validate" => Ok(Self::Validate),
            other @ ("update" | "create" | "create-drop") => Err(Error::config(format!(
                "schema_check `{other}` would migrate the schema; use `none` or `validate`"
            ))),
            other => Err(Error::config(format!("unknown schema_check: {other}"))),
        }
    }
}

impl TryFrom<String> for SchemaCheck {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

mod pool_keys {
    pub const MAX_CONNECTIONS: &str = "max_connections";
    pub const MIN_CONNECTIONS: &str = "min_connections";
    pub const ACQUIRE_TIMEOUT_SECS: &str = "acquire_timeout_secs";
    pub const IDLE_TIMEOUT_SECS: &str = "idle_timeout_secs";
    pub const MAX_LIFETIME_SECS: &str = "max_lifetime_secs";
    pub const TEST_BEFORE_ACQUIRE: &str = "test_before_acquire";
}

/// Pool tuning parsed from `pool_properties`. Unset fields keep the driver defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout: Option<Duration>,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
    pub test_before_acquire: Option<bool>,
}

fn parse_property<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("invalid value for pool property {key}: {value}")))
}

impl PoolSettings {
    pub fn from_properties(properties: &BTreeMap<String, String>) -> Result<Self> {
        let mut settings = Self::default();
        for (key, value) in properties {
            match key.as_str() {
                pool_keys::MAX_CONNECTIONS => {
                    settings.max_connections = Some(parse_property(key, value)?);
                }
                pool_keys::MIN_CONNECTIONS => {
                    settings.min_connections = Some(parse_property(key, value)?);
                }
                pool_keys::ACQUIRE_TIMEOUT_SECS => {
                    settings.acquire_timeout =
                        Some(Duration::from_secs(parse_property(key, value)?));
                }
                pool_keys::IDLE_TIMEOUT_SECS => {
                    settings.idle_timeout = Some(Duration::from_secs(parse_property(key, value)?));
                }
                pool_keys::MAX_LIFETIME_SECS => {
                    settings.max_lifetime = Some(Duration::from_secs(parse_property(key, value)?));
                }
                pool_keys::TEST_BEFORE_ACQUIRE => {
                    settings.test_before_acquire = Some(parse_property(key, value)?);
                }
                other => return Err(Error::config(format!("unknown pool property: {other}"))),
            }
        }

        if settings.max_connections == Some(0) {
            return Err(Error::config("max_connections must be greater than 0"));
        }
        if let (Some(min), Some(max)) = (settings.min_connections, settings.max_connections)
            && min > max
        {
            return Err(Error::config(format!(
                "min_connections ({min}) exceeds max_connections ({max})"
            )));
        }

        Ok(settings)
    }

    fn apply(&self, mut options: MySqlPoolOptions) -> MySqlPoolOptions {
        if let Some(max) = self.max_connections {
            options = options.max_connections(max);
        }
        if let Some(min) = self.min_connections {
            options = options.min_connections(min);
        }
        if let Some(timeout) = self.acquire_timeout {
            options = options.acquire_timeout(timeout);
        }
        if let Some(timeout) = self.idle_timeout {
            options = options.idle_timeout(timeout);
        }
        if let Some(lifetime) = self.max_lifetime {
            options = options.max_lifetime(lifetime);
        }
        if let Some(test) = self.test_before_acquire {
            options = options.test_before_acquire(test);
        }
        options
    }
}

/// Named MySQL connection settings, validated by [`MySqlConfig::new`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MySqlOptions {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<Password>,
    /// URL scheme, `mysql` or `mariadb`.
    pub driver: String,
    /// Log every executed statement.
    pub debug: bool,
    pub schema_check: SchemaCheck,
    /// Tables managers may be created for.
    pub entities: BTreeSet<String>,
    /// Driver options rendered into the connection URL query.
    pub url_properties: BTreeMap<String, String>,
    /// Apply `pool_properties` instead of the driver's pool defaults.
    pub pool: bool,
    pub pool_properties: BTreeMap<String, String>,
}

impl Default for MySqlOptions {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_MYSQL_PORT,
            database: String::new(),
            user: None,
            password: None,
            driver: DEFAULT_MYSQL_DRIVER.to_string(),
            debug: false,
            schema_check: SchemaCheck::None,
            entities: BTreeSet::new(),
            url_properties: BTreeMap::new(),
            pool: false,
            pool_properties: BTreeMap::new(),
        }
    }
}

impl MySqlOptions {
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

/// Immutable, validated MySQL configuration.
#[derive(Debug, Clone)]
pub struct MySqlConfig {
    address: StoreAddress,
    database: String,
    credentials: Option<Credentials>,
    debug: bool,
    schema_check: SchemaCheck,
    entities: BTreeSet<String>,
    pool: Option<PoolSettings>,
}

impl MySqlConfig {
    pub fn new(options: MySqlOptions) -> Result<Self> {
        let driver = options.driver.trim();
        if driver.is_empty() {
            return Err(Error::config("driver must not be empty"));
        }
        if !SUPPORTED_MYSQL_DRIVERS.contains(&driver) {
            return Err(Error::config(format!(
                "unsupported driver: {driver} (expected one of: {})",
                SUPPORTED_MYSQL_DRIVERS.join(", ")
            )));
        }

        let database = options.database.trim().to_string();
        let address = StoreAddress::new(
            driver,
            &options.host,
            options.port,
            DEFAULT_MYSQL_PORT,
            &database,
            &options.url_properties,
        )?;

        let pool = if options.pool {
            Some(PoolSettings::from_properties(&options.pool_properties)?)
        } else {
            if !options.pool_properties.is_empty() {
                tracing::warn!("pool_properties ignored because pool is disabled");
            }
            None
        };

        let credentials = options.user.map(|user| Credentials {
            user,
            password: options.password,
        });

        Ok(Self {
            address,
            database,
            credentials,
            debug: options.debug,
            schema_check: options.schema_check,
            entities: options.entities,
            pool,
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
    pub const fn debug(&self) -> bool {
        self.debug
    }

    #[must_use]
    pub const fn schema_check(&self) -> SchemaCheck {
        self.schema_check
    }

    #[must_use]
    pub const fn entities(&self) -> &BTreeSet<String> {
        &self.entities
    }

    #[must_use]
    pub const fn pool(&self) -> Option<&PoolSettings> {
        self.pool.as_ref()
    }

    /// Driver options for the configured address and credentials.
    pub fn connect_options(&self) -> Result<MySqlConnectOptions> {
        let mut options = MySqlConnectOptions::from_str(self.address.as_str())?;
        if let Some(credentials) = &self.credentials {
            options = options.username(&credentials.user);
            if let Some(password) = &credentials.password {
                options = options.password(password.expose());
            }
        }
        if !self.debug {
            options = options.disable_statement_logging();
        }
        Ok(options)
    }

    #[must_use]
    pub fn pool_options(&self) -> MySqlPoolOptions {
        let options = MySqlPoolOptions::new();
        match &self.pool {
            Some(settings) => settings.apply(options),
            None => options,
        }
    }
}

impl TryFrom<MySqlOptions> for MySqlConfig {
    type Error = Error;

    fn try_from(options: MySqlOptions) -> Result<Self> {
        Self::new(options)
    }
}
