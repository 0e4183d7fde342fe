//! MongoDB connection wrapper

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, Credential, Tls, TlsOptions};
use mongodb::{Client, Collection, Database};
use parking_lot::RwLock;

use super::config::MongoConfig;
use crate::connection::{Connection, ConnectionState};
use crate::constants::MONGO_CONNECT_TIMEOUT;
use crate::{Error, Result};

/// Client plus the configured database, shared by every manager of a connection.
#[derive(Debug, Clone)]
pub struct Datastore {
    client: Client,
    database: Database,
}

impl Datastore {
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.database
    }

    /// Typed collection named after an entity.
    #[must_use]
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.database.collection(name)
    }

    async fn ping(&self) -> Result<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

/// Connection to one MongoDB database.
pub struct MongoConnection {
    config: MongoConfig,
    state: RwLock<ConnectionState<Datastore>>,
}

impl MongoConnection {
    /// Build the client and ping the server.
    ///
    /// Returns a connected wrapper or [`Error::Connection`]; a handle that
    /// failed its handshake is never handed out.
    pub async fn connect(config: &MongoConfig) -> Result<Self> {
        let options = client_options(config).await?;
        let client = Client::with_options(options)?;
        let datastore = Datastore {
            database: client.database(config.database()),
            client,
        };

        if let Err(e) = datastore.ping().await {
            tracing::warn!(
                host = %config.address().server(),
                database = %config.database(),
                error = %e,
                "MongoDB handshake failed"
            );
            return Err(Error::Connection(format!(
                "error connecting to mongodb. Host: '{}', Database Name: '{}'",
                config.address().host(),
                config.database()
            )));
        }

        tracing::info!(
            host = %config.address().server(),
            database = %config.database(),
            "Connected to MongoDB"
        );

        Ok(Self {
            config: config.clone(),
            state: RwLock::new(ConnectionState::Connected(datastore)),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &MongoConfig {
        &self.config
    }

    #[cfg(test)]
    pub(crate) fn disconnected(config: MongoConfig) -> Self {
        Self {
            config,
            state: RwLock::new(ConnectionState::Disconnected),
        }
    }
}

async fn client_options(config: &MongoConfig) -> Result<ClientOptions> {
    let mut options = ClientOptions::parse(config.address().as_str()).await?;
    options.connect_timeout = Some(MONGO_CONNECT_TIMEOUT);
    options.server_selection_timeout = Some(MONGO_CONNECT_TIMEOUT);
    options.tls = Some(if config.tls() {
        Tls::Enabled(TlsOptions::default())
    } else {
        Tls::Disabled
    });

    if let Some(credentials) = config.credentials() {
        options.credential = Some(
            Credential::builder()
                .username(credentials.user.clone())
                .password(
                    credentials
                        .password
                        .as_ref()
                        .map(|p| p.expose().to_string()),
                )
                .source(config.auth_database().map(str::to_string))
                .build(),
        );
    }

    Ok(options)
}

impl std::fmt::Debug for MongoConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoConnection")
            .field("server", &self.config.address().server())
            .field("connected", &self.state.read().is_connected())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connection for MongoConnection {
    type Handle = Datastore;

    fn state(&self) -> ConnectionState<Datastore> {
        self.state.read().clone()
    }

    async fn is_connected(&self) -> bool {
        match self.health_check().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    host = %self.config.address().server(),
                    error = %e,
                    "MongoDB liveness check failed"
                );
                false
            }
        }
    }

    async fn health_check(&self) -> Result<()> {
        let datastore = self.handle()?;
        datastore.ping().await
    }

    fn is_registered(&self, name: &str) -> bool {
        self.config.entities().contains(name)
    }

    async fn close(&self) {
        let datastore = self.state.write().take();
        if let Some(datastore) = datastore {
            datastore.client.shutdown().await;
            tracing::info!(
                host = %self.config.address().server(),
                "MongoDB connection closed"
            );
        }
    }
}
