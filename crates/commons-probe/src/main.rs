use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use commons_data::mongo::{MongoConfig, MongoConnection, MongoOptions};
use commons_data::mysql::{MySqlConfig, MySqlConnection, MySqlOptions};
use commons_data::{Connection, init_logging, load_settings, load_settings_from_path};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    Mongo,
    Mysql,
    All,
}

impl Backend {
    fn includes(self, other: Self) -> bool {
        self == Self::All || self == other
    }
}

#[derive(Parser, Debug)]
#[command(name = "commons-probe")]
#[command(about = "Check connectivity of configured commons-data backends", long_about = None)]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "COMMONS_CONFIG")]
    config: Option<PathBuf>,

    /// Backend to probe
    #[arg(short, long, value_enum, default_value = "all")]
    backend: Backend,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable JSON logging output
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load settings with precedence: env > file > defaults
    let mut settings = if let Some(ref path) = args.config {
        load_settings_from_path(path)?
    } else {
        load_settings()?
    };

    if args.verbose {
        settings.logging.level = "debug".to_string();
    }
    if args.json_logs {
        settings.logging.json = true;
    }
    init_logging(&settings.logging)?;

    let mut probed = 0_usize;
    let mut failed = 0_usize;

    if args.backend.includes(Backend::Mongo) {
        match settings.mongo.take() {
            Some(options) => {
                probed += 1;
                if let Err(e) = probe_mongo(options).await {
                    tracing::error!(backend = "mongo", error = %e, "Probe failed");
                    failed += 1;
                }
            }
            None if args.backend == Backend::Mongo => {
                anyhow::bail!("no [mongo] settings configured");
            }
            None => tracing::debug!(backend = "mongo", "Not configured, skipping"),
        }
    }

    if args.backend.includes(Backend::Mysql) {
        match settings.mysql.take() {
            Some(options) => {
                probed += 1;
                if let Err(e) = probe_mysql(options).await {
                    tracing::error!(backend = "mysql", error = %e, "Probe failed");
                    failed += 1;
                }
            }
            None if args.backend == Backend::Mysql => {
                anyhow::bail!("no [mysql] settings configured");
            }
            None => tracing::debug!(backend = "mysql", "Not configured, skipping"),
        }
    }

    if probed == 0 {
        anyhow::bail!("no backend configured");
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {probed} backend(s) failed");
    }

    tracing::info!(backends = probed, "All backends healthy");
    Ok(())
}

async fn probe_mongo(options: MongoOptions) -> anyhow::Result<()> {
    let config = MongoConfig::new(options)?;
    let connection = MongoConnection::connect(&config).await?;
    report("mongo", &connection).await
}

async fn probe_mysql(options: MySqlOptions) -> anyhow::Result<()> {
    let config = MySqlConfig::new(options)?;
    let connection = MySqlConnection::connect(&config).await?;
    report("mysql", &connection).await
}

async fn report<C: Connection>(backend: &str, connection: &C) -> anyhow::Result<()> {
    let connected = connection.is_connected().await;
    let health = connection.health_check().await;
    connection.close().await;

    health?;
    tracing::info!(backend, connected, "Backend healthy");
    Ok(())
}
