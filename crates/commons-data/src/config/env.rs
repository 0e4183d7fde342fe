//! Environment variable overrides for settings

use std::env;

use super::Settings;
use crate::Result;
#[cfg(feature = "mongo")]
use crate::mongo::MongoOptions;
#[cfg(feature = "mysql")]
use crate::mysql::MySqlOptions;

/// Environment variable names
mod vars {
    pub const COMMONS_MONGO_HOST: &str = "COMMONS_MONGO_HOST";
    pub const COMMONS_MONGO_PORT: &str = "COMMONS_MONGO_PORT";
    pub const COMMONS_MONGO_DATABASE: &str = "COMMONS_MONGO_DATABASE";
    pub const COMMONS_MONGO_USER: &str = "COMMONS_MONGO_USER";
    pub const COMMONS_MONGO_PASSWORD: &str = "COMMONS_MONGO_PASSWORD";
    pub const COMMONS_MONGO_TLS: &str = "COMMONS_MONGO_TLS";
    pub const COMMONS_MYSQL_HOST: &str = "COMMONS_MYSQL_HOST";
    pub const COMMONS_MYSQL_PORT: &str = "COMMONS_MYSQL_PORT";
    pub const COMMONS_MYSQL_DATABASE: &str = "COMMONS_MYSQL_DATABASE";
    pub const COMMONS_MYSQL_USER: &str = "COMMONS_MYSQL_USER";
    pub const COMMONS_MYSQL_PASSWORD: &str = "COMMONS_MYSQL_PASSWORD";
    pub const RUST_LOG: &str = "RUST_LOG";
    pub const COMMONS_JSON_LOGS: &str = "COMMONS_JSON_LOGS";

    #[cfg(feature = "mongo")]
    pub const MONGO: &[&str] = &[
        COMMONS_MONGO_HOST,
        COMMONS_MONGO_PORT,
        COMMONS_MONGO_DATABASE,
        COMMONS_MONGO_USER,
        COMMONS_MONGO_PASSWORD,
        COMMONS_MONGO_TLS,
    ];

    #[cfg(feature = "mysql")]
    pub const MYSQL: &[&str] = &[
        COMMONS_MYSQL_HOST,
        COMMONS_MYSQL_PORT,
        COMMONS_MYSQL_DATABASE,
        COMMONS_MYSQL_USER,
        COMMONS_MYSQL_PASSWORD,
    ];
}

/// Apply environment overrides on top of file settings
///
/// Setting any variable of a backend enables that backend even when the file
/// has no section for it.
pub fn load_from_env(mut settings: Settings) -> Result<Settings> {
    #[cfg(feature = "mongo")]
    if any_set(vars::MONGO) {
        apply_mongo(settings.mongo.get_or_insert_with(MongoOptions::default))?;
    }

    #[cfg(feature = "mysql")]
    if any_set(vars::MYSQL) {
        apply_mysql(settings.mysql.get_or_insert_with(MySqlOptions::default))?;
    }

    if let Ok(level) = env::var(vars::RUST_LOG) {
        settings.logging.level = level;
    }

    if let Ok(val) = env::var(vars::COMMONS_JSON_LOGS) {
        settings.logging.json = parse_bool(&val);
    }

    Ok(settings)
}

#[cfg(feature = "mongo")]
fn apply_mongo(options: &mut MongoOptions) -> Result<()> {
    if let Ok(host) = env::var(vars::COMMONS_MONGO_HOST) {
        options.host = host;
    }
    if let Ok(port) = env::var(vars::COMMONS_MONGO_PORT) {
        options.port = parse_port(vars::COMMONS_MONGO_PORT, &port)?;
    }
    if let Ok(database) = env::var(vars::COMMONS_MONGO_DATABASE) {
        options.database = database;
    }
    if let Ok(user) = env::var(vars::COMMONS_MONGO_USER) {
        options.user = Some(user);
    }
    if let Ok(password) = env::var(vars::COMMONS_MONGO_PASSWORD) {
        options.password = Some(password.into());
    }
    if let Ok(val) = env::var(vars::COMMONS_MONGO_TLS) {
        options.tls = parse_bool(&val);
    }
    Ok(())
}

#[cfg(feature = "mysql")]
fn apply_mysql(options: &mut MySqlOptions) -> Result<()> {
    if let Ok(host) = env::var(vars::COMMONS_MYSQL_HOST) {
        options.host = host;
    }
    if let Ok(port) = env::var(vars::COMMONS_MYSQL_PORT) {
        options.port = parse_port(vars::COMMONS_MYSQL_PORT, &port)?;
    }
    if let Ok(database) = env::var(vars::COMMONS_MYSQL_DATABASE) {
        options.database = database;
    }
    if let Ok(user) = env::var(vars::COMMONS_MYSQL_USER) {
        options.user = Some(user);
    }
    if let Ok(password) = env::var(vars::COMMONS_MYSQL_PASSWORD) {
        options.password = Some(password.into());
    }
    Ok(())
}

#[cfg(any(feature = "mongo", feature = "mysql"))]
fn any_set(names: &[&str]) -> bool {
    names.iter().any(|name| env::var_os(name).is_some())
}

#[cfg(any(feature = "mongo", feature = "mysql"))]
fn parse_port(name: &str, value: &str) -> Result<u16> {
    value
        .trim()
        .parse()
        .map_err(|e| crate::Error::Config(format!("Invalid {name}: {e}")))
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_MUTEX;

    const ALL_VARS: &[&str] = &[
        vars::COMMONS_MONGO_HOST,
        vars::COMMONS_MONGO_PORT,
        vars::COMMONS_MONGO_DATABASE,
        vars::COMMONS_MONGO_USER,
        vars::COMMONS_MONGO_PASSWORD,
        vars::COMMONS_MONGO_TLS,
        vars::COMMONS_MYSQL_HOST,
        vars::COMMONS_MYSQL_PORT,
        vars::COMMONS_MYSQL_DATABASE,
        vars::COMMONS_MYSQL_USER,
        vars::COMMONS_MYSQL_PASSWORD,
        vars::RUST_LOG,
        vars::COMMONS_JSON_LOGS,
    ];

    /// Run `f` with exactly `vars` set among the variables this module reads.
    fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let old_values: Vec<_> = ALL_VARS.iter().map(|k| (*k, env::var(k).ok())).collect();

        for key in ALL_VARS {
            // SAFETY: We hold a mutex lock to ensure no concurrent modifications
            unsafe { env::remove_var(key) };
        }
        for (key, value) in vars {
            // SAFETY: We hold a mutex lock to ensure no concurrent modifications
            unsafe { env::set_var(key, value) };
        }

        let result = f();

        for (key, old_value) in old_values {
            match old_value {
                // SAFETY: We hold a mutex lock to ensure no concurrent modifications
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }

        result
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(parse_bool("yes"));
        assert!(parse_bool("on"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn test_no_vars_keeps_settings() {
        with_env_vars(&[], || {
            let settings = load_from_env(Settings::default()).unwrap();
            #[cfg(feature = "mongo")]
            assert!(settings.mongo.is_none());
            #[cfg(feature = "mysql")]
            assert!(settings.mysql.is_none());
            assert_eq!(settings.logging.level, "info");
        });
    }

    #[test]
    fn test_logging_overrides() {
        with_env_vars(
            &[("RUST_LOG", "commons_data=trace"), ("COMMONS_JSON_LOGS", "yes")],
            || {
                let settings = load_from_env(Settings::default()).unwrap();
                assert_eq!(settings.logging.level, "commons_data=trace");
                assert!(settings.logging.json);
            },
        );
    }

    #[cfg(feature = "mongo")]
    #[test]
    fn test_mongo_vars_enable_backend() {
        with_env_vars(
            &[
                ("COMMONS_MONGO_HOST", "mongo.internal"),
                ("COMMONS_MONGO_DATABASE", "game"),
                ("COMMONS_MONGO_PASSWORD", "secret"),
                ("COMMONS_MONGO_TLS", "on"),
            ],
            || {
                let settings = load_from_env(Settings::default()).unwrap();
                let mongo = settings.mongo.unwrap();
                assert_eq!(mongo.host, "mongo.internal");
                assert_eq!(mongo.database, "game");
                assert_eq!(mongo.port, 27017);
                assert_eq!(mongo.password.unwrap().expose(), "secret");
                assert!(mongo.tls);
            },
        );
    }

    #[cfg(feature = "mongo")]
    #[test]
    fn test_env_overrides_file_values() {
        with_env_vars(&[("COMMONS_MONGO_PORT", "27018")], || {
            let mut settings = Settings::default();
            settings.mongo = Some(MongoOptions::new("file-host", "file-db"));
            let mongo = load_from_env(settings).unwrap().mongo.unwrap();
            assert_eq!(mongo.host, "file-host");
            assert_eq!(mongo.database, "file-db");
            assert_eq!(mongo.port, 27018);
        });
    }

    #[cfg(feature = "mysql")]
    #[test]
    fn test_mysql_vars() {
        with_env_vars(
            &[
                ("COMMONS_MYSQL_HOST", "mysql.internal"),
                ("COMMONS_MYSQL_PORT", "3307"),
                ("COMMONS_MYSQL_USER", "app"),
            ],
            || {
                let settings = load_from_env(Settings::default()).unwrap();
                let mysql = settings.mysql.unwrap();
                assert_eq!(mysql.host, "mysql.internal");
                assert_eq!(mysql.port, 3307);
                assert_eq!(mysql.user.as_deref(), Some("app"));
                assert!(mysql.password.is_none());
            },
        );
    }

    #[cfg(feature = "mysql")]
    #[test]
    fn test_invalid_port() {
        with_env_vars(&[("COMMONS_MYSQL_PORT", "not-a-port")], || {
            let err = load_from_env(Settings::default()).unwrap_err();
            assert!(err.is_config());
            assert!(err.to_string().contains("COMMONS_MYSQL_PORT"));
        });
    }
}
