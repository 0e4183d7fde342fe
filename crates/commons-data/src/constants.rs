//! Constants shared by the backends

use std::time::Duration;

/// Default MongoDB port, left out of rendered URLs
pub const DEFAULT_MONGO_PORT: u16 = 27017;

/// Default MySQL port, left out of rendered URLs
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Authentication database used when none is configured
pub const DEFAULT_AUTH_DATABASE: &str = "admin";

/// URL scheme selecting the MySQL driver
pub const DEFAULT_MYSQL_DRIVER: &str = "mysql";

/// URL schemes the MySQL driver accepts
pub const SUPPORTED_MYSQL_DRIVERS: &[&str] = &["mysql", "mariadb"];

/// Connect timeout applied to every MongoDB client
pub const MONGO_CONNECT_TIMEOUT: Duration = Duration::from_millis(3000);

/// SQL query to check database connection health
pub const HEALTH_CHECK_QUERY: &str = "SELECT 1";

/// Default identity column of relational records
pub const DEFAULT_ID_COLUMN: &str = "id";
