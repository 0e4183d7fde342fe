//! Live MySQL round trips
//!
//! Run with `COMMONS_TEST_MYSQL_HOST=localhost cargo test -- --ignored`.
//! The user needs rights to create the `commons_test_orders` table.

#![cfg(feature = "mysql")]

use std::sync::Arc;

use commons_data::mysql::{
    MySqlConfig, MySqlConnection, MySqlManager, MySqlOptions, Record, SchemaCheck, Value,
    transactional,
};
use commons_data::{Connection, DataManager, Entity};
use sqlx::MySqlPool;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
struct Order {
    id: Option<i64>,
    item: String,
    quantity: i32,
    note: Option<String>,
}

impl Entity for Order {
    type Id = i64;

    const NAME: &'static str = "commons_test_orders";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

impl Record for Order {
    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("item", self.item.clone().into()),
            ("quantity", self.quantity.into()),
            ("note", self.note.clone().into()),
        ]
    }

    fn id_from_generated(raw: u64) -> Option<i64> {
        i64::try_from(raw).ok()
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
struct Badge {
    id: Option<i64>,
    code: String,
}

impl Entity for Badge {
    type Id = i64;

    const NAME: &'static str = "commons_test_badges";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

impl Record for Badge {
    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![("code", self.code.clone().into())]
    }

    fn id_from_generated(raw: u64) -> Option<i64> {
        i64::try_from(raw).ok()
    }
}

const CREATE_BADGES: &str = "CREATE TABLE IF NOT EXISTS commons_test_badges (\
     id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY, \
     code VARCHAR(64) NOT NULL UNIQUE)";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS commons_test_orders (\
     id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY, \
     item VARCHAR(255) NOT NULL, \
     quantity INT NOT NULL, \
     note VARCHAR(255) NULL)";

fn options() -> Option<MySqlOptions> {
    let host = std::env::var("COMMONS_TEST_MYSQL_HOST").ok()?;
    let database =
        std::env::var("COMMONS_TEST_MYSQL_DATABASE").unwrap_or_else(|_| "commons_test".to_string());
    let mut options = MySqlOptions::new(host, database);
    options.user = Some(std::env::var("COMMONS_TEST_MYSQL_USER").unwrap_or_else(|_| "root".to_string()));
    options.password = std::env::var("COMMONS_TEST_MYSQL_PASSWORD").ok().map(Into::into);
    options.register::<Order>();
    options.register::<Badge>();
    Some(options)
}

async fn connect() -> Option<Arc<MySqlConnection>> {
    let config = MySqlConfig::new(options()?).unwrap();
    let connection = MySqlConnection::connect(&config).await.unwrap();
    let pool = connection.handle().unwrap();
    for ddl in [CREATE_TABLE, CREATE_BADGES] {
        sqlx::query(ddl).execute(&pool).await.unwrap();
    }
    Some(Arc::new(connection))
}

#[tokio::test]
#[ignore = "requires a MySQL server"]
async fn test_save_get_delete() {
    let Some(connection) = connect().await else {
        return;
    };
    assert!(connection.is_connected().await);
    connection.health_check().await.unwrap();

    let manager = MySqlManager::<Order>::new(Arc::clone(&connection)).unwrap();
    let mut order = Order {
        id: None,
        item: "book".to_string(),
        quantity: 2,
        note: None,
    };

    manager.save(&mut order).await.unwrap();
    let id = order.id.expect("insert assigns an identity");
    assert_eq!(manager.get(&id).await.unwrap().as_ref(), Some(&order));

    order.quantity = 5;
    order.note = Some("gift".to_string());
    manager.save(&mut order).await.unwrap();
    assert_eq!(manager.get(&id).await.unwrap().as_ref(), Some(&order));

    assert!(manager.delete(&order).await.unwrap());
    assert!(manager.get(&id).await.unwrap().is_none());
    assert!(!manager.delete(&order).await.unwrap());

    connection.close().await;
    assert!(!connection.is_connected().await);
}

#[tokio::test]
#[ignore = "requires a MySQL server"]
async fn test_schema_validation() {
    let Some(mut options) = options() else {
        return;
    };
    drop(connect().await);

    options.schema_check = SchemaCheck::Validate;
    let config = MySqlConfig::new(options.clone()).unwrap();
    let connection = MySqlConnection::connect(&config).await.unwrap();
    connection.close().await;

    options.entities.insert("commons_test_missing".to_string());
    let config = MySqlConfig::new(options).unwrap();
    let err = MySqlConnection::connect(&config).await.unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("commons_test_missing"));
}

#[tokio::test]
#[ignore = "requires a MySQL server"]
async fn test_unreachable_server() {
    if options().is_none() {
        return;
    }
    let options = MySqlOptions {
        port: 1,
        ..MySqlOptions::new("127.0.0.1", "commons_test")
    };
    let config = MySqlConfig::new(options).unwrap();
    let err = MySqlConnection::connect(&config).await.unwrap_err();
    assert!(err.is_connection());
}

async fn count_where(pool: &MySqlPool, sql: &str, arg: &str) -> i64 {
    sqlx::query_scalar(sql).bind(arg).fetch_one(pool).await.unwrap()
}

#[tokio::test]
#[ignore = "requires a MySQL server"]
async fn test_duplicate_key_is_conflict() {
    let Some(connection) = connect().await else {
        return;
    };
    let pool = connection.handle().unwrap();
    sqlx::query("DELETE FROM commons_test_badges WHERE code = ?")
        .bind("gold")
        .execute(&pool)
        .await
        .unwrap();

    let manager = MySqlManager::<Badge>::new(Arc::clone(&connection)).unwrap();
    let mut first = Badge {
        id: None,
        code: "gold".to_string(),
    };
    manager.save(&mut first).await.unwrap();

    let mut second = first.clone();
    second.id = None;
    let err = manager.save(&mut second).await.unwrap_err();
    assert!(err.is_conflict(), "{err}");
    assert!(second.id.is_none());

    let stored = count_where(
        &pool,
        "SELECT COUNT(*) FROM commons_test_badges WHERE code = ?",
        "gold",
    )
    .await;
    assert_eq!(stored, 1);

    assert!(manager.delete(&first).await.unwrap());
    connection.close().await;
}

#[tokio::test]
#[ignore = "requires a MySQL server"]
async fn test_failed_write_rolls_back_transaction() {
    let Some(connection) = connect().await else {
        return;
    };
    let pool = connection.handle().unwrap();
    let marker = "rollback-marker";

    let err = transactional(&pool, move |tx| {
        Box::pin(async move {
            sqlx::query("INSERT INTO commons_test_orders (item, quantity, note) VALUES (?, 1, ?)")
                .bind("book")
                .bind(marker)
                .execute(&mut **tx)
                .await?;
            sqlx::query("INSERT INTO commons_test_orders (item, quantity) VALUES (NULL, 1)")
                .execute(&mut **tx)
                .await?;
            Ok::<(), commons_data::Error>(())
        })
    })
    .await
    .unwrap_err();
    assert!(err.is_query(), "{err}");

    let stored = count_where(
        &pool,
        "SELECT COUNT(*) FROM commons_test_orders WHERE note = ?",
        marker,
    )
    .await;
    assert_eq!(stored, 0);

    connection.close().await;
}
