//! SQL generated for record persistence

use std::fmt::Write as _;

use sqlx::Executor;
use sqlx::mysql::{MySql, MySqlArguments, MySqlQueryResult, MySqlRow};
use sqlx::query::Query;

use super::value::Value;
use crate::Result;

/// Quote a table or column name with backticks.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn column_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.map(quote_ident).collect::<Vec<_>>().join(", ")
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Owned SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    values: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            values,
        }
    }

    /// Insert, or update every non-identity column when the identity exists.
    #[must_use]
    pub fn upsert(
        table: &str,
        id_column: &str,
        id: Value,
        columns: Vec<(&str, Value)>,
    ) -> Self {
        let names: Vec<&str> = std::iter::once(id_column)
            .chain(columns.iter().map(|(name, _)| *name))
            .collect();

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON DUPLICATE KEY UPDATE ",
            quote_ident(table),
            column_list(names.iter().copied()),
            placeholders(names.len()),
        );

        if columns.is_empty() {
            let id = quote_ident(id_column);
            let _ = write!(sql, "{id} = {id}");
        } else {
            let updates = columns
                .iter()
                .map(|(name, _)| {
                    let column = quote_ident(name);
                    format!("{column} = VALUES({column})")
                })
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&updates);
        }

        let values = std::iter::once(id)
            .chain(columns.into_iter().map(|(_, value)| value))
            .collect();
        Self { sql, values }
    }

    /// Insert leaving the identity to the store.
    #[must_use]
    pub fn insert(table: &str, columns: Vec<(&str, Value)>) -> Self {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            column_list(columns.iter().map(|(name, _)| *name)),
            placeholders(columns.len()),
        );
        let values = columns.into_iter().map(|(_, value)| value).collect();
        Self { sql, values }
    }

    #[must_use]
    pub fn select_by_id(table: &str, id_column: &str, id: Value) -> Self {
        Self {
            sql: format!(
                "SELECT * FROM {} WHERE {} = ?",
                quote_ident(table),
                quote_ident(id_column)
            ),
            values: vec![id],
        }
    }

    #[must_use]
    pub fn delete_by_id(table: &str, id_column: &str, id: Value) -> Self {
        Self {
            sql: format!(
                "DELETE FROM {} WHERE {} = ?",
                quote_ident(table),
                quote_ident(id_column)
            ),
            values: vec![id],
        }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    fn query(&self) -> Query<'_, MySql, MySqlArguments> {
        self.values
            .iter()
            .cloned()
            .fold(sqlx::query(&self.sql), |query, value| value.bind_to(query))
    }

    pub async fn execute<'c, E>(&self, executor: E) -> Result<MySqlQueryResult>
    where
        E: Executor<'c, Database = MySql>,
    {
        Ok(self.query().execute(executor).await?)
    }

    pub async fn fetch_optional<'c, E>(&self, executor: E) -> Result<Option<MySqlRow>>
    where
        E: Executor<'c, Database = MySql>,
    {
        Ok(self.query().fetch_optional(executor).await?)
    }
}
