//! Target-table schema: the column set that drives every derivation.
//!
//! The schema is introspected from the live table, not declared in config.
//! A column absent from the schema is never computed and never written.

use anyhow::{bail, Result};
use sqlx::{Row, SqlitePool};

/// Relational columns owned by the hierarchy calculator. They are excluded
/// from normalized row data and applied in a second update pass.
pub const FOREIGN_COLUMNS: [&str; 4] = ["translation_id", "parent_id", "prev_id", "next_id"];

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    /// Declared maximum length in characters; 0 = unbounded.
    pub max_length: i64,
}

/// Ordered column listing for the target table.
#[derive(Debug, Clone, Default)]
pub struct TargetSchema {
    columns: Vec<Column>,
}

impl TargetSchema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn has(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column.name == name)
    }

    /// The relational columns this table actually declares.
    pub fn foreign_columns(&self) -> Vec<&str> {
        FOREIGN_COLUMNS
            .iter()
            .copied()
            .filter(|name| self.has(name))
            .collect()
    }

    /// Columns written directly from normalized row data.
    pub fn data_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(|column| !FOREIGN_COLUMNS.contains(&column.name.as_str()))
    }
}

/// Dynamic table and column names are interpolated into statements; reject
/// anything that is not a plain SQL identifier.
pub fn check_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_');
    if !head_ok || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("invalid identifier: {:?}", name);
    }
    Ok(())
}

pub async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?",
    )
    .bind(table)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Column listing with declared maximum lengths, in table declaration order.
/// `VARCHAR(80)` reads as 80; bare `TEXT`/`INTEGER` as 0 (unbounded).
pub async fn load_schema(pool: &SqlitePool, table: &str) -> Result<TargetSchema> {
    check_identifier(table)?;
    let rows = sqlx::query(&format!("PRAGMA table_info(\"{}\")", table))
        .fetch_all(pool)
        .await?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.try_get("name")?;
        let declared: String = row.try_get("type")?;
        check_identifier(&name)?;
        columns.push(Column {
            max_length: declared_length(&declared),
            name,
        });
    }
    Ok(TargetSchema::new(columns))
}

/// Highest id currently stored in the table; 0 when empty.
pub async fn max_id(pool: &SqlitePool, table: &str) -> Result<i64> {
    check_identifier(table)?;
    let max: Option<i64> = sqlx::query_scalar(&format!("SELECT MAX(id) FROM \"{}\"", table))
        .fetch_one(pool)
        .await?;
    Ok(max.unwrap_or(0))
}

fn declared_length(declared: &str) -> i64 {
    let open = match declared.find('(') {
        Some(position) => position,
        None => return 0,
    };
    let close = match declared[open..].find(')') {
        Some(offset) => open + offset,
        None => return 0,
    };
    declared[open + 1..close]
        .split(',')
        .next()
        .and_then(|length| length.trim().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_length_parsing() {
        assert_eq!(declared_length("VARCHAR(191)"), 191);
        assert_eq!(declared_length("varchar(2)"), 2);
        assert_eq!(declared_length("DECIMAL(10, 2)"), 10);
        assert_eq!(declared_length("TEXT"), 0);
        assert_eq!(declared_length("INTEGER"), 0);
        assert_eq!(declared_length("VARCHAR("), 0);
    }

    #[test]
    fn test_identifier_guard() {
        assert!(check_identifier("pages").is_ok());
        assert!(check_identifier("_private2").is_ok());
        assert!(check_identifier("").is_err());
        assert!(check_identifier("2fast").is_err());
        assert!(check_identifier("pages; DROP TABLE x").is_err());
        assert!(check_identifier("pa\"ges").is_err());
    }

    #[test]
    fn test_foreign_and_data_column_partition() {
        let schema = TargetSchema::new(vec![
            Column { name: "id".into(), max_length: 0 },
            Column { name: "route".into(), max_length: 191 },
            Column { name: "parent_id".into(), max_length: 0 },
            Column { name: "next_id".into(), max_length: 0 },
        ]);
        assert_eq!(schema.foreign_columns(), vec!["parent_id", "next_id"]);
        let data: Vec<&str> = schema.data_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(data, vec!["id", "route"]);
    }
}
