//! Transactional application of a sync plan.
//!
//! All writes for a run happen inside one transaction, in an order that
//! keeps referential integrity intact: relational columns are nulled before
//! any row is deleted, rows are written without their relational columns,
//! and the relations land in a second pass once every referenced row
//! exists. Any error rolls the whole sequence back.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::models::{Relations, RowData, SyncPlan};
use crate::schema::{check_identifier, Column, TargetSchema};

/// Rows per multi-row INSERT. Keeps the bind count under SQLite's default
/// host-parameter limit even for wide tables.
const INSERT_CHUNK_ROWS: usize = 500;

pub struct Synchronizer<'a> {
    pool: &'a SqlitePool,
    table: &'a str,
    subject_type: &'a str,
    schema: &'a TargetSchema,
}

impl<'a> Synchronizer<'a> {
    pub fn new(
        pool: &'a SqlitePool,
        table: &'a str,
        subject_type: &'a str,
        schema: &'a TargetSchema,
    ) -> Self {
        Self {
            pool,
            table,
            subject_type,
            schema,
        }
    }

    /// Apply the plan as one atomic unit.
    pub async fn apply(
        &self,
        rows: &BTreeMap<i64, RowData>,
        relations: &BTreeMap<i64, Relations>,
        plan: &SyncPlan,
    ) -> Result<()> {
        check_identifier(self.table)?;

        let mut tx = self.pool.begin().await?;

        self.reset_foreign_fields(&mut tx).await?;
        self.delete_rows(&mut tx, &plan.deletes).await?;
        self.update_rows(&mut tx, rows, &plan.updates).await?;
        self.insert_rows(&mut tx, rows, &plan.inserts).await?;
        self.update_foreigns(&mut tx, relations).await?;
        self.replace_fingerprints(&mut tx, &plan.fingerprints).await?;

        tx.commit().await.context("sync transaction failed")?;
        Ok(())
    }

    /// Null every relational column first, so deleting referenced rows
    /// cannot trip foreign-key constraints.
    async fn reset_foreign_fields(&self, tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
        let foreign = self.schema.foreign_columns();
        if foreign.is_empty() {
            return Ok(());
        }
        let sets = foreign
            .iter()
            .map(|name| format!("\"{}\" = NULL", name))
            .collect::<Vec<_>>()
            .join(", ");
        sqlx::query(&format!("UPDATE \"{}\" SET {}", self.table, sets))
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn delete_rows(&self, tx: &mut Transaction<'_, Sqlite>, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "DELETE FROM \"{}\" WHERE id IN ({})",
            self.table, placeholders
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }
        query.execute(&mut **tx).await?;
        Ok(())
    }

    async fn update_rows(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        rows: &BTreeMap<i64, RowData>,
        ids: &[i64],
    ) -> Result<()> {
        let columns: Vec<&Column> = self
            .schema
            .data_columns()
            .filter(|column| column.name != "id")
            .collect();
        if columns.is_empty() {
            return Ok(());
        }
        let sets = columns
            .iter()
            .map(|column| format!("\"{}\" = ?", column.name))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE \"{}\" SET {} WHERE id = ?", self.table, sets);

        for id in ids {
            let row = match rows.get(id) {
                Some(row) => row,
                None => continue,
            };
            let mut query = sqlx::query(&sql);
            for column in &columns {
                query = bind_column(query, row, &column.name);
            }
            query.bind(id).execute(&mut **tx).await?;
        }
        Ok(())
    }

    async fn insert_rows(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        rows: &BTreeMap<i64, RowData>,
        ids: &[i64],
    ) -> Result<()> {
        let columns: Vec<&Column> = self.schema.data_columns().collect();
        let plan_rows: Vec<&RowData> = ids.iter().filter_map(|id| rows.get(id)).collect();
        if columns.is_empty() || plan_rows.is_empty() {
            return Ok(());
        }

        let column_list = columns
            .iter()
            .map(|column| format!("\"{}\"", column.name))
            .collect::<Vec<_>>()
            .join(", ");
        let row_placeholder = format!("({})", vec!["?"; columns.len()].join(", "));

        for chunk in plan_rows.chunks(INSERT_CHUNK_ROWS) {
            let values = vec![row_placeholder.as_str(); chunk.len()].join(", ");
            let sql = format!(
                "INSERT INTO \"{}\" ({}) VALUES {}",
                self.table, column_list, values
            );
            let mut query = sqlx::query(&sql);
            for row in chunk {
                for column in &columns {
                    query = bind_column(query, row, &column.name);
                }
            }
            query.execute(&mut **tx).await?;
        }
        Ok(())
    }

    /// Second pass: every row exists now, so the relational columns can
    /// point wherever the batch says.
    async fn update_foreigns(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        relations: &BTreeMap<i64, Relations>,
    ) -> Result<()> {
        if self.schema.foreign_columns().is_empty() {
            return Ok(());
        }
        for (id, fields) in relations {
            if fields.is_empty() {
                continue;
            }
            let sets = fields
                .keys()
                .map(|name| format!("\"{}\" = ?", name))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!("UPDATE \"{}\" SET {} WHERE id = ?", self.table, sets);
            let mut query = sqlx::query(&sql);
            for value in fields.values() {
                query = bind_value(query, value);
            }
            query.bind(id).execute(&mut **tx).await?;
        }
        Ok(())
    }

    /// Replace this content type's fingerprint rows wholesale.
    async fn replace_fingerprints(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        fingerprints: &BTreeMap<i64, String>,
    ) -> Result<()> {
        sqlx::query("DELETE FROM fingerprints WHERE subject_type = ?")
            .bind(self.subject_type)
            .execute(&mut **tx)
            .await?;

        let entries: Vec<(&i64, &String)> = fingerprints.iter().collect();
        for chunk in entries.chunks(INSERT_CHUNK_ROWS) {
            let values = vec!["(?, ?, ?)"; chunk.len()].join(", ");
            let sql = format!(
                "INSERT INTO fingerprints (subject_id, subject_type, hash) VALUES {}",
                values
            );
            let mut query = sqlx::query(&sql);
            for (id, hash) in chunk {
                query = query.bind(**id).bind(self.subject_type).bind(hash.as_str());
            }
            query.execute(&mut **tx).await?;
        }
        Ok(())
    }
}

/// Stored fingerprint map for a content type, joined against the content
/// table so fingerprint rows whose row vanished do not mask inserts.
pub async fn load_stored_fingerprints(
    pool: &SqlitePool,
    table: &str,
    subject_type: &str,
) -> Result<HashMap<i64, String>> {
    check_identifier(table)?;
    let rows = sqlx::query(&format!(
        "SELECT f.subject_id, f.hash FROM fingerprints f \
         JOIN \"{}\" t ON f.subject_id = t.id WHERE f.subject_type = ?",
        table
    ))
    .bind(subject_type)
    .fetch_all(pool)
    .await?;

    let mut stored = HashMap::new();
    for row in rows {
        let id: i64 = row.try_get("subject_id")?;
        let hash: Option<String> = row.try_get("hash")?;
        stored.insert(id, hash.unwrap_or_default());
    }
    Ok(stored)
}

/// Bind a row's value for `column`, with SQL NULL for a missing entry.
fn bind_column<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    row: &'q RowData,
    column: &str,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match row.get(column) {
        Some(value) => bind_value(query, value),
        None => query.bind(None::<String>),
    }
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(flag) => query.bind(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => query.bind(integer),
            None => query.bind(number.as_f64().unwrap_or(0.0)),
        },
        Value::String(text) => query.bind(text.as_str()),
        other => query.bind(other.to_string()),
    }
}
