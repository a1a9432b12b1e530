//! Engine-owned schema setup.
//!
//! Only the fingerprint table belongs to the engine. Content tables are
//! application-owned; the check phase reports when one is missing instead
//! of creating it.

use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fingerprints (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            subject_id INTEGER NOT NULL,
            subject_type TEXT NOT NULL,
            hash TEXT,
            UNIQUE(subject_type, subject_id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_fingerprints_subject_type ON fingerprints(subject_type)",
    )
    .execute(&pool)
    .await?;

    pool.close().await;
    Ok(())
}
