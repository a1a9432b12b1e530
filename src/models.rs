//! Core data types that flow through the sync pipeline.
//!
//! A run turns content files into [`RawRecord`]s, normalizes them into
//! per-column row data, derives relational fields from structural position,
//! and condenses the delta against stored state into a [`SyncPlan`].

use std::collections::BTreeMap;

use serde_json::Value;

/// One parsed content file: YAML front matter plus an optional body.
///
/// The `path` is `/`-separated and relative to the content root, including
/// the content-type directory (`pages/guides/index.md`). It is the unique
/// key for a record within a run. The `id` is resolved by the scanner:
/// either read from the front matter or freshly allocated.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub path: String,
    pub id: i64,
    /// Open front-matter mapping, including the resolved `id`.
    pub meta: BTreeMap<String, Value>,
    /// Text after the `---` separator, verbatim.
    pub body: Option<String>,
}

impl RawRecord {
    /// The body text that counts: the separator body when present, else a
    /// string `body` value carried in the front matter itself.
    pub fn effective_body(&self) -> Option<&str> {
        if let Some(body) = &self.body {
            return Some(body);
        }
        self.meta.get("body").and_then(Value::as_str)
    }
}

/// One row's worth of non-relational column values, keyed by column name.
///
/// Every non-relational column of the target schema has an entry, possibly
/// `Null`. Relational columns are carried separately in [`Relations`].
pub type RowData = BTreeMap<String, Value>;

/// Relational fields (`parent_id`, `translation_id`, `prev_id`, `next_id`)
/// for one record. Only keys the target schema declares are ever present;
/// `prev_id`/`next_id` appear only for members of a materialized sibling
/// chain. Values are ids from the current batch, or `Null`.
pub type Relations = BTreeMap<String, Value>;

/// The minimal write set for one run, derived from the fingerprint delta.
///
/// Built fresh each run and discarded after the transaction commits.
/// `inserts` and `updates` keep the scan-derived id order; `deletes` is
/// sorted ascending.
#[derive(Debug, Default)]
pub struct SyncPlan {
    pub inserts: Vec<i64>,
    pub updates: Vec<i64>,
    pub deletes: Vec<i64>,
    /// Fresh fingerprint per id, replacing the stored set wholesale.
    pub fingerprints: BTreeMap<i64, String>,
}

/// Observational run summary. Has no effect on control flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCounts {
    /// Files listed under the content directory, before any filtering.
    pub scanned: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}
