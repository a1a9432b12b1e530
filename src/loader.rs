//! Run orchestration.
//!
//! A run has two explicit phases. The check phase is read-only: it scans
//! and converts the content directory, derives relations, fingerprints
//! everything, and builds the sync plan while collecting every recoverable
//! issue. The load phase commits the plan transactionally and backfills
//! freshly assigned ids into their files. Keeping the phases separate lets
//! the caller inspect the report before anything is written.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::fingerprint;
use crate::hierarchy::HierarchyCalculator;
use crate::models::{RawRecord, Relations, RowData, SyncCounts, SyncPlan};
use crate::normalize::Normalizer;
use crate::render::BodyRenderer;
use crate::report::Reporter;
use crate::scan;
use crate::schema::{self, TargetSchema};
use crate::store::FileStore;
use crate::sync::{self, Synchronizer};
use crate::writer;

/// Everything the check phase computed, ready for the load phase.
pub struct CheckedContent {
    pub records: Vec<RawRecord>,
    pub rows: BTreeMap<i64, RowData>,
    pub relations: BTreeMap<i64, Relations>,
    pub plan: SyncPlan,
    pub new_paths: Vec<String>,
    pub scanned: usize,
    pub schema: TargetSchema,
}

impl CheckedContent {
    pub fn counts(&self) -> SyncCounts {
        SyncCounts {
            scanned: self.scanned,
            created: self.plan.inserts.len(),
            updated: self.plan.updates.len(),
            deleted: self.plan.deletes.len(),
        }
    }
}

pub struct ContentLoader<'a> {
    pool: &'a SqlitePool,
    config: &'a Config,
    store: &'a dyn FileStore,
    renderer: &'a dyn BodyRenderer,
    dir: &'a str,
    subdirs: Option<&'a str>,
    content_type: String,
}

impl<'a> ContentLoader<'a> {
    pub fn new(
        pool: &'a SqlitePool,
        config: &'a Config,
        store: &'a dyn FileStore,
        renderer: &'a dyn BodyRenderer,
        dir: &'a str,
        subdirs: Option<&'a str>,
    ) -> Self {
        Self {
            pool,
            config,
            store,
            renderer,
            dir,
            subdirs,
            content_type: singularize(dir),
        }
    }

    /// The fingerprint subject type for this run (`pages` → `page`).
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Phase one: read and check. No writes anywhere; every recoverable
    /// issue lands in the reporter.
    pub async fn check(&self, reporter: &mut Reporter) -> Result<CheckedContent> {
        let table_ok = schema::table_exists(self.pool, self.dir).await?;
        if !table_ok {
            reporter.add_error(format!(
                "Table \"{}\" is missing in the database.",
                self.dir
            ));
        }

        let target = if table_ok {
            schema::load_schema(self.pool, self.dir).await?
        } else {
            TargetSchema::default()
        };

        let stored: HashMap<i64, String> = if table_ok {
            match sync::load_stored_fingerprints(self.pool, self.dir, &self.content_type).await {
                Ok(stored) => stored,
                Err(err) => {
                    reporter.add_error(format!(
                        "Error reading {} fingerprints from the database: {}.",
                        self.content_type, err
                    ));
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        let max_stored_id = if table_ok {
            schema::max_id(self.pool, self.dir).await?
        } else {
            0
        };

        let outcome = scan::scan(self.store, self.dir, self.subdirs, max_stored_id, reporter)?;

        let mut normalizer = Normalizer::new(
            &target,
            &self.config.content.default_locale,
            &self.config.sync.overflow_column,
            self.renderer,
        );
        let rows = normalizer.run(&outcome.records, reporter);

        let calculator = HierarchyCalculator::new(
            &target,
            &self.config.sync.overflow_column,
            &self.config.content.translation_locale,
        );
        let relations = calculator.calculate(&outcome.records, &rows);

        let plan = fingerprint::build_plan(&rows, &relations, &stored);

        Ok(CheckedContent {
            records: outcome.records,
            rows,
            relations,
            plan,
            new_paths: outcome.new_paths,
            scanned: outcome.scanned,
            schema: target,
        })
    }

    /// Phase two: commit the plan atomically, then backfill ids into the
    /// files that received one.
    pub async fn load(&self, checked: &CheckedContent) -> Result<SyncCounts> {
        let synchronizer =
            Synchronizer::new(self.pool, self.dir, &self.content_type, &checked.schema);
        synchronizer
            .apply(&checked.rows, &checked.relations, &checked.plan)
            .await?;

        writer::update_new_files(self.store, &checked.records, &checked.new_paths)?;

        Ok(checked.counts())
    }
}

/// Directory-name to subject-type reduction: `pages` → `page`,
/// `stories` → `story`, `statuses` → `status`.
pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    if let Some(stem) = word.strip_suffix("ses") {
        return format!("{}s", stem);
    }
    if word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("pages"), "page");
        assert_eq!(singularize("stories"), "story");
        assert_eq!(singularize("statuses"), "status");
        assert_eq!(singularize("glass"), "glass");
        assert_eq!(singularize("news"), "new");
    }
}
