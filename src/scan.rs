//! Content file scanning: listing, front-matter parsing, id assignment.
//!
//! Output ordering contract: records come back sorted by path length
//! ascending (ties broken by path). Records for a directory's index file
//! therefore precede records nested deeper inside that directory, which the
//! normalizer's slug cache and the hierarchy calculator's parent lookups
//! depend on. Consumers must preserve this order.

use std::collections::{BTreeMap, HashSet};

use anyhow::Result;
use serde_json::Value;

use crate::models::RawRecord;
use crate::report::Reporter;
use crate::store::FileStore;

/// The scanner's result: ordered records, all ids resolved.
pub struct ScanOutcome {
    pub records: Vec<RawRecord>,
    /// Paths that were parsed without an `id` key, in assignment order.
    /// These files need their freshly allocated id written back.
    pub new_paths: Vec<String>,
    /// Files listed under the directory, before subdirectory filtering.
    pub scanned: usize,
}

/// Scan one content-type directory into records.
///
/// `subdirs` is an optional comma-separated set of subdirectory names;
/// when present, only files whose immediate parent directory is one of
/// `<dir>/<name>` are parsed. `max_stored_id` is the highest id currently
/// present in the target table; new ids continue above both it and the
/// highest id found in the files, as one contiguous ascending run.
pub fn scan(
    store: &dyn FileStore,
    dir: &str,
    subdirs: Option<&str>,
    max_stored_id: i64,
    reporter: &mut Reporter,
) -> Result<ScanOutcome> {
    let mut files = store.list_files(dir)?;
    let scanned = files.len();

    // Parent records must come first so children can resolve them by path.
    files.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

    let filter: Option<Vec<String>> = subdirs.map(|set| {
        set.split(',')
            .map(|name| format!("{}/{}", dir, name.trim()))
            .collect()
    });

    let mut parsed: Vec<Parsed> = Vec::new();
    let mut seen_ids: HashSet<i64> = HashSet::new();

    for path in files {
        if let Some(allowed) = &filter {
            let parent = path.rsplit_once('/').map(|(head, _)| head).unwrap_or("");
            if !allowed.iter().any(|candidate| candidate == parent) {
                continue;
            }
        }

        let contents = match store.read(&path) {
            Ok(contents) => contents,
            Err(err) => {
                reporter.add_error(format!("Cannot read file {}: {}.", path, err));
                continue;
            }
        };

        let Some((meta, body, id)) = parse_file(&path, &contents, reporter) else {
            continue;
        };

        if let Some(id) = id {
            if !seen_ids.insert(id) {
                reporter.add_error(format!("Duplicate id {} in file {}.", id, path));
                continue;
            }
        }

        parsed.push(Parsed {
            path,
            id,
            meta,
            body,
        });
    }

    let max_in_files = parsed.iter().filter_map(|record| record.id).max().unwrap_or(0);
    let mut next_id = max_stored_id.max(max_in_files) + 1;

    let mut records = Vec::with_capacity(parsed.len());
    let mut new_paths = Vec::new();
    for record in parsed {
        let id = match record.id {
            Some(id) => id,
            None => {
                let id = next_id;
                next_id += 1;
                new_paths.push(record.path.clone());
                id
            }
        };
        let mut meta = record.meta;
        meta.insert("id".to_string(), Value::from(id));
        records.push(RawRecord {
            path: record.path,
            id,
            meta,
            body: record.body,
        });
    }

    Ok(ScanOutcome {
        records,
        new_paths,
        scanned,
    })
}

struct Parsed {
    path: String,
    id: Option<i64>,
    meta: BTreeMap<String, Value>,
    body: Option<String>,
}

/// Split file contents at the first `---` into the front-matter block and
/// the verbatim trailing body. No separator means no body.
fn split_front_matter(contents: &str) -> (&str, Option<&str>) {
    match contents.split_once("---") {
        Some((front, body)) => (front, Some(body)),
        None => (contents, None),
    }
}

type ParsedParts = (BTreeMap<String, Value>, Option<String>, Option<i64>);

fn parse_file(path: &str, contents: &str, reporter: &mut Reporter) -> Option<ParsedParts> {
    if contents.trim().is_empty() {
        reporter.add_error(format!("File {} is empty.", path));
        return None;
    }

    let (front, body) = split_front_matter(contents);

    let document: serde_yaml::Value = match serde_yaml::from_str(front) {
        Ok(document) => document,
        Err(err) => {
            reporter.add_error(format!("Yaml parse error in file {}: {}.", path, err));
            return None;
        }
    };
    let mapping = match document {
        serde_yaml::Value::Mapping(mapping) => mapping,
        _ => {
            reporter.add_error(format!("Front matter in file {} is not a mapping.", path));
            return None;
        }
    };

    let mut meta = BTreeMap::new();
    for (key, value) in mapping {
        let key = match key {
            serde_yaml::Value::String(key) => key,
            other => {
                reporter.add_error(format!(
                    "Front matter in file {} has a non-string key: {:?}.",
                    path, other
                ));
                return None;
            }
        };
        let value = match serde_json::to_value(&value) {
            Ok(value) => value,
            Err(err) => {
                reporter.add_error(format!(
                    "Front matter value for {} in file {} is not representable: {}.",
                    key, path, err
                ));
                return None;
            }
        };
        meta.insert(key, value);
    }

    let id = match meta.get("id") {
        None => None,
        Some(value) => match value.as_i64() {
            Some(id) => Some(id),
            None => {
                reporter.add_error(format!("Field id in file {} is not an integer.", path));
                return None;
            }
        },
    };

    Some((meta, body.map(str::to_string), id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryFileStore;

    fn scan_store(store: &MemoryFileStore, subdirs: Option<&str>, max_stored_id: i64) -> (ScanOutcome, Reporter) {
        let mut reporter = Reporter::new();
        let outcome = scan(store, "pages", subdirs, max_stored_id, &mut reporter).unwrap();
        (outcome, reporter)
    }

    #[test]
    fn test_orders_by_path_length() {
        let store = MemoryFileStore::new();
        store.insert("pages/guides/setup/index.md", "id: 3");
        store.insert("pages/index.md", "id: 1");
        store.insert("pages/guides/index.md", "id: 2");

        let (outcome, reporter) = scan_store(&store, None, 0);
        assert!(!reporter.has_errors());
        let paths: Vec<&str> = outcome.records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "pages/index.md",
                "pages/guides/index.md",
                "pages/guides/setup/index.md"
            ]
        );
    }

    #[test]
    fn test_body_split_and_missing_body() {
        let store = MemoryFileStore::new();
        store.insert("pages/index.md", "id: 1\ntitle: Home\n---\nHello **world**\n");
        store.insert("pages/a/index.md", "id: 2\ntitle: Bare");

        let (outcome, _) = scan_store(&store, None, 0);
        assert_eq!(outcome.records[0].body.as_deref(), Some("\nHello **world**\n"));
        assert_eq!(outcome.records[1].body, None);
        assert_eq!(
            outcome.records[0].meta.get("title").and_then(|v| v.as_str()),
            Some("Home")
        );
    }

    #[test]
    fn test_empty_file_is_reported_and_skipped() {
        let store = MemoryFileStore::new();
        store.insert("pages/index.md", "   \n");
        let (outcome, reporter) = scan_store(&store, None, 0);
        assert!(outcome.records.is_empty());
        assert_eq!(reporter.errors(), &["File pages/index.md is empty."]);
    }

    #[test]
    fn test_bad_yaml_is_reported_and_skipped() {
        let store = MemoryFileStore::new();
        store.insert("pages/index.md", "id: 1\ntitle: [unclosed\n");
        store.insert("pages/a/index.md", "id: 2");
        let (outcome, reporter) = scan_store(&store, None, 0);
        assert_eq!(outcome.records.len(), 1);
        assert!(reporter.has_errors());
        assert!(reporter.errors()[0].starts_with("Yaml parse error in file pages/index.md"));
    }

    #[test]
    fn test_new_ids_continue_above_db_and_files() {
        let store = MemoryFileStore::new();
        store.insert("pages/index.md", "id: 4\ntitle: Root");
        store.insert("pages/a/index.md", "title: A");
        store.insert("pages/b/index.md", "title: B");

        let (outcome, _) = scan_store(&store, None, 10);
        let ids: Vec<i64> = outcome.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 11, 12]);
        assert_eq!(outcome.new_paths, vec!["pages/a/index.md", "pages/b/index.md"]);
        // The allocated id lands in the metadata too.
        assert_eq!(
            outcome.records[1].meta.get("id").and_then(|v| v.as_i64()),
            Some(11)
        );
    }

    #[test]
    fn test_duplicate_id_drops_second_file() {
        let store = MemoryFileStore::new();
        store.insert("pages/a/index.md", "id: 5\ntitle: First");
        store.insert("pages/b/index.md", "id: 5\ntitle: Second");

        let (outcome, reporter) = scan_store(&store, None, 0);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].path, "pages/a/index.md");
        assert_eq!(reporter.errors(), &["Duplicate id 5 in file pages/b/index.md."]);
    }

    #[test]
    fn test_subdir_filter_matches_immediate_parent_only() {
        let store = MemoryFileStore::new();
        store.insert("pages/index.md", "id: 1");
        store.insert("pages/guides/index.md", "id: 2");
        store.insert("pages/guides/deep/index.md", "id: 3");
        store.insert("pages/notes/index.md", "id: 4");

        let (outcome, _) = scan_store(&store, Some("guides,notes"), 0);
        let paths: Vec<&str> = outcome.records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["pages/guides/index.md", "pages/notes/index.md"]);
        // The scanned count still reflects the whole directory.
        assert_eq!(outcome.scanned, 4);
    }

    #[test]
    fn test_non_integer_id_is_reported() {
        let store = MemoryFileStore::new();
        store.insert("pages/index.md", "id: twelve");
        let (outcome, reporter) = scan_store(&store, None, 0);
        assert!(outcome.records.is_empty());
        assert_eq!(
            reporter.errors(),
            &["Field id in file pages/index.md is not an integer."]
        );
    }
}
