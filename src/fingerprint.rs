//! Content fingerprinting and change classification.
//!
//! A record's fingerprint digests everything that would be written for it:
//! the normalized row data merged with its relation set. The serialization
//! is key-sorted JSON, so logically identical content hashes identically no
//! matter what order the fields were produced in.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::models::{Relations, RowData, SyncPlan};

/// Hex SHA-256 over the canonical (key-sorted) JSON of row ∪ relations.
pub fn fingerprint(row: &RowData, relations: Option<&Relations>) -> String {
    let mut merged: BTreeMap<&String, &Value> = row.iter().collect();
    if let Some(relations) = relations {
        for (key, value) in relations {
            merged.insert(key, value);
        }
    }
    let canonical = serde_json::to_string(&merged).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Classify every fresh record against the stored fingerprint map and
/// derive the delete set from what storage has that the files no longer do.
pub fn build_plan(
    rows: &BTreeMap<i64, RowData>,
    relations: &BTreeMap<i64, Relations>,
    stored: &HashMap<i64, String>,
) -> SyncPlan {
    let mut plan = SyncPlan::default();

    for (id, row) in rows {
        let hash = fingerprint(row, relations.get(id));
        let unchanged = stored.get(id).map_or(false, |known| *known == hash);
        plan.fingerprints.insert(*id, hash);

        if unchanged {
            continue;
        }
        if stored.contains_key(id) {
            plan.updates.push(*id);
        } else {
            plan.inserts.push(*id);
        }
    }

    plan.deletes = stored
        .keys()
        .filter(|id| !rows.contains_key(id))
        .copied()
        .collect();
    plan.deletes.sort_unstable();

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(entries: &[(&str, Value)]) -> RowData {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_fingerprint_stable_across_runs() {
        let data = row(&[("id", json!(1)), ("title", json!("Home"))]);
        let relations = Relations::from([("parent_id".to_string(), Value::Null)]);
        assert_eq!(
            fingerprint(&data, Some(&relations)),
            fingerprint(&data, Some(&relations))
        );
    }

    #[test]
    fn test_fingerprint_changes_with_relations() {
        let data = row(&[("id", json!(1))]);
        let chained = Relations::from([("next_id".to_string(), json!(2))]);
        let unchained = Relations::from([("next_id".to_string(), Value::Null)]);
        assert_ne!(
            fingerprint(&data, Some(&chained)),
            fingerprint(&data, Some(&unchained))
        );
        assert_ne!(fingerprint(&data, Some(&chained)), fingerprint(&data, None));
    }

    #[test]
    fn test_classification() {
        let mut rows = BTreeMap::new();
        rows.insert(1, row(&[("id", json!(1)), ("title", json!("kept"))]));
        rows.insert(2, row(&[("id", json!(2)), ("title", json!("edited"))]));
        rows.insert(3, row(&[("id", json!(3)), ("title", json!("brand new"))]));
        let relations = BTreeMap::new();

        let mut stored = HashMap::new();
        stored.insert(1, fingerprint(&rows[&1], None));
        stored.insert(2, "something else".to_string());
        stored.insert(9, "gone".to_string());

        let plan = build_plan(&rows, &relations, &stored);
        assert_eq!(plan.inserts, vec![3]);
        assert_eq!(plan.updates, vec![2]);
        assert_eq!(plan.deletes, vec![9]);
        assert_eq!(plan.fingerprints.len(), 3);
    }

    #[test]
    fn test_unchanged_batch_plans_nothing() {
        let mut rows = BTreeMap::new();
        rows.insert(1, row(&[("id", json!(1))]));
        rows.insert(2, row(&[("id", json!(2))]));
        let mut relations = BTreeMap::new();
        relations.insert(1, Relations::from([("next_id".to_string(), json!(2))]));

        let stored: HashMap<i64, String> = rows
            .iter()
            .map(|(id, data)| (*id, fingerprint(data, relations.get(id))))
            .collect();

        let plan = build_plan(&rows, &relations, &stored);
        assert!(plan.inserts.is_empty());
        assert!(plan.updates.is_empty());
        assert!(plan.deletes.is_empty());
        assert_eq!(plan.fingerprints.len(), 2);
    }
}
