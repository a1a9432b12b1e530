//! Relational-field derivation from structural position.
//!
//! Nothing here comes from the front matter: parent linkage falls out of
//! directory nesting, translation pairing out of a filename convention, and
//! prev/next navigation out of ordering sibling groups ("books") and
//! flattening their subtrees into linear chains.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::models::{RawRecord, Relations, RowData};
use crate::schema::TargetSchema;

pub struct HierarchyCalculator<'a> {
    schema: &'a TargetSchema,
    overflow_column: &'a str,
    translation_locale: &'a str,
}

impl<'a> HierarchyCalculator<'a> {
    pub fn new(
        schema: &'a TargetSchema,
        overflow_column: &'a str,
        translation_locale: &'a str,
    ) -> Self {
        Self {
            schema,
            overflow_column,
            translation_locale,
        }
    }

    /// Produce the relation set for the batch. Only columns the schema
    /// declares are computed; every referenced id belongs to the batch.
    pub fn calculate(
        &self,
        records: &[RawRecord],
        rows: &BTreeMap<i64, RowData>,
    ) -> BTreeMap<i64, Relations> {
        let mut relations: BTreeMap<i64, Relations> = BTreeMap::new();
        let by_path: HashMap<&str, i64> = records
            .iter()
            .map(|record| (record.path.as_str(), record.id))
            .collect();

        let parents = self.calculate_parents(records, &by_path, &mut relations);
        self.calculate_translations(records, &by_path, &mut relations);
        self.calculate_siblings(records, rows, &parents, &mut relations);

        relations
    }

    /// Parent = the record at the same filename one directory level up.
    /// Only index-form files have parents; the rewrite keeps a locale
    /// prefix, so a translated page's parent is the translated parent.
    fn calculate_parents(
        &self,
        records: &[RawRecord],
        by_path: &HashMap<&str, i64>,
        relations: &mut BTreeMap<i64, Relations>,
    ) -> HashMap<i64, Option<i64>> {
        let mut parents = HashMap::new();
        if !self.schema.has("parent_id") {
            return parents;
        }

        for record in records {
            let parent_id = parent_lookup_path(&record.path)
                .and_then(|path| by_path.get(path.as_str()).copied());
            relations
                .entry(record.id)
                .or_default()
                .insert("parent_id".to_string(), id_value(parent_id));
            parents.insert(record.id, parent_id);
        }
        parents
    }

    /// The translation counterpart swaps the bare filename and the
    /// translation-locale-prefixed one within the same directory:
    /// `index.md` ↔ `en.index.md`.
    fn calculate_translations(
        &self,
        records: &[RawRecord],
        by_path: &HashMap<&str, i64>,
        relations: &mut BTreeMap<i64, Relations>,
    ) {
        if !self.schema.has("translation_id") {
            return;
        }

        let prefix = format!("{}.", self.translation_locale);
        for record in records {
            let (dir, filename) = match record.path.rsplit_once('/') {
                Some(split) => split,
                None => ("", record.path.as_str()),
            };
            let counterpart = match filename.strip_prefix(&prefix) {
                Some(bare) => bare.to_string(),
                None => format!("{}{}", prefix, filename),
            };
            let lookup = if dir.is_empty() {
                counterpart
            } else {
                format!("{}/{}", dir, counterpart)
            };
            let translation_id = by_path.get(lookup.as_str()).copied();
            relations
                .entry(record.id)
                .or_default()
                .insert("translation_id".to_string(), id_value(translation_id));
        }
    }

    /// Group published records by parent, order each group, flatten eligible
    /// books depth-first, and link neighbors. Groups are visited in
    /// first-seen (scan) order; a deeper book's assignments overwrite an
    /// ancestor's for the members they share, so chains end up confined to
    /// the deepest materialized book.
    fn calculate_siblings(
        &self,
        records: &[RawRecord],
        rows: &BTreeMap<i64, RowData>,
        parents: &HashMap<i64, Option<i64>>,
        relations: &mut BTreeMap<i64, Relations>,
    ) {
        if !(self.schema.has("prev_id") && self.schema.has("next_id")) {
            return;
        }

        let mut group_order: Vec<i64> = Vec::new();
        let mut groups: HashMap<i64, Vec<Member>> = HashMap::new();

        for record in records {
            let parent = match parents.get(&record.id) {
                Some(Some(parent)) => *parent,
                _ => continue,
            };
            let row = match rows.get(&record.id) {
                Some(row) => row,
                None => continue,
            };
            if self.unpublished(row) {
                continue;
            }
            let member = Member {
                id: record.id,
                route: row
                    .get("route")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
                weight: row.get("weight").and_then(Value::as_i64).unwrap_or(0),
            };
            if !groups.contains_key(&parent) {
                group_order.push(parent);
            }
            groups.entry(parent).or_default().push(member);
        }

        // weight is the primary ordering key; the preceding descending
        // route sort is a stable tie-break, so equal weights order by
        // route descending. This exact double sort is a contract.
        for members in groups.values_mut() {
            members.sort_by(|a, b| b.route.cmp(&a.route));
            members.sort_by_key(|member| member.weight);
        }

        let adjacency: HashMap<i64, Vec<i64>> = groups
            .iter()
            .map(|(parent, members)| {
                (*parent, members.iter().map(|member| member.id).collect())
            })
            .collect();

        for root in group_order {
            if self.nested_root(root, parents) {
                continue;
            }
            let chain = flatten_book(&adjacency, root);
            for (position, id) in chain.iter().enumerate() {
                let entry = relations.entry(*id).or_default();
                entry.insert(
                    "prev_id".to_string(),
                    id_value(position.checked_sub(1).map(|p| chain[p])),
                );
                entry.insert(
                    "next_id".to_string(),
                    id_value(chain.get(position + 1).copied()),
                );
            }
        }
    }

    /// A book is skipped when its root is itself nested below another book
    /// root; such subtrees are reached by splicing instead.
    fn nested_root(&self, root: i64, parents: &HashMap<i64, Option<i64>>) -> bool {
        match parents.get(&root).copied().flatten() {
            Some(parent) => parents.get(&parent).copied().flatten().is_some(),
            None => false,
        }
    }

    fn unpublished(&self, row: &RowData) -> bool {
        row.get(self.overflow_column)
            .and_then(Value::as_str)
            .map_or(false, |overflow| overflow.contains("\"unpublished\""))
    }
}

struct Member {
    id: i64,
    route: String,
    weight: i64,
}

/// The path a record's parent lives at, if the record can have one.
///
/// Defined for index-form filenames only: the last directory is removed,
/// the filename kept. `pages/guides/setup/index.md` → `pages/guides/index.md`;
/// a root-level index resolves to a prefix-less path no record occupies.
fn parent_lookup_path(path: &str) -> Option<String> {
    let (dir, filename) = path.rsplit_once('/')?;
    if !is_index_filename(filename) {
        return None;
    }
    Some(match dir.rsplit_once('/') {
        Some((prefix, _)) => format!("{}/{}", prefix, filename),
        None => filename.to_string(),
    })
}

/// `index.md` or a two-character-prefixed `xx.index.md`.
fn is_index_filename(filename: &str) -> bool {
    filename == "index.md"
        || filename
            .strip_suffix(".index.md")
            .map_or(false, |prefix| prefix.chars().count() == 2)
}

/// Iterative pre-order flattening of a book's subtree: each child is
/// emitted, then its own ordered subtree immediately after it, matching
/// in-place splicing of grandchildren.
fn flatten_book(adjacency: &HashMap<i64, Vec<i64>>, root: i64) -> Vec<i64> {
    let mut chain = Vec::new();
    let mut stack: Vec<i64> = match adjacency.get(&root) {
        Some(children) => children.iter().rev().copied().collect(),
        None => return chain,
    };
    while let Some(id) = stack.pop() {
        chain.push(id);
        if let Some(children) = adjacency.get(&id) {
            stack.extend(children.iter().rev().copied());
        }
    }
    chain
}

fn id_value(id: Option<i64>) -> Value {
    match id {
        Some(id) => Value::from(id),
        None => Value::Null,
    }
}
