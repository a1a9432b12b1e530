//! Raw-record to table-row conversion.
//!
//! Each schema column gets its value from a fixed derivation rule: derived
//! (`route`, `slug`, `depth`, `locale`), defaulted (`weight`), rendered
//! (`body`), collected (the overflow column), or copied verbatim from the
//! front matter. Relational columns are left to the hierarchy calculator.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::models::{RawRecord, RowData};
use crate::render::BodyRenderer;
use crate::report::Reporter;
use crate::schema::{TargetSchema, FOREIGN_COLUMNS};

pub struct Normalizer<'a> {
    schema: &'a TargetSchema,
    default_locale: &'a str,
    overflow_column: &'a str,
    renderer: &'a dyn BodyRenderer,
    /// Raw route → resolved slug path, filled as records stream through.
    /// Correct only because records arrive in non-decreasing path-length
    /// order: a child's parent route is always cached before the child.
    slug_routes: HashMap<String, String>,
}

impl<'a> Normalizer<'a> {
    pub fn new(
        schema: &'a TargetSchema,
        default_locale: &'a str,
        overflow_column: &'a str,
        renderer: &'a dyn BodyRenderer,
    ) -> Self {
        Self {
            schema,
            default_locale,
            overflow_column,
            renderer,
            slug_routes: HashMap::new(),
        }
    }

    /// Convert records, in scan order, into row data keyed by id.
    pub fn run(&mut self, records: &[RawRecord], reporter: &mut Reporter) -> BTreeMap<i64, RowData> {
        let mut rows = BTreeMap::new();
        for record in records {
            rows.insert(record.id, self.convert(record, reporter));
        }
        rows
    }

    fn convert(&mut self, record: &RawRecord, reporter: &mut Reporter) -> RowData {
        let route = self.file_route(record);

        let mut data = RowData::new();
        for column in self.schema.columns() {
            if FOREIGN_COLUMNS.contains(&column.name.as_str()) {
                continue;
            }

            let value = match column.name.as_str() {
                "route" => Value::String(route.clone()),
                "slug" => match record.meta.get("slug") {
                    Some(slug) if !slug.is_null() => slug.clone(),
                    _ => Value::String(last_segment(&route).to_string()),
                },
                "depth" => Value::from(record.path.matches('/').count() as i64 - 1),
                "weight" => record.meta.get("weight").cloned().unwrap_or(Value::from(0)),
                "body" => match record.effective_body() {
                    Some(body) if !body.is_empty() => {
                        Value::String(self.renderer.render(body))
                    }
                    _ => Value::Null,
                },
                "locale" => Value::String(self.locale(&record.path)),
                name if name == self.overflow_column => {
                    Value::String(self.overflow_json(record))
                }
                other => record.meta.get(other).cloned().unwrap_or(Value::Null),
            };

            if column.max_length > 0 {
                if let Value::String(text) = &value {
                    if text.chars().count() as i64 > column.max_length {
                        reporter.add_error(format!(
                            "Field {} is too long in file {}.",
                            column.name, record.path
                        ));
                    }
                }
            }

            data.insert(column.name.clone(), value);
        }
        data
    }

    /// The record's position in the hierarchy as a slash-joined slug path.
    ///
    /// The raw route is the directory chain with the content-type prefix and
    /// the filename stripped. Index files keep it verbatim. Other files
    /// substitute their own slug and their parent's resolved slug path
    /// (from the cache, falling back to the raw parent prefix), and cache
    /// the result under the raw route for their descendants.
    fn file_route(&mut self, record: &RawRecord) -> String {
        let path = record
            .path
            .split_once('/')
            .map(|(_, rest)| rest)
            .unwrap_or("");
        let raw_route = path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        let filename = path.rsplit('/').next().unwrap_or(path);

        if filename == "index.md" || raw_route.is_empty() {
            return raw_route.to_string();
        }

        let (parent_route, leaf) = match raw_route.rsplit_once('/') {
            Some((parent, leaf)) => (parent, leaf),
            None => ("", raw_route),
        };

        let slug = match record.meta.get("slug") {
            Some(Value::String(slug)) => slug.clone(),
            Some(Value::Null) | None => leaf.to_string(),
            Some(other) => other.to_string(),
        };

        let slug_route = if parent_route.is_empty() {
            slug
        } else {
            let parent_slug = self
                .slug_routes
                .get(parent_route)
                .map(String::as_str)
                .unwrap_or(parent_route);
            format!("{}/{}", parent_slug, slug)
        };

        self.slug_routes
            .insert(raw_route.to_string(), slug_route.clone());
        slug_route
    }

    fn locale(&self, path: &str) -> String {
        let filename = path.rsplit('/').next().unwrap_or(path);
        let parts: Vec<&str> = filename.split('.').collect();
        if parts.len() == 3 && parts[0].chars().count() == 2 {
            parts[0].to_string()
        } else {
            self.default_locale.to_string()
        }
    }

    /// Key-sorted JSON of every metadata key no schema column consumes.
    /// Sorting keeps fingerprints stable across front-matter reorderings.
    fn overflow_json(&self, record: &RawRecord) -> String {
        let extras: BTreeMap<&String, &Value> = record
            .meta
            .iter()
            .filter(|(key, _)| !self.schema.has(key))
            .collect();
        serde_json::to_string(&extras).unwrap_or_else(|_| "{}".to_string())
    }
}

fn last_segment(route: &str) -> &str {
    route.rsplit('/').next().unwrap_or(route)
}
