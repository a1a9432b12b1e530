//! Backfilling freshly assigned ids into their originating files.
//!
//! Files are only ever rewritten to embed an id that was allocated during
//! the scan. Derived fields never flow back; a file whose id was already
//! known is never touched.

use std::collections::HashMap;

use anyhow::Result;

use crate::models::RawRecord;
use crate::store::FileStore;

/// Rewrite every file listed in `new_paths` with its record's resolved id.
pub fn update_new_files(
    store: &dyn FileStore,
    records: &[RawRecord],
    new_paths: &[String],
) -> Result<()> {
    let by_path: HashMap<&str, &RawRecord> = records
        .iter()
        .map(|record| (record.path.as_str(), record))
        .collect();

    for path in new_paths {
        if let Some(record) = by_path.get(path.as_str()) {
            store.write(path, &render_file(record)?)?;
        }
    }
    Ok(())
}

/// Front matter with `id` first and the remaining keys sorted; the body,
/// when present, follows a `---` separator verbatim.
fn render_file(record: &RawRecord) -> Result<String> {
    let mut mapping = serde_yaml::Mapping::new();
    mapping.insert(
        serde_yaml::Value::String("id".to_string()),
        serde_yaml::Value::Number(record.id.into()),
    );
    for (key, value) in &record.meta {
        if key == "id" || key == "body" {
            continue;
        }
        mapping.insert(
            serde_yaml::Value::String(key.clone()),
            serde_yaml::to_value(value)?,
        );
    }
    let front = serde_yaml::to_string(&mapping)?;

    Ok(match record.effective_body() {
        Some(body) if !body.is_empty() => format!("{}---{}", front, body),
        _ => front,
    })
}
