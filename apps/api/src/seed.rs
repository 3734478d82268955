use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::info;

use crate::store::{Collection, DocumentStore};

/// Artifact written by the transform for each collection.
fn artifact_name(collection: Collection) -> &'static str {
    match collection {
        Collection::Jobs => "jobs_nested.json",
        Collection::Companies => "companies.json",
        Collection::Industry => "industry_info.json",
    }
}

/// Loads the transform's artifacts into every collection that is still empty.
/// Collections that already hold documents are left alone, so restarting
/// with the same `SEED_DIR` is harmless.
pub async fn seed_empty_collections(store: &dyn DocumentStore, dir: &Path) -> Result<()> {
    for collection in Collection::ALL {
        let existing = store.count(collection).await?;
        if existing > 0 {
            info!(
                "Skipping seed for '{}': {existing} document(s) present",
                collection.name()
            );
            continue;
        }

        let path = dir.join(artifact_name(collection));
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;
        let records: Vec<Value> = serde_json::from_str(&raw)
            .with_context(|| format!("Seed file {} is not a JSON array", path.display()))?;

        let mut loaded = 0usize;
        for record in records {
            let Value::Object(body) = record else {
                bail!("Seed file {} contains a non-object record", path.display());
            };
            store.insert(collection, body).await?;
            loaded += 1;
        }
        info!("Seeded '{}' with {loaded} document(s)", collection.name());
    }
    Ok(())
}
