use anyhow::{Context, Result, anyhow, bail};
use docintegrity::{Collection, Document, MemoryDocumentStore};
use serde_json::Value as JsonValue;
use std::path::Path;
use tracing::info;

/// Documents to seed, grouped by collection.
///
/// The file is one JSON object keyed by collection name, each value an
/// array of documents. Documents may carry their own `_id` so fixtures can
/// reference each other.
#[derive(Debug, Default)]
pub struct Fixtures {
    pub collections: Vec<(Collection, Vec<Document>)>,
}

impl Fixtures {
    pub fn parse(raw: &str) -> Result<Self> {
        let value: JsonValue = serde_json::from_str(raw).context("fixtures are not valid JSON")?;
        let JsonValue::Object(entries) = value else {
            bail!("fixtures must be a JSON object keyed by collection name");
        };

        let mut collections = Vec::with_capacity(entries.len());
        for (name, documents) in entries {
            let collection: Collection = name.parse().map_err(|err: String| anyhow!(err))?;
            let JsonValue::Array(items) = documents else {
                bail!("fixtures for '{}' must be an array", name);
            };

            let documents = items
                .into_iter()
                .enumerate()
                .map(|(index, item)| match item {
                    JsonValue::Object(document) => Ok(document),
                    other => Err(anyhow!(
                        "fixture {} of '{}' is not an object: {}",
                        index,
                        name,
                        other
                    )),
                })
                .collect::<Result<Vec<_>>>()?;
            collections.push((collection, documents));
        }
        Ok(Self { collections })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixtures {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid fixtures {}", path.display()))
    }

    /// Imports every document as-is, without schema validation.
    pub async fn seed(self, store: &MemoryDocumentStore) -> Result<()> {
        for (collection, documents) in self.collections {
            let count = documents.len();
            store
                .import(collection, documents)
                .await
                .with_context(|| format!("failed to seed '{}'", collection))?;
            info!(collection = %collection, count, "fixtures seeded");
        }
        Ok(())
    }
}
