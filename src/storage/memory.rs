use super::engine::{DeleteAck, DocumentStore, InsertAck, Populate, UpdateAck, UpdateSpec, Window};
use super::error::{StoreError, StoreResult};
use super::filter::Filter;
use super::schema::CollectionSchema;
use crate::core::{Collection, Document, EntityId, ID_FIELD};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Default name of the per-document revision counter.
pub const DEFAULT_VERSION_MARKER: &str = "__v";

/// In-process [`DocumentStore`] keeping every collection as an ordered list
/// of JSON documents.
///
/// Behaves like a schemaless document database: `_id` and the version
/// counter are assigned on insert, the counter is bumped on every modifying
/// update, and relations are hydrated on read without any referential
/// checks.
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
    schemas: HashMap<Collection, CollectionSchema>,
    version_marker: String,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            schemas: HashMap::new(),
            version_marker: DEFAULT_VERSION_MARKER.to_string(),
        }
    }

    /// Registers the schema checked by [`DocumentStore::validate`].
    pub fn with_schema(mut self, collection: Collection, schema: CollectionSchema) -> Self {
        self.schemas.insert(collection, schema);
        self
    }

    pub fn with_schemas<I>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = (Collection, CollectionSchema)>,
    {
        self.schemas.extend(schemas);
        self
    }

    pub fn with_version_marker(mut self, marker: impl Into<String>) -> Self {
        self.version_marker = marker.into();
        self
    }

    pub fn version_marker(&self) -> &str {
        &self.version_marker
    }

    /// Inserts documents as-is (bypassing validation), returning their ids.
    pub async fn import(
        &self,
        collection: Collection,
        documents: Vec<Document>,
    ) -> StoreResult<Vec<EntityId>> {
        let mut ids = Vec::with_capacity(documents.len());
        for document in documents {
            let ack = self.insert_one(collection, document).await?;
            if let Some(id) = ack.inserted_id {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Number of stored documents, ignoring any filter.
    pub async fn len(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map_or(0, Vec::len)
    }

    pub async fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection).await == 0
    }

    /// Raw stored document, without population.
    pub async fn raw(&self, collection: Collection, id: EntityId) -> Option<Document> {
        let collections = self.collections.read().await;
        collections
            .get(&collection)
            .and_then(|documents| find_by_id(documents, &id))
            .cloned()
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn find_by_id<'a>(documents: &'a [Document], id: &EntityId) -> Option<&'a Document> {
    let needle = id.to_json();
    documents
        .iter()
        .find(|document| document.get(ID_FIELD) == Some(&needle))
}

fn populate(
    collections: &HashMap<Collection, Vec<Document>>,
    mut document: Document,
    paths: &[Populate],
) -> Document {
    for spec in paths {
        let Some(value) = document.get_mut(spec.path) else {
            continue;
        };
        let targets = collections
            .get(&spec.collection)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let hydrate = |reference: &JsonValue| -> Option<JsonValue> {
            let id = EntityId::from_json(reference)?;
            find_by_id(targets, &id)
                .filter(|target| spec.shows(target))
                .cloned()
                .map(JsonValue::Object)
        };

        match value {
            JsonValue::Array(items) => {
                let hydrated = items.iter().filter_map(hydrate).collect();
                *value = JsonValue::Array(hydrated);
            }
            JsonValue::Null => {}
            single => {
                *single = hydrate(&*single).unwrap_or(JsonValue::Null);
            }
        }
    }
    document
}

fn apply_update(
    collection: Collection,
    document: &mut Document,
    update: &UpdateSpec,
) -> StoreResult<()> {
    for (field, value) in &update.set {
        document.insert(field.clone(), value.clone());
    }
    for field in &update.unset {
        document.remove(field);
    }
    for (field, values) in &update.add_to_set {
        let items = array_field(collection, document, field)?;
        for value in values {
            if !items.contains(value) {
                items.push(value.clone());
            }
        }
    }
    for (field, values) in &update.pull {
        let items = array_field(collection, document, field)?;
        items.retain(|item| !values.contains(item));
    }
    Ok(())
}

fn array_field<'a>(
    collection: Collection,
    document: &'a mut Document,
    field: &str,
) -> StoreResult<&'a mut Vec<JsonValue>> {
    let slot = document
        .entry(field.to_string())
        .or_insert_with(|| JsonValue::Array(Vec::new()));
    if slot.is_null() {
        *slot = JsonValue::Array(Vec::new());
    }
    slot.as_array_mut().ok_or_else(|| StoreError::Malformed {
        collection,
        reason: format!("field '{}' is not an array", field),
    })
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
        populate_paths: &[Populate],
    ) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        let found = collections
            .get(&collection)
            .and_then(|documents| documents.iter().find(|document| filter.matches(document)))
            .cloned();
        Ok(found.map(|document| populate(&collections, document, populate_paths)))
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        window: Window,
        populate_paths: &[Populate],
    ) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(&collection) else {
            return Ok(Vec::new());
        };

        let skip = usize::try_from(window.skip).unwrap_or(usize::MAX);
        let limit = window
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));

        Ok(documents
            .iter()
            .filter(|document| filter.matches(document))
            .skip(skip)
            .take(limit)
            .cloned()
            .map(|document| populate(&collections, document, populate_paths))
            .collect())
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> StoreResult<u64> {
        let collections = self.collections.read().await;
        let count = collections.get(&collection).map_or(0, |documents| {
            documents
                .iter()
                .filter(|document| filter.matches(document))
                .count()
        });
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn insert_one(
        &self,
        collection: Collection,
        mut document: Document,
    ) -> StoreResult<InsertAck> {
        let id = match document.get(ID_FIELD) {
            None | Some(JsonValue::Null) => EntityId::new(),
            Some(raw) => EntityId::from_json(raw).ok_or_else(|| StoreError::Malformed {
                collection,
                reason: format!("'{}' is not a valid identifier: {}", ID_FIELD, raw),
            })?,
        };

        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection).or_default();
        if find_by_id(documents, &id).is_some() {
            return Err(StoreError::Malformed {
                collection,
                reason: format!("duplicate {} {}", ID_FIELD, id),
            });
        }

        document.insert(ID_FIELD.to_string(), id.to_json());
        document.insert(self.version_marker.clone(), JsonValue::from(0));
        documents.push(document);

        Ok(InsertAck {
            acknowledged: true,
            inserted_id: Some(id),
        })
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &UpdateSpec,
    ) -> StoreResult<UpdateAck> {
        let mut collections = self.collections.write().await;
        let Some(document) = collections
            .get_mut(&collection)
            .and_then(|documents| documents.iter_mut().find(|document| filter.matches(document)))
        else {
            return Ok(UpdateAck::default());
        };

        // All operators land or none do.
        let mut updated = document.clone();
        apply_update(collection, &mut updated, update)?;
        if updated == *document {
            return Ok(UpdateAck {
                matched_count: 1,
                modified_count: 0,
                modified_id: None,
            });
        }

        let revision = updated
            .get(&self.version_marker)
            .and_then(JsonValue::as_u64)
            .unwrap_or(0);
        updated.insert(self.version_marker.clone(), JsonValue::from(revision + 1));
        *document = updated;

        Ok(UpdateAck {
            matched_count: 1,
            modified_count: 1,
            modified_id: document.get(ID_FIELD).and_then(EntityId::from_json),
        })
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> StoreResult<DeleteAck> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(&collection) else {
            return Ok(DeleteAck::default());
        };

        match documents.iter().position(|document| filter.matches(document)) {
            Some(index) => {
                documents.remove(index);
                Ok(DeleteAck { deleted_count: 1 })
            }
            None => Ok(DeleteAck::default()),
        }
    }

    async fn validate(&self, collection: Collection, document: &Document) -> StoreResult<()> {
        let Some(schema) = self.schemas.get(&collection) else {
            return Ok(());
        };

        let violations = schema.validate(document);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Validation {
                collection,
                violations,
            })
        }
    }
}
