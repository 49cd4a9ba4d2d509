use super::error::StoreResult;
use super::filter::Filter;
use crate::core::{Collection, Document, EntityId};
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// A relation path to hydrate from another collection on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Populate {
    pub path: &'static str,
    pub collection: Collection,
    /// Targets with this field set (non-null) are treated as absent.
    pub hidden_by: Option<&'static str>,
}

impl Populate {
    pub const fn new(path: &'static str, collection: Collection) -> Self {
        Self {
            path,
            collection,
            hidden_by: None,
        }
    }

    pub const fn hidden_by(mut self, field: &'static str) -> Self {
        self.hidden_by = Some(field);
        self
    }

    /// Whether `target` may be hydrated into this path.
    pub fn shows(&self, target: &Document) -> bool {
        self.hidden_by
            .is_none_or(|field| target.get(field).is_none_or(JsonValue::is_null))
    }
}

/// Skip/limit window of a find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    pub skip: u64,
    pub limit: Option<u64>,
}

impl Window {
    pub fn page(page: u32, page_size: u32) -> Self {
        Self {
            skip: u64::from(page) * u64::from(page_size),
            limit: Some(u64::from(page_size)),
        }
    }
}

/// Update operators applied to the single matched document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSpec {
    pub set: Document,
    pub unset: Vec<String>,
    /// Values appended to an array field unless already present.
    pub add_to_set: Vec<(String, Vec<JsonValue>)>,
    /// Values removed from an array field.
    pub pull: Vec<(String, Vec<JsonValue>)>,
}

impl UpdateSpec {
    pub fn set(document: Document) -> Self {
        Self {
            set: document,
            ..Self::default()
        }
    }

    pub fn with_set(mut self, field: impl Into<String>, value: JsonValue) -> Self {
        self.set.insert(field.into(), value);
        self
    }

    pub fn add_to_set(mut self, field: impl Into<String>, values: Vec<JsonValue>) -> Self {
        self.add_to_set.push((field.into(), values));
        self
    }

    pub fn pull(mut self, field: impl Into<String>, values: Vec<JsonValue>) -> Self {
        self.pull.push((field.into(), values));
        self
    }
}

/// Acknowledgement of a single-document insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertAck {
    pub acknowledged: bool,
    pub inserted_id: Option<EntityId>,
}

/// Outcome of a filtered single-document update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateAck {
    pub matched_count: u64,
    pub modified_count: u64,
    /// Identifier of the modified document, when one was modified.
    pub modified_id: Option<EntityId>,
}

/// Outcome of a filtered single-document delete.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteAck {
    pub deleted_count: u64,
}

/// The schemaless document store the integrity layer sits on.
///
/// The store offers no foreign keys: population of a relation whose target
/// is gone yields `null` (singular) or drops the entry (plural).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// First document matching `filter`, with `populate` paths hydrated.
    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
        populate: &[Populate],
    ) -> StoreResult<Option<Document>>;

    /// Documents matching `filter` in insertion order, windowed and hydrated.
    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        window: Window,
        populate: &[Populate],
    ) -> StoreResult<Vec<Document>>;

    async fn count(&self, collection: Collection, filter: &Filter) -> StoreResult<u64>;

    /// Inserts one document; the store assigns `_id` when absent.
    async fn insert_one(&self, collection: Collection, document: Document) -> StoreResult<InsertAck>;

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &UpdateSpec,
    ) -> StoreResult<UpdateAck>;

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> StoreResult<DeleteAck>;

    /// Structural validation of a candidate document without writing it.
    async fn validate(&self, collection: Collection, document: &Document) -> StoreResult<()>;
}
