use crate::config::IntegrityConfig;
use crate::core::{
    ArgumentViolation, DELETED_AT_FIELD, Document, EntityId, IntegrityError, Result,
};
use crate::model::{Aggregate, DeletionMode};
use crate::storage::{DocumentStore, Filter, Window};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub results: Vec<T>,
    /// Total number of matching documents, across all pages.
    pub number_of_items: u64,
    pub page: u32,
    pub items_per_page: u32,
}

impl<T> Page<T> {
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> std::result::Result<U, E>) -> std::result::Result<Page<U>, E> {
        Ok(Page {
            results: self.results.into_iter().map(f).collect::<std::result::Result<_, _>>()?,
            number_of_items: self.number_of_items,
            page: self.page,
            items_per_page: self.items_per_page,
        })
    }

    pub fn total_pages(&self) -> u64 {
        if self.items_per_page == 0 {
            return 0;
        }
        self.number_of_items.div_ceil(u64::from(self.items_per_page))
    }
}

/// Single and paginated reads of one aggregate.
///
/// Every read hydrates the aggregate's relation paths and strips the
/// store's version marker from the document and from each hydrated
/// relation. Logically deleted documents are invisible.
pub struct PagedReader<A> {
    store: Arc<dyn DocumentStore>,
    config: IntegrityConfig,
    scope: Filter,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A> Clone for PagedReader<A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
            scope: self.scope.clone(),
            _aggregate: PhantomData,
        }
    }
}

impl<A: Aggregate> PagedReader<A> {
    pub fn new(store: Arc<dyn DocumentStore>, config: IntegrityConfig) -> Self {
        Self {
            store,
            config,
            scope: visible_scope::<A>(),
            _aggregate: PhantomData,
        }
    }

    /// Filter restricting reads to documents that are not logically deleted.
    pub fn scope(&self) -> &Filter {
        &self.scope
    }

    pub fn config(&self) -> &IntegrityConfig {
        &self.config
    }

    pub async fn get_by_id(&self, id: EntityId) -> Result<A> {
        let document = self.get_document(id).await?;
        decode::<A>(document)
    }

    /// Hydrated raw document with the version marker removed.
    pub async fn get_document(&self, id: EntityId) -> Result<Document> {
        let span = info_span!("reader.get_by_id", entity = A::ENTITY, id = %id);
        async move {
            let filter = Filter::by_id(id).and(&self.scope);
            let found = self
                .store
                .find_one(A::COLLECTION, &filter, A::POPULATE)
                .await
                .map_err(|err| {
                    event!(Level::ERROR, error = %err, "get_by_id failed");
                    IntegrityError::database("get_by_id", A::COLLECTION, err)
                })?;

            match found {
                Some(document) => Ok(self.strip(document)),
                None => {
                    event!(Level::DEBUG, "document not found");
                    Err(IntegrityError::not_found(A::COLLECTION, vec![id]))
                }
            }
        }
        .instrument(span)
        .await
    }

    pub async fn query(
        &self,
        filter: &Filter,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Page<A>> {
        self.query_documents(filter, page, page_size)
            .await?
            .try_map(decode::<A>)
    }

    /// Page `page` (zero-based) of the documents matching `filter`.
    ///
    /// Fails with `NotFound` when nothing matches and with
    /// `InvalidArgument` when the page or page size is out of range.
    pub async fn query_documents(
        &self,
        filter: &Filter,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Page<Document>> {
        let page = page.unwrap_or(0);
        let page_size = page_size.unwrap_or(self.config.default_page_size);
        let span = info_span!(
            "reader.query",
            entity = A::ENTITY,
            filter = %filter,
            page = page,
            page_size = page_size
        );

        async move {
            if page_size == 0 || page_size > self.config.max_page_size {
                return Err(IntegrityError::invalid_argument(
                    A::ENTITY,
                    ArgumentViolation::PageSize {
                        requested: page_size,
                        max: self.config.max_page_size,
                    },
                ));
            }

            let scoped = filter.clone().and(&self.scope);
            let count = self
                .store
                .count(A::COLLECTION, &scoped)
                .await
                .map_err(|err| {
                    event!(Level::ERROR, error = %err, "count failed");
                    IntegrityError::database("count", A::COLLECTION, err)
                })?;

            if count == 0 {
                return Err(IntegrityError::not_found_matching(
                    A::COLLECTION,
                    filter.clone(),
                ));
            }

            let total_pages = count.div_ceil(u64::from(page_size));
            if u64::from(page) >= total_pages {
                return Err(IntegrityError::invalid_argument(
                    A::ENTITY,
                    ArgumentViolation::PageOutOfRange { page, total_pages },
                ));
            }

            let documents = self
                .store
                .find(A::COLLECTION, &scoped, Window::page(page, page_size), A::POPULATE)
                .await
                .map_err(|err| {
                    event!(Level::ERROR, error = %err, "find failed");
                    IntegrityError::database("find", A::COLLECTION, err)
                })?;

            event!(
                Level::DEBUG,
                matched = count,
                returned = documents.len(),
                "query served"
            );
            Ok(Page {
                results: documents.into_iter().map(|document| self.strip(document)).collect(),
                number_of_items: count,
                page,
                items_per_page: page_size,
            })
        }
        .instrument(span)
        .await
    }

    /// Removes the version marker from the top level and from each
    /// hydrated relation. Nested user data is left alone.
    fn strip(&self, mut document: Document) -> Document {
        let marker = self.config.version_marker.as_str();
        document.remove(marker);
        for populate in A::POPULATE {
            match document.get_mut(populate.path) {
                Some(JsonValue::Object(related)) => {
                    related.remove(marker);
                }
                Some(JsonValue::Array(items)) => {
                    for item in items.iter_mut().filter_map(JsonValue::as_object_mut) {
                        item.remove(marker);
                    }
                }
                _ => {}
            }
        }
        document
    }
}

/// Parses a caller-supplied JSON filter.
pub fn parse_filter(entity: &'static str, value: &JsonValue) -> Result<Filter> {
    Filter::from_json(value).map_err(|reason| {
        IntegrityError::invalid_argument(entity, ArgumentViolation::MalformedFilter { reason })
    })
}

pub(crate) fn visible_scope<A: Aggregate>() -> Filter {
    match A::DELETION {
        DeletionMode::Physical => Filter::new(),
        DeletionMode::Logical => Filter::new().exists(DELETED_AT_FIELD, false),
    }
}

fn decode<A: Aggregate>(document: Document) -> Result<A> {
    serde_json::from_value(JsonValue::Object(document)).map_err(|err| {
        event!(Level::ERROR, entity = A::ENTITY, error = %err, "stored document does not decode");
        IntegrityError::database("decode", A::COLLECTION, err)
    })
}
