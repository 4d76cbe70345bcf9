use crate::error::Result;
use crate::error::TaxonomyError;
use crate::model::AttributeId;
use crate::model::CategoryId;
use crate::model::SubcategoryId;
use crate::model::Taxonomy;
use serde::Serialize;
use serde_json::Value;
use shopfront_store::CatalogBackend;
use shopfront_store::Order;
use shopfront_store::Predicate;
use shopfront_store::Select;
use shopfront_store::Window;
use shopfront_store::schema::columns;
use shopfront_store::schema::tables;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::warn;

/// Upper bound on rows requested per counting select.
const TALLY_BATCH: u64 = 1000;

/// A taxonomy node a count can be attached to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "level", content = "id", rename_all = "snake_case")]
pub enum NodeId {
    Category(CategoryId),
    Subcategory(SubcategoryId),
    Attribute(AttributeId),
}

/// Number of published products under one node. Recomputed on demand, never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CounterEntry {
    pub node: NodeId,
    pub count: u64,
}

#[derive(Default)]
struct CounterCache {
    categories: Option<HashMap<CategoryId, u64>>,
    subcategories: HashMap<SubcategoryId, u64>,
    attributes: HashMap<AttributeId, u64>,
    expanded_categories: HashSet<CategoryId>,
    expanded_subcategories: HashSet<SubcategoryId>,
}

/// Per-node product counts over the *unfiltered* published catalog.
///
/// Counts ignore the active filter selection on purpose: the tree shows how
/// many items exist under each node, not how many survive the current filters.
/// Category counts come from one batched query; subcategory and attribute
/// counts are fetched only when their parent is expanded.
pub struct CounterAggregator {
    backend: Arc<dyn CatalogBackend>,
    cache: Mutex<CounterCache>,
}

impl CounterAggregator {
    pub fn new(backend: Arc<dyn CatalogBackend>) -> Self {
        Self {
            backend,
            cache: Mutex::new(CounterCache::default()),
        }
    }

    /// Counts for every category, in taxonomy order.
    pub async fn category_counts(&self, taxonomy: &Taxonomy) -> Result<Vec<CounterEntry>> {
        let cached = self.cache.lock().await.categories.clone();
        let counts = match cached {
            Some(counts) => counts,
            None => {
                let ids: Vec<String> = taxonomy
                    .categories()
                    .iter()
                    .map(|category| category.id.to_string())
                    .collect();
                let tally = self.tally(columns::CATEGORY_ID, ids).await?;
                let counts: HashMap<CategoryId, u64> = taxonomy
                    .categories()
                    .iter()
                    .map(|category| {
                        let count = tally.get(category.id.as_str()).copied().unwrap_or(0);
                        (category.id.clone(), count)
                    })
                    .collect();
                self.cache.lock().await.categories = Some(counts.clone());
                counts
            }
        };
        Ok(taxonomy
            .categories()
            .iter()
            .map(|category| CounterEntry {
                node: NodeId::Category(category.id.clone()),
                count: counts.get(&category.id).copied().unwrap_or(0),
            })
            .collect())
    }

    pub async fn count_for_category(&self, taxonomy: &Taxonomy, id: &CategoryId) -> Result<u64> {
        if taxonomy.category(id).is_none() {
            return Err(not_found("category", id.as_str()));
        }
        let entries = self.category_counts(taxonomy).await?;
        Ok(entries
            .into_iter()
            .find(|entry| entry.node == NodeId::Category(id.clone()))
            .map(|entry| entry.count)
            .unwrap_or(0))
    }

    /// Load counts for the subcategories of one category.
    pub async fn expand_category(
        &self,
        taxonomy: &Taxonomy,
        id: &CategoryId,
    ) -> Result<Vec<CounterEntry>> {
        let category = taxonomy
            .category(id)
            .ok_or_else(|| not_found("category", id.as_str()))?;
        if !self.cache.lock().await.expanded_categories.contains(id) {
            let ids: Vec<String> = category
                .subcategories
                .iter()
                .map(|subcategory| subcategory.id.to_string())
                .collect();
            let tally = self.tally(columns::SUBCATEGORY_ID, ids).await?;
            let mut cache = self.cache.lock().await;
            for subcategory in &category.subcategories {
                let count = tally.get(subcategory.id.as_str()).copied().unwrap_or(0);
                cache.subcategories.insert(subcategory.id.clone(), count);
            }
            cache.expanded_categories.insert(id.clone());
        }
        let cache = self.cache.lock().await;
        Ok(category
            .subcategories
            .iter()
            .map(|subcategory| CounterEntry {
                node: NodeId::Subcategory(subcategory.id.clone()),
                count: cache
                    .subcategories
                    .get(&subcategory.id)
                    .copied()
                    .unwrap_or(0),
            })
            .collect())
    }

    /// Load counts for the attributes of one subcategory.
    pub async fn expand_subcategory(
        &self,
        taxonomy: &Taxonomy,
        id: &SubcategoryId,
    ) -> Result<Vec<CounterEntry>> {
        let subcategory = taxonomy
            .subcategory(id)
            .ok_or_else(|| not_found("subcategory", id.as_str()))?;
        if !self.cache.lock().await.expanded_subcategories.contains(id) {
            let ids: Vec<String> = subcategory
                .attributes
                .iter()
                .map(|attribute| attribute.id.to_string())
                .collect();
            let tally = self.tally(columns::ATTRIBUTE_ID, ids).await?;
            let mut cache = self.cache.lock().await;
            for attribute in &subcategory.attributes {
                let count = tally.get(attribute.id.as_str()).copied().unwrap_or(0);
                cache.attributes.insert(attribute.id.clone(), count);
            }
            cache.expanded_subcategories.insert(id.clone());
        }
        let cache = self.cache.lock().await;
        Ok(subcategory
            .attributes
            .iter()
            .map(|attribute| CounterEntry {
                node: NodeId::Attribute(attribute.id.clone()),
                count: cache.attributes.get(&attribute.id).copied().unwrap_or(0),
            })
            .collect())
    }

    /// Expands the owning category if it has not been expanded yet.
    pub async fn count_for_subcategory(
        &self,
        taxonomy: &Taxonomy,
        id: &SubcategoryId,
    ) -> Result<u64> {
        if let Some(count) = self.cache.lock().await.subcategories.get(id).copied() {
            return Ok(count);
        }
        let owner = taxonomy
            .category_of(id)
            .ok_or_else(|| not_found("subcategory", id.as_str()))?
            .clone();
        let entries = self.expand_category(taxonomy, &owner).await?;
        Ok(entries
            .into_iter()
            .find(|entry| entry.node == NodeId::Subcategory(id.clone()))
            .map(|entry| entry.count)
            .unwrap_or(0))
    }

    /// Expands the owning subcategory if it has not been expanded yet.
    pub async fn count_for_attribute(&self, taxonomy: &Taxonomy, id: &AttributeId) -> Result<u64> {
        if let Some(count) = self.cache.lock().await.attributes.get(id).copied() {
            return Ok(count);
        }
        let owner = taxonomy
            .subcategory_of(id)
            .ok_or_else(|| not_found("attribute", id.as_str()))?
            .clone();
        let entries = self.expand_subcategory(taxonomy, &owner).await?;
        Ok(entries
            .into_iter()
            .find(|entry| entry.node == NodeId::Attribute(id.clone()))
            .map(|entry| entry.count)
            .unwrap_or(0))
    }

    /// Count already known for `node`, without touching the store.
    pub async fn cached(&self, node: &NodeId) -> Option<u64> {
        let cache = self.cache.lock().await;
        match node {
            NodeId::Category(id) => cache
                .categories
                .as_ref()
                .and_then(|counts| counts.get(id).copied()),
            NodeId::Subcategory(id) => cache.subcategories.get(id).copied(),
            NodeId::Attribute(id) => cache.attributes.get(id).copied(),
        }
    }

    /// Forget every count; call after taxonomy or product mutations.
    pub async fn invalidate(&self) {
        *self.cache.lock().await = CounterCache::default();
        debug!("counter cache cleared");
    }

    /// Published products grouped by `column`, restricted to `ids`.
    ///
    /// Reads in id-ordered windows until the exact count is covered; a store
    /// may silently cap how many rows one response carries.
    async fn tally(&self, column: &str, ids: Vec<String>) -> Result<HashMap<String, u64>> {
        let mut tally = HashMap::new();
        if ids.is_empty() {
            return Ok(tally);
        }
        let mut offset = 0;
        let mut batches = 0;
        loop {
            let output = self
                .backend
                .select(
                    Select::from(tables::PRODUCTS)
                        .columns(&[column])
                        .filter(Predicate::eq(columns::PUBLISHED, true))
                        .filter(Predicate::one_of(column, ids.iter().cloned()))
                        .order_by(Order::asc(columns::ID))
                        .window(Window {
                            offset,
                            limit: TALLY_BATCH,
                        })
                        .with_exact_count(),
                )
                .await?;
            let total = output.total.ok_or_else(|| TaxonomyError::Decode {
                table: tables::PRODUCTS,
                message: "store did not report an exact count".to_string(),
            })?;
            batches += 1;
            for row in &output.rows {
                if let Some(Value::String(id)) = row.get(column) {
                    *tally.entry(id.clone()).or_insert(0) += 1;
                }
            }
            let read = output.rows.len() as u64;
            offset += read;
            if offset >= total {
                break;
            }
            if read == 0 {
                warn!(column, offset, total, "store returned no rows before the count was covered");
                break;
            }
        }
        debug!(column, nodes = tally.len(), rows = offset, batches, "counted products");
        Ok(tally)
    }
}

fn not_found(kind: &'static str, id: &str) -> TaxonomyError {
    TaxonomyError::NotFound {
        kind,
        id: id.to_string(),
    }
}
