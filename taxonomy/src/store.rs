use crate::error::Result;
use crate::error::TaxonomyError;
use crate::model::Attribute;
use crate::model::AttributeId;
use crate::model::Category;
use crate::model::CategoryId;
use crate::model::Subcategory;
use crate::model::SubcategoryId;
use crate::model::Taxonomy;
use crate::validate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shopfront_store::CatalogBackend;
use shopfront_store::Order;
use shopfront_store::Predicate;
use shopfront_store::Row;
use shopfront_store::Select;
use shopfront_store::schema::columns;
use shopfront_store::schema::tables;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// What the rendering layer should show for the taxonomy tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LoadStatus {
    #[default]
    NotLoaded,
    Ready,
    /// "Could not load catalog"; calling [`TaxonomyStore::load`] again is the retry.
    Failed(String),
}

#[derive(Deserialize)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    slug: String,
}

#[derive(Deserialize)]
struct SubcategoryRow {
    id: SubcategoryId,
    category_id: CategoryId,
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct AttributeRow {
    id: AttributeId,
    subcategory_id: SubcategoryId,
    label: String,
}

#[derive(Default)]
struct Cached {
    taxonomy: Option<Arc<Taxonomy>>,
    status: LoadStatus,
}

/// Loads and caches the taxonomy; every mutation is followed by a full reload.
pub struct TaxonomyStore {
    backend: Arc<dyn CatalogBackend>,
    cached: RwLock<Cached>,
}

impl TaxonomyStore {
    pub fn new(backend: Arc<dyn CatalogBackend>) -> Self {
        Self {
            backend,
            cached: RwLock::new(Cached::default()),
        }
    }

    /// Fetch the whole tree and replace the cached copy.
    ///
    /// On failure the previous tree (if any) stays cached and the status
    /// becomes [`LoadStatus::Failed`].
    pub async fn load(&self) -> Result<Arc<Taxonomy>> {
        match self.fetch().await {
            Ok(taxonomy) => {
                let taxonomy = Arc::new(taxonomy);
                let mut cached = self.cached.write().await;
                cached.taxonomy = Some(Arc::clone(&taxonomy));
                cached.status = LoadStatus::Ready;
                info!(
                    categories = taxonomy.categories().len(),
                    subcategories = taxonomy.subcategory_count(),
                    attributes = taxonomy.attribute_count(),
                    "taxonomy loaded"
                );
                Ok(taxonomy)
            }
            Err(err) => {
                warn!("taxonomy load failed: {err}");
                self.cached.write().await.status =
                    LoadStatus::Failed(format!("could not load catalog: {err}"));
                Err(err)
            }
        }
    }

    /// Cached tree, if one has been loaded.
    pub async fn taxonomy(&self) -> Option<Arc<Taxonomy>> {
        self.cached.read().await.taxonomy.clone()
    }

    /// Cached tree, loading it on first use.
    pub async fn current(&self) -> Result<Arc<Taxonomy>> {
        if let Some(taxonomy) = self.taxonomy().await {
            return Ok(taxonomy);
        }
        self.load().await
    }

    pub async fn status(&self) -> LoadStatus {
        self.cached.read().await.status.clone()
    }

    pub async fn create_category(&self, name: &str, slug: &str) -> Result<Category> {
        let taxonomy = self.current().await?;
        let (name, slug) = validate::new_category(&taxonomy, name, slug)?;
        let mut row = Row::new();
        row.insert(columns::NAME.to_string(), Value::String(name));
        row.insert(columns::SLUG.to_string(), Value::String(slug));
        let inserted = self.backend.insert(tables::CATEGORIES, row).await?;
        let created: CategoryRow = decode(tables::CATEGORIES, inserted)?;
        info!(category = %created.id, slug = %created.slug, "category created");
        self.reload_after_mutation().await;
        Ok(Category {
            id: created.id,
            name: created.name,
            slug: created.slug,
            subcategories: Vec::new(),
        })
    }

    pub async fn create_subcategory(
        &self,
        category_id: &CategoryId,
        name: &str,
        kind: &str,
    ) -> Result<Subcategory> {
        let taxonomy = self.current().await?;
        let (name, kind) = validate::new_subcategory(&taxonomy, category_id, name, kind)?;
        let mut row = Row::new();
        row.insert(
            columns::CATEGORY_ID.to_string(),
            Value::String(category_id.to_string()),
        );
        row.insert(columns::NAME.to_string(), Value::String(name));
        row.insert(columns::TYPE.to_string(), Value::String(kind));
        let inserted = self.backend.insert(tables::SUBCATEGORIES, row).await?;
        let created: SubcategoryRow = decode(tables::SUBCATEGORIES, inserted)?;
        info!(subcategory = %created.id, category = %category_id, "subcategory created");
        self.reload_after_mutation().await;
        Ok(Subcategory {
            id: created.id,
            category_id: created.category_id,
            name: created.name,
            kind: created.kind,
            attributes: Vec::new(),
        })
    }

    pub async fn create_attribute(
        &self,
        subcategory_id: &SubcategoryId,
        label: &str,
    ) -> Result<Attribute> {
        let taxonomy = self.current().await?;
        let label = validate::new_attribute(&taxonomy, subcategory_id, label)?;
        let mut row = Row::new();
        row.insert(
            columns::SUBCATEGORY_ID.to_string(),
            Value::String(subcategory_id.to_string()),
        );
        row.insert(columns::LABEL.to_string(), Value::String(label));
        let inserted = self.backend.insert(tables::ATTRIBUTES, row).await?;
        let created: AttributeRow = decode(tables::ATTRIBUTES, inserted)?;
        info!(attribute = %created.id, subcategory = %subcategory_id, "attribute created");
        self.reload_after_mutation().await;
        Ok(Attribute {
            id: created.id,
            subcategory_id: created.subcategory_id,
            label: created.label,
        })
    }

    /// Remove a category and everything under it, children first.
    ///
    /// Products are detached (their references set to null), never deleted.
    pub async fn delete_category(&self, id: &CategoryId) -> Result<()> {
        let taxonomy = self.current().await?;
        let category = taxonomy.category(id).ok_or_else(|| TaxonomyError::NotFound {
            kind: "category",
            id: id.to_string(),
        })?;
        let subcategory_ids: Vec<Value> = category
            .subcategories
            .iter()
            .map(|subcategory| Value::String(subcategory.id.to_string()))
            .collect();
        let attribute_ids: Vec<Value> = category
            .subcategories
            .iter()
            .flat_map(|subcategory| &subcategory.attributes)
            .map(|attribute| Value::String(attribute.id.to_string()))
            .collect();
        info!(
            category = %id,
            subcategories = subcategory_ids.len(),
            attributes = attribute_ids.len(),
            "deleting category"
        );

        self.detach_products(columns::CATEGORY_ID, vec![Value::String(id.to_string())])
            .await?;
        self.detach_products(columns::SUBCATEGORY_ID, subcategory_ids.clone())
            .await?;
        self.detach_products(columns::ATTRIBUTE_ID, attribute_ids)
            .await?;
        if !subcategory_ids.is_empty() {
            self.backend
                .delete(
                    tables::ATTRIBUTES,
                    &[Predicate::one_of(columns::SUBCATEGORY_ID, subcategory_ids)],
                )
                .await?;
        }
        self.backend
            .delete(
                tables::SUBCATEGORIES,
                &[Predicate::eq(columns::CATEGORY_ID, id.as_str())],
            )
            .await?;
        self.backend
            .delete(tables::CATEGORIES, &[Predicate::eq(columns::ID, id.as_str())])
            .await?;

        self.reload_after_mutation().await;
        Ok(())
    }

    pub async fn delete_subcategory(&self, id: &SubcategoryId) -> Result<()> {
        let taxonomy = self.current().await?;
        let subcategory = taxonomy
            .subcategory(id)
            .ok_or_else(|| TaxonomyError::NotFound {
                kind: "subcategory",
                id: id.to_string(),
            })?;
        let attribute_ids: Vec<Value> = subcategory
            .attributes
            .iter()
            .map(|attribute| Value::String(attribute.id.to_string()))
            .collect();
        info!(subcategory = %id, attributes = attribute_ids.len(), "deleting subcategory");

        self.detach_products(columns::SUBCATEGORY_ID, vec![Value::String(id.to_string())])
            .await?;
        self.detach_products(columns::ATTRIBUTE_ID, attribute_ids)
            .await?;
        self.backend
            .delete(
                tables::ATTRIBUTES,
                &[Predicate::eq(columns::SUBCATEGORY_ID, id.as_str())],
            )
            .await?;
        self.backend
            .delete(
                tables::SUBCATEGORIES,
                &[Predicate::eq(columns::ID, id.as_str())],
            )
            .await?;

        self.reload_after_mutation().await;
        Ok(())
    }

    pub async fn delete_attribute(&self, id: &AttributeId) -> Result<()> {
        let taxonomy = self.current().await?;
        if taxonomy.attribute(id).is_none() {
            return Err(TaxonomyError::NotFound {
                kind: "attribute",
                id: id.to_string(),
            });
        }
        info!(attribute = %id, "deleting attribute");

        self.detach_products(columns::ATTRIBUTE_ID, vec![Value::String(id.to_string())])
            .await?;
        self.backend
            .delete(tables::ATTRIBUTES, &[Predicate::eq(columns::ID, id.as_str())])
            .await?;

        self.reload_after_mutation().await;
        Ok(())
    }

    async fn detach_products(&self, column: &str, ids: Vec<Value>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut patch = Row::new();
        patch.insert(column.to_string(), Value::Null);
        let detached = self
            .backend
            .update(tables::PRODUCTS, &[Predicate::one_of(column, ids)], patch)
            .await?;
        debug!(column, detached, "detached products");
        Ok(())
    }

    /// A mutation that reached the store has happened; a failed reload only
    /// degrades the status so the tree shows its retry state.
    async fn reload_after_mutation(&self) {
        if let Err(err) = self.load().await {
            warn!("reload after mutation failed: {err}");
        }
    }

    async fn fetch(&self) -> Result<Taxonomy> {
        let categories = self
            .backend
            .select(
                Select::from(tables::CATEGORIES)
                    .order_by(Order::asc(columns::NAME))
                    .order_by(Order::asc(columns::ID)),
            )
            .await?;
        let subcategories = self
            .backend
            .select(
                Select::from(tables::SUBCATEGORIES)
                    .order_by(Order::asc(columns::NAME))
                    .order_by(Order::asc(columns::ID)),
            )
            .await?;
        let attributes = self
            .backend
            .select(
                Select::from(tables::ATTRIBUTES)
                    .order_by(Order::asc(columns::LABEL))
                    .order_by(Order::asc(columns::ID)),
            )
            .await?;

        let mut tree: Vec<Category> = Vec::with_capacity(categories.rows.len());
        let mut category_slots: HashMap<CategoryId, usize> = HashMap::new();
        for row in categories.rows {
            let row: CategoryRow = decode(tables::CATEGORIES, row)?;
            category_slots.insert(row.id.clone(), tree.len());
            tree.push(Category {
                id: row.id,
                name: row.name,
                slug: row.slug,
                subcategories: Vec::new(),
            });
        }

        let mut subcategory_slots: HashMap<SubcategoryId, (usize, usize)> = HashMap::new();
        for row in subcategories.rows {
            let row: SubcategoryRow = decode(tables::SUBCATEGORIES, row)?;
            let Some(&ci) = category_slots.get(&row.category_id) else {
                warn!(subcategory = %row.id, category = %row.category_id, "orphan subcategory skipped");
                continue;
            };
            let subcategories = &mut tree[ci].subcategories;
            subcategory_slots.insert(row.id.clone(), (ci, subcategories.len()));
            subcategories.push(Subcategory {
                id: row.id,
                category_id: row.category_id,
                name: row.name,
                kind: row.kind,
                attributes: Vec::new(),
            });
        }

        for row in attributes.rows {
            let row: AttributeRow = decode(tables::ATTRIBUTES, row)?;
            let Some(&(ci, si)) = subcategory_slots.get(&row.subcategory_id) else {
                warn!(attribute = %row.id, subcategory = %row.subcategory_id, "orphan attribute skipped");
                continue;
            };
            tree[ci].subcategories[si].attributes.push(Attribute {
                id: row.id,
                subcategory_id: row.subcategory_id,
                label: row.label,
            });
        }

        Ok(Taxonomy::new(tree))
    }
}

fn decode<T: DeserializeOwned>(table: &'static str, row: Row) -> Result<T> {
    serde_json::from_value(Value::Object(row)).map_err(|err| TaxonomyError::Decode {
        table,
        message: err.to_string(),
    })
}
