use crate::backend::CatalogBackend;
use crate::error::Result;
use crate::error::StoreError;
use crate::schema::catalog_foreign_keys;
use crate::schema::columns;
use crate::schema::tables;
use crate::select::Predicate;
use crate::select::Row;
use crate::select::Select;
use crate::select::SelectOutput;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// `table.column` must name an existing row of `references` (by `id`) or be null.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    pub references: String,
}

impl ForeignKey {
    pub fn new(table: &str, column: &str, references: &str) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
            references: references.to_string(),
        }
    }
}

/// In-process store with restrict-on-delete foreign keys.
///
/// Used by tests, by the CLI `--fixture` mode, and anywhere a real store is
/// not reachable. Failures and latency can be injected to exercise retry and
/// sequencing logic.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<BTreeMap<String, Vec<Row>>>,
    foreign_keys: Vec<ForeignKey>,
    pending_failures: AtomicUsize,
    select_calls: AtomicUsize,
    latency: Option<Duration>,
    max_rows: Option<u64>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty catalog tables with the catalog's referential constraints.
    pub fn catalog() -> Self {
        let mut tables = BTreeMap::new();
        for table in [
            tables::CATEGORIES,
            tables::SUBCATEGORIES,
            tables::ATTRIBUTES,
            tables::PRODUCTS,
            tables::PRODUCT_IMAGES,
        ] {
            tables.insert(table.to_string(), Vec::new());
        }
        Self {
            tables: RwLock::new(tables),
            foreign_keys: catalog_foreign_keys(),
            ..Self::default()
        }
    }

    /// Catalog tables seeded from a JSON object of `{ "table": [rows...] }`.
    ///
    /// Rows are loaded as-is; constraints apply to later mutations only.
    pub fn from_fixture(fixture: Value) -> Result<Self> {
        let Value::Object(entries) = fixture else {
            return Err(StoreError::Decode(
                "fixture must be an object of table name to rows".to_string(),
            ));
        };
        let mut backend = Self::catalog();
        {
            let tables = backend.tables.get_mut();
            for (table, rows) in entries {
                let Value::Array(rows) = rows else {
                    return Err(StoreError::Decode(format!(
                        "fixture table {table} must be an array"
                    )));
                };
                let mut decoded = Vec::with_capacity(rows.len());
                for row in rows {
                    match row {
                        Value::Object(row) => decoded.push(row),
                        other => {
                            return Err(StoreError::Decode(format!(
                                "fixture row in {table} is not an object: {other}"
                            )));
                        }
                    }
                }
                tables.insert(table, decoded);
            }
        }
        Ok(backend)
    }

    pub fn with_rows(mut self, table: &str, rows: Vec<Row>) -> Self {
        self.tables
            .get_mut()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
        self
    }

    /// Delay every call by `latency` before touching the tables.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Return at most `max_rows` rows per select, as a PostgREST `max-rows`
    /// setting does. Exact counts still cover every matching row.
    pub fn with_max_rows(mut self, max_rows: u64) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    /// Make the next `count` calls fail with a transient error.
    pub fn fail_next(&self, count: usize) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Number of `select` calls received so far, failed ones included.
    pub fn select_calls(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }

    /// Current contents as a fixture document.
    pub async fn snapshot(&self) -> Value {
        let tables = self.tables.read().await;
        let mut out = serde_json::Map::new();
        for (name, rows) in tables.iter() {
            out.insert(
                name.clone(),
                Value::Array(rows.iter().cloned().map(Value::Object).collect()),
            );
        }
        Value::Object(out)
    }

    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    async fn enter(&self) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let injected = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();
        if injected {
            debug!("memory backend: injecting failure");
            return Err(StoreError::Injected("simulated store outage".to_string()));
        }
        Ok(())
    }

    fn check_references(
        &self,
        tables: &BTreeMap<String, Vec<Row>>,
        table: &str,
        row: &Row,
    ) -> Result<()> {
        for key in self.foreign_keys.iter().filter(|key| key.table == table) {
            let Some(value) = row.get(&key.column).filter(|value| !value.is_null()) else {
                continue;
            };
            let exists = tables.get(&key.references).is_some_and(|parents| {
                parents
                    .iter()
                    .any(|parent| parent.get(columns::ID) == Some(value))
            });
            if !exists {
                return Err(StoreError::ForeignKey {
                    table: key.table.clone(),
                    column: key.column.clone(),
                    message: format!("no {} row with id {value}", key.references),
                });
            }
        }
        Ok(())
    }
}

fn matches_all(filters: &[Predicate], row: &Row) -> bool {
    filters.iter().all(|predicate| predicate.matches(row))
}

#[async_trait]
impl CatalogBackend for MemoryBackend {
    async fn select(&self, query: Select) -> Result<SelectOutput> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await?;
        let tables = self.tables.read().await;
        let rows = tables
            .get(&query.table)
            .ok_or_else(|| StoreError::UnknownTable(query.table.clone()))?;

        let mut matched: Vec<&Row> = rows
            .iter()
            .filter(|row| matches_all(&query.filters, row))
            .collect();
        if !query.order.is_empty() {
            matched.sort_by(|a, b| {
                query
                    .order
                    .iter()
                    .map(|order| order.compare(a, b))
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let total = query.exact_count.then_some(matched.len() as u64);
        let (offset, limit) = match query.window {
            Some(window) => (window.offset, window.limit),
            None => (0, u64::MAX),
        };
        let limit = self.max_rows.map_or(limit, |cap| limit.min(cap));
        let windowed: Vec<&Row> = matched
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect();

        let rows = windowed
            .into_iter()
            .map(|row| match &query.columns {
                Some(columns) => columns
                    .iter()
                    .filter_map(|column| {
                        row.get(column).map(|value| (column.clone(), value.clone()))
                    })
                    .collect(),
                None => row.clone(),
            })
            .collect();
        Ok(SelectOutput { rows, total })
    }

    async fn insert(&self, table: &str, mut row: Row) -> Result<Row> {
        self.enter().await?;
        let mut tables = self.tables.write().await;
        if !tables.contains_key(table) {
            return Err(StoreError::UnknownTable(table.to_string()));
        }
        if row.get(columns::ID).is_none_or(Value::is_null) {
            row.insert(
                columns::ID.to_string(),
                Value::String(Uuid::new_v4().to_string()),
            );
        }
        self.check_references(&tables, table, &row)?;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, filters: &[Predicate], patch: Row) -> Result<u64> {
        self.enter().await?;
        let mut tables = self.tables.write().await;
        if !tables.contains_key(table) {
            return Err(StoreError::UnknownTable(table.to_string()));
        }
        self.check_references(&tables, table, &patch)?;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        let mut touched = 0;
        for row in rows.iter_mut().filter(|row| matches_all(filters, row)) {
            for (column, value) in &patch {
                row.insert(column.clone(), value.clone());
            }
            touched += 1;
        }
        Ok(touched)
    }

    async fn delete(&self, table: &str, filters: &[Predicate]) -> Result<u64> {
        self.enter().await?;
        let mut tables = self.tables.write().await;
        let rows = tables
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        let doomed: HashSet<String> = rows
            .iter()
            .filter(|row| matches_all(filters, row))
            .filter_map(|row| row.get(columns::ID).map(Value::to_string))
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        for key in self.foreign_keys.iter().filter(|key| key.references == table) {
            let referenced = tables.get(&key.table).is_some_and(|children| {
                children.iter().any(|child| {
                    child
                        .get(&key.column)
                        .is_some_and(|value| doomed.contains(&value.to_string()))
                })
            });
            if referenced {
                return Err(StoreError::ForeignKey {
                    table: key.table.clone(),
                    column: key.column.clone(),
                    message: format!("{table} row is still referenced"),
                });
            }
        }

        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        let before = rows.len();
        rows.retain(|row| !matches_all(filters, row));
        Ok((before - rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::Order;
    use crate::select::Window;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn seeded() -> MemoryBackend {
        MemoryBackend::catalog()
            .with_rows(
                tables::CATEGORIES,
                vec![row(json!({ "id": "c1", "name": "Watches", "slug": "watches" }))],
            )
            .with_rows(
                tables::PRODUCTS,
                (1..=5)
                    .map(|i| {
                        row(json!({
                            "id": format!("p{i}"),
                            "name": format!("Product {i}"),
                            "price": 10 * i,
                            "published": i != 3,
                            "category_id": "c1",
                        }))
                    })
                    .collect(),
            )
    }

    #[tokio::test]
    async fn select_counts_before_windowing() {
        let backend = seeded();
        let output = backend
            .select(
                Select::from(tables::PRODUCTS)
                    .filter(Predicate::eq(columns::PUBLISHED, true))
                    .order_by(Order::desc(columns::PRICE))
                    .window(Window::page(1, 2))
                    .with_exact_count(),
            )
            .await
            .unwrap();

        assert_eq!(output.total, Some(4));
        let ids: Vec<_> = output
            .rows
            .iter()
            .map(|row| row[columns::ID].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["p5", "p4"]);
    }

    #[tokio::test]
    async fn max_rows_caps_responses_but_not_counts() {
        let backend = seeded().with_max_rows(2);
        let unwindowed = backend
            .select(Select::from(tables::PRODUCTS).with_exact_count())
            .await
            .unwrap();
        assert_eq!(unwindowed.rows.len(), 2);
        assert_eq!(unwindowed.total, Some(5));

        let tail = backend
            .select(Select::from(tables::PRODUCTS).window(Window { offset: 1, limit: 10 }))
            .await
            .unwrap();
        assert_eq!(tail.rows.len(), 2);
    }

    #[tokio::test]
    async fn select_projects_columns() {
        let backend = seeded();
        let output = backend
            .select(Select::from(tables::PRODUCTS).columns(&[columns::ID]))
            .await
            .unwrap();
        assert!(output.rows.iter().all(|row| row.len() == 1));
        assert_eq!(output.total, None);
    }

    #[tokio::test]
    async fn delete_refuses_referenced_parent() {
        let backend = seeded();
        let err = backend
            .delete(tables::CATEGORIES, &[Predicate::eq(columns::ID, "c1")])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKey { .. }));

        backend
            .update(
                tables::PRODUCTS,
                &[Predicate::eq(columns::CATEGORY_ID, "c1")],
                row(json!({ "category_id": null })),
            )
            .await
            .unwrap();
        let removed = backend
            .delete(tables::CATEGORIES, &[Predicate::eq(columns::ID, "c1")])
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn insert_assigns_id_and_checks_parent() {
        let backend = seeded();
        let inserted = backend
            .insert(
                tables::SUBCATEGORIES,
                row(json!({ "category_id": "c1", "name": "Brand", "type": "brand" })),
            )
            .await
            .unwrap();
        assert!(inserted[columns::ID].is_string());

        let err = backend
            .insert(
                tables::SUBCATEGORIES,
                row(json!({ "category_id": "missing", "name": "Size", "type": "size" })),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKey { .. }));
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let backend = seeded();
        backend.fail_next(2);
        for _ in 0..2 {
            let err = backend
                .select(Select::from(tables::PRODUCTS))
                .await
                .unwrap_err();
            assert!(err.is_transient());
        }
        assert!(backend.select(Select::from(tables::PRODUCTS)).await.is_ok());
        assert_eq!(backend.select_calls(), 3);
    }

    #[tokio::test]
    async fn fixture_round_trips_through_snapshot() {
        let fixture = json!({
            "categories": [{ "id": "c1", "name": "Watches", "slug": "watches" }],
        });
        let backend = MemoryBackend::from_fixture(fixture).unwrap();
        let snapshot = backend.snapshot().await;
        assert_eq!(snapshot["categories"][0]["slug"], json!("watches"));
        assert_eq!(snapshot["products"], json!([]));
    }

    #[tokio::test]
    async fn unknown_table_is_an_error() {
        let backend = MemoryBackend::new();
        let err = backend.select(Select::from("nope")).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownTable(name) if name == "nope"));
    }
}
