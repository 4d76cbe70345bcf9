use crate::error::Result;
use crate::select::Predicate;
use crate::select::Row;
use crate::select::Select;
use crate::select::SelectOutput;
use async_trait::async_trait;

/// Capability surface of the remote structured query service.
///
/// Every method is a suspension point; callers must not assume anything
/// about the store between issuing a call and receiving its result.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// Filtered, ordered, optionally windowed read with an optional exact count.
    async fn select(&self, query: Select) -> Result<SelectOutput>;

    /// Insert one row and return it as stored (with its generated id).
    async fn insert(&self, table: &str, row: Row) -> Result<Row>;

    /// Apply `patch` to every row matching all `filters`. Returns the number of rows touched.
    async fn update(&self, table: &str, filters: &[Predicate], patch: Row) -> Result<u64>;

    /// Delete every row matching all `filters`. Returns the number of rows removed.
    async fn delete(&self, table: &str, filters: &[Predicate]) -> Result<u64>;
}
