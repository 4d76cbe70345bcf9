/*!
# Shopfront Query

Turns a [`shopfront_filter::FilterState`] into one windowed, counted product
select, runs it with retry and backoff, attaches images, and keeps a browse
session's listing in step with the filter controller.

```rust,no_run
use shopfront_filter::{AddressConfig, FilterController};
use shopfront_query::{BrowseSession, ExecutorConfig, QueryExecutor};
use shopfront_store::MemoryBackend;
use shopfront_taxonomy::TaxonomyStore;
use std::sync::Arc;

# async fn demo() -> Result<(), Box<dyn std::error::Error>> {
let backend = Arc::new(MemoryBackend::catalog());
let taxonomy = TaxonomyStore::new(backend.clone()).load().await?;
let controller =
    FilterController::with_address(taxonomy, AddressConfig::default(), "/store/watches");
let executor = QueryExecutor::new(backend, ExecutorConfig::default());
let session = BrowseSession::storefront(executor, controller.subscribe());
session.fetch(true).await;
if let Some(page) = session.result().await {
    println!("{} of {}", page.items.len(), page.total_count);
}
# Ok(())
# }
```
*/

mod config;
mod error;
mod executor;
mod images;
mod model;
mod projection;
mod request;
mod sequencer;
mod session;

pub use config::{ExecutorConfig, MAX_PAGE_SIZE, ProjectionConfig, RetryConfig, SortScope};
pub use error::{QueryError, Result};
pub use executor::QueryExecutor;
pub use images::{attach_images, is_displayable};
pub use model::{ProductImage, ProductRecord, QueryResult};
pub use projection::{ProductCard, project_page};
pub use request::{
    PRODUCT_COLUMNS, QueryRequest, SEARCH_COLUMNS, StatusFilter, sort_orders, sort_page,
};
pub use sequencer::{DropReason, FetchSequencer, FetchTicket};
pub use session::{Audience, BrowseSession, FetchOutcome, LoadStatus};
