/*!
# Shopfront Taxonomy

The three-level catalog tree (category → subcategory → attribute), the store
that loads and mutates it, and the aggregator that counts published products
per node.

## Lifecycle

- The tree is loaded once per session and cached.
- Every administrative mutation is followed by a full reload. The cache is
  never patched in place.
- Deleting a node removes children before parents and detaches products.
  Products are never deleted.

## Example

```rust,no_run
use shopfront_store::MemoryBackend;
use shopfront_taxonomy::{CounterAggregator, TaxonomyStore};
use std::sync::Arc;

# async fn demo() -> shopfront_taxonomy::Result<()> {
let backend = Arc::new(MemoryBackend::catalog());
let store = TaxonomyStore::new(backend.clone());
let counters = CounterAggregator::new(backend);

let taxonomy = store.load().await?;
for entry in counters.category_counts(&taxonomy).await? {
    println!("{:?}: {}", entry.node, entry.count);
}
# Ok(())
# }
```
*/

mod counters;
mod error;
mod model;
mod store;
mod validate;

pub use counters::{CounterAggregator, CounterEntry, NodeId};
pub use error::{Result, TaxonomyError};
pub use model::{
    Attribute, AttributeId, Category, CategoryId, Subcategory, SubcategoryId, Taxonomy,
};
pub use store::{LoadStatus, TaxonomyStore};
pub use validate::{is_valid_slug, slugify};
