//! # Shopfront Store
//!
//! The structured query surface the catalog engine runs against. Everything
//! above this crate speaks [`Select`]/[`Predicate`] and a [`CatalogBackend`],
//! never a transport.
//!
//! Two backends ship here:
//!
//! - [`RestBackend`]: a PostgREST-compatible HTTP client (`eq`/`in`/`ilike`
//!   filters, `or=(...)` groups, `offset`/`limit` windows, `Prefer: count=exact`).
//! - [`MemoryBackend`]: in-process tables with restrict-on-delete foreign keys,
//!   failure and latency injection. Used by tests and the CLI fixture mode.
//!
//! ## Example
//!
//! ```no_run
//! use shopfront_store::{CatalogBackend, MemoryBackend, Predicate, Select, Window};
//! use shopfront_store::schema::{columns, tables};
//!
//! # async fn demo() -> shopfront_store::Result<()> {
//! let store = MemoryBackend::catalog();
//! let page = store
//!     .select(
//!         Select::from(tables::PRODUCTS)
//!             .filter(Predicate::eq(columns::PUBLISHED, true))
//!             .window(Window::page(1, 12))
//!             .with_exact_count(),
//!     )
//!     .await?;
//! println!("{} of {:?}", page.rows.len(), page.total);
//! # Ok(())
//! # }
//! ```

mod backend;
mod config;
mod error;
mod memory;
mod rest;
pub mod schema;
mod select;

pub use backend::CatalogBackend;
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use memory::{ForeignKey, MemoryBackend};
pub use rest::RestBackend;
pub use select::{Order, Predicate, Row, Select, SelectOutput, Window};
