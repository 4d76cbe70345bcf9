//! Filter, sort and page selection for the catalog, plus its address form.
//!
//! [`FilterState`] is a plain value with pure transitions
//! ([`FilterState::apply`]). [`FilterController`] owns one for a browsing
//! session, turns each change into a [`Navigation`], and publishes the new
//! state on a `watch` channel for the query side.

mod address;
mod controller;
mod state;
#[cfg(test)]
mod test_support;

pub use address::{
    Address, AddressConfig, PARAM_ATTRIBUTES, PARAM_PAGE, PARAM_SEARCH, PARAM_SORT,
    PARAM_SUBCATEGORIES, decode, encode,
};
pub use controller::{FilterController, FilterSnapshot, Navigation};
pub use state::{FilterAction, FilterState, SortOption};
