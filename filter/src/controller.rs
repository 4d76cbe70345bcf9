use crate::address::Address;
use crate::address::AddressConfig;
use crate::address::decode;
use crate::address::encode;
use crate::state::FilterAction;
use crate::state::FilterState;
use crate::state::SortOption;
use shopfront_taxonomy::AttributeId;
use shopfront_taxonomy::CategoryId;
use shopfront_taxonomy::SubcategoryId;
use shopfront_taxonomy::Taxonomy;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// How the navigation layer should record an address change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    /// New history entry; used when the category (the path) changes.
    Push(Address),
    /// Rewrite the current entry's query parameters.
    Replace(Address),
}

impl Navigation {
    pub fn address(&self) -> &Address {
        match self {
            Navigation::Push(address) | Navigation::Replace(address) => address,
        }
    }
}

/// A published filter state. `revision` increases with every change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterSnapshot {
    pub revision: u64,
    pub state: FilterState,
}

/// Owns the session's [`FilterState`] and keeps the address in step with it.
pub struct FilterController {
    taxonomy: Arc<Taxonomy>,
    config: AddressConfig,
    current: FilterSnapshot,
    tx: watch::Sender<FilterSnapshot>,
}

impl FilterController {
    pub fn new(taxonomy: Arc<Taxonomy>, config: AddressConfig) -> Self {
        let (tx, _rx) = watch::channel(FilterSnapshot::default());
        Self {
            taxonomy,
            config,
            current: FilterSnapshot::default(),
            tx,
        }
    }

    /// Controller whose initial state is decoded from `address`.
    pub fn with_address(taxonomy: Arc<Taxonomy>, config: AddressConfig, address: &str) -> Self {
        let mut controller = Self::new(taxonomy, config);
        controller.restore(address);
        controller
    }

    pub fn subscribe(&self) -> watch::Receiver<FilterSnapshot> {
        self.tx.subscribe()
    }

    pub fn state(&self) -> &FilterState {
        &self.current.state
    }

    pub fn snapshot(&self) -> FilterSnapshot {
        self.current.clone()
    }

    pub fn revision(&self) -> u64 {
        self.current.revision
    }

    pub fn taxonomy(&self) -> &Arc<Taxonomy> {
        &self.taxonomy
    }

    /// Address of the current state.
    pub fn address(&self) -> Address {
        encode(&self.current.state, &self.taxonomy, &self.config)
    }

    /// Apply `action`. Returns the navigation to perform, or `None` when the
    /// state did not change.
    pub fn dispatch(&mut self, action: FilterAction) -> Option<Navigation> {
        let next = self.current.state.apply(action, &self.taxonomy);
        if next == self.current.state {
            return None;
        }
        let path_changed = next.category() != self.current.state.category();
        self.publish(next);
        let address = self.address();
        Some(if path_changed {
            Navigation::Push(address)
        } else {
            Navigation::Replace(address)
        })
    }

    pub fn select_category(&mut self, id: Option<CategoryId>) -> Option<Navigation> {
        self.dispatch(FilterAction::SelectCategory(id))
    }

    pub fn toggle_subcategory(&mut self, id: SubcategoryId) -> Option<Navigation> {
        self.dispatch(FilterAction::ToggleSubcategory(id))
    }

    pub fn toggle_attribute(&mut self, id: AttributeId) -> Option<Navigation> {
        self.dispatch(FilterAction::ToggleAttribute(id))
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) -> Option<Navigation> {
        self.dispatch(FilterAction::SetSearchText(text.into()))
    }

    pub fn set_sort_option(&mut self, sort: SortOption) -> Option<Navigation> {
        self.dispatch(FilterAction::SetSort(sort))
    }

    pub fn set_page(&mut self, page: u32) -> Option<Navigation> {
        self.dispatch(FilterAction::SetPage(page))
    }

    /// Back to the catalog root with nothing selected.
    pub fn reset(&mut self) -> Option<Navigation> {
        self.dispatch(FilterAction::Reset)
    }

    /// Adopt the state encoded in `address` (initial load, back/forward).
    /// The address is already current, so no navigation is produced.
    pub fn restore(&mut self, address: &str) {
        let next = decode(address, &self.taxonomy, &self.config);
        if next != self.current.state {
            debug!(address, "filter state restored from address");
            self.publish(next);
        }
    }

    /// Swap in a reloaded taxonomy and drop selections that no longer exist.
    pub fn replace_taxonomy(&mut self, taxonomy: Arc<Taxonomy>) {
        self.taxonomy = taxonomy;
        let next = self.current.state.clone().normalized(&self.taxonomy);
        if next != self.current.state {
            self.publish(next);
        }
    }

    pub fn is_category_selected(&self, id: &CategoryId) -> bool {
        self.current.state.is_category_selected(id)
    }

    pub fn is_subcategory_selected(&self, id: &SubcategoryId) -> bool {
        self.current.state.is_subcategory_selected(id)
    }

    pub fn is_attribute_selected(&self, id: &AttributeId) -> bool {
        self.current.state.is_attribute_selected(id)
    }

    fn publish(&mut self, state: FilterState) {
        self.current = FilterSnapshot {
            revision: self.current.revision + 1,
            state,
        };
        debug!(revision = self.current.revision, "filter state changed");
        self.tx.send_replace(self.current.clone());
    }
}
