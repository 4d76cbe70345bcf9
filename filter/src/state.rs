use serde::Deserialize;
use serde::Serialize;
use shopfront_taxonomy::AttributeId;
use shopfront_taxonomy::CategoryId;
use shopfront_taxonomy::SubcategoryId;
use shopfront_taxonomy::Taxonomy;
use std::collections::BTreeSet;
use std::fmt;

/// Result ordering chosen by the visitor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOption {
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    Newest,
}

impl SortOption {
    pub const ALL: [SortOption; 4] = [
        SortOption::Relevance,
        SortOption::PriceAsc,
        SortOption::PriceDesc,
        SortOption::Newest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortOption::Relevance => "relevance",
            SortOption::PriceAsc => "price-asc",
            SortOption::PriceDesc => "price-desc",
            SortOption::Newest => "newest",
        }
    }

    /// Parse an address value. Unknown values yield `None`.
    pub fn from_param(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|option| option.as_str() == value)
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single user intent against the filter state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterAction {
    SelectCategory(Option<CategoryId>),
    ToggleSubcategory(SubcategoryId),
    ToggleAttribute(AttributeId),
    SetSearchText(String),
    SetSort(SortOption),
    SetPage(u32),
    Reset,
}

/// Everything that determines which products are shown.
///
/// Fields are only reachable through [`FilterState::apply`] so that the
/// selection always forms a path down the taxonomy: subcategories belong to
/// the selected category and attributes belong to selected subcategories.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    search_text: String,
    category: Option<CategoryId>,
    subcategories: BTreeSet<SubcategoryId>,
    attributes: BTreeSet<AttributeId>,
    sort: SortOption,
    page: u32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            category: None,
            subcategories: BTreeSet::new(),
            attributes: BTreeSet::new(),
            sort: SortOption::default(),
            page: 1,
        }
    }
}

impl FilterState {
    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn category(&self) -> Option<&CategoryId> {
        self.category.as_ref()
    }

    pub fn subcategories(&self) -> &BTreeSet<SubcategoryId> {
        &self.subcategories
    }

    pub fn attributes(&self) -> &BTreeSet<AttributeId> {
        &self.attributes
    }

    pub fn sort(&self) -> SortOption {
        self.sort
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn is_category_selected(&self, id: &CategoryId) -> bool {
        self.category.as_ref() == Some(id)
    }

    pub fn is_subcategory_selected(&self, id: &SubcategoryId) -> bool {
        self.subcategories.contains(id)
    }

    pub fn is_attribute_selected(&self, id: &AttributeId) -> bool {
        self.attributes.contains(id)
    }

    /// True when nothing narrows the result set.
    pub fn is_unfiltered(&self) -> bool {
        self.search_text.trim().is_empty() && self.category.is_none()
    }

    /// Next state after `action`. Actions that reference nodes outside the
    /// current selection path leave the state unchanged.
    pub fn apply(&self, action: FilterAction, taxonomy: &Taxonomy) -> FilterState {
        let mut next = self.clone();
        match action {
            FilterAction::SelectCategory(id) => {
                let id = id.filter(|id| taxonomy.category(id).is_some());
                if id == self.category {
                    return next;
                }
                next.category = id;
                next.subcategories.clear();
                next.attributes.clear();
                next.page = 1;
            }
            FilterAction::ToggleSubcategory(id) => {
                if self.category.is_none() || taxonomy.category_of(&id) != self.category.as_ref()
                {
                    return next;
                }
                if next.subcategories.remove(&id) {
                    if let Some(subcategory) = taxonomy.subcategory(&id) {
                        for attribute in &subcategory.attributes {
                            next.attributes.remove(&attribute.id);
                        }
                    }
                } else {
                    next.subcategories.insert(id);
                }
                next.page = 1;
            }
            FilterAction::ToggleAttribute(id) => {
                let owned_by_selection = taxonomy
                    .subcategory_of(&id)
                    .is_some_and(|owner| self.subcategories.contains(owner));
                if !owned_by_selection {
                    return next;
                }
                if !next.attributes.remove(&id) {
                    next.attributes.insert(id);
                }
                next.page = 1;
            }
            FilterAction::SetSearchText(text) => {
                if text == self.search_text {
                    return next;
                }
                next.search_text = text;
                next.page = 1;
            }
            FilterAction::SetSort(sort) => {
                if sort == self.sort {
                    return next;
                }
                next.sort = sort;
                next.page = 1;
            }
            FilterAction::SetPage(page) => {
                next.page = page.max(1);
            }
            FilterAction::Reset => return FilterState::default(),
        }
        next
    }

    /// Drop every selection that does not fit `taxonomy`.
    ///
    /// Used after decoding an address and after the taxonomy is reloaded.
    pub fn normalized(mut self, taxonomy: &Taxonomy) -> FilterState {
        if self
            .category
            .as_ref()
            .is_some_and(|id| taxonomy.category(id).is_none())
        {
            self.category = None;
        }
        let category = self.category.clone();
        self.subcategories
            .retain(|id| category.is_some() && taxonomy.category_of(id) == category.as_ref());
        let subcategories = &self.subcategories;
        self.attributes.retain(|id| {
            taxonomy
                .subcategory_of(id)
                .is_some_and(|owner| subcategories.contains(owner))
        });
        self.page = self.page.max(1);
        self
    }

    pub(crate) fn from_parts(
        search_text: String,
        category: Option<CategoryId>,
        subcategories: BTreeSet<SubcategoryId>,
        attributes: BTreeSet<AttributeId>,
        sort: SortOption,
        page: u32,
    ) -> Self {
        Self {
            search_text,
            category,
            subcategories,
            attributes,
            sort,
            page,
        }
    }
}
