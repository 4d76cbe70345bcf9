use crate::config::SortScope;
use crate::error::QueryError;
use crate::error::Result;
use crate::model::ProductRecord;
use serde::Deserialize;
use serde::Serialize;
use shopfront_filter::FilterState;
use shopfront_filter::SortOption;
use shopfront_store::Order;
use shopfront_store::Predicate;
use shopfront_store::Select;
use shopfront_store::Window;
use shopfront_store::schema::columns;
use shopfront_store::schema::tables;
use shopfront_taxonomy::AttributeId;
use shopfront_taxonomy::CategoryId;
use shopfront_taxonomy::SubcategoryId;
use std::cmp::Ordering;

/// Columns read for a product listing.
pub const PRODUCT_COLUMNS: &[&str] = &[
    columns::ID,
    columns::NAME,
    columns::SHORT_DESCRIPTION,
    columns::DESCRIPTION,
    columns::PRICE,
    columns::PUBLISHED,
    columns::CREATED_AT,
    columns::CATEGORY_ID,
    columns::SUBCATEGORY_ID,
    columns::ATTRIBUTE_ID,
];

/// Text columns matched by the search box.
pub const SEARCH_COLUMNS: &[&str] = &[
    columns::NAME,
    columns::SHORT_DESCRIPTION,
    columns::DESCRIPTION,
];

/// Publication filter. The storefront always uses [`StatusFilter::Published`];
/// the admin listing lets the operator choose.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    Published,
    Unpublished,
    All,
}

/// One page request against the product table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryRequest {
    pub page: u32,
    pub page_size: u32,
    pub search: String,
    pub category_id: Option<CategoryId>,
    pub subcategory_ids: Vec<SubcategoryId>,
    pub attribute_ids: Vec<AttributeId>,
    pub status: StatusFilter,
    pub sort: SortOption,
}

impl QueryRequest {
    pub fn from_filter(state: &FilterState, page_size: u32, status: StatusFilter) -> Self {
        Self {
            page: state.page(),
            page_size,
            search: state.search_text().to_string(),
            category_id: state.category().cloned(),
            subcategory_ids: state.subcategories().iter().cloned().collect(),
            attribute_ids: state.attributes().iter().cloned().collect(),
            status,
            sort: state.sort(),
        }
    }

    /// Storefront request; only published products are visible.
    pub fn storefront(state: &FilterState, page_size: u32) -> Self {
        Self::from_filter(state, page_size, StatusFilter::Published)
    }

    pub fn published_only(&self) -> bool {
        self.status == StatusFilter::Published
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(QueryError::InvalidRequest(
                "page size must be at least 1".to_string(),
            ));
        }
        if self.page == 0 {
            return Err(QueryError::InvalidRequest("pages start at 1".to_string()));
        }
        Ok(())
    }

    /// Filter predicates; the exact count covers these and nothing else.
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        let search = self.search.trim();
        if !search.is_empty() {
            predicates.push(Predicate::Any(
                SEARCH_COLUMNS
                    .iter()
                    .map(|column| Predicate::contains(column, search))
                    .collect(),
            ));
        }
        if let Some(category) = &self.category_id {
            predicates.push(Predicate::eq(columns::CATEGORY_ID, category.as_str()));
        }
        if !self.subcategory_ids.is_empty() {
            predicates.push(Predicate::one_of(
                columns::SUBCATEGORY_ID,
                self.subcategory_ids.iter().map(SubcategoryId::as_str),
            ));
        }
        if !self.attribute_ids.is_empty() {
            predicates.push(Predicate::one_of(
                columns::ATTRIBUTE_ID,
                self.attribute_ids.iter().map(AttributeId::as_str),
            ));
        }
        match self.status {
            StatusFilter::Published => predicates.push(Predicate::eq(columns::PUBLISHED, true)),
            StatusFilter::Unpublished => {
                predicates.push(Predicate::eq(columns::PUBLISHED, false));
            }
            StatusFilter::All => {}
        }
        predicates
    }

    pub fn window(&self) -> Window {
        Window::page(self.page, self.page_size)
    }

    /// The single windowed, counted select for this page.
    pub fn to_select(&self, scope: SortScope) -> Select {
        let mut select = Select::from(tables::PRODUCTS).columns(PRODUCT_COLUMNS);
        for predicate in self.predicates() {
            select = select.filter(predicate);
        }
        let orders = match scope {
            SortScope::Server => sort_orders(self.sort),
            SortScope::Page => vec![Order::asc(columns::ID)],
        };
        for order in orders {
            select = select.order_by(order);
        }
        select.window(self.window()).with_exact_count()
    }
}

/// Server-side order for `sort`, always ending in `id` so pages are stable.
pub fn sort_orders(sort: SortOption) -> Vec<Order> {
    match sort {
        SortOption::Relevance => vec![Order::asc(columns::ID)],
        SortOption::PriceAsc => vec![Order::asc(columns::PRICE), Order::asc(columns::ID)],
        SortOption::PriceDesc => vec![Order::desc(columns::PRICE), Order::asc(columns::ID)],
        SortOption::Newest => vec![Order::desc(columns::CREATED_AT), Order::asc(columns::ID)],
    }
}

/// Reorder one returned page in place. Missing prices and dates go last.
pub fn sort_page(items: &mut [ProductRecord], sort: SortOption) {
    match sort {
        SortOption::Relevance => {}
        SortOption::PriceAsc => items.sort_by(|a, b| {
            nulls_last(a.price, b.price, |x, y| x.total_cmp(&y)).then_with(|| a.id.cmp(&b.id))
        }),
        SortOption::PriceDesc => items.sort_by(|a, b| {
            nulls_last(a.price, b.price, |x, y| y.total_cmp(&x)).then_with(|| a.id.cmp(&b.id))
        }),
        SortOption::Newest => items.sort_by(|a, b| {
            nulls_last(a.created_at, b.created_at, |x, y| y.cmp(&x))
                .then_with(|| a.id.cmp(&b.id))
        }),
    }
}

fn nulls_last<T>(a: Option<T>, b: Option<T>, cmp: impl Fn(T, T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => cmp(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
