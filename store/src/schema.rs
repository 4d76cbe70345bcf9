//! Table and column names shared by every crate that talks to the store.

pub mod tables {
    pub const CATEGORIES: &str = "categories";
    pub const SUBCATEGORIES: &str = "subcategories";
    pub const ATTRIBUTES: &str = "attributes";
    pub const PRODUCTS: &str = "products";
    pub const PRODUCT_IMAGES: &str = "product_images";
}

pub mod columns {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const SLUG: &str = "slug";
    pub const TYPE: &str = "type";
    pub const LABEL: &str = "label";
    pub const CATEGORY_ID: &str = "category_id";
    pub const SUBCATEGORY_ID: &str = "subcategory_id";
    pub const ATTRIBUTE_ID: &str = "attribute_id";
    pub const PRODUCT_ID: &str = "product_id";
    pub const SHORT_DESCRIPTION: &str = "short_description";
    pub const DESCRIPTION: &str = "description";
    pub const PRICE: &str = "price";
    pub const PUBLISHED: &str = "published";
    pub const CREATED_AT: &str = "created_at";
    pub const URL: &str = "url";
    pub const POSITION: &str = "position";
}

use crate::memory::ForeignKey;

/// Referential constraints of the catalog schema, children first.
pub fn catalog_foreign_keys() -> Vec<ForeignKey> {
    vec![
        ForeignKey::new(
            tables::PRODUCT_IMAGES,
            columns::PRODUCT_ID,
            tables::PRODUCTS,
        ),
        ForeignKey::new(tables::PRODUCTS, columns::ATTRIBUTE_ID, tables::ATTRIBUTES),
        ForeignKey::new(
            tables::PRODUCTS,
            columns::SUBCATEGORY_ID,
            tables::SUBCATEGORIES,
        ),
        ForeignKey::new(tables::PRODUCTS, columns::CATEGORY_ID, tables::CATEGORIES),
        ForeignKey::new(
            tables::ATTRIBUTES,
            columns::SUBCATEGORY_ID,
            tables::SUBCATEGORIES,
        ),
        ForeignKey::new(
            tables::SUBCATEGORIES,
            columns::CATEGORY_ID,
            tables::CATEGORIES,
        ),
    ]
}
