use serde::Deserialize;
use serde::Serialize;
use shopfront_taxonomy::AttributeId;
use shopfront_taxonomy::CategoryId;
use shopfront_taxonomy::SubcategoryId;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: String,
    pub product_id: String,
    pub url: String,
    #[serde(default)]
    pub position: i64,
}

/// A product row plus the images that survived URL filtering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub published: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub subcategory_id: Option<SubcategoryId>,
    #[serde(default)]
    pub attribute_id: Option<AttributeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ProductImage>,
}

/// One page of products and the size of the whole filtered set.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub items: Vec<ProductRecord>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
}

impl QueryResult {
    /// Number of pages needed for `total_count`; at least 1.
    pub fn page_count(&self) -> u32 {
        if self.page_size == 0 {
            return 1;
        }
        let pages = self.total_count.div_ceil(u64::from(self.page_size));
        u32::try_from(pages).unwrap_or(u32::MAX).max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn page_count_rounds_up() {
        let result = QueryResult {
            total_count: 25,
            page_size: 12,
            ..Default::default()
        };
        assert_eq!(result.page_count(), 3);

        let empty = QueryResult {
            page_size: 12,
            ..Default::default()
        };
        assert_eq!(empty.page_count(), 1);
    }

    #[test]
    fn decodes_store_row_with_nulls() {
        let record: ProductRecord = serde_json::from_value(serde_json::json!({
            "id": "p8",
            "name": "Canvas Weekender",
            "short_description": null,
            "price": null,
            "published": true,
            "created_at": "2022-12-01T10:00:00Z",
            "category_id": "c-bags",
            "subcategory_id": null
        }))
        .unwrap();
        assert_eq!(record.price, None);
        assert_eq!(record.category_id, Some(CategoryId::new("c-bags")));
        assert_eq!(record.created_at.map(|at| at.year()), Some(2022));
        assert!(record.images.is_empty());
    }
}
