use crate::error::Result;
use crate::model::ProductImage;
use crate::model::ProductRecord;
use shopfront_store::CatalogBackend;
use shopfront_store::Order;
use shopfront_store::Predicate;
use shopfront_store::Select;
use shopfront_store::schema::columns;
use shopfront_store::schema::tables;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

/// Whether `url` may be shown: non-empty, well-formed and under `storage_prefix`.
pub fn is_displayable(url: &str, storage_prefix: &str) -> bool {
    let url = url.trim();
    !url.is_empty() && Url::parse(url).is_ok() && url.starts_with(storage_prefix)
}

/// Load images for every product on the page with one batched select and
/// attach the displayable ones in `position` order.
pub async fn attach_images(
    backend: &dyn CatalogBackend,
    items: &mut [ProductRecord],
    storage_prefix: &str,
) -> Result<()> {
    if items.is_empty() {
        return Ok(());
    }
    let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
    let output = backend
        .select(
            Select::from(tables::PRODUCT_IMAGES)
                .filter(Predicate::one_of(columns::PRODUCT_ID, ids))
                .order_by(Order::asc(columns::POSITION))
                .order_by(Order::asc(columns::ID)),
        )
        .await?;

    let mut by_product: HashMap<String, Vec<ProductImage>> = HashMap::new();
    let mut dropped = 0usize;
    for row in output.rows {
        let image: ProductImage = match serde_json::from_value(serde_json::Value::Object(row)) {
            Ok(image) => image,
            Err(err) => {
                dropped += 1;
                debug!("dropping malformed image row: {err}");
                continue;
            }
        };
        if !is_displayable(&image.url, storage_prefix) {
            dropped += 1;
            debug!(image = %image.id, product = %image.product_id, "dropping image outside storage");
            continue;
        }
        by_product
            .entry(image.product_id.clone())
            .or_default()
            .push(image);
    }

    for item in items.iter_mut() {
        item.images = by_product.remove(&item.id).unwrap_or_default();
    }
    if dropped > 0 {
        debug!(dropped, "images filtered from page");
    }
    Ok(())
}
