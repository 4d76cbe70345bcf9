use crate::config::ProjectionConfig;
use crate::model::ProductRecord;
use serde::Serialize;

const SUBTITLE_MAX_CHARS: usize = 120;

/// What a product tile shows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProductCard {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ProductCard {
    pub fn project(record: &ProductRecord, config: &ProjectionConfig) -> Self {
        let subtitle = non_blank(record.short_description.as_deref())
            .map(str::to_string)
            .or_else(|| non_blank(record.description.as_deref()).map(truncate));
        Self {
            id: record.id.clone(),
            title: record.name.clone(),
            subtitle,
            price_label: record
                .price
                .map(|price| format!("{}{price:.2}", config.currency_symbol)),
            image_url: record.images.first().map(|image| image.url.clone()),
        }
    }
}

pub fn project_page(records: &[ProductRecord], config: &ProjectionConfig) -> Vec<ProductCard> {
    records
        .iter()
        .map(|record| ProductCard::project(record, config))
        .collect()
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|text| !text.is_empty())
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= SUBTITLE_MAX_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(SUBTITLE_MAX_CHARS).collect();
    format!("{}…", cut.trim_end())
}
