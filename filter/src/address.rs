//! Conversion between [`FilterState`] and a shareable address.
//!
//! The category travels as a path segment (its slug, under the configured
//! base path); everything else is a query parameter omitted at its default.
//! Decoding never fails: anything it cannot make sense of falls back to the
//! default for that field.

use crate::state::FilterState;
use crate::state::SortOption;
use percent_encoding::AsciiSet;
use percent_encoding::CONTROLS;
use percent_encoding::percent_decode_str;
use percent_encoding::utf8_percent_encode;
use serde::Deserialize;
use serde::Serialize;
use shopfront_taxonomy::AttributeId;
use shopfront_taxonomy::CategoryId;
use shopfront_taxonomy::SubcategoryId;
use shopfront_taxonomy::Taxonomy;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;
use url::Url;
use url::form_urlencoded;

pub const PARAM_SEARCH: &str = "q";
pub const PARAM_SUBCATEGORIES: &str = "subcategories";
pub const PARAM_ATTRIBUTES: &str = "attributes";
pub const PARAM_PAGE: &str = "page";
pub const PARAM_SORT: &str = "sort";

/// Origin used to resolve relative addresses; never rendered.
const ADDRESS_ORIGIN: &str = "http://shopfront.invalid/";

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressConfig {
    /// Path under which the catalog lives; the category slug is appended.
    #[serde(default = "default_base_path")]
    pub base_path: String,
}

fn default_base_path() -> String {
    "/store".to_string()
}

impl Default for AddressConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
        }
    }
}

impl AddressConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.base_path.starts_with('/') {
            return Err(format!(
                "base_path must start with '/', got {:?}",
                self.base_path
            ));
        }
        if self.base_path.contains(['?', '#']) {
            return Err(format!(
                "base_path must not contain a query or fragment, got {:?}",
                self.base_path
            ));
        }
        Ok(())
    }

    fn base(&self) -> &str {
        self.base_path.trim_end_matches('/')
    }
}

/// Path plus optional query string, ready to hand to the navigation layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn path(&self) -> &str {
        self.0.split_once('?').map_or(self.0.as_str(), |(path, _)| path)
    }

    pub fn query(&self) -> Option<&str> {
        self.0.split_once('?').map(|(_, query)| query)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn encode(state: &FilterState, taxonomy: &Taxonomy, config: &AddressConfig) -> Address {
    let mut path = config.base().to_string();
    if let Some(category) = state.category().and_then(|id| taxonomy.category(id)) {
        path.push('/');
        path.extend(utf8_percent_encode(&category.slug, PATH_SEGMENT));
    }
    if path.is_empty() {
        path.push('/');
    }

    let mut query = form_urlencoded::Serializer::new(String::new());
    if !state.search_text().is_empty() {
        query.append_pair(PARAM_SEARCH, state.search_text());
    }
    if !state.subcategories().is_empty() {
        query.append_pair(
            PARAM_SUBCATEGORIES,
            &join_ids(state.subcategories().iter().map(SubcategoryId::as_str)),
        );
    }
    if !state.attributes().is_empty() {
        query.append_pair(
            PARAM_ATTRIBUTES,
            &join_ids(state.attributes().iter().map(AttributeId::as_str)),
        );
    }
    if state.page() > 1 {
        query.append_pair(PARAM_PAGE, &state.page().to_string());
    }
    if state.sort() != SortOption::default() {
        query.append_pair(PARAM_SORT, state.sort().as_str());
    }
    let query = query.finish();

    if query.is_empty() {
        Address(path)
    } else {
        Address(format!("{path}?{query}"))
    }
}

/// Rebuild a state from `address`, which may be absolute or a path with an
/// optional query. Ids that do not fit the decoded selection are dropped.
pub fn decode(address: &str, taxonomy: &Taxonomy, config: &AddressConfig) -> FilterState {
    let Ok(origin) = Url::parse(ADDRESS_ORIGIN) else {
        return FilterState::default();
    };
    let url = match Url::options().base_url(Some(&origin)).parse(address) {
        Ok(url) => url,
        Err(err) => {
            debug!(address, "unparseable address, using defaults: {err}");
            return FilterState::default();
        }
    };

    let category = category_from_path(url.path(), taxonomy, config);
    let mut search_text = String::new();
    let mut subcategories = BTreeSet::new();
    let mut attributes = BTreeSet::new();
    let mut page = 1;
    let mut sort = SortOption::default();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            PARAM_SEARCH => search_text = value.into_owned(),
            PARAM_SUBCATEGORIES => {
                subcategories.extend(split_ids(&value).map(SubcategoryId::new));
            }
            PARAM_ATTRIBUTES => attributes.extend(split_ids(&value).map(AttributeId::new)),
            PARAM_PAGE => {
                page = value
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|page| *page >= 1)
                    .unwrap_or(1);
            }
            PARAM_SORT => sort = SortOption::from_param(value.trim()).unwrap_or_default(),
            _ => {}
        }
    }

    FilterState::from_parts(search_text, category, subcategories, attributes, sort, page)
        .normalized(taxonomy)
}

fn category_from_path(path: &str, taxonomy: &Taxonomy, config: &AddressConfig) -> Option<CategoryId> {
    let base = config.base();
    let rest = if base.is_empty() {
        path
    } else {
        path.strip_prefix(base)
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))?
    };
    let segment = rest.split('/').find(|segment| !segment.is_empty())?;
    let slug = percent_decode_str(segment).decode_utf8().ok()?;
    let category = taxonomy.category_by_slug(&slug);
    if category.is_none() {
        debug!(slug = %slug, "unknown category slug in address");
    }
    category.map(|category| category.id.clone())
}

fn join_ids<'a>(ids: impl Iterator<Item = &'a str>) -> String {
    ids.collect::<Vec<_>>().join(",")
}

fn split_ids(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FilterAction;
    use crate::test_support::sample_taxonomy;
    use pretty_assertions::assert_eq;

    fn selected_state(taxonomy: &Taxonomy) -> FilterState {
        FilterState::default()
            .apply(FilterAction::SelectCategory(Some("c-watches".into())), taxonomy)
            .apply(FilterAction::ToggleSubcategory("s-brand".into()), taxonomy)
            .apply(FilterAction::ToggleAttribute("a-rolex".into()), taxonomy)
            .apply(FilterAction::ToggleAttribute("a-omega".into()), taxonomy)
            .apply(FilterAction::SetSearchText("chrono gold".to_string()), taxonomy)
            .apply(FilterAction::SetSort(SortOption::PriceDesc), taxonomy)
            .apply(FilterAction::SetPage(2), taxonomy)
    }

    #[test]
    fn default_state_is_the_bare_base_path() {
        let taxonomy = sample_taxonomy();
        let address = encode(&FilterState::default(), &taxonomy, &AddressConfig::default());
        assert_eq!(address.as_str(), "/store");
        assert_eq!(address.query(), None);
    }

    #[test]
    fn encodes_every_non_default_field() {
        let taxonomy = sample_taxonomy();
        let address = encode(&selected_state(&taxonomy), &taxonomy, &AddressConfig::default());
        assert_eq!(
            address.as_str(),
            "/store/watches?q=chrono+gold&subcategories=s-brand&attributes=a-omega%2Ca-rolex&page=2&sort=price-desc"
        );
        assert_eq!(address.path(), "/store/watches");
    }

    #[test]
    fn decode_inverts_encode() {
        let taxonomy = sample_taxonomy();
        let config = AddressConfig::default();
        let state = selected_state(&taxonomy);
        let address = encode(&state, &taxonomy, &config);
        let decoded = decode(address.as_str(), &taxonomy, &config);
        assert_eq!(decoded, state);
        assert_eq!(encode(&decoded, &taxonomy, &config), address);
    }

    #[test]
    fn unknown_slug_means_no_category() {
        let taxonomy = sample_taxonomy();
        let state = decode(
            "/store/clocks?q=chrono&subcategories=s-brand",
            &taxonomy,
            &AddressConfig::default(),
        );
        assert_eq!(state.category(), None);
        assert!(state.subcategories().is_empty());
        assert_eq!(state.search_text(), "chrono");
    }

    #[test]
    fn malformed_params_fall_back_to_defaults() {
        let taxonomy = sample_taxonomy();
        let state = decode(
            "/store/bags?page=abc&sort=cheapest&attributes=,,a-rolex&subcategories=s-material",
            &taxonomy,
            &AddressConfig::default(),
        );
        assert_eq!(state.page(), 1);
        assert_eq!(state.sort(), SortOption::Relevance);
        assert_eq!(state.category(), Some(&CategoryId::new("c-bags")));
        assert_eq!(
            state.subcategories().iter().cloned().collect::<Vec<_>>(),
            vec![SubcategoryId::new("s-material")]
        );
        assert!(state.attributes().is_empty(), "a-rolex is not under material");

        assert_eq!(decode("/store?page=0", &taxonomy, &AddressConfig::default()).page(), 1);
    }

    #[test]
    fn absolute_addresses_and_foreign_paths() {
        let taxonomy = sample_taxonomy();
        let config = AddressConfig::default();
        let state = decode("https://shop.example.com/store/bags/?page=3", &taxonomy, &config);
        assert_eq!(state.category(), Some(&CategoryId::new("c-bags")));
        assert_eq!(state.page(), 3);

        let state = decode("/storefront/bags", &taxonomy, &config);
        assert_eq!(state.category(), None);
    }

    #[test]
    fn root_base_path() {
        let taxonomy = sample_taxonomy();
        let config = AddressConfig {
            base_path: "/".to_string(),
        };
        let state = FilterState::default()
            .apply(FilterAction::SelectCategory(Some("c-bags".into())), &taxonomy);
        let address = encode(&state, &taxonomy, &config);
        assert_eq!(address.as_str(), "/bags");
        assert_eq!(decode(address.as_str(), &taxonomy, &config), state);
        assert_eq!(
            encode(&FilterState::default(), &taxonomy, &config).as_str(),
            "/"
        );
    }

    #[test]
    fn base_path_must_be_absolute() {
        let config = AddressConfig {
            base_path: "store".to_string(),
        };
        assert!(config.validate().is_err());
        assert!(AddressConfig::default().validate().is_ok());
    }
}
