use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use serde::Deserialize;
use serde::Serialize;
use shopfront_filter::AddressConfig;
use shopfront_query::ExecutorConfig;
use shopfront_query::ProjectionConfig;
use shopfront_store::StoreConfig;
use std::path::Path;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_FILE: &str = "shopfront.toml";
pub const ENV_STORE_URL: &str = "SHOPFRONT_STORE_URL";
pub const ENV_API_KEY: &str = "SHOPFRONT_API_KEY";

/// Everything `shopfront.toml` can set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShopfrontConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub address: AddressConfig,
    #[serde(default)]
    pub projection: ProjectionConfig,
    /// Used when `RUST_LOG` is unset.
    #[serde(default)]
    pub log_level: Option<String>,
}

impl ShopfrontConfig {
    /// Load `explicit`, or `shopfront.toml` in the working directory when it
    /// exists, or defaults. Environment overrides are applied afterwards.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                fallback.is_file().then_some(fallback)
            }
        };
        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_STORE_URL).filter(|value| !value.is_empty()) {
            self.store.base_url = url;
        }
        if let Some(key) = lookup(ENV_API_KEY).filter(|value| !value.is_empty()) {
            self.store.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.store
            .validate()
            .map_err(|err| anyhow!("[store] {err}"))?;
        self.executor
            .validate()
            .map_err(|err| anyhow!("[executor] {err}"))?;
        self.address
            .validate()
            .map_err(|err| anyhow!("[address] {err}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shopfront_query::SortScope;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: ShopfrontConfig = toml::from_str(
            r#"
log_level = "debug"

[executor]
page_size = 24
sort_scope = "page"

[projection]
currency_symbol = "€"
"#,
        )
        .unwrap();
        assert_eq!(config.executor.page_size, 24);
        assert_eq!(config.executor.sort_scope, SortScope::Page);
        assert_eq!(config.executor.retry.max_retries, 3);
        assert_eq!(config.address.base_path, "/store");
        assert_eq!(config.projection.currency_symbol, "€");
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn environment_overrides_store_settings() {
        let mut config = ShopfrontConfig::default();
        config.apply_env(|key| match key {
            ENV_STORE_URL => Some("https://shop.example.com/rest/v1/".to_string()),
            ENV_API_KEY => Some("anon".to_string()),
            _ => None,
        });
        assert_eq!(config.store.base_url, "https://shop.example.com/rest/v1/");
        assert_eq!(config.store.api_key.as_deref(), Some("anon"));
    }

    #[test]
    fn invalid_section_is_named() {
        let mut config = ShopfrontConfig::default();
        config.executor.page_size = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.starts_with("[executor]"), "{err}");
    }
}
