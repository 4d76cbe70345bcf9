use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Where result ordering is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortScope {
    /// The store orders the whole filtered set before windowing.
    #[default]
    Server,
    /// Only the returned page is reordered. Correct within a page only.
    Page,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt; 0 disables retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry; doubles for each following one.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

/// Settings for [`crate::QueryExecutor`] and [`crate::BrowseSession`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Images whose URL does not start with this prefix are dropped.
    /// Empty accepts any well-formed URL.
    #[serde(default)]
    pub storage_prefix: String,

    #[serde(default)]
    pub sort_scope: SortScope,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Non-forced fetches closer than this to the last completed one are dropped.
    #[serde(default = "default_min_fetch_interval_ms")]
    pub min_fetch_interval_ms: u64,
}

fn default_page_size() -> u32 {
    12
}

fn default_min_fetch_interval_ms() -> u64 {
    2_000
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            storage_prefix: String::new(),
            sort_scope: SortScope::default(),
            retry: RetryConfig::default(),
            min_fetch_interval_ms: default_min_fetch_interval_ms(),
        }
    }
}

/// Upper bound for `page_size`.
pub const MAX_PAGE_SIZE: u32 = 1_000;

impl ExecutorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(format!(
                "page_size must be in [1, {MAX_PAGE_SIZE}], got {}",
                self.page_size
            ));
        }
        if !self.storage_prefix.is_empty() {
            Url::parse(&self.storage_prefix).map_err(|err| {
                format!(
                    "storage_prefix {:?} is not a valid URL: {err}",
                    self.storage_prefix
                )
            })?;
        }
        if self.retry.max_retries > 10 {
            return Err(format!(
                "retry.max_retries must be at most 10, got {}",
                self.retry.max_retries
            ));
        }
        Ok(())
    }

    pub fn min_fetch_interval(&self) -> Duration {
        Duration::from_millis(self.min_fetch_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_uses_defaults() {
        let config: ExecutorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ExecutorConfig::default());
        assert_eq!(config.page_size, 12);
        assert_eq!(config.retry.base_delay(), Duration::from_secs(1));
        assert_eq!(config.min_fetch_interval(), Duration::from_secs(2));
    }

    #[test]
    fn sort_scope_is_lowercase() {
        let config: ExecutorConfig = serde_json::from_str(r#"{ "sort_scope": "page" }"#).unwrap();
        assert_eq!(config.sort_scope, SortScope::Page);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let zero = ExecutorConfig {
            page_size: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let prefix = ExecutorConfig {
            storage_prefix: "cdn/images".to_string(),
            ..Default::default()
        };
        assert!(prefix.validate().unwrap_err().contains("storage_prefix"));
        assert!(ExecutorConfig::default().validate().is_ok());
    }
}
