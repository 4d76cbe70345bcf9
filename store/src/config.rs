use serde::Deserialize;
use serde::Serialize;
use url::Url;

/// Connection settings for [`crate::RestBackend`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root of the REST endpoint, e.g. `https://project.example.co/rest/v1/`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sent as both the `apikey` header and the bearer token.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:54321/rest/v1/".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), String> {
        let url = Url::parse(&self.base_url)
            .map_err(|err| format!("base_url {:?} is not a valid URL: {err}", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!(
                "base_url must use http or https, got {}",
                url.scheme()
            ));
        }
        if self.timeout_ms == 0 {
            return Err("timeout_ms must be greater than 0".to_string());
        }
        Ok(())
    }

    /// `base_url` with a guaranteed trailing slash so table names join under it.
    pub fn endpoint(&self) -> Result<Url, String> {
        let mut base = self.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base).map_err(|err| err.to_string())
    }
}
