use anyhow::Context;
use anyhow::Result;
use shopfront_store::CatalogBackend;
use shopfront_store::MemoryBackend;
use shopfront_store::RestBackend;
use shopfront_store::StoreConfig;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// The store a command runs against: the configured REST endpoint, or an
/// in-memory copy of a fixture file.
pub enum Backend {
    Rest(Arc<RestBackend>),
    Fixture {
        path: PathBuf,
        memory: Arc<MemoryBackend>,
    },
}

impl Backend {
    pub fn open(store: &StoreConfig, fixture: Option<&Path>) -> Result<Self> {
        match fixture {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read fixture {}", path.display()))?;
                let document = serde_json::from_str(&text)
                    .with_context(|| format!("Fixture {} is not valid JSON", path.display()))?;
                let memory = MemoryBackend::from_fixture(document)
                    .with_context(|| format!("Failed to load fixture {}", path.display()))?;
                info!(fixture = %path.display(), "using in-memory catalog");
                Ok(Backend::Fixture {
                    path: path.to_path_buf(),
                    memory: Arc::new(memory),
                })
            }
            None => {
                let rest = RestBackend::new(store).context("Failed to create store client")?;
                info!(base_url = %store.base_url, "using remote catalog");
                Ok(Backend::Rest(Arc::new(rest)))
            }
        }
    }

    pub fn shared(&self) -> Arc<dyn CatalogBackend> {
        match self {
            Backend::Rest(rest) => Arc::clone(rest) as Arc<dyn CatalogBackend>,
            Backend::Fixture { memory, .. } => Arc::clone(memory) as Arc<dyn CatalogBackend>,
        }
    }

    /// Persist in-memory mutations back to the fixture file. A no-op for the
    /// REST backend, whose mutations are already remote.
    pub async fn write_back(&self) -> Result<()> {
        let Backend::Fixture { path, memory } = self else {
            return Ok(());
        };
        let snapshot = memory.snapshot().await;
        let text = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, text + "\n")
            .with_context(|| format!("Failed to write fixture {}", path.display()))?;
        info!(fixture = %path.display(), "fixture updated");
        Ok(())
    }
}
