use crate::config::ExecutorConfig;
use crate::config::SortScope;
use crate::error::QueryError;
use crate::error::Result;
use crate::images::attach_images;
use crate::model::ProductRecord;
use crate::model::QueryResult;
use crate::request::QueryRequest;
use crate::request::sort_page;
use serde_json::Value;
use shopfront_store::CatalogBackend;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing::warn;

/// Doubling delay between retries: base, 2×base, 4×base, ...
#[derive(Debug)]
struct Backoff {
    current: Duration,
}

impl Backoff {
    fn new(initial: Duration) -> Self {
        Self { current: initial }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2);
        delay
    }
}

/// Runs [`QueryRequest`]s against the catalog store.
pub struct QueryExecutor {
    backend: Arc<dyn CatalogBackend>,
    config: ExecutorConfig,
}

impl QueryExecutor {
    pub fn new(backend: Arc<dyn CatalogBackend>, config: ExecutorConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Fetch one page, retrying transient store failures with exponential
    /// backoff. Non-transient failures return immediately.
    pub async fn execute(&self, request: &QueryRequest) -> Result<QueryResult> {
        request.validate()?;
        let max_retries = self.config.retry.max_retries;
        let mut backoff = Backoff::new(self.config.retry.base_delay());
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.execute_once(request).await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(attempt, "product query recovered");
                    }
                    return Ok(result);
                }
                Err(QueryError::Store(err)) if err.is_transient() => {
                    if attempt > max_retries {
                        warn!(attempts = attempt, "product query failed, giving up: {err}");
                        return Err(QueryError::Exhausted {
                            attempts: attempt,
                            source: err,
                        });
                    }
                    let delay = backoff.next_delay();
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "product query failed, retrying: {err}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn execute_once(&self, request: &QueryRequest) -> Result<QueryResult> {
        let output = self
            .backend
            .select(request.to_select(self.config.sort_scope))
            .await?;
        let total_count = output
            .total
            .ok_or_else(|| QueryError::Decode("store did not report an exact count".to_string()))?;

        let mut items = output
            .rows
            .into_iter()
            .map(|row| {
                serde_json::from_value::<ProductRecord>(Value::Object(row))
                    .map_err(|err| QueryError::Decode(err.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        attach_images(self.backend.as_ref(), &mut items, &self.config.storage_prefix).await?;
        if self.config.sort_scope == SortScope::Page {
            sort_page(&mut items, request.sort);
        }

        debug!(
            page = request.page,
            items = items.len(),
            total_count,
            "product page loaded"
        );
        Ok(QueryResult {
            items,
            total_count,
            page: request.page,
            page_size: request.page_size,
        })
    }
}
