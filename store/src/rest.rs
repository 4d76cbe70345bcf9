use crate::backend::CatalogBackend;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::error::StoreError;
use crate::select::Order;
use crate::select::Predicate;
use crate::select::Row;
use crate::select::Select;
use crate::select::SelectOutput;
use async_trait::async_trait;
use reqwest::Method;
use reqwest::Response;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_RANGE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

const PREFER: &str = "prefer";
const POSTGRES_FOREIGN_KEY_VIOLATION: &str = "23503";

/// Client for a PostgREST-compatible table API.
#[derive(Clone, Debug)]
pub struct RestBackend {
    http: reqwest::Client,
    endpoint: Url,
    headers: HeaderMap,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

impl RestBackend {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        config.validate().map_err(StoreError::InvalidConfig)?;
        let endpoint = config.endpoint().map_err(StoreError::InvalidConfig)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| StoreError::InvalidConfig(err.to_string()))?;
        Ok(Self {
            http,
            endpoint,
            headers: auth_headers(config.api_key.as_deref())?,
        })
    }

    fn table_url(&self, table: &str) -> Result<Url> {
        self.endpoint
            .join(table)
            .map_err(|err| StoreError::InvalidConfig(format!("bad table name {table}: {err}")))
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        prefer: Option<&str>,
        body: Option<&Row>,
    ) -> Result<Response> {
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .headers(self.headers.clone());
        if let Some(prefer) = prefer {
            request = request.header(PREFER, prefer);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status();
        debug!(%method, path = url.path(), status = status.as_u16(), "store request");
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(status_error(status.as_u16(), url.path(), &text))
    }

    async fn rows(response: Response) -> Result<Vec<Row>> {
        let body: Value = response.json().await?;
        match body {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => Ok(row),
                    other => Err(StoreError::Decode(format!("expected row object, got {other}"))),
                })
                .collect(),
            other => Err(StoreError::Decode(format!("expected row array, got {other}"))),
        }
    }
}

fn auth_headers(api_key: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(key) = api_key {
        let value = HeaderValue::from_str(key)
            .map_err(|err| StoreError::InvalidConfig(format!("api_key: {err}")))?;
        headers.insert("apikey", value);
        let bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|err| StoreError::InvalidConfig(format!("api_key: {err}")))?;
        headers.insert(AUTHORIZATION, bearer);
    }
    Ok(headers)
}

fn status_error(status: u16, path: &str, text: &str) -> StoreError {
    let body = serde_json::from_str::<ErrorBody>(text).ok();
    let message = body
        .as_ref()
        .and_then(|body| body.message.clone())
        .unwrap_or_else(|| text.to_string());
    match body {
        Some(body) if body.code.as_deref() == Some(POSTGRES_FOREIGN_KEY_VIOLATION) => {
            StoreError::ForeignKey {
                table: path.rsplit('/').next().unwrap_or(path).to_string(),
                column: "*".to_string(),
                message: body.details.unwrap_or(message),
            }
        }
        _ => StoreError::Status { status, message },
    }
}

/// Total from a `Content-Range` header such as `0-11/42` or `*/0`.
pub(crate) fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Quote a value for use inside `in.(...)` lists and `or=(...)` trees.
fn quote_reserved(raw: &str) -> String {
    let reserved = raw
        .chars()
        .any(|ch| matches!(ch, ',' | '.' | ':' | '(' | ')' | '"' | '\\') || ch.is_whitespace());
    if !reserved {
        return raw.to_string();
    }
    let escaped = raw.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// `ilike` pattern matching `needle` anywhere in the column.
///
/// PostgREST rewrites every `*` to `%` and offers no escape for it, so a
/// literal `*` is sent as `_` and matches any single character.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
        .replace('*', "_");
    format!("*{escaped}*")
}

fn render_list(values: &[Value]) -> String {
    let items: Vec<String> = values
        .iter()
        .map(|value| quote_reserved(&render_scalar(value)))
        .collect();
    format!("({})", items.join(","))
}

/// `column=op.value` query pair for a top-level filter.
pub(crate) fn filter_param(predicate: &Predicate) -> (String, String) {
    match predicate {
        Predicate::Eq { column, value } if value.is_null() => {
            (column.clone(), "is.null".to_string())
        }
        Predicate::Eq { column, value } => (column.clone(), format!("eq.{}", render_scalar(value))),
        Predicate::In { column, values } => (column.clone(), format!("in.{}", render_list(values))),
        Predicate::Contains { column, needle } => {
            (column.clone(), format!("ilike.{}", like_pattern(needle)))
        }
        Predicate::IsNull { column } => (column.clone(), "is.null".to_string()),
        Predicate::Any(inner) => ("or".to_string(), render_group(inner)),
    }
}

fn render_group(inner: &[Predicate]) -> String {
    let parts: Vec<String> = inner.iter().map(render_condition).collect();
    format!("({})", parts.join(","))
}

fn render_condition(predicate: &Predicate) -> String {
    match predicate {
        Predicate::Eq { column, value } if value.is_null() => format!("{column}.is.null"),
        Predicate::Eq { column, value } => {
            format!("{column}.eq.{}", quote_reserved(&render_scalar(value)))
        }
        Predicate::In { column, values } => format!("{column}.in.{}", render_list(values)),
        Predicate::Contains { column, needle } => {
            format!("{column}.ilike.{}", quote_reserved(&like_pattern(needle)))
        }
        Predicate::IsNull { column } => format!("{column}.is.null"),
        Predicate::Any(inner) => format!("or{}", render_group(inner)),
    }
}

fn render_order(order: &[Order]) -> String {
    order
        .iter()
        .map(|order| {
            let direction = if order.descending { "desc" } else { "asc" };
            let nulls = if order.nulls_last {
                "nullslast"
            } else {
                "nullsfirst"
            };
            format!("{}.{direction}.{nulls}", order.column)
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Query string for a select, in a stable order.
pub(crate) fn select_params(query: &Select) -> Vec<(String, String)> {
    let mut params = vec![(
        "select".to_string(),
        query
            .columns
            .as_ref()
            .map(|columns| columns.join(","))
            .unwrap_or_else(|| "*".to_string()),
    )];
    params.extend(query.filters.iter().map(filter_param));
    if !query.order.is_empty() {
        params.push(("order".to_string(), render_order(&query.order)));
    }
    if let Some(window) = query.window {
        params.push(("offset".to_string(), window.offset.to_string()));
        params.push(("limit".to_string(), window.limit.to_string()));
    }
    params
}

fn with_filters(mut url: Url, filters: &[Predicate]) -> Url {
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in filters.iter().map(filter_param) {
            pairs.append_pair(&key, &value);
        }
    }
    url
}

#[async_trait]
impl CatalogBackend for RestBackend {
    async fn select(&self, query: Select) -> Result<SelectOutput> {
        let mut url = self.table_url(&query.table)?;
        url.query_pairs_mut().extend_pairs(select_params(&query));
        let prefer = query.exact_count.then_some("count=exact");
        let response = self.send(Method::GET, url, prefer, None).await?;

        let total = if query.exact_count {
            let header = response
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| StoreError::Decode("missing Content-Range header".to_string()))?;
            Some(parse_content_range(header).ok_or_else(|| {
                StoreError::Decode(format!("unparseable Content-Range {header:?}"))
            })?)
        } else {
            None
        };
        let rows = Self::rows(response).await?;
        Ok(SelectOutput { rows, total })
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        let url = self.table_url(table)?;
        let response = self
            .send(Method::POST, url, Some("return=representation"), Some(&row))
            .await?;
        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode(format!("insert into {table} returned no row")))
    }

    async fn update(&self, table: &str, filters: &[Predicate], patch: Row) -> Result<u64> {
        let url = with_filters(self.table_url(table)?, filters);
        let response = self
            .send(Method::PATCH, url, Some("return=representation"), Some(&patch))
            .await?;
        Ok(Self::rows(response).await?.len() as u64)
    }

    async fn delete(&self, table: &str, filters: &[Predicate]) -> Result<u64> {
        let url = with_filters(self.table_url(table)?, filters);
        let response = self
            .send(Method::DELETE, url, Some("return=representation"), None)
            .await?;
        Ok(Self::rows(response).await?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::Window;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn renders_filters_in_postgrest_syntax() {
        let query = Select::from("products")
            .filter(Predicate::Any(vec![
                Predicate::contains("name", "deep sea"),
                Predicate::contains("description", "steel"),
            ]))
            .filter(Predicate::eq("category_id", "c1"))
            .filter(Predicate::one_of("subcategory_id", ["s1", "s,2"]))
            .filter(Predicate::eq("published", true))
            .order_by(Order::desc("price"))
            .order_by(Order::asc("id"))
            .window(Window::page(2, 12));

        assert_eq!(
            select_params(&query),
            pairs(&[
                ("select", "*"),
                (
                    "or",
                    "(name.ilike.\"*deep sea*\",description.ilike.*steel*)"
                ),
                ("category_id", "eq.c1"),
                ("subcategory_id", "in.(s1,\"s,2\")"),
                ("published", "eq.true"),
                ("order", "price.desc.nullslast,id.asc.nullslast"),
                ("offset", "12"),
                ("limit", "12"),
            ])
        );
    }

    #[test]
    fn like_wildcards_in_search_text_are_neutralised() {
        assert_eq!(like_pattern("50%_off"), "*50\\%\\_off*");
        assert_eq!(like_pattern("a*b"), "*a_b*");
        assert_eq!(
            filter_param(&Predicate::contains("name", "a*b")),
            ("name".to_string(), "ilike.*a_b*".to_string())
        );
    }

    #[test]
    fn null_equality_becomes_is_null() {
        assert_eq!(
            filter_param(&Predicate::eq("category_id", Value::Null)),
            ("category_id".to_string(), "is.null".to_string())
        );
        assert_eq!(
            filter_param(&Predicate::is_null("attribute_id")),
            ("attribute_id".to_string(), "is.null".to_string())
        );
    }

    #[test]
    fn parses_content_range() {
        assert_eq!(parse_content_range("0-11/42"), Some(42));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-11/*"), None);
    }

    #[test]
    fn foreign_key_errors_are_recognised() {
        let body = json!({
            "code": "23503",
            "message": "update or delete violates foreign key constraint",
            "details": "Key (id)=(c1) is still referenced from table \"products\"."
        })
        .to_string();
        let err = status_error(409, "/rest/v1/categories", &body);
        assert!(
            matches!(err, StoreError::ForeignKey { ref table, .. } if table == "categories"),
            "{err:?}"
        );
        let err = status_error(503, "/rest/v1/categories", "upstream down");
        assert!(err.is_transient());
    }
}
