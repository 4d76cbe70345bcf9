use serde_json::Value;
use std::cmp::Ordering;

/// A single record as exchanged with the store.
pub type Row = serde_json::Map<String, Value>;

/// Row filter understood by every backend. Filters in a [`Select`] are ANDed.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// `column = value`
    Eq { column: String, value: Value },
    /// `column IN (values)`
    In { column: String, values: Vec<Value> },
    /// Case-insensitive substring match on a text column.
    Contains { column: String, needle: String },
    /// `column IS NULL`
    IsNull { column: String },
    /// Disjunction of the inner predicates.
    Any(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Predicate::Eq {
            column: column.to_string(),
            value: value.into(),
        }
    }

    pub fn one_of<I, V>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::In {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(column: &str, needle: &str) -> Self {
        Predicate::Contains {
            column: column.to_string(),
            needle: needle.to_string(),
        }
    }

    pub fn is_null(column: &str) -> Self {
        Predicate::IsNull {
            column: column.to_string(),
        }
    }

    /// Evaluate against an in-process row.
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Predicate::Eq { column, value } => {
                row.get(column).is_some_and(|cell| values_equal(cell, value))
            }
            Predicate::In { column, values } => row
                .get(column)
                .is_some_and(|cell| values.iter().any(|value| values_equal(cell, value))),
            Predicate::Contains { column, needle } => match row.get(column) {
                Some(Value::String(text)) => {
                    text.to_lowercase().contains(&needle.to_lowercase())
                }
                _ => false,
            },
            Predicate::IsNull { column } => row.get(column).is_none_or(Value::is_null),
            Predicate::Any(inner) => inner.iter().any(|predicate| predicate.matches(row)),
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
    pub nulls_last: bool,
}

impl Order {
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: false,
            nulls_last: true,
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: true,
            nulls_last: true,
        }
    }

    /// Compare two rows on this column.
    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        let left = a.get(&self.column).filter(|value| !value.is_null());
        let right = b.get(&self.column).filter(|value| !value.is_null());
        match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) if self.nulls_last => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) if self.nulls_last => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = compare_values(x, y);
                if self.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            }
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Offset/limit window over an ordered result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub limit: u64,
}

impl Window {
    /// Window for a 1-based page. Page 0 is treated as page 1.
    pub fn page(page: u32, page_size: u32) -> Self {
        let page = u64::from(page.max(1));
        let page_size = u64::from(page_size);
        Self {
            offset: (page - 1) * page_size,
            limit: page_size,
        }
    }

    /// Inclusive index of the last row in the window, `None` for an empty window.
    pub fn last_index(&self) -> Option<u64> {
        (self.limit > 0).then(|| self.offset + self.limit - 1)
    }
}

/// A read against one table.
#[derive(Clone, Debug, PartialEq)]
pub struct Select {
    pub table: String,
    /// Projected columns; `None` selects every column.
    pub columns: Option<Vec<String>>,
    pub filters: Vec<Predicate>,
    pub order: Vec<Order>,
    pub window: Option<Window>,
    /// Ask the store for the exact number of rows matching `filters`,
    /// ignoring `window`.
    pub exact_count: bool,
}

impl Select {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: None,
            filters: Vec::new(),
            order: Vec::new(),
            window: None,
            exact_count: false,
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|column| (*column).to_string()).collect());
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn order_by(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    pub fn window(mut self, window: Window) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_exact_count(mut self) -> Self {
        self.exact_count = true;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectOutput {
    pub rows: Vec<Row>,
    /// Present when the select asked for an exact count.
    pub total: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn contains_is_case_insensitive() {
        let product = row(json!({ "name": "Chronograph Deluxe" }));
        assert!(Predicate::contains("name", "CHRONO").matches(&product));
        assert!(!Predicate::contains("name", "diver").matches(&product));
        assert!(!Predicate::contains("description", "chrono").matches(&product));
    }

    #[test]
    fn missing_column_counts_as_null() {
        let product = row(json!({ "name": "x", "category_id": null }));
        assert!(Predicate::is_null("category_id").matches(&product));
        assert!(Predicate::is_null("subcategory_id").matches(&product));
        assert!(!Predicate::eq("category_id", "c1").matches(&product));
    }

    #[test]
    fn numbers_compare_by_value() {
        let product = row(json!({ "price": 10 }));
        assert!(Predicate::eq("price", json!(10.0)).matches(&product));
        assert!(Predicate::one_of("price", [json!(3), json!(10)]).matches(&product));
    }

    #[test]
    fn nulls_sort_last_in_both_directions() {
        let cheap = row(json!({ "price": 1 }));
        let unpriced = row(json!({ "price": null }));
        assert_eq!(Order::asc("price").compare(&cheap, &unpriced), Ordering::Less);
        assert_eq!(Order::desc("price").compare(&cheap, &unpriced), Ordering::Less);
    }

    #[test]
    fn page_window_is_one_based() {
        assert_eq!(Window::page(1, 12), Window { offset: 0, limit: 12 });
        assert_eq!(Window::page(3, 12).last_index(), Some(35));
        assert_eq!(Window::page(0, 5), Window::page(1, 5));
        assert_eq!(Window::page(2, 0).last_index(), None);
    }
}
