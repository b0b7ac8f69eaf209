//! Parameterized document queries.
//!
//! Filters are data, not strings: field names and values travel as bind
//! parameters to SQL backends and are compared structurally by the
//! in-memory backend. Nothing user-supplied is ever spliced into query text.

use serde_json::Value;

/// A predicate over a JSON document.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Top-level `field` equals `value`.
    Eq {
        /// Field name.
        field: String,
        /// Expected value.
        value: Value,
    },
    /// At least one of the filters holds. An empty list matches nothing.
    AnyOf(Vec<Filter>),
    /// Every filter holds. An empty list matches everything.
    AllOf(Vec<Filter>),
}

impl Filter {
    /// Equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Evaluate against a document.
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Self::Eq { field, value } => document.get(field) == Some(value),
            Self::AnyOf(filters) => filters.iter().any(|f| f.matches(document)),
            Self::AllOf(filters) => filters.iter().all(|f| f.matches(document)),
        }
    }
}

/// A bind parameter produced when rendering a filter to SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// Bound as `TEXT` (field names).
    Text(String),
    /// Bound as `JSONB` (compared values).
    Json(Value),
}

/// A conjunction of filters over one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    collection: String,
    filters: Vec<Filter>,
}

impl Query {
    /// Query every document of `collection`.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
        }
    }

    /// Require `field == value`.
    pub fn filter_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::eq(field, value))
    }

    /// Require at least one of `alternatives`.
    pub fn filter_any(self, alternatives: Vec<Filter>) -> Self {
        self.filter(Filter::AnyOf(alternatives))
    }

    /// Add an arbitrary filter.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Target collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Filters, all of which must hold.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Evaluate against a document.
    pub fn matches(&self, document: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(document))
    }

    /// Render the filters as a SQL predicate over a JSONB `column`.
    ///
    /// Placeholders are numbered from `first_placeholder`; the returned
    /// parameters must be bound in order.
    pub fn to_sql_predicate(&self, column: &str, first_placeholder: usize) -> (String, Vec<SqlParam>) {
        let mut params = Vec::new();
        let mut next = first_placeholder;
        let sql = render(&Filter::AllOf(self.filters.clone()), column, &mut next, &mut params);
        (sql, params)
    }
}

fn render(filter: &Filter, column: &str, next: &mut usize, params: &mut Vec<SqlParam>) -> String {
    match filter {
        Filter::Eq { field, value } => {
            let field_ph = *next;
            let value_ph = *next + 1;
            *next += 2;
            params.push(SqlParam::Text(field.clone()));
            params.push(SqlParam::Json(value.clone()));
            format!("{} -> ${} = ${}", column, field_ph, value_ph)
        }
        Filter::AnyOf(filters) if filters.is_empty() => "FALSE".to_string(),
        Filter::AllOf(filters) if filters.is_empty() => "TRUE".to_string(),
        Filter::AnyOf(filters) => {
            let parts: Vec<_> = filters.iter().map(|f| render(f, column, next, params)).collect();
            format!("({})", parts.join(" OR "))
        }
        Filter::AllOf(filters) => {
            let parts: Vec<_> = filters.iter().map(|f| render(f, column, next, params)).collect();
            format!("({})", parts.join(" AND "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_matches_conjunction() {
        let query = Query::new("ls_node")
            .filter_eq("igp_router_id", "0000.0000.0001")
            .filter_eq("domain_id", 1);

        assert!(query.matches(&json!({"igp_router_id": "0000.0000.0001", "domain_id": 1})));
        assert!(!query.matches(&json!({"igp_router_id": "0000.0000.0001", "domain_id": 2})));
        assert!(!query.matches(&json!({"igp_router_id": "0000.0000.0001"})));
    }

    #[test]
    fn test_matches_disjunction() {
        let query = Query::new("ls_node_edge").filter_any(vec![
            Filter::eq("_from", "ls_node/a"),
            Filter::eq("_to", "ls_node/a"),
        ]);

        assert!(query.matches(&json!({"_from": "ls_node/a", "_to": "ls_node/b"})));
        assert!(query.matches(&json!({"_from": "ls_node/b", "_to": "ls_node/a"})));
        assert!(!query.matches(&json!({"_from": "ls_node/b", "_to": "ls_node/c"})));
    }

    #[test]
    fn test_empty_any_matches_nothing() {
        let query = Query::new("c").filter_any(vec![]);
        assert!(!query.matches(&json!({})));
        assert!(Query::new("c").matches(&json!({})));
    }

    #[test]
    fn test_sql_predicate_binds_everything() {
        let query = Query::new("ls_node_edge")
            .filter_eq("protocol_id", 2)
            .filter_any(vec![
                Filter::eq("_from", "ls_node/a\" OR 1=1"),
                Filter::eq("_to", "ls_node/a"),
            ]);

        let (sql, params) = query.to_sql_predicate("body", 2);
        assert_eq!(sql, "(body -> $2 = $3 AND (body -> $4 = $5 OR body -> $6 = $7))");
        assert_eq!(params.len(), 6);
        assert_eq!(params[0], SqlParam::Text("protocol_id".to_string()));
        assert_eq!(params[3], SqlParam::Json(json!("ls_node/a\" OR 1=1")));
        assert!(!sql.contains("OR 1=1"));
    }

    #[test]
    fn test_sql_predicate_without_filters() {
        let (sql, params) = Query::new("ls_node").to_sql_predicate("body", 2);
        assert_eq!(sql, "TRUE");
        assert!(params.is_empty());
    }
}
