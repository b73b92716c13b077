//! Document model spoken by the persistence gateway.
//!
//! The hosted database stores schemaless documents grouped in collections.
//! [`Document`] is one record (an opaque id plus a field map), [`FieldValue`]
//! is the closed set of value types the client writes, and [`Query`] is the
//! subset of the query language the client uses: a conjunction of
//! single-field filters with an optional single-field sort.
//!
//! [`FieldValue::ServerTimestamp`] is a write-only sentinel. Stores replace it
//! with their own clock at write time, so reads never return it.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of generated document ids.
pub const DOCUMENT_ID_LEN: usize = 20;

/// Generate a random alphanumeric document id, the same shape the hosted
/// database assigns.
pub fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(DOCUMENT_ID_LEN)
        .map(char::from)
        .collect()
}

/// Field map of a document, ordered by field name.
pub type Fields = BTreeMap<String, FieldValue>;

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    String(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<FieldValue>),
    /// Resolved to the store's clock when written.
    ServerTimestamp,
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Ordering between two values of the same type. Values of different
    /// types (or arrays) are not comparable.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => Some(Ordering::Equal),
            (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
            (FieldValue::String(a), FieldValue::String(b)) => Some(a.cmp(b)),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Integer(n)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(ts: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(ts)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::Array(items.into_iter().map(FieldValue::String).collect())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_str)
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(FieldValue::as_bool)
    }

    pub fn get_timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        self.get(field).and_then(FieldValue::as_timestamp)
    }

    /// String elements of an array field. Non-string elements are skipped.
    pub fn get_string_array(&self, field: &str) -> Option<Vec<String>> {
        self.get(field).and_then(FieldValue::as_array).map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
    }
}

/// Comparison operator of a field filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Equal,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

/// `field <op> value`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: FieldValue,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOp::Equal, value)
    }

    /// Evaluate the filter against a field map. A missing field never matches.
    pub fn matches(&self, fields: &Fields) -> bool {
        let Some(actual) = fields.get(&self.field) else {
            return false;
        };
        if self.op == FilterOp::Equal {
            return actual == &self.value;
        }
        match actual.compare(&self.value) {
            Some(ord) => match self.op {
                FilterOp::LessThan => ord == Ordering::Less,
                FilterOp::LessThanOrEqual => ord != Ordering::Greater,
                FilterOp::GreaterThan => ord == Ordering::Greater,
                FilterOp::GreaterThanOrEqual => ord != Ordering::Less,
                FilterOp::Equal => ord == Ordering::Equal,
            },
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Collection query: all filters must match; results sorted by `order_by`.
///
/// As in the hosted database, documents that lack the sort field are left
/// out of sorted results.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<FieldFilter>,
    pub order_by: Option<(String, SortDirection)>,
    pub limit: Option<usize>,
}

impl Query {
    /// Start a query over a collection.
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    /// Add a filter (AND-ed with the existing ones).
    pub fn filter(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Shorthand for an equality filter.
    pub fn where_eq(self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.filter(FieldFilter::eq(field, value))
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Whether a document's fields satisfy every filter.
    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters.iter().all(|f| f.matches(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fields(pairs: &[(&str, FieldValue)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_generated_ids_are_alphanumeric() {
        let id = generate_id();
        assert_eq!(id.len(), DOCUMENT_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(generate_id(), id);
    }

    #[test]
    fn test_eq_filter_matches_same_value() {
        let f = fields(&[("userId", "u1".into()), ("isFavorite", true.into())]);
        assert!(FieldFilter::eq("userId", "u1").matches(&f));
        assert!(!FieldFilter::eq("userId", "u2").matches(&f));
        assert!(FieldFilter::eq("isFavorite", true).matches(&f));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let f = fields(&[("title", "x".into())]);
        assert!(!FieldFilter::eq("category", "Work").matches(&f));
        assert!(!FieldFilter::new("count", FilterOp::GreaterThan, 1i64).matches(&f));
    }

    #[test]
    fn test_range_filters_on_timestamps() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let f = fields(&[("updatedAt", late.into())]);

        assert!(FieldFilter::new("updatedAt", FilterOp::GreaterThan, early).matches(&f));
        assert!(FieldFilter::new("updatedAt", FilterOp::GreaterThanOrEqual, late).matches(&f));
        assert!(!FieldFilter::new("updatedAt", FilterOp::LessThan, early).matches(&f));
    }

    #[test]
    fn test_range_filter_type_mismatch_is_false() {
        let f = fields(&[("title", "abc".into())]);
        assert!(!FieldFilter::new("title", FilterOp::LessThan, 5i64).matches(&f));
    }

    #[test]
    fn test_query_builder_conjunction() {
        let q = Query::collection("notes")
            .where_eq("userId", "u1")
            .where_eq("category", "Work")
            .order_by("updatedAt", SortDirection::Descending);

        assert_eq!(q.filters.len(), 2);
        assert!(q.matches(&fields(&[
            ("userId", "u1".into()),
            ("category", "Work".into())
        ])));
        assert!(!q.matches(&fields(&[
            ("userId", "u1".into()),
            ("category", "Study".into())
        ])));
    }

    #[test]
    fn test_string_array_skips_non_strings() {
        let doc = Document::new(
            "d1",
            fields(&[(
                "tags",
                FieldValue::Array(vec!["a".into(), FieldValue::Integer(3), "b".into()]),
            )]),
        );
        assert_eq!(
            doc.get_string_array("tags"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(doc.get_string_array("missing"), None);
    }

    #[test]
    fn test_option_into_field_value() {
        let some: FieldValue = Some("x".to_string()).into();
        let none: FieldValue = Option::<String>::None.into();
        assert_eq!(some, FieldValue::String("x".to_string()));
        assert_eq!(none, FieldValue::Null);
    }
}
