//! Firestore REST v1 wire types and value conversion.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use supernotes_core::{
    Document, Error, FieldFilter, FieldValue, Fields, FilterOp, Query, Result, SortDirection,
};

// =============================================================================
// VALUES
// =============================================================================

/// A Firestore value: a JSON object with exactly one `<type>Value` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    /// int64 travels as a decimal string.
    IntegerValue(String),
    DoubleValue(f64),
    /// RFC 3339 UTC timestamp.
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(serde_json::Value),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Encode a field value. `ServerTimestamp` has no wire value (it becomes a
/// field transform), so it yields `None`.
pub fn encode_value(value: &FieldValue) -> Option<Value> {
    Some(match value {
        FieldValue::Null => Value::NullValue(()),
        FieldValue::Bool(b) => Value::BooleanValue(*b),
        FieldValue::Integer(n) => Value::IntegerValue(n.to_string()),
        FieldValue::String(s) => Value::StringValue(s.clone()),
        FieldValue::Timestamp(ts) => Value::TimestampValue(format_timestamp(ts)),
        FieldValue::Array(items) => Value::ArrayValue(ArrayValue {
            values: items.iter().filter_map(encode_value).collect(),
        }),
        FieldValue::ServerTimestamp => return None,
    })
}

/// Decode a wire value. Types the client never writes (doubles, maps,
/// references, bytes, geo points) decode as `Null`.
pub fn decode_value(value: Value) -> FieldValue {
    match value {
        Value::NullValue(()) => FieldValue::Null,
        Value::BooleanValue(b) => FieldValue::Bool(b),
        Value::IntegerValue(n) => n.parse().map(FieldValue::Integer).unwrap_or(FieldValue::Null),
        Value::StringValue(s) => FieldValue::String(s),
        Value::TimestampValue(ts) => DateTime::parse_from_rfc3339(&ts)
            .map(|dt| FieldValue::Timestamp(dt.with_timezone(&Utc)))
            .unwrap_or(FieldValue::Null),
        Value::ArrayValue(arr) => {
            FieldValue::Array(arr.values.into_iter().map(decode_value).collect())
        }
        Value::DoubleValue(_)
        | Value::BytesValue(_)
        | Value::ReferenceValue(_)
        | Value::GeoPointValue(_)
        | Value::MapValue(_) => FieldValue::Null,
    }
}

// =============================================================================
// DOCUMENTS
// =============================================================================

/// Document resource as sent and received.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing)]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing)]
    pub update_time: Option<String>,
}

impl WireDocument {
    /// Convert to a core document. The id is the last segment of `name`.
    pub fn into_document(self) -> Document {
        let id = self
            .name
            .as_deref()
            .and_then(|n| n.rsplit('/').next())
            .unwrap_or_default()
            .to_string();
        let fields = self
            .fields
            .into_iter()
            .map(|(k, v)| (k, decode_value(v)))
            .collect();
        Document::new(id, fields)
    }
}

// =============================================================================
// COMMIT
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub writes: Vec<Write>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Write {
    pub update: WireDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_mask: Option<DocumentMask>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub update_transforms: Vec<FieldTransform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_document: Option<Precondition>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMask {
    pub field_paths: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTransform {
    pub field_path: String,
    pub set_to_server_value: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Precondition {
    pub exists: bool,
}

/// How a write treats the existing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Must not exist yet.
    Create,
    /// Create or replace.
    Replace,
    /// Must exist; only the given fields change and `Null` deletes a field.
    Merge,
}

/// Build a single write. Server timestamps become `REQUEST_TIME` transforms.
pub fn build_write(name: String, fields: Fields, mode: WriteMode) -> Write {
    let mut wire = BTreeMap::new();
    let mut mask = Vec::new();
    let mut transforms = Vec::new();

    for (key, value) in fields {
        match value {
            FieldValue::ServerTimestamp => transforms.push(FieldTransform {
                field_path: key,
                set_to_server_value: "REQUEST_TIME",
            }),
            // Masked but absent from the document: the field is deleted.
            FieldValue::Null if mode == WriteMode::Merge => mask.push(key),
            other => {
                if let Some(encoded) = encode_value(&other) {
                    mask.push(key.clone());
                    wire.insert(key, encoded);
                }
            }
        }
    }

    let (update_mask, current_document) = match mode {
        WriteMode::Create => (None, Some(Precondition { exists: false })),
        WriteMode::Replace => (None, None),
        WriteMode::Merge => (
            Some(DocumentMask { field_paths: mask }),
            Some(Precondition { exists: true }),
        ),
    };

    Write {
        update: WireDocument {
            name: Some(name),
            fields: wire,
            ..Default::default()
        },
        update_mask,
        update_transforms: transforms,
        current_document,
    }
}

// =============================================================================
// QUERY
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<Order>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Filter {
    FieldFilter(WireFieldFilter),
    CompositeFilter(CompositeFilter),
}

#[derive(Debug, Serialize)]
pub struct WireFieldFilter {
    pub field: FieldReference,
    pub op: &'static str,
    pub value: Value,
}

#[derive(Debug, Serialize)]
pub struct CompositeFilter {
    pub op: &'static str,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub field_path: String,
}

#[derive(Debug, Serialize)]
pub struct Order {
    pub field: FieldReference,
    pub direction: &'static str,
}

/// One element of the `:runQuery` response stream.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryResponseItem {
    #[serde(default)]
    pub document: Option<WireDocument>,
}

fn op_name(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Equal => "EQUAL",
        FilterOp::LessThan => "LESS_THAN",
        FilterOp::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
        FilterOp::GreaterThan => "GREATER_THAN",
        FilterOp::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
    }
}

fn field_filter(filter: &FieldFilter) -> Result<Filter> {
    let value = encode_value(&filter.value).ok_or_else(|| {
        Error::InvalidInput(format!(
            "server timestamp cannot be used as a filter value on '{}'",
            filter.field
        ))
    })?;
    Ok(Filter::FieldFilter(WireFieldFilter {
        field: FieldReference {
            field_path: filter.field.clone(),
        },
        op: op_name(filter.op),
        value,
    }))
}

/// Translate a core query. Several filters become one `AND` composite.
pub fn structured_query(query: &Query) -> Result<StructuredQuery> {
    let mut filters = query
        .filters
        .iter()
        .map(field_filter)
        .collect::<Result<Vec<_>>>()?;

    let filter = match filters.len() {
        0 => None,
        1 => filters.pop(),
        _ => Some(Filter::CompositeFilter(CompositeFilter {
            op: "AND",
            filters,
        })),
    };

    let order_by = query
        .order_by
        .iter()
        .map(|(field, direction)| Order {
            field: FieldReference {
                field_path: field.clone(),
            },
            direction: match direction {
                SortDirection::Ascending => "ASCENDING",
                SortDirection::Descending => "DESCENDING",
            },
        })
        .collect();

    Ok(StructuredQuery {
        from: vec![CollectionSelector {
            collection_id: query.collection.clone(),
        }],
        filter,
        order_by,
        limit: query.limit.map(|n| i32::try_from(n).unwrap_or(i32::MAX)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_value_wire_shapes() {
        assert_eq!(
            serde_json::to_value(encode_value(&FieldValue::from("hi")).unwrap()).unwrap(),
            json!({"stringValue": "hi"})
        );
        assert_eq!(
            serde_json::to_value(encode_value(&FieldValue::Integer(42)).unwrap()).unwrap(),
            json!({"integerValue": "42"})
        );
        assert_eq!(
            serde_json::to_value(encode_value(&FieldValue::Null).unwrap()).unwrap(),
            json!({"nullValue": null})
        );
        assert_eq!(
            serde_json::to_value(encode_value(&FieldValue::Array(vec![])).unwrap()).unwrap(),
            json!({"arrayValue": {}})
        );
        assert!(encode_value(&FieldValue::ServerTimestamp).is_none());
    }

    #[test]
    fn test_decode_timestamp_and_array() {
        let v: Value =
            serde_json::from_value(json!({"timestampValue": "2024-05-01T12:30:00.123456Z"}))
                .unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
            + chrono::Duration::microseconds(123_456);
        assert_eq!(decode_value(v), FieldValue::Timestamp(expected));

        let v: Value = serde_json::from_value(json!({
            "arrayValue": {"values": [{"stringValue": "a"}, {"stringValue": "b"}]}
        }))
        .unwrap();
        assert_eq!(
            decode_value(v),
            FieldValue::Array(vec!["a".into(), "b".into()])
        );

        let empty: Value = serde_json::from_value(json!({"arrayValue": {}})).unwrap();
        assert_eq!(decode_value(empty), FieldValue::Array(vec![]));
    }

    #[test]
    fn test_document_id_from_name() {
        let doc: WireDocument = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/notes/abc123",
            "fields": {"title": {"stringValue": "T"}},
            "createTime": "2024-01-01T00:00:00Z",
            "updateTime": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        let doc = doc.into_document();
        assert_eq!(doc.id, "abc123");
        assert_eq!(doc.get_str("title"), Some("T"));
    }

    #[test]
    fn test_merge_write_masks_and_transforms() {
        let mut fields = Fields::new();
        fields.insert("title".to_string(), "New".into());
        fields.insert("image".to_string(), FieldValue::Null);
        fields.insert("updatedAt".to_string(), FieldValue::ServerTimestamp);

        let write = build_write("n".to_string(), fields, WriteMode::Merge);
        let json = serde_json::to_value(&write).unwrap();

        assert_eq!(json["updateMask"]["fieldPaths"], json!(["image", "title"]));
        assert_eq!(json["update"]["fields"], json!({"title": {"stringValue": "New"}}));
        assert_eq!(
            json["updateTransforms"],
            json!([{"fieldPath": "updatedAt", "setToServerValue": "REQUEST_TIME"}])
        );
        assert_eq!(json["currentDocument"], json!({"exists": true}));
    }

    #[test]
    fn test_create_write_requires_absent_document() {
        let mut fields = Fields::new();
        fields.insert("createdAt".to_string(), FieldValue::ServerTimestamp);
        let json =
            serde_json::to_value(build_write("n".to_string(), fields, WriteMode::Create)).unwrap();
        assert_eq!(json["currentDocument"], json!({"exists": false}));
        assert!(json.get("updateMask").is_none());
    }

    #[test]
    fn test_structured_query_composite_filter() {
        let q = Query::collection("notes")
            .where_eq("userId", "u1")
            .where_eq("isFavorite", true)
            .order_by("updatedAt", SortDirection::Descending);
        let json = serde_json::to_value(structured_query(&q).unwrap()).unwrap();

        assert_eq!(json["from"], json!([{"collectionId": "notes"}]));
        assert_eq!(json["where"]["compositeFilter"]["op"], "AND");
        assert_eq!(
            json["where"]["compositeFilter"]["filters"][1],
            json!({"fieldFilter": {
                "field": {"fieldPath": "isFavorite"},
                "op": "EQUAL",
                "value": {"booleanValue": true}
            }})
        );
        assert_eq!(
            json["orderBy"],
            json!([{"field": {"fieldPath": "updatedAt"}, "direction": "DESCENDING"}])
        );
        assert!(json.get("limit").is_none());
    }

    #[test]
    fn test_structured_query_single_filter_is_not_composite() {
        let q = Query::collection("notes").where_eq("userId", "u1");
        let json = serde_json::to_value(structured_query(&q).unwrap()).unwrap();
        assert!(json["where"].get("fieldFilter").is_some());
        assert!(json.get("orderBy").is_none());
    }
}
