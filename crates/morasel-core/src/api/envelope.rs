//! Defensive decoding of backend response bodies.
//!
//! The backend is inconsistent about wrapping: some endpoints return the
//! payload directly, others wrap it as `{ "data": payload }`, and list
//! endpoints return either a bare array or a paginated object. Everything
//! here coerces those shapes into one return type instead of failing.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use super::ApiError;
use crate::models::Page;

/// Page size used when neither the caller nor the server gives one.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Loose truthiness, matching how the backend's own clients test `data`.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Unwrap a `{ "data": payload }` envelope, or return the body as-is.
pub fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(inner) if is_truthy(&inner) => inner,
            Some(inner) => {
                map.insert("data".to_string(), inner);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

/// Decode a single resource, accepting both bare and enveloped shapes.
pub fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(unwrap_data(body)).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Decode a list. Anything that is not an array becomes empty, and items
/// that fail to decode are skipped.
pub fn decode_list<T: DeserializeOwned>(body: Value) -> Vec<T> {
    match unwrap_data(body) {
        Value::Array(items) => decode_items(items),
        other => {
            warn!(kind = value_kind(&other), "Expected a list response, treating as empty");
            Vec::new()
        }
    }
}

fn decode_items<T: DeserializeOwned>(items: Vec<Value>) -> Vec<T> {
    let total = items.len();
    let decoded: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %e, "Skipping malformed list item");
                None
            }
        })
        .collect();
    if decoded.len() != total {
        warn!(total, kept = decoded.len(), "Dropped malformed items from list response");
    }
    decoded
}

/// Read a non-negative integer that may arrive as a number or a numeric string.
fn as_count(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_u32(value: Option<&Value>) -> Option<u32> {
    as_count(value).and_then(|n| u32::try_from(n).ok())
}

/// Normalize a paginated list response.
///
/// A bare array becomes a single page holding every item. A paginated
/// object, bare or inside a `data` envelope, keeps the metadata the server
/// sent; missing fields fall back to the request, then to defaults.
pub fn decode_page<T: DeserializeOwned>(
    body: Value,
    requested_page: Option<u32>,
    requested_limit: Option<u32>,
) -> Page<T> {
    let default_page = requested_page.filter(|p| *p > 0).unwrap_or(1);
    let default_limit = requested_limit
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_PAGE_LIMIT);

    // `{data: {data: [...], total}}` is an envelope around a paginated
    // object; `{data: [...], total}` is the paginated object itself.
    let raw = match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(inner @ Value::Object(_)) => inner,
            Some(inner) => {
                map.insert("data".to_string(), inner);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    };

    match raw {
        Value::Array(items) => {
            let data: Vec<T> = decode_items(items);
            Page {
                total: data.len() as u64,
                data,
                page: default_page,
                limit: default_limit,
                total_pages: 1,
            }
        }
        Value::Object(mut map) => {
            let data: Vec<T> = match map.remove("data") {
                Some(Value::Array(items)) => decode_items(items),
                _ => Vec::new(),
            };
            Page {
                total: as_count(map.get("total")).unwrap_or(data.len() as u64),
                page: as_u32(map.get("page")).unwrap_or(default_page),
                limit: as_u32(map.get("limit")).unwrap_or(default_limit),
                total_pages: as_u32(map.get("totalPages"))
                    .or_else(|| as_u32(map.get("lastPage")))
                    .unwrap_or(1),
                data,
            }
        }
        other => {
            warn!(kind = value_kind(&other), "Unexpected paginated response shape");
            Page {
                data: Vec::new(),
                total: 0,
                page: default_page,
                limit: default_limit,
                total_pages: 1,
            }
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
    }

    #[test]
    fn test_unwrap_data_envelope() {
        assert_eq!(unwrap_data(json!({"data": {"id": "1"}})), json!({"id": "1"}));
        assert_eq!(unwrap_data(json!({"id": "1"})), json!({"id": "1"}));
    }

    #[test]
    fn test_unwrap_keeps_body_when_data_is_falsy() {
        let body = json!({"data": null, "points": 5});
        assert_eq!(unwrap_data(body.clone()), body);
        let body = json!({"data": 0, "points": 5});
        assert_eq!(unwrap_data(body.clone()), body);
    }

    #[test]
    fn test_decode_list_coerces_non_arrays() {
        let items: Vec<Item> = decode_list(json!({"message": "ok"}));
        assert!(items.is_empty());
        let items: Vec<Item> = decode_list(json!({"data": [{"id": "a"}, {"id": "b"}]}));
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_decode_list_skips_malformed_items() {
        let items: Vec<Item> = decode_list(json!([{"id": "a"}, {"nope": true}, {"id": "c"}]));
        assert_eq!(items, vec![Item { id: "a".into() }, Item { id: "c".into() }]);
    }

    #[test]
    fn test_bare_array_becomes_single_page() {
        let page: Page<Item> = decode_page(json!([{"id": "a"}, {"id": "b"}, {"id": "c"}]), None, None);
        assert_eq!(page.data.len(), 3);
        assert_eq!(page.total, 3);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_bare_array_uses_requested_page_and_limit() {
        let page: Page<Item> = decode_page(json!([{"id": "a"}]), Some(3), Some(50));
        assert_eq!(page.page, 3);
        assert_eq!(page.limit, 50);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_paginated_object_passes_through() {
        let body = json!({
            "data": [{"id": "a"}, {"id": "b"}],
            "total": 42,
            "page": 2,
            "limit": 2,
            "totalPages": 21
        });
        let page: Page<Item> = decode_page(body, Some(1), Some(20));
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.total, 42);
        assert_eq!(page.page, 2);
        assert_eq!(page.limit, 2);
        assert_eq!(page.total_pages, 21);
    }

    #[test]
    fn test_enveloped_paginated_object_with_last_page() {
        let body = json!({
            "data": {"data": [{"id": "a"}], "total": "11", "page": "2", "lastPage": 6}
        });
        let page: Page<Item> = decode_page(body, None, Some(2));
        assert_eq!(page.total, 11);
        assert_eq!(page.page, 2);
        assert_eq!(page.limit, 2);
        assert_eq!(page.total_pages, 6);
    }

    #[test]
    fn test_paginated_object_missing_fields_default() {
        let page: Page<Item> = decode_page(json!({"data": [{"id": "a"}]}), Some(4), None);
        assert_eq!(page.total, 1);
        assert_eq!(page.page, 4);
        assert_eq!(page.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_garbage_becomes_empty_page() {
        let page: Page<Item> = decode_page(json!("oops"), None, None);
        assert!(page.data.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 1);
    }
}
