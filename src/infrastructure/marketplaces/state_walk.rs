//! Generic depth-first search for an "items"-like list inside an arbitrary
//! nested JSON payload. Marketplaces embed their page state in wildly
//! different shapes; the first non-empty array under a matching key is taken.

use serde_json::Value;

const ITEM_KEYS: [&str; 2] = ["items", "products"];

/// Find the first non-empty array keyed by an "items"-like key, walking the
/// tree depth-first in document order.
pub fn find_items_list(root: &Value) -> Option<&Vec<Value>> {
    match root {
        Value::Object(map) => {
            for (key, value) in map {
                if ITEM_KEYS.contains(&key.as_str()) {
                    if let Value::Array(items) = value {
                        if !items.is_empty() {
                            return Some(items);
                        }
                    }
                }
                if let Some(found) = find_items_list(value) {
                    return Some(found);
                }
            }
            None
        }
        Value::Array(values) => values.iter().find_map(find_items_list),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_finds_nested_items() {
        let payload = json!({
            "props": {
                "pageProps": {
                    "fallback": {
                        "widget-1": { "meta": {} },
                        "widget-2": { "items": [{"name": "a"}, {"name": "b"}] }
                    }
                }
            }
        });
        let items = find_items_list(&payload).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_skips_empty_lists() {
        let payload = json!({
            "first": { "items": [] },
            "second": { "products": [{"id": 1}] }
        });
        let items = find_items_list(&payload).unwrap();
        assert_eq!(items[0]["id"], 1);
    }

    #[test]
    fn test_none_when_absent() {
        let payload = json!({ "widgets": { "header": "x" } });
        assert!(find_items_list(&payload).is_none());
    }
}
