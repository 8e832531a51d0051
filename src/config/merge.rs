//! Deep merge of configuration layers
//!
//! - Objects: deep-merge by key
//! - Arrays: replace (last wins)
//! - Scalars: override (last wins)

use serde_json::Value;

/// Deep merge `overlay` onto `base`.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge layers in order (first is base, last has highest precedence)
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_override() {
        let result = deep_merge(json!({"max_detail_length": 8000}), json!({"max_detail_length": 100}));
        assert_eq!(result["max_detail_length"], 100);
    }

    #[test]
    fn test_untouched_keys_survive() {
        let result = deep_merge(
            json!({"strict": false, "merged_name": "merged"}),
            json!({"strict": true}),
        );
        assert_eq!(result["strict"], true);
        assert_eq!(result["merged_name"], "merged");
    }

    #[test]
    fn test_array_replace() {
        let result = deep_merge(json!({"inputs": ["a", "b", "c"]}), json!({"inputs": ["x"]}));
        assert_eq!(result["inputs"], json!(["x"]));
    }

    #[test]
    fn test_nested_objects_merge() {
        let result = deep_merge(
            json!({"outer": {"a": 1, "b": 2}}),
            json!({"outer": {"b": 3, "c": 4}}),
        );
        assert_eq!(result["outer"], json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn test_merge_layers_last_wins() {
        let result = merge_layers(vec![
            json!({"jobs": 0, "group_by": "run"}),
            json!({"group_by": "class"}),
            json!({"jobs": 4}),
        ]);
        assert_eq!(result["jobs"], 4);
        assert_eq!(result["group_by"], "class");
    }

    #[test]
    fn test_merge_no_layers_is_null() {
        assert!(merge_layers(Vec::new()).is_null());
    }
}
