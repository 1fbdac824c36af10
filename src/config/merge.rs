//! Configuration merge logic
//!
//! - Objects: deep-merge by key
//! - Arrays: REPLACE (last wins)
//! - Scalars: override (last wins)

use serde_json::Value;

/// Deep merge `overlay` onto `base`.
///
/// Null in the overlay overrides any value.
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
        let result = deep_merge(json!({"retry": 3}), json!({"retry": 5}));
        assert_eq!(result["retry"], 5);
    }

    #[test]
    fn test_object_deep_merge() {
        let base = json!({"poll": {"interval_seconds": 5, "max_attempts": 60}});
        let overlay = json!({"poll": {"max_attempts": 10}});
        let result = deep_merge(base, overlay);

        assert_eq!(result["poll"]["max_attempts"], 10);
        assert_eq!(result["poll"]["interval_seconds"], 5);
    }

    #[test]
    fn test_array_replace() {
        let result = deep_merge(json!({"statuses": [400, 409, 500]}), json!({"statuses": [503]}));
        assert_eq!(result["statuses"], json!([503]));
    }

    #[test]
    fn test_null_override() {
        let result = deep_merge(json!({"host": "a"}), json!({"host": null}));
        assert!(result["host"].is_null());
    }

    #[test]
    fn test_merge_layers_precedence() {
        let builtin = json!({"port": 0, "retry": 3});
        let file = json!({"host": "file-host", "port": 7099});
        let env = json!({"host": "env-host"});
        let cli = json!({"retry": 1});

        let result = merge_layers(vec![builtin, file, env, cli]);

        assert_eq!(result["host"], "env-host");
        assert_eq!(result["port"], 7099);
        assert_eq!(result["retry"], 1);
    }
}
