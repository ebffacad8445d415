use serde_json::Value;
use tracing::warn;

pub const DEFAULT_MAX_DEPTH: usize = 25;

/// Collects every value stored under `key` at any depth, in document order.
/// Array matches are flattened into the output. Descent stops at `max_depth`.
pub fn walk_nested_dict(value: &Value, key: &str, max_depth: usize) -> Vec<Value> {
    let mut found = Vec::new();
    walk(value, key, 0, max_depth, &mut found);
    found
}

fn walk(value: &Value, key: &str, depth: usize, max_depth: usize, found: &mut Vec<Value>) {
    if depth > max_depth {
        warn!(max_depth, "nested lookup for '{key}' exceeded maximum depth");
        return;
    }
    match value {
        Value::Object(map) => {
            for (name, child) in map {
                if name == key {
                    match child {
                        Value::Array(items) => found.extend(items.iter().cloned()),
                        other => found.push(other.clone()),
                    }
                } else {
                    walk(child, key, depth + 1, max_depth, found);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, key, depth + 1, max_depth, found);
            }
        }
        _ => {}
    }
}

/// Recursively merges `overrides` into `base`. Objects merge key by key; any
/// other override value replaces the base value.
pub fn merge_json(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            for (key, value) in override_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overrides) => *base = overrides,
    }
}
