use serde_json::Value;
use tracing::debug;

/// Keys probed, in order, when a payload wraps its rows in an object.
const WRAPPER_KEYS: [&str; 4] = ["predictions", "games", "rows", "data"];

/// Extracts the ordered row sequence from a loosely shaped payload.
///
/// Arrays come back unchanged. Objects yield the first wrapper key holding an
/// array. Anything else is an empty sequence rather than an error.
pub fn normalize_rows(payload: Value) -> Vec<Value> {
    match payload {
        Value::Array(rows) => rows,
        Value::Object(mut map) => {
            let rows = WRAPPER_KEYS
                .iter()
                .find(|key| map.get(**key).map_or(false, Value::is_array))
                .and_then(|key| map.remove(*key));
            match rows {
                Some(Value::Array(rows)) => rows,
                _ => {
                    debug!(keys = ?map.keys().collect::<Vec<_>>(), "no row array in payload");
                    Vec::new()
                }
            }
        }
        _ => Vec::new(),
    }
}
