//! JSON result envelopes printed by the CLI.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// `{"success": true, ...payload, "timestamp": ...}`
///
/// Object payloads are merged into the envelope; anything else goes under `data`.
pub fn success(payload: impl Serialize) -> anyhow::Result<Value> {
    let mut envelope = match serde_json::to_value(payload)? {
        Value::Object(fields) => fields,
        other => {
            let mut fields = Map::new();
            fields.insert("data".to_string(), other);
            fields
        }
    };
    envelope.insert("success".to_string(), Value::Bool(true));
    envelope.insert("timestamp".to_string(), Value::String(timestamp()));
    Ok(Value::Object(envelope))
}

pub fn failure(message: &str, code: &str) -> Value {
    json!({
        "success": false,
        "error": message,
        "code": code,
        "timestamp": timestamp(),
    })
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_merges_object() {
        let value = success(json!({"text": "hi", "usage": {"inputTokens": 1}})).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["text"], "hi");
        assert_eq!(value["usage"]["inputTokens"], 1);
        let ts = value["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn test_success_wraps_scalars() {
        let value = success(vec!["a", "b"]).unwrap();
        assert_eq!(value["data"], json!(["a", "b"]));
        assert_eq!(value["success"], true);
    }

    #[test]
    fn test_failure_shape() {
        let value = failure("API quota exceeded", "QUOTA_EXCEEDED");
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "API quota exceeded");
        assert_eq!(value["code"], "QUOTA_EXCEEDED");
        assert!(value["timestamp"].is_string());
    }
}
