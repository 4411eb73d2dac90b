use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the transport hands back on a 2xx reply.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
}

/// Stable, caller-facing shape of a conversion submission result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventResponse {
    pub events_received: u64,
    pub messages: Vec<String>,
    pub trace_id: Option<String>,
    pub id: Option<String>,
    pub processed_count: u64,
}

/// Map a reply body to [`EventResponse`]. Missing or mistyped fields fall
/// back to zero values; this never fails.
pub fn map_response(body: &Value) -> EventResponse {
    let events_received = body
        .get("events_received")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let messages = body
        .get("messages")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|m| match m {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let processed_count = body
        .get("processed_count")
        .and_then(Value::as_u64)
        .unwrap_or(events_received);

    EventResponse {
        events_received,
        messages,
        trace_id: body
            .get("fbtrace_id")
            .and_then(Value::as_str)
            .map(str::to_string),
        id: body.get("id").and_then(Value::as_str).map(str::to_string),
        processed_count,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_body_maps_to_zero_values() {
        let mapped = map_response(&json!({}));
        assert_eq!(mapped.events_received, 0);
        assert!(mapped.messages.is_empty());
        assert_eq!(mapped.processed_count, 0);
        assert_eq!(mapped.trace_id, None);
        assert_eq!(mapped.id, None);
    }

    #[test]
    fn non_object_bodies_do_not_panic() {
        assert_eq!(map_response(&Value::Null), EventResponse::default());
        assert_eq!(map_response(&json!([1, 2])), EventResponse::default());
    }

    #[test]
    fn full_body_is_mapped() {
        let mapped = map_response(&json!({
            "events_received": 3,
            "messages": ["ok", {"code": 1}],
            "fbtrace_id": "AZx9",
            "id": "1234"
        }));
        assert_eq!(mapped.events_received, 3);
        assert_eq!(mapped.processed_count, 3);
        assert_eq!(mapped.messages, vec!["ok".to_string(), r#"{"code":1}"#.to_string()]);
        assert_eq!(mapped.trace_id.as_deref(), Some("AZx9"));
        assert_eq!(mapped.id.as_deref(), Some("1234"));
    }

    #[test]
    fn explicit_processed_count_wins() {
        let mapped = map_response(&json!({"events_received": 5, "processed_count": 4}));
        assert_eq!(mapped.processed_count, 4);
    }
}
