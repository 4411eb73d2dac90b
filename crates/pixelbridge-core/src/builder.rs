use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    event::{ActionSource, CustomData, EventData, UserData, WireEvent, WireUserData},
    normalize::normalize,
};

/// Wire keys produced from the typed `CustomData` fields. Extension
/// properties may not shadow them.
pub const RESERVED_CUSTOM_KEYS: &[&str] = &[
    "value",
    "currency",
    "content_name",
    "content_category",
    "content_ids",
    "content_type",
    "contents",
    "order_id",
    "predicted_ltv",
    "num_items",
    "search_string",
    "status",
    "delivery_category",
];

/// A built event plus the extension keys that were dropped on the way.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub event: WireEvent,
    pub dropped_keys: Vec<String>,
}

/// Generate a dedup key: `evt_{unix_millis}_{9 random alphanumerics}`.
pub fn generate_event_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!("evt_{}_{}", Utc::now().timestamp_millis(), suffix.to_lowercase())
}

/// Turn caller input into the wire record. Does not validate.
pub fn build(input: &EventData) -> WireEvent {
    build_with_report(input).event
}

pub fn build_with_report(input: &EventData) -> BuildReport {
    let (custom_data, dropped_keys) = map_custom_data(&input.custom_data);
    for key in &dropped_keys {
        warn!(
            event_name = %input.name,
            key = %key,
            "custom property collides with a reserved key and was dropped"
        );
    }

    // Unknown sources are rejected by validation; building alone falls back
    // to the default so the transform stays total.
    let action_source = input
        .action_source
        .as_deref()
        .and_then(|s| s.parse::<ActionSource>().ok())
        .unwrap_or_default();

    let event = WireEvent {
        event_name: input.name.clone(),
        event_time: input.time.unwrap_or_else(|| Utc::now().timestamp()),
        event_id: input.id.clone().unwrap_or_else(generate_event_id),
        event_source_url: input.source_url.clone(),
        referrer_url: input.referrer_url.clone(),
        action_source,
        user_data: map_user_data(&input.user_data),
        custom_data,
        opt_out: input.opt_out,
        data_processing_options: input.data_processing_options.clone(),
        data_processing_options_country: input.data_processing_options_country,
        data_processing_options_state: input.data_processing_options_state,
    };

    BuildReport {
        event,
        dropped_keys,
    }
}

pub fn map_user_data(user_data: &UserData) -> WireUserData {
    let hashed = normalize(user_data);
    WireUserData {
        em: hashed.email,
        ph: hashed.phone,
        first_name: hashed.first_name,
        ln: hashed.last_name,
        ge: hashed.gender,
        db: hashed.date_of_birth,
        ct: hashed.city,
        st: hashed.state,
        zp: hashed.zip,
        country: hashed.country,
        external_id: hashed.external_id,
        client_ip_address: hashed.client_ip_address,
        client_user_agent: hashed.client_user_agent,
        fbc: hashed.fbc,
        fbp: hashed.fbp,
        subscription_id: hashed.subscription_id,
        lead_id: hashed.lead_id,
    }
}

/// Map commerce fields to wire keys and merge extension properties.
///
/// Returns `None` for the map when nothing was set, together with the list
/// of extension keys that were dropped for colliding with a reserved key.
pub fn map_custom_data(custom: &CustomData) -> (Option<Map<String, Value>>, Vec<String>) {
    let mut out = Map::new();

    let mut put = |key: &str, value: Option<Value>| {
        if let Some(value) = value {
            out.insert(key.to_string(), value);
        }
    };
    put("value", custom.value.map(Value::from));
    put("currency", custom.currency.clone().map(Value::from));
    put("content_name", custom.content_name.clone().map(Value::from));
    put(
        "content_category",
        custom.content_category.clone().map(Value::from),
    );
    put("content_ids", custom.content_ids.clone().map(Value::from));
    put("content_type", custom.content_type.clone().map(Value::from));
    put(
        "contents",
        custom.contents.as_ref().map(|items| {
            Value::Array(
                items
                    .iter()
                    .map(|item| {
                        let mut entry = Map::new();
                        entry.insert("id".to_string(), Value::from(item.id.clone()));
                        if let Some(q) = item.quantity {
                            entry.insert("quantity".to_string(), Value::from(q));
                        }
                        if let Some(p) = item.item_price {
                            entry.insert("item_price".to_string(), Value::from(p));
                        }
                        if let Some(t) = &item.title {
                            entry.insert("title".to_string(), Value::from(t.clone()));
                        }
                        if let Some(c) = &item.category {
                            entry.insert("category".to_string(), Value::from(c.clone()));
                        }
                        if let Some(b) = &item.brand {
                            entry.insert("brand".to_string(), Value::from(b.clone()));
                        }
                        Value::Object(entry)
                    })
                    .collect(),
            )
        }),
    );
    put("order_id", custom.order_id.clone().map(Value::from));
    put("predicted_ltv", custom.predicted_ltv.map(Value::from));
    put("num_items", custom.num_items.map(Value::from));
    put("search_string", custom.search_string.clone().map(Value::from));
    put("status", custom.status.clone().map(Value::from));
    put(
        "delivery_category",
        custom.delivery_category.clone().map(Value::from),
    );

    let mut dropped = Vec::new();
    for (key, value) in &custom.custom_properties {
        if RESERVED_CUSTOM_KEYS.contains(&key.as_str()) {
            dropped.push(key.clone());
            continue;
        }
        out.insert(key.clone(), value.clone());
    }

    let map = (!out.is_empty()).then_some(out);
    (map, dropped)
}
