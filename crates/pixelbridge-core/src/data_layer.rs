//! In-process mirror of a tag-manager data layer.
//!
//! The tag-management container reads a named array of plain records. This
//! type holds that array for one page render or one server request and
//! serialises it into the `<script>` that seeds the browser global.

use std::sync::Mutex;

use serde_json::{json, Map, Value};

use crate::{
    browser::script_json, catalog::data_layer_name, error::TrackerError, event::EventData,
};

pub const DEFAULT_DATA_LAYER_NAME: &str = "dataLayer";

#[derive(Debug)]
pub struct DataLayer {
    name: String,
    entries: Mutex<Vec<Value>>,
}

impl Default for DataLayer {
    fn default() -> Self {
        Self {
            name: DEFAULT_DATA_LAYER_NAME.to_string(),
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl DataLayer {
    /// `name` becomes a `window` property in the rendered script, so it must
    /// be a plain JS identifier.
    pub fn new(name: impl Into<String>) -> Result<Self, TrackerError> {
        let name = name.into();
        if !is_js_identifier(&name) {
            return Err(TrackerError::config(format!(
                "data layer name must be a JavaScript identifier, got {name:?}"
            )));
        }
        Ok(Self {
            name,
            entries: Mutex::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a plain record.
    pub fn push(&self, record: Value) {
        self.lock().push(record);
    }

    /// Append the data-layer rendition of a tracked event.
    pub fn push_event(&self, event: &EventData) {
        self.push(event_record(event));
    }

    pub fn entries(&self) -> Vec<Value> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// `window.<name> = window.<name> || []; window.<name>.push(...)` for
    /// every buffered record.
    pub fn render_script(&self) -> String {
        let name = &self.name;
        let mut script = format!("window.{name}=window.{name}||[];");
        for entry in self.lock().iter() {
            script.push_str(&format!("window.{name}.push({});", script_json(entry)));
        }
        script
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Value>> {
        // A poisoned lock only means a panic elsewhere mid-push; the Vec
        // itself is still consistent.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn is_js_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Record shape consumed by the container: the GA4 event name when one
/// exists (the pixel name otherwise), the dedup id, and an `ecommerce`
/// block for commerce payloads.
pub fn event_record(event: &EventData) -> Value {
    let mut record = Map::new();
    let name = data_layer_name(&event.name).unwrap_or(event.name.as_str());
    record.insert("event".to_string(), Value::from(name));
    record.insert("pixel_event".to_string(), Value::from(event.name.clone()));
    if let Some(id) = &event.id {
        record.insert("event_id".to_string(), Value::from(id.clone()));
    }

    let custom = &event.custom_data;
    if !custom.is_empty() {
        let mut ecommerce = Map::new();
        if let Some(value) = custom.value {
            ecommerce.insert("value".to_string(), Value::from(value));
        }
        if let Some(currency) = &custom.currency {
            ecommerce.insert("currency".to_string(), Value::from(currency.clone()));
        }
        if let Some(order_id) = &custom.order_id {
            ecommerce.insert("transaction_id".to_string(), Value::from(order_id.clone()));
        }
        if let Some(search) = &custom.search_string {
            ecommerce.insert("search_term".to_string(), Value::from(search.clone()));
        }
        if let Some(contents) = &custom.contents {
            let items: Vec<Value> = contents
                .iter()
                .map(|item| {
                    json!({
                        "item_id": item.id,
                        "item_name": item.title,
                        "item_category": item.category,
                        "item_brand": item.brand,
                        "price": item.item_price,
                        "quantity": item.quantity,
                    })
                })
                .collect();
            ecommerce.insert("items".to_string(), Value::Array(items));
        }
        if !ecommerce.is_empty() {
            record.insert("ecommerce".to_string(), Value::Object(ecommerce));
        }
        for (key, value) in &custom.custom_properties {
            record.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    Value::Object(record)
}
