use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Loosely-typed event input as callers hand it to the tracker.
///
/// Every field except `name` is optional; the builder fills in `time`, `id`
/// and `action_source` when they are absent. `action_source` stays a string
/// here so that unknown values reach validation instead of failing
/// deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EventData {
    pub name: String,
    /// Unix seconds.
    pub time: Option<i64>,
    /// Dedup key shared between browser and server submissions.
    pub id: Option<String>,
    pub source_url: Option<String>,
    pub referrer_url: Option<String>,
    pub action_source: Option<String>,
    #[serde(default)]
    pub user_data: UserData,
    #[serde(default)]
    pub custom_data: CustomData,
    pub opt_out: Option<bool>,
    pub data_processing_options: Option<Vec<String>>,
    pub data_processing_options_country: Option<i32>,
    pub data_processing_options_state: Option<i32>,
}

impl EventData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_time(mut self, time: i64) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_action_source(mut self, source: ActionSource) -> Self {
        self.action_source = Some(source.as_str().to_string());
        self
    }

    pub fn with_user_data(mut self, user_data: UserData) -> Self {
        self.user_data = user_data;
        self
    }

    pub fn with_custom_data(mut self, custom_data: CustomData) -> Self {
        self.custom_data = custom_data;
        self
    }

    pub fn page_view(source_url: impl Into<String>) -> Self {
        Self::new("PageView").with_source_url(source_url)
    }

    pub fn view_content(content: Content) -> Self {
        Self::new("ViewContent").with_custom_data(CustomData {
            content_ids: Some(vec![content.id.clone()]),
            content_type: Some("product".to_string()),
            contents: Some(vec![content]),
            ..Default::default()
        })
    }

    pub fn add_to_cart(content: Content, currency: impl Into<String>) -> Self {
        let value = content.item_price.unwrap_or(0.0) * f64::from(content.quantity.unwrap_or(1));
        Self::new("AddToCart").with_custom_data(CustomData {
            value: Some(value),
            currency: Some(currency.into()),
            content_ids: Some(vec![content.id.clone()]),
            content_type: Some("product".to_string()),
            contents: Some(vec![content]),
            ..Default::default()
        })
    }

    pub fn initiate_checkout(contents: Vec<Content>, value: f64, currency: impl Into<String>) -> Self {
        Self::new("InitiateCheckout").with_custom_data(commerce_data(contents, value, currency.into()))
    }

    pub fn purchase(contents: Vec<Content>, value: f64, currency: impl Into<String>) -> Self {
        Self::new("Purchase").with_custom_data(commerce_data(contents, value, currency.into()))
    }

    pub fn lead() -> Self {
        Self::new("Lead")
    }

    pub fn complete_registration(status: impl Into<String>) -> Self {
        Self::new("CompleteRegistration").with_custom_data(CustomData {
            status: Some(status.into()),
            ..Default::default()
        })
    }

    pub fn search(query: impl Into<String>) -> Self {
        Self::new("Search").with_custom_data(CustomData {
            search_string: Some(query.into()),
            ..Default::default()
        })
    }
}

fn commerce_data(contents: Vec<Content>, value: f64, currency: String) -> CustomData {
    let num_items = contents.iter().map(|c| c.quantity.unwrap_or(1)).sum::<u32>();
    CustomData {
        value: Some(value),
        currency: Some(currency),
        content_ids: Some(contents.iter().map(|c| c.id.clone()).collect()),
        content_type: Some("product".to_string()),
        num_items: Some(num_items),
        contents: Some(contents),
        ..Default::default()
    }
}

/// Identity fields used by the platform for matching.
///
/// Email, phone, name, gender, birth date, geo fragments and the external id
/// are hashed by the normalizer. Browser/click ids, IP and user agent are
/// opaque tokens and pass through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UserData {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    /// Any format; only the digits are kept, e.g. "1990-02-14" -> "19900214".
    pub date_of_birth: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub external_id: Option<String>,
    pub client_ip_address: Option<String>,
    pub client_user_agent: Option<String>,
    /// Click id cookie (`_fbc`).
    pub fbc: Option<String>,
    /// Browser id cookie (`_fbp`).
    pub fbp: Option<String>,
    pub subscription_id: Option<String>,
    pub lead_id: Option<String>,
}

/// A single purchased / viewed line item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Content {
    pub id: String,
    pub quantity: Option<u32>,
    pub item_price: Option<f64>,
    pub title: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
}

impl Content {
    pub fn new(id: impl Into<String>, quantity: u32, item_price: f64) -> Self {
        Self {
            id: id.into(),
            quantity: Some(quantity),
            item_price: Some(item_price),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CustomData {
    pub value: Option<f64>,
    pub currency: Option<String>,
    pub content_name: Option<String>,
    pub content_category: Option<String>,
    pub content_ids: Option<Vec<String>>,
    pub content_type: Option<String>,
    pub contents: Option<Vec<Content>>,
    pub order_id: Option<String>,
    pub predicted_ltv: Option<f64>,
    pub num_items: Option<u32>,
    pub search_string: Option<String>,
    pub status: Option<String>,
    pub delivery_category: Option<String>,
    /// Free-form extension properties. Keys that collide with a reserved wire
    /// key are dropped by the builder (with a warning).
    #[serde(default)]
    pub custom_properties: Map<String, Value>,
}

impl CustomData {
    pub fn is_empty(&self) -> bool {
        *self == CustomData::default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSource {
    #[default]
    Website,
    Email,
    App,
    PhoneCall,
    Chat,
    PhysicalStore,
    SystemGenerated,
    BusinessMessaging,
    Other,
}

impl ActionSource {
    pub const ALL: [ActionSource; 9] = [
        ActionSource::Website,
        ActionSource::Email,
        ActionSource::App,
        ActionSource::PhoneCall,
        ActionSource::Chat,
        ActionSource::PhysicalStore,
        ActionSource::SystemGenerated,
        ActionSource::BusinessMessaging,
        ActionSource::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionSource::Website => "website",
            ActionSource::Email => "email",
            ActionSource::App => "app",
            ActionSource::PhoneCall => "phone_call",
            ActionSource::Chat => "chat",
            ActionSource::PhysicalStore => "physical_store",
            ActionSource::SystemGenerated => "system_generated",
            ActionSource::BusinessMessaging => "business_messaging",
            ActionSource::Other => "other",
        }
    }
}

impl fmt::Display for ActionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionSource::ALL
            .iter()
            .copied()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| format!("unknown action_source: {s}"))
    }
}

/// Hashed / opaque identity fields under the platform's short wire keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireUserData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub em: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ph: Option<String>,
    #[serde(rename = "fn", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ln: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ct: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub st: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
}

/// The fully normalized event record as it goes over the network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireEvent {
    pub event_name: String,
    pub event_time: i64,
    pub event_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer_url: Option<String>,
    pub action_source: ActionSource,
    pub user_data: WireUserData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opt_out: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_processing_options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_processing_options_country: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_processing_options_state: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_source_parses_every_wire_value() {
        for source in ActionSource::ALL {
            assert_eq!(source.as_str().parse::<ActionSource>(), Ok(source));
        }
        assert!("carrier_pigeon".parse::<ActionSource>().is_err());
    }

    #[test]
    fn event_data_rejects_unknown_fields() {
        let err = serde_json::from_str::<EventData>(r#"{"name":"Lead","colour":"red"}"#);
        assert!(err.is_err(), "unknown keys must be rejected");
    }

    #[test]
    fn event_data_deserializes_nested_input() {
        let raw = r#"{
            "name": "Purchase",
            "user_data": {"email": "a@b.co"},
            "custom_data": {"value": 10.5, "currency": "EUR", "custom_properties": {"tier": "gold"}}
        }"#;
        let data: EventData = serde_json::from_str(raw).expect("parse event");
        assert_eq!(data.user_data.email.as_deref(), Some("a@b.co"));
        assert_eq!(data.custom_data.value, Some(10.5));
        assert_eq!(data.custom_data.custom_properties["tier"], "gold");
    }

    #[test]
    fn purchase_helper_fills_commerce_fields() {
        let event = EventData::purchase(
            vec![Content::new("a", 2, 5.0), Content::new("b", 1, 10.0)],
            20.0,
            "USD",
        );
        assert_eq!(event.name, "Purchase");
        let custom = &event.custom_data;
        assert_eq!(custom.num_items, Some(3));
        assert_eq!(
            custom.content_ids,
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(custom.value, Some(20.0));
    }

    #[test]
    fn add_to_cart_value_is_price_times_quantity() {
        let event = EventData::add_to_cart(Content::new("sku", 3, 2.5), "EUR");
        assert_eq!(event.custom_data.value, Some(7.5));
        assert_eq!(event.custom_data.currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn wire_user_data_uses_short_keys() {
        let wire = WireUserData {
            first_name: Some("h".to_string()),
            fbp: Some("fb.1.1.2".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&wire).expect("serialize");
        assert_eq!(value, serde_json::json!({"fn": "h", "fbp": "fb.1.1.2"}));
    }
}
