/// Event names the platform recognises without custom configuration.
pub const STANDARD_EVENTS: &[&str] = &[
    "AddPaymentInfo",
    "AddToCart",
    "AddToWishlist",
    "CompleteRegistration",
    "Contact",
    "CustomizeProduct",
    "Donate",
    "FindLocation",
    "InitiateCheckout",
    "Lead",
    "PageView",
    "Purchase",
    "Schedule",
    "Search",
    "StartTrial",
    "SubmitApplication",
    "Subscribe",
    "ViewContent",
];

/// Prefix marking a deliberately custom event name.
pub const CUSTOM_EVENT_PREFIX: &str = "Custom";

pub fn is_standard_event(name: &str) -> bool {
    STANDARD_EVENTS.contains(&name)
}

pub fn is_custom_event(name: &str) -> bool {
    name.starts_with(CUSTOM_EVENT_PREFIX)
}

/// Tag-manager (GA4) event name for a pixel event, if one exists.
pub fn data_layer_name(name: &str) -> Option<&'static str> {
    let mapped = match name {
        "PageView" => "page_view",
        "ViewContent" => "view_item",
        "Search" => "search",
        "AddToCart" => "add_to_cart",
        "AddToWishlist" => "add_to_wishlist",
        "InitiateCheckout" => "begin_checkout",
        "AddPaymentInfo" => "add_payment_info",
        "Purchase" => "purchase",
        "Lead" => "generate_lead",
        "CompleteRegistration" => "sign_up",
        _ => return None,
    };
    Some(mapped)
}
