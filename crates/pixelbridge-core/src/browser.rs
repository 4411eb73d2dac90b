//! Browser-side pixel: bootstrap markup and `fbq` command rendering.
//!
//! Server-side code uses this to emit the pixel into rendered pages and to
//! produce the browser call that mirrors a server event under the same
//! dedup id.

use serde_json::{Map, Value};

use crate::{
    builder::map_custom_data,
    catalog::is_standard_event,
    error::TrackerError,
    event::EventData,
    validation::validate_pixel_id,
};

pub const PIXEL_SCRIPT_URL: &str = "https://connect.facebook.net/en_US/fbevents.js";
pub const SCRIPT_ELEMENT_ID: &str = "pixelbridge-script";
pub const NOSCRIPT_ELEMENT_ID: &str = "pixelbridge-noscript";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelSnippet {
    pixel_id: String,
}

impl PixelSnippet {
    pub fn new(pixel_id: impl Into<String>) -> Result<Self, TrackerError> {
        let pixel_id = pixel_id.into();
        validate_pixel_id(&pixel_id)?;
        Ok(Self { pixel_id })
    }

    pub fn pixel_id(&self) -> &str {
        &self.pixel_id
    }

    /// Loader script that defines `fbq`, pulls the remote script and fires
    /// the initial `PageView`.
    pub fn script_tag(&self) -> String {
        format!(
            concat!(
                "<script id=\"{id}\">",
                "!function(f,b,e,v,n,t,s){{if(f.fbq)return;n=f.fbq=function(){{n.callMethod?",
                "n.callMethod.apply(n,arguments):n.queue.push(arguments)}};if(!f._fbq)f._fbq=n;",
                "n.push=n;n.loaded=!0;n.version='2.0';n.queue=[];t=b.createElement(e);t.async=!0;",
                "t.src=v;s=b.getElementsByTagName(e)[0];s.parentNode.insertBefore(t,s)}}",
                "(window,document,'script','{url}');",
                "fbq('init','{pixel}');fbq('track','PageView');",
                "</script>"
            ),
            id = SCRIPT_ELEMENT_ID,
            url = PIXEL_SCRIPT_URL,
            pixel = self.pixel_id,
        )
    }

    pub fn noscript_tag(&self) -> String {
        format!(
            "<noscript id=\"{NOSCRIPT_ELEMENT_ID}\"><iframe height=\"1\" width=\"1\" \
             style=\"display:none\" src=\"https://www.facebook.com/tr?id={}&ev=PageView&noscript=1\">\
             </iframe></noscript>",
            self.pixel_id
        )
    }

    /// Insert the script into `<head>` and the fallback right after `<body>`.
    ///
    /// Each element is inserted at most once: if its id is already in the
    /// document, or the anchor tag is missing, that part is left alone.
    pub fn inject(&self, html: &str) -> String {
        let mut out = html.to_string();
        if !contains_element_id(&out, SCRIPT_ELEMENT_ID) {
            if let Some(pos) = find_tag_end(&out, "head") {
                out.insert_str(pos, &self.script_tag());
            }
        }
        if !contains_element_id(&out, NOSCRIPT_ELEMENT_ID) {
            if let Some(pos) = find_tag_end(&out, "body") {
                out.insert_str(pos, &self.noscript_tag());
            }
        }
        out
    }

    /// Browser call mirroring `event`; standard names use `track`, anything
    /// else `trackCustom`. The dedup id is passed as `eventID`.
    pub fn track_call(&self, event: &EventData) -> String {
        let method = if is_standard_event(&event.name) {
            "track"
        } else {
            "trackCustom"
        };
        let (params, _) = map_custom_data(&event.custom_data);
        let params = script_json(&Value::Object(params.unwrap_or_default()));
        let name = script_json(&Value::from(event.name.clone()));

        match &event.id {
            Some(id) => {
                let mut options = Map::new();
                options.insert("eventID".to_string(), Value::from(id.clone()));
                format!(
                    "fbq('{method}',{name},{params},{});",
                    script_json(&Value::Object(options))
                )
            }
            None => format!("fbq('{method}',{name},{params});"),
        }
    }
}

/// JSON text safe to place inside an inline `<script>` element.
///
/// Markup-significant characters and the JS line separators are written as
/// `\uXXXX` escapes, which only ever occur inside JSON strings, so the
/// value parses back unchanged.
pub fn script_json(value: &Value) -> String {
    let raw = value.to_string();
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            other => out.push(other),
        }
    }
    out
}

fn contains_element_id(html: &str, id: &str) -> bool {
    html.contains(&format!("id=\"{id}\"")) || html.contains(&format!("id='{id}'"))
}

/// Byte offset just past the opening `<tag ...>`, case-insensitive.
fn find_tag_end(html: &str, tag: &str) -> Option<usize> {
    let lower = html.to_ascii_lowercase();
    let needle = format!("<{tag}");
    let mut from = 0;
    while let Some(rel) = lower[from..].find(&needle) {
        let start = from + rel;
        let after = start + needle.len();
        let boundary = lower[after..].chars().next();
        if matches!(boundary, Some('>') | Some(' ') | Some('\t') | Some('\n') | Some('\r')) {
            return lower[after..].find('>').map(|close| after + close + 1);
        }
        from = after;
    }
    None
}
