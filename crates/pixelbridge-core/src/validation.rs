use chrono::Utc;
use tracing::warn;

use crate::{
    catalog::{is_custom_event, is_standard_event},
    error::TrackerError,
    event::{ActionSource, EventData},
};

/// Maximum number of events accepted in a single submission.
pub const BATCH_SIZE_MAX: usize = 1000;

/// Earliest event time accepted (2001-09-09).
pub const MIN_EVENT_TIME: i64 = 1_000_000_000;

/// How far into the future an event time may lie, in seconds.
pub const MAX_FUTURE_SKEW_SECS: i64 = 3600;

pub const PIXEL_ID_MIN_LEN: usize = 15;
pub const PIXEL_ID_MAX_LEN: usize = 16;
pub const ACCESS_TOKEN_MIN_LEN: usize = 50;

/// Check a single event before it is built or sent.
///
/// With `debug` set, names outside the standard catalog that do not carry
/// the custom prefix are logged as a warning. They are never rejected.
pub fn validate(event: &EventData, debug: bool) -> Result<(), TrackerError> {
    if event.name.trim().is_empty() {
        return Err(TrackerError::validation("event name is required"));
    }

    if let Some(source) = event.action_source.as_deref() {
        source
            .parse::<ActionSource>()
            .map_err(TrackerError::Validation)?;
    }

    if let Some(time) = event.time {
        validate_event_time(time)?;
    }

    if debug && !is_standard_event(&event.name) && !is_custom_event(&event.name) {
        warn!(
            event_name = %event.name,
            "non-standard event name; prefix custom events with \"Custom\""
        );
    }

    Ok(())
}

pub fn validate_event_time(time: i64) -> Result<(), TrackerError> {
    let upper = Utc::now().timestamp() + MAX_FUTURE_SKEW_SECS;
    if !(MIN_EVENT_TIME..=upper).contains(&time) {
        return Err(TrackerError::validation(format!(
            "event time {time} outside [{MIN_EVENT_TIME}, {upper}]"
        )));
    }
    Ok(())
}

pub fn validate_batch_len(len: usize) -> Result<(), TrackerError> {
    if len == 0 {
        return Err(TrackerError::validation("batch is empty"));
    }
    if len > BATCH_SIZE_MAX {
        return Err(TrackerError::validation(format!(
            "batch of {len} events exceeds maximum of {BATCH_SIZE_MAX}"
        )));
    }
    Ok(())
}

/// Pixel ids are 15 or 16 ASCII digits.
pub fn validate_pixel_id(pixel_id: &str) -> Result<(), TrackerError> {
    let len_ok = (PIXEL_ID_MIN_LEN..=PIXEL_ID_MAX_LEN).contains(&pixel_id.len());
    if !len_ok || !pixel_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TrackerError::config(format!(
            "pixel_id must be {PIXEL_ID_MIN_LEN}-{PIXEL_ID_MAX_LEN} digits"
        )));
    }
    Ok(())
}

pub fn validate_access_token(token: &str) -> Result<(), TrackerError> {
    if token.trim().len() < ACCESS_TOKEN_MIN_LEN {
        return Err(TrackerError::config(format!(
            "access_token must be at least {ACCESS_TOKEN_MIN_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        io::Write,
        sync::{Arc, Mutex},
    };

    use tracing::Level;
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    #[test]
    fn rejects_missing_name() {
        let err = validate(&EventData::new("  "), false).unwrap_err();
        assert!(matches!(err, TrackerError::Validation(_)));
    }

    #[test]
    fn rejects_unknown_action_source() {
        let mut event = EventData::new("Lead");
        event.action_source = Some("fax".to_string());
        assert!(validate(&event, false).is_err());

        event.action_source = Some("phone_call".to_string());
        assert!(validate(&event, false).is_ok());
    }

    #[test]
    fn time_bounds() {
        let now = Utc::now().timestamp();
        assert!(validate(&EventData::new("Lead").with_time(500_000_000), false).is_err());
        assert!(validate(&EventData::new("Lead").with_time(now), false).is_ok());
        assert!(validate(&EventData::new("Lead").with_time(now + 3000), false).is_ok());
        assert!(validate(&EventData::new("Lead").with_time(now + 7200), false).is_err());
        assert!(validate(&EventData::new("Lead").with_time(MIN_EVENT_TIME), false).is_ok());
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("lock logs").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Run `validate` under a local subscriber and return what it logged.
    fn validate_logged(event: &EventData, debug: bool) -> String {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(Level::WARN)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            validate(event, debug).expect("valid event");
        });
        let bytes = logs.0.lock().expect("lock logs").clone();
        String::from_utf8(bytes).expect("utf-8 log output")
    }

    #[test]
    fn non_standard_names_are_not_errors() {
        assert!(validate(&EventData::new("QuizFinished"), true).is_ok());
        assert!(validate(&EventData::new("QuizFinished"), false).is_ok());
    }

    #[test]
    fn debug_warns_about_non_standard_names() {
        let logged = validate_logged(&EventData::new("QuizFinished"), true);
        assert!(logged.contains("WARN"), "got {logged:?}");
        assert!(logged.contains("non-standard event name"), "got {logged:?}");
        assert!(logged.contains("QuizFinished"), "got {logged:?}");
    }

    #[test]
    fn no_warning_without_debug_or_for_known_names() {
        assert_eq!(validate_logged(&EventData::new("QuizFinished"), false), "");
        assert_eq!(validate_logged(&EventData::new("Purchase"), true), "");
        assert_eq!(validate_logged(&EventData::new("CustomQuizDone"), true), "");
    }

    #[test]
    fn batch_len_bounds() {
        assert!(validate_batch_len(0).is_err());
        assert!(validate_batch_len(1).is_ok());
        assert!(validate_batch_len(BATCH_SIZE_MAX).is_ok());
        assert!(validate_batch_len(BATCH_SIZE_MAX + 1).is_err());
    }

    #[test]
    fn pixel_id_format() {
        assert!(validate_pixel_id("123456789012345").is_ok());
        assert!(validate_pixel_id("1234567890123456").is_ok());
        assert!(validate_pixel_id("12345").is_err());
        assert!(validate_pixel_id("abc456789012345").is_err());
        assert!(validate_pixel_id("12345678901234567").is_err());
    }

    #[test]
    fn access_token_length() {
        assert!(validate_access_token(&"a".repeat(49)).is_err());
        assert!(validate_access_token(&"a".repeat(50)).is_ok());
    }
}
