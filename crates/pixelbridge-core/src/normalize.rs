use sha2::{Digest, Sha256};

use crate::event::UserData;

/// Trim, lower-case and SHA-256 a matching field.
///
/// Returns 64 lower-case hex characters, or an empty string when the trimmed
/// input is empty. Never fails.
pub fn hash(value: &str) -> String {
    let cleaned = value.trim().to_lowercase();
    if cleaned.is_empty() {
        return String::new();
    }
    hex::encode(Sha256::digest(cleaned.as_bytes()))
}

/// Hash an already-prepared value, mapping "nothing left" to `None`.
fn hash_opt(value: Option<&str>, prepare: impl Fn(&str) -> String) -> Option<String> {
    let prepared = prepare(value?);
    let hashed = hash(&prepared);
    (!hashed.is_empty()).then_some(hashed)
}

fn identity(s: &str) -> String {
    s.to_string()
}

fn digits_only(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

fn without_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn first_letter(s: &str) -> String {
    s.trim().chars().next().map(String::from).unwrap_or_default()
}

/// Produce a copy of `user_data` with every matching field hashed.
///
/// Opaque tokens (IP, user agent, click/browser ids, subscription and lead
/// ids) are copied verbatim. The input is left untouched.
pub fn normalize(user_data: &UserData) -> UserData {
    UserData {
        email: hash_opt(user_data.email.as_deref(), identity),
        phone: hash_opt(user_data.phone.as_deref(), digits_only),
        first_name: hash_opt(user_data.first_name.as_deref(), identity),
        last_name: hash_opt(user_data.last_name.as_deref(), identity),
        gender: hash_opt(user_data.gender.as_deref(), first_letter),
        date_of_birth: hash_opt(user_data.date_of_birth.as_deref(), digits_only),
        city: hash_opt(user_data.city.as_deref(), without_whitespace),
        state: hash_opt(user_data.state.as_deref(), identity),
        zip: hash_opt(user_data.zip.as_deref(), without_whitespace),
        country: hash_opt(user_data.country.as_deref(), identity),
        external_id: hash_opt(user_data.external_id.as_deref(), identity),
        client_ip_address: user_data.client_ip_address.clone(),
        client_user_agent: user_data.client_user_agent.clone(),
        fbc: user_data.fbc.clone(),
        fbp: user_data.fbp.clone(),
        subscription_id: user_data.subscription_id.clone(),
        lead_id: user_data.lead_id.clone(),
    }
}
