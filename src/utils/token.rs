use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, thread_rng, Rng, RngCore};

pub fn generate_access_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Random bytes rendered as lowercase hex. Used for email verification and
/// password reset links.
pub fn generate_hex_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

pub fn anonymous_client_id() -> String {
    format!("anon_{}", generate_access_token(12).to_lowercase())
}

pub fn consultation_reference(now: DateTime<Utc>) -> String {
    format!(
        "CONSULT-{}-{}",
        now.timestamp_millis(),
        generate_access_token(8).to_uppercase()
    )
}

pub fn listing_reference(profession: &str, now: DateTime<Utc>) -> String {
    format!("PRO-{}-{}", profession, now.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_token_has_two_chars_per_byte() {
        let token = generate_hex_token(32);
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn references_carry_expected_prefixes() {
        let now = Utc::now();
        let consult = consultation_reference(now);
        assert!(consult.starts_with(&format!("CONSULT-{}-", now.timestamp_millis())));
        assert_eq!(consult.rsplit('-').next().map(str::len), Some(8));
        assert_eq!(
            listing_reference("DOCTOR", now),
            format!("PRO-DOCTOR-{}", now.timestamp_millis())
        );
    }

    #[test]
    fn anonymous_ids_are_prefixed() {
        let id = anonymous_client_id();
        assert!(id.starts_with("anon_"));
        assert_eq!(id.len(), 17);
    }
}
