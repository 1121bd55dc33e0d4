use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

type HmacSha512 = Hmac<Sha512>;

pub fn sign_payload(body: &[u8], secret: &str) -> Option<String> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Checks a Paystack `x-paystack-signature` header against the raw body.
pub fn verify_paystack_signature(body: &[u8], signature: &str, secret: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Some(expected) = sign_payload(body, secret) else {
        return false;
    };
    let provided = signature.trim().to_ascii_lowercase();
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_signature() {
        let body = br#"{"event":"charge.success"}"#;
        let signature = sign_payload(body, "sk_test").unwrap();
        assert!(verify_paystack_signature(body, &signature, "sk_test"));
        assert!(verify_paystack_signature(body, &signature.to_uppercase(), "sk_test"));
    }

    #[test]
    fn rejects_tampered_body_or_empty_secret() {
        let signature = sign_payload(b"original", "sk_test").unwrap();
        assert!(!verify_paystack_signature(b"tampered", &signature, "sk_test"));
        assert!(!verify_paystack_signature(b"original", &signature, ""));
    }
}
