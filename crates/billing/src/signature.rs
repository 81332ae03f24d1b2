//! Stripe webhook signature verification.
//!
//! Stripe signs each delivery with
//! `Stripe-Signature: t=<unix>,v1=<hex>[,v1=<hex>...]` where each `v1`
//! value is `HMAC-SHA256(secret, "{t}.{raw_body}")`. Verification must run
//! against the raw request bytes before any JSON parsing, and must reject
//! stale timestamps to bound replay.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age (and clock skew) of the signature timestamp.
pub const TOLERANCE_SECS: i64 = 300;

/// Signature verification failure reasons. All map to HTTP 400; the
/// distinction is for logs only.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed Stripe-Signature header")]
    Malformed,

    #[error("signature timestamp outside tolerance window")]
    StaleTimestamp,

    #[error("no matching v1 signature")]
    NoMatch,
}

/// Verify a `Stripe-Signature` header against the raw request body.
///
/// `now_unix` is passed in rather than read from the clock so the
/// tolerance window is testable.
pub fn verify_signature(
    header: &str,
    body: &[u8],
    secret: &str,
    now_unix: i64,
) -> Result<(), SignatureError> {
    let (timestamp, candidates) = parse_header(header)?;

    if (now_unix - timestamp).abs() > TOLERANCE_SECS {
        return Err(SignatureError::StaleTimestamp);
    }

    let mut signed_payload = Vec::with_capacity(body.len() + 16);
    signed_payload.extend_from_slice(timestamp.to_string().as_bytes());
    signed_payload.push(b'.');
    signed_payload.extend_from_slice(body);

    for candidate in candidates {
        let Ok(expected) = hex_decode(candidate) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(&signed_payload);
        // verify_slice is constant-time.
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(SignatureError::NoMatch)
}

/// Split the header into its timestamp and the list of `v1` signatures.
fn parse_header(header: &str) -> Result<(i64, Vec<&str>), SignatureError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            return Err(SignatureError::Malformed);
        };
        match key {
            "t" => {
                timestamp = Some(value.parse().map_err(|_| SignatureError::Malformed)?);
            }
            "v1" => candidates.push(value),
            // Unknown schemes (e.g. v0 test-mode signatures) are ignored.
            _ => {}
        }
    }

    match (timestamp, candidates.is_empty()) {
        (Some(t), false) => Ok((t, candidates)),
        _ => Err(SignatureError::Malformed),
    }
}

fn hex_decode(s: &str) -> Result<Vec<u8>, ()> {
    if s.len() % 2 != 0 {
        return Err(());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| ()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    /// Build a valid header for `body` at `timestamp`, the way Stripe does.
    fn sign(body: &[u8], timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(body);
        let hex: String = mac
            .finalize()
            .into_bytes()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        format!("t={timestamp},v1={hex}")
    }

    #[test]
    fn valid_signature_passes() {
        let body = br#"{"id":"evt_1"}"#;
        let header = sign(body, 1_700_000_000);
        assert_eq!(
            verify_signature(&header, body, SECRET, 1_700_000_000),
            Ok(())
        );
    }

    #[test]
    fn signature_within_tolerance_passes() {
        let body = b"{}";
        let header = sign(body, 1_700_000_000);
        assert_eq!(
            verify_signature(&header, body, SECRET, 1_700_000_000 + TOLERANCE_SECS),
            Ok(())
        );
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let body = b"{}";
        let header = sign(body, 1_700_000_000);
        assert_eq!(
            verify_signature(&header, body, SECRET, 1_700_000_000 + TOLERANCE_SECS + 1),
            Err(SignatureError::StaleTimestamp)
        );
    }

    #[test]
    fn tampered_body_is_rejected() {
        let header = sign(br#"{"id":"evt_1"}"#, 1_700_000_000);
        assert_eq!(
            verify_signature(&header, br#"{"id":"evt_2"}"#, SECRET, 1_700_000_000),
            Err(SignatureError::NoMatch)
        );
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = b"{}";
        let header = sign(body, 1_700_000_000);
        assert_eq!(
            verify_signature(&header, body, "whsec_other", 1_700_000_000),
            Err(SignatureError::NoMatch)
        );
    }

    #[test]
    fn malformed_headers_are_rejected() {
        for header in ["", "t=abc,v1=00", "v1=00", "t=123", "nonsense"] {
            assert_eq!(
                verify_signature(header, b"{}", SECRET, 123),
                Err(SignatureError::Malformed),
                "header {header:?} should be malformed"
            );
        }
    }

    #[test]
    fn second_v1_candidate_is_accepted() {
        // Stripe sends multiple v1 entries during secret rotation.
        let body = b"{}";
        let valid = sign(body, 1_700_000_000);
        let hex = valid.split("v1=").nth(1).unwrap();
        let header = format!("t=1700000000,v1={},v1={hex}", "0".repeat(64));
        assert_eq!(verify_signature(&header, body, SECRET, 1_700_000_000), Ok(()));
    }
}
