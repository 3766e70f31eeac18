//! Signed session cookie values
//!
//! The cookie carries `<session id>.<hex HMAC-SHA256 of the id>`. A value
//! whose tag does not verify under the configured secret is ignored.

use anyhow::Result;
use data_encoding::HEXLOWER;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies session ids with a server secret
#[derive(Clone)]
pub struct SessionSigner {
    mac: HmacSha256,
}

impl SessionSigner {
    pub fn new(secret: &str) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid session secret: {}", e))?;
        Ok(Self { mac })
    }

    /// Produce the cookie value for a session id
    pub fn sign(&self, session_id: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(session_id.as_bytes());
        let tag = mac.finalize().into_bytes();
        format!("{}.{}", session_id, HEXLOWER.encode(&tag))
    }

    /// Recover the session id from a cookie value, if its signature verifies
    pub fn verify(&self, cookie_value: &str) -> Option<String> {
        let (session_id, tag) = cookie_value.rsplit_once('.')?;
        if session_id.is_empty() {
            return None;
        }
        let tag = HEXLOWER.decode(tag.as_bytes()).ok()?;

        let mut mac = self.mac.clone();
        mac.update(session_id.as_bytes());
        mac.verify_slice(&tag).ok()?;

        Some(session_id.to_string())
    }
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn signer() -> SessionSigner {
        SessionSigner::new("test-secret").unwrap()
    }

    #[test]
    fn test_sign_then_verify() {
        let signer = signer();
        let value = signer.sign("abc123");

        assert!(value.starts_with("abc123."));
        assert_eq!(signer.verify(&value).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_rejects_unsigned_value() {
        assert_eq!(signer().verify("abc123"), None);
        assert_eq!(signer().verify(""), None);
        assert_eq!(signer().verify(".deadbeef"), None);
    }

    #[test]
    fn test_rejects_tampered_id() {
        let signer = signer();
        let value = signer.sign("abc123");
        let (_, tag) = value.rsplit_once('.').unwrap();

        assert_eq!(signer.verify(&format!("abc124.{}", tag)), None);
    }

    #[test]
    fn test_rejects_other_secret() {
        let value = SessionSigner::new("another-secret").unwrap().sign("abc123");
        assert_eq!(signer().verify(&value), None);
    }

    #[test]
    fn test_rejects_non_hex_tag() {
        assert_eq!(signer().verify("abc123.not-hex!"), None);
    }

    proptest! {
        #[test]
        fn prop_signed_ids_verify(id in "[a-zA-Z0-9-]{1,64}") {
            let signer = signer();
            prop_assert_eq!(signer.verify(&signer.sign(&id)), Some(id));
        }

        #[test]
        fn prop_flipped_tag_fails(id in "[a-f0-9]{32}", pos in 0usize..64) {
            let signer = signer();
            let value = signer.sign(&id);
            let (sid, tag) = value.rsplit_once('.').unwrap();
            let mut tag: Vec<u8> = tag.bytes().collect();
            tag[pos] = if tag[pos] == b'0' { b'1' } else { b'0' };
            let tampered = format!("{}.{}", sid, String::from_utf8(tag).unwrap());
            prop_assert_eq!(signer.verify(&tampered), None);
        }
    }
}
