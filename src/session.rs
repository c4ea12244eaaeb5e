//! Signed, expiring session tokens.
//!
//! Tokens are compact HS256 JWTs (`header.claims.signature`, base64url without
//! padding) carrying the GitHub user id, the full GitHub profile and the GitHub
//! access token. There is no server-side revocation: a token is valid until its
//! `exp` passes, and logout only clears the cookie.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

use crate::errors::AuthError;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

/// Name of the cookie that carries the session token.
pub const SESSION_COOKIE: &str = "access_token";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Verified payload of a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// GitHub user id, as a string.
    pub sub: String,
    /// Profile exactly as GitHub returned it (plus the enriched email).
    pub github_data: Value,
    pub github_access_token: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies session tokens with a single shared secret.
#[derive(Clone)]
pub struct SessionManager {
    secret: Vec<u8>,
    ttl: TimeDelta,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionManager {
    pub fn new(secret: &str, ttl: TimeDelta) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl,
        }
    }

    /// Out-of-range values saturate; issuing then fails instead of panicking.
    pub fn with_ttl_minutes(secret: &str, minutes: i64) -> Self {
        let ttl = TimeDelta::try_minutes(minutes).unwrap_or(if minutes < 0 {
            TimeDelta::MIN
        } else {
            TimeDelta::MAX
        });
        Self::new(secret, ttl)
    }

    /// Lifetime of a freshly issued token.
    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Sign a token for `profile` that embeds `github_token`.
    pub fn issue(&self, profile: &Value, github_token: &str) -> Result<String, AuthError> {
        self.issue_at(profile, github_token, Utc::now())
    }

    pub fn issue_at(
        &self,
        profile: &Value,
        github_token: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let sub = match profile.get("id") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => return Err(AuthError::Signing("profile has no id".into())),
        };
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AuthError::Signing("session expiry is out of range".into()))?;
        let claims = SessionClaims {
            sub,
            github_data: profile.clone(),
            github_access_token: github_token.to_string(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };
        let header_json =
            serde_json::to_vec(&header).map_err(|e| AuthError::Signing(e.to_string()))?;
        let claims_json =
            serde_json::to_vec(claims).map_err(|e| AuthError::Signing(e.to_string()))?;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let signature = self.mac(signing_input.as_bytes())?.finalize().into_bytes();
        Ok(format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Check signature, shape and expiry of `token`.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError> {
        let mut segments = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(AuthError::Malformed("expected three segments".into()));
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AuthError::InvalidSignature)?;
        let mut mac = self.mac(header_b64.as_bytes())?;
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidSignature)?;

        let header: Header = decode_segment(header_b64, "header")?;
        if header.alg != ALGORITHM {
            return Err(AuthError::Malformed(format!(
                "unsupported algorithm {}",
                header.alg
            )));
        }
        let claims: SessionClaims = decode_segment(claims_b64, "claims")?;
        if claims.github_access_token.is_empty() {
            return Err(AuthError::Malformed("GitHub token not found".into()));
        }
        if claims.exp <= now.timestamp() {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }

    fn mac(&self, data: &[u8]) -> Result<HmacSha256, AuthError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        mac.update(data);
        Ok(mac)
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(
    segment: &str,
    what: &str,
) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::Malformed(format!("{} is not base64url: {}", what, e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::Malformed(format!("{} is not valid JSON: {}", what, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manager() -> SessionManager {
        SessionManager::with_ttl_minutes("test-secret", 1440)
    }

    fn profile() -> Value {
        json!({
            "id": 4242,
            "login": "octocat",
            "name": "The Octocat",
            "email": "octocat@github.com"
        })
    }

    #[test]
    fn test_issue_then_verify_returns_payload() {
        let sessions = manager();
        let token = sessions.issue(&profile(), "gho_abc123").unwrap();
        let claims = sessions.verify(&token).unwrap();
        assert_eq!(claims.sub, "4242");
        assert_eq!(claims.github_data["login"], "octocat");
        assert_eq!(claims.github_access_token, "gho_abc123");
        assert_eq!(claims.exp - claims.iat, 1440 * 60);
    }

    #[test]
    fn test_token_has_three_segments() {
        let token = manager().issue(&profile(), "gho_abc123").unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert!(!token.contains('='));
    }

    #[test]
    fn test_string_id_is_accepted() {
        let sessions = manager();
        let token = sessions
            .issue(&json!({"id": "abc", "login": "x"}), "gho_1")
            .unwrap();
        assert_eq!(sessions.verify(&token).unwrap().sub, "abc");
    }

    #[test]
    fn test_profile_without_id_cannot_be_signed() {
        let err = manager().issue(&json!({"login": "x"}), "gho_1").unwrap_err();
        assert!(matches!(err, AuthError::Signing(_)));
    }

    #[test]
    fn test_token_expired_in_the_past_fails() {
        let sessions = SessionManager::new("test-secret", TimeDelta::minutes(-5));
        let token = sessions.issue(&profile(), "gho_abc123").unwrap();
        assert!(matches!(sessions.verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn test_token_fails_exactly_at_expiry() {
        let sessions = manager();
        let issued = Utc::now();
        let token = sessions.issue_at(&profile(), "gho_1", issued).unwrap();
        let at_expiry = issued + sessions.ttl();
        assert!(matches!(
            sessions.verify_at(&token, at_expiry),
            Err(AuthError::Expired)
        ));
        assert!(
            sessions
                .verify_at(&token, at_expiry - TimeDelta::seconds(1))
                .is_ok()
        );
    }

    #[test]
    fn test_tampering_any_byte_fails_verification() {
        let sessions = manager();
        let token = sessions.issue(&profile(), "gho_abc123").unwrap();
        let bytes = token.as_bytes();
        for i in 0..bytes.len() {
            let mut tampered = bytes.to_vec();
            tampered[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(tampered).unwrap();
            assert!(
                sessions.verify(&tampered).is_err(),
                "tampered byte {} was accepted",
                i
            );
        }
    }

    #[test]
    fn test_token_from_other_secret_fails() {
        let token = SessionManager::with_ttl_minutes("other-secret", 60)
            .issue(&profile(), "gho_1")
            .unwrap();
        assert!(matches!(
            manager().verify(&token),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let sessions = manager();
        assert!(matches!(
            sessions.verify("not-a-token"),
            Err(AuthError::Malformed(_))
        ));
        assert!(sessions.verify("").is_err());
        assert!(sessions.verify("a.b.c.d").is_err());
    }

    #[test]
    fn test_signed_but_wrong_shape_is_malformed() {
        let sessions = manager();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(br#"{"sub":"1"}"#);
        let input = format!("{}.{}", header, claims);
        let sig = sessions
            .mac(input.as_bytes())
            .unwrap()
            .finalize()
            .into_bytes();
        let token = format!("{}.{}", input, URL_SAFE_NO_PAD.encode(sig));
        assert!(matches!(
            sessions.verify(&token),
            Err(AuthError::Malformed(_))
        ));
    }

    #[test]
    fn test_oversized_ttl_fails_to_sign_without_panicking() {
        let sessions = SessionManager::with_ttl_minutes("test-secret", i64::MAX / 2);
        assert!(matches!(
            sessions.issue(&profile(), "gho_1"),
            Err(AuthError::Signing(_))
        ));

        let sessions = SessionManager::with_ttl_minutes("test-secret", 1_000_000_000_000);
        assert!(matches!(
            sessions.issue(&profile(), "gho_1"),
            Err(AuthError::Signing(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", manager());
        assert!(!debug.contains("test-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
