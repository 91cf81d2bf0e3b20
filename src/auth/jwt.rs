use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::OffsetDateTime;
use tracing::debug;

use super::claims::Claims;
use crate::config::{JwtConfig, MAX_TTL_MINUTES};

/// Every way a presented token can fail. Deliberately carries no detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid or expired token")]
pub struct InvalidToken;

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: u64, // seconds
}

/// Signing and verification keys, built once from config at startup.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm: cfg.algorithm,
            ttl: Duration::from_secs(cfg.ttl_minutes.clamp(0, MAX_TTL_MINUTES) as u64 * 60),
        }
    }

    pub fn issue(&self, subject: &str) -> anyhow::Result<IssuedToken> {
        self.issue_with_ttl(subject, self.ttl)
    }

    pub fn issue_with_ttl(&self, subject: &str, ttl: Duration) -> anyhow::Result<IssuedToken> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let exp = i64::try_from(ttl.as_secs())
            .ok()
            .and_then(|secs| now.checked_add(secs))
            .ok_or_else(|| anyhow::anyhow!("token ttl out of range: {ttl:?}"))?;
        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp,
        };
        let token = self.sign(&claims)?;
        debug!(exp = claims.exp, "jwt signed");
        Ok(IssuedToken {
            token,
            expires_in: ttl.as_secs(),
        })
    }

    fn sign(&self, claims: &Claims) -> anyhow::Result<String> {
        Ok(encode(&Header::new(self.algorithm), claims, &self.encoding)?)
    }

    /// Checks signature, algorithm and expiry; returns the subject.
    pub fn verify(&self, token: &str) -> Result<String, InvalidToken> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(reason = ?e.kind(), "jwt rejected");
            InvalidToken
        })?;

        if data.claims.sub.is_empty() {
            return Err(InvalidToken);
        }
        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            algorithm: Algorithm::HS256,
            ttl_minutes: 5,
        })
    }

    #[test]
    fn issue_and_verify_yields_subject() {
        let keys = make_keys("dev-secret");
        let issued = keys.issue("ana@example.org").expect("sign");
        assert_eq!(issued.expires_in, 300);
        assert_eq!(keys.verify(&issued.token), Ok("ana@example.org".to_string()));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = make_keys("dev-secret");
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let token = keys
            .sign(&Claims {
                sub: "ana@example.org".into(),
                iat: now - 120,
                exp: now - 60,
            })
            .unwrap();
        assert_eq!(keys.verify(&token), Err(InvalidToken));
    }

    #[test]
    fn token_stops_verifying_once_ttl_elapses() {
        let keys = make_keys("dev-secret");
        let issued = keys
            .issue_with_ttl("ana@example.org", Duration::from_secs(1))
            .unwrap();
        assert!(keys.verify(&issued.token).is_ok());
        std::thread::sleep(Duration::from_millis(2100));
        assert_eq!(keys.verify(&issued.token), Err(InvalidToken));
    }

    #[test]
    fn oversized_ttl_is_an_error_not_a_panic() {
        let keys = make_keys("dev-secret");
        assert!(keys
            .issue_with_ttl("ana@example.org", Duration::from_secs(u64::MAX))
            .is_err());

        let clamped = JwtKeys::new(&JwtConfig {
            secret: "dev-secret".into(),
            algorithm: Algorithm::HS256,
            ttl_minutes: i64::MAX,
        });
        let issued = clamped.issue("ana@example.org").unwrap();
        assert_eq!(issued.expires_in, MAX_TTL_MINUTES as u64 * 60);
    }

    #[test]
    fn different_secret_is_rejected() {
        let issuer = make_keys("secret-a");
        let verifier = make_keys("secret-b");
        let issued = issuer.issue("ana@example.org").unwrap();
        assert_eq!(verifier.verify(&issued.token), Err(InvalidToken));
    }

    #[test]
    fn different_algorithm_is_rejected() {
        let issuer = JwtKeys::new(&JwtConfig {
            secret: "same".into(),
            algorithm: Algorithm::HS512,
            ttl_minutes: 5,
        });
        let verifier = make_keys("same");
        let issued = issuer.issue("ana@example.org").unwrap();
        assert_eq!(verifier.verify(&issued.token), Err(InvalidToken));
    }

    #[test]
    fn garbage_and_tampered_tokens_are_rejected() {
        let keys = make_keys("dev-secret");
        assert_eq!(keys.verify(""), Err(InvalidToken));
        assert_eq!(keys.verify("not.a.jwt"), Err(InvalidToken));

        // payload of one token spliced onto the signature of another
        let ana = keys.issue("ana@example.org").unwrap().token;
        let eve = keys.issue("eve@example.org").unwrap().token;
        let ana_parts: Vec<&str> = ana.split('.').collect();
        let eve_parts: Vec<&str> = eve.split('.').collect();
        let tampered = format!("{}.{}.{}", ana_parts[0], eve_parts[1], ana_parts[2]);
        assert_eq!(keys.verify(&tampered), Err(InvalidToken));
    }

    #[test]
    fn unsigned_token_is_rejected() {
        let keys = make_keys("dev-secret");
        let issued = keys.issue("ana@example.org").unwrap();
        let mut parts = issued.token.split('.');
        let header = parts.next().unwrap();
        let payload = parts.next().unwrap();
        let stripped = format!("{header}.{payload}.");
        assert_eq!(keys.verify(&stripped), Err(InvalidToken));
    }
}
