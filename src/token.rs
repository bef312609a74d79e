use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::err::Error;

/// Claims embedded in every token the server issues.
///
/// `sub` is the user's rut. The optional identifiers are the overlay set:
/// when present they override the stored user's fields for the duration of
/// a request (see `identity`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teaching_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub career_type_id: Option<i32>,
}

impl Claims {
    pub fn for_subject<S: Into<String>>(sub: S) -> Claims {
        Claims {
            sub: sub.into(),
            iat: 0,
            exp: 0,
            role_id: None,
            customer_id: None,
            school_id: None,
            teaching_id: None,
            course_id: None,
            career_type_id: None,
        }
    }
}

/// Sign a claim set valid for exactly `validity` from now.
///
/// Validity is mandatory and must be positive; "no expiry" is a
/// configuration error, not a default.
pub fn issue_token(
    secret: &str,
    mut claims: Claims,
    validity: Duration,
) -> Result<String, Error> {
    if validity <= Duration::zero() {
        return Err(Error::InternalError {
            kind: "TokenError",
            message: "token validity must be positive".to_string(),
        });
    }
    let now = Utc::now();
    claims.iat = now.timestamp();
    claims.exp = (now + validity).timestamp();

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| Error::InternalError {
        kind: "TokenError",
        message: err.to_string(),
    })
}

/// Decode and validate a bearer token. Signature and expiry failures all
/// collapse into the same generic authentication rejection.
pub fn decode_token(secret: &str, token: &str) -> Result<Claims, Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| Error::credentials())
}

pub fn issue_for(cfg: &AppConfig, claims: Claims) -> Result<String, Error> {
    issue_token(&cfg.jwt_secret, claims, cfg.token_validity())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn issued_token_round_trips() {
        let mut claims = Claims::for_subject("12345678");
        claims.role_id = Some(2);
        let token = issue_token(SECRET, claims, Duration::minutes(30)).unwrap();

        let decoded = decode_token(SECRET, &token).unwrap();
        assert_eq!(decoded.sub, "12345678");
        assert_eq!(decoded.role_id, Some(2));
        assert!(decoded.exp > decoded.iat);
    }

    #[test]
    fn expired_token_is_rejected() {
        // Build an already-expired claim set by hand so the expiry check is
        // exercised without sleeping.
        let now = Utc::now().timestamp();
        let mut claims = Claims::for_subject("12345678");
        claims.iat = now - 3600;
        claims.exp = now - 60;
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let err = decode_token(SECRET, &token).unwrap_err();
        assert!(matches!(err, Error::AuthenticationFailure { .. }));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let token = issue_token(
            SECRET,
            Claims::for_subject("12345678"),
            Duration::minutes(5),
        )
        .unwrap();
        let forged = issue_token(
            "other-secret",
            Claims::for_subject("12345678"),
            Duration::minutes(5),
        )
        .unwrap();

        assert!(decode_token(SECRET, &token).is_ok());
        assert!(decode_token(SECRET, &forged).is_err());
        assert!(decode_token(SECRET, "not.a.token").is_err());
    }

    #[test]
    fn non_positive_validity_is_refused() {
        let err = issue_token(SECRET, Claims::for_subject("1"), Duration::zero()).unwrap_err();
        assert!(matches!(err, Error::InternalError { .. }));
        assert!(
            issue_token(SECRET, Claims::for_subject("1"), Duration::minutes(-5)).is_err()
        );
    }
}
