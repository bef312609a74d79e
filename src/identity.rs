use axum::extract::{Extension, FromRequest, RequestParts};
use axum::headers::authorization::{Authorization, Bearer};
use axum::TypedHeader;
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::err::Error;
use crate::models::UserRecord;
use crate::token::{decode_token, Claims};

/// The authenticated caller, resolved per request from the bearer token.
///
/// The wrapped record is the active database user with the token's overlay
/// claims already applied, so handlers read affiliation fields without
/// caring where a value came from.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

/// Token values win over the stored record for the overlay key set.
pub fn apply_claims(mut user: UserRecord, claims: &Claims) -> UserRecord {
    if claims.role_id.is_some() {
        user.role_id = claims.role_id;
    }
    if claims.customer_id.is_some() {
        user.customer_id = claims.customer_id;
    }
    if claims.school_id.is_some() {
        user.school_id = claims.school_id;
    }
    if claims.teaching_id.is_some() {
        user.teaching_id = claims.teaching_id;
    }
    if claims.course_id.is_some() {
        user.course_id = claims.course_id;
    }
    if claims.career_type_id.is_some() {
        user.career_type_id = claims.career_type_id;
    }
    user
}

pub async fn resolve_bearer(
    pool: &PgPool,
    cfg: &AppConfig,
    token: &str,
) -> Result<UserRecord, Error> {
    let claims = decode_token(&cfg.jwt_secret, token)?;

    let user = sqlx::query_as::<_, UserRecord>(
        "SELECT * FROM users WHERE rut = $1 AND deleted_date IS NULL LIMIT 1",
    )
    .bind(&claims.sub)
    .fetch_optional(pool)
    .await
    .map_err(Error::from)?;

    // Unknown or soft-deleted subjects get the same generic rejection as a
    // bad signature.
    match user {
        Some(user) => Ok(apply_claims(user, &claims)),
        None => Err(Error::credentials()),
    }
}

#[axum::async_trait]
impl<B: Send> FromRequest<B> for CurrentUser {
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request(req)
                .await
                .map_err(|_| Error::credentials())?;
        let Extension(pool) = Extension::<PgPool>::from_request(req)
            .await
            .map_err(|err| Error::InternalError {
                kind: "ExtensionError",
                message: err.to_string(),
            })?;
        let Extension(cfg) = Extension::<AppConfig>::from_request(req)
            .await
            .map_err(|err| Error::InternalError {
                kind: "ExtensionError",
                message: err.to_string(),
            })?;

        let user = resolve_bearer(&pool, &cfg, bearer.token()).await?;
        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stored_user() -> UserRecord {
        UserRecord {
            id: 1,
            rut: "12345678".to_string(),
            name: "Ana".to_string(),
            last_name: "Rojas".to_string(),
            email: "ana@example.cl".to_string(),
            password_hash: String::new(),
            role_id: Some(5),
            customer_id: Some(1),
            school_id: Some(10),
            teaching_id: None,
            course_id: None,
            career_type_id: None,
            created_at: Utc::now(),
            deleted_date: None,
        }
    }

    #[test]
    fn token_claims_override_stored_fields() {
        let mut claims = Claims::for_subject("12345678");
        claims.role_id = Some(2);
        claims.school_id = Some(99);

        let user = apply_claims(stored_user(), &claims);
        assert_eq!(user.role_id, Some(2));
        assert_eq!(user.school_id, Some(99));
        // Keys absent from the token keep their stored values.
        assert_eq!(user.customer_id, Some(1));
        assert_eq!(user.teaching_id, None);
    }

    #[test]
    fn empty_claim_set_changes_nothing() {
        let claims = Claims::for_subject("12345678");
        let user = apply_claims(stored_user(), &claims);
        assert_eq!(user.role_id, Some(5));
        assert_eq!(user.customer_id, Some(1));
        assert_eq!(user.school_id, Some(10));
    }
}
