use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::err::Error;
use crate::identity::CurrentUser;
use crate::models::UserRecord;
use crate::password::{hash_password, needs_rehash, verify_password};
use crate::token::{issue_for, Claims};
use crate::{breaks, proceeds, Payload};

pub async fn register(
    Json(body): Json<RegisterUser>,
    Extension(pg): Extension<PgPool>,
) -> Payload<CreatedUser> {
    if body.rut.is_empty() {
        return breaks(Error::validation("`rut` must not be empty"));
    }
    if body.password.is_empty() {
        return breaks(Error::validation("`password` must not be empty"));
    }

    let existing = sqlx::query_as::<_, UserRecord>(
        "SELECT * FROM users WHERE rut = $1 OR email = $2 LIMIT 1",
    )
    .bind(&body.rut)
    .bind(&body.email)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;
    if existing.is_some() {
        return breaks(Error::conflict(
            "User with provided rut/email already exists!",
        ));
    }

    let password_hash = hash_password(&body.password)?;
    let user = sqlx::query_as::<_, UserRecord>(
        "INSERT INTO users \
         (rut, name, last_name, email, password_hash, role_id, customer_id, \
          school_id, teaching_id, course_id, career_type_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
    )
    .bind(&body.rut)
    .bind(&body.name)
    .bind(&body.last_name)
    .bind(&body.email)
    .bind(&password_hash)
    .bind(body.role_id)
    .bind(body.customer_id)
    .bind(body.school_id)
    .bind(body.teaching_id)
    .bind(body.course_id)
    .bind(body.career_type_id)
    .fetch_one(&pg)
    .await
    .map_err(Error::from)?;

    log::info!("registered user rut={}", user.rut);
    proceeds(CreatedUser {
        id: user.id,
        rut: user.rut,
    })
}

pub async fn login(
    Json(body): Json<LoginRequest>,
    Extension(pg): Extension<PgPool>,
    Extension(cfg): Extension<AppConfig>,
) -> Payload<LoggedIn> {
    if body.password.is_empty() {
        return breaks(Error::validation("`password` parameter was empty"));
    }

    let user = sqlx::query_as::<_, UserRecord>(
        "SELECT * FROM users WHERE rut = $1 AND deleted_date IS NULL LIMIT 1",
    )
    .bind(&body.rut)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    // Unknown rut and wrong password are indistinguishable to the caller.
    let user = match user {
        Some(user) => user,
        None => return breaks(Error::credentials()),
    };
    if !verify_password(&body.password, &user.password_hash) {
        return breaks(Error::credentials());
    }

    // Successful login upgrades legacy bcrypt hashes in place.
    if needs_rehash(&user.password_hash) {
        let upgraded = hash_password(&body.password)?;
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(&upgraded)
            .bind(user.id)
            .execute(&pg)
            .await
            .map_err(Error::from)?;
        log::info!("upgraded password hash for rut={}", user.rut);
    }

    let mut claims = Claims::for_subject(&user.rut);
    claims.role_id = user.role_id;
    claims.customer_id = user.customer_id;
    claims.school_id = user.school_id;
    claims.teaching_id = user.teaching_id;
    claims.course_id = user.course_id;
    claims.career_type_id = user.career_type_id;
    let token = issue_for(&cfg, claims)?;
    let expires_at = Utc::now() + cfg.token_validity();

    proceeds(LoggedIn {
        token,
        expires_at,
        user,
    })
}

pub async fn me(CurrentUser(user): CurrentUser) -> Payload<UserRecord> {
    proceeds(user)
}

pub async fn change_password(
    CurrentUser(user): CurrentUser,
    Json(body): Json<ChangePassword>,
    Extension(pg): Extension<PgPool>,
) -> Payload<PasswordChanged> {
    if body.new_password.is_empty() {
        return breaks(Error::validation("`new_password` must not be empty"));
    }
    if !verify_password(&body.current_password, &user.password_hash) {
        return breaks(Error::credentials());
    }

    let password_hash = hash_password(&body.new_password)?;
    let res = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(&password_hash)
        .bind(user.id)
        .execute(&pg)
        .await
        .map_err(Error::from)?;

    proceeds(PasswordChanged {
        changed: res.rows_affected() >= 1,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUser {
    pub rut: String,
    pub name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role_id: Option<i32>,
    pub customer_id: Option<i32>,
    pub school_id: Option<i32>,
    pub teaching_id: Option<i32>,
    pub course_id: Option<i32>,
    pub career_type_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedUser {
    pub id: i32,
    pub rut: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub rut: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggedIn {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserRecord,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePassword {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordChanged {
    pub changed: bool,
}
