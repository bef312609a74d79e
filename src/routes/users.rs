use axum::extract::{Path, Query};
use axum::{Extension, Json};
use serde::Deserialize;
use sqlx::PgPool;

use crate::err::Error;
use crate::identity::CurrentUser;
use crate::models::UserRecord;
use crate::pagination::{PageParams, Paged};
use crate::{breaks, proceeds, Deleted, Payload};

pub async fn list(
    _auth: CurrentUser,
    Query(params): Query<PageParams>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Paged<UserRecord>> {
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE deleted_date IS NULL")
            .fetch_one(&pg)
            .await
            .map_err(Error::from)?;

    let items = sqlx::query_as::<_, UserRecord>(
        "SELECT * FROM users WHERE deleted_date IS NULL ORDER BY id LIMIT $1 OFFSET $2",
    )
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(&pg)
    .await
    .map_err(Error::from)?;

    proceeds(Paged::new(&params, total, items))
}

pub async fn get(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Extension(pg): Extension<PgPool>,
) -> Payload<UserRecord> {
    let user = sqlx::query_as::<_, UserRecord>(
        "SELECT * FROM users WHERE id = $1 AND deleted_date IS NULL LIMIT 1",
    )
    .bind(id)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    match user {
        Some(user) => proceeds(user),
        None => breaks(Error::not_found(format!("User with id `{}` does not exist!", id))),
    }
}

pub async fn update(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Json(body): Json<UpdateUser>,
    Extension(pg): Extension<PgPool>,
) -> Payload<UserRecord> {
    let user = sqlx::query_as::<_, UserRecord>(
        "UPDATE users SET \
         name = COALESCE($1, name), \
         last_name = COALESCE($2, last_name), \
         email = COALESCE($3, email), \
         role_id = COALESCE($4, role_id), \
         customer_id = COALESCE($5, customer_id), \
         school_id = COALESCE($6, school_id), \
         teaching_id = COALESCE($7, teaching_id), \
         course_id = COALESCE($8, course_id), \
         career_type_id = COALESCE($9, career_type_id) \
         WHERE id = $10 AND deleted_date IS NULL RETURNING *",
    )
    .bind(&body.name)
    .bind(&body.last_name)
    .bind(&body.email)
    .bind(body.role_id)
    .bind(body.customer_id)
    .bind(body.school_id)
    .bind(body.teaching_id)
    .bind(body.course_id)
    .bind(body.career_type_id)
    .bind(id)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    match user {
        Some(user) => proceeds(user),
        None => breaks(Error::not_found(format!("User with id `{}` does not exist!", id))),
    }
}

pub async fn delete(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Deleted> {
    let res = sqlx::query(
        "UPDATE users SET deleted_date = NOW() WHERE id = $1 AND deleted_date IS NULL",
    )
    .bind(id)
    .execute(&pg)
    .await
    .map_err(Error::from)?;

    if res.rows_affected() < 1 {
        return breaks(Error::not_found(format!("User with id `{}` does not exist!", id)));
    }
    proceeds(Deleted { id })
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role_id: Option<i32>,
    pub customer_id: Option<i32>,
    pub school_id: Option<i32>,
    pub teaching_id: Option<i32>,
    pub course_id: Option<i32>,
    pub career_type_id: Option<i32>,
}
