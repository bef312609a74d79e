use axum::extract::{Path, Query};
use axum::{Extension, Json};
use serde::Deserialize;
use sqlx::PgPool;

use crate::err::Error;
use crate::identity::CurrentUser;
use crate::models::Professional;
use crate::pagination::{PageParams, Paged};
use crate::{breaks, proceeds, Deleted, Payload};

pub async fn list(
    _auth: CurrentUser,
    Query(params): Query<PageParams>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Paged<Professional>> {
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM professionals WHERE deleted_date IS NULL")
            .fetch_one(&pg)
            .await
            .map_err(Error::from)?;

    let items = sqlx::query_as::<_, Professional>(
        "SELECT * FROM professionals WHERE deleted_date IS NULL \
         ORDER BY id LIMIT $1 OFFSET $2",
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
) -> Payload<Professional> {
    let professional = sqlx::query_as::<_, Professional>(
        "SELECT * FROM professionals WHERE id = $1 AND deleted_date IS NULL LIMIT 1",
    )
    .bind(id)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    match professional {
        Some(professional) => proceeds(professional),
        None => breaks(Error::not_found(format!(
            "Professional with id `{}` does not exist!",
            id
        ))),
    }
}

pub async fn store(
    _auth: CurrentUser,
    Json(body): Json<StoreProfessional>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Professional> {
    if body.rut.is_empty() {
        return breaks(Error::validation("`rut` must not be empty"));
    }

    let professional = sqlx::query_as::<_, Professional>(
        "INSERT INTO professionals (rut, name, last_name, specialty, school_id) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(&body.rut)
    .bind(&body.name)
    .bind(&body.last_name)
    .bind(&body.specialty)
    .bind(body.school_id)
    .fetch_one(&pg)
    .await
    .map_err(Error::from)?;

    proceeds(professional)
}

pub async fn update(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Json(body): Json<UpdateProfessional>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Professional> {
    let professional = sqlx::query_as::<_, Professional>(
        "UPDATE professionals SET \
         name = COALESCE($1, name), \
         last_name = COALESCE($2, last_name), \
         specialty = COALESCE($3, specialty), \
         school_id = COALESCE($4, school_id) \
         WHERE id = $5 AND deleted_date IS NULL RETURNING *",
    )
    .bind(&body.name)
    .bind(&body.last_name)
    .bind(&body.specialty)
    .bind(body.school_id)
    .bind(id)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    match professional {
        Some(professional) => proceeds(professional),
        None => breaks(Error::not_found(format!(
            "Professional with id `{}` does not exist!",
            id
        ))),
    }
}

pub async fn delete(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Deleted> {
    let res = sqlx::query(
        "UPDATE professionals SET deleted_date = NOW() \
         WHERE id = $1 AND deleted_date IS NULL",
    )
    .bind(id)
    .execute(&pg)
    .await
    .map_err(Error::from)?;

    if res.rows_affected() < 1 {
        return breaks(Error::not_found(format!(
            "Professional with id `{}` does not exist!",
            id
        )));
    }
    proceeds(Deleted { id })
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreProfessional {
    pub rut: String,
    pub name: String,
    pub last_name: String,
    pub specialty: Option<String>,
    pub school_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfessional {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub specialty: Option<String>,
    pub school_id: Option<i32>,
}
