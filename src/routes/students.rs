use axum::extract::{Path, Query};
use axum::{Extension, Json};
use serde::Deserialize;
use sqlx::PgPool;

use crate::err::Error;
use crate::identity::CurrentUser;
use crate::models::Student;
use crate::pagination::{PageParams, Paged};
use crate::{breaks, proceeds, Deleted, Payload};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentFilter {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub school_id: Option<i32>,
    pub course_id: Option<i32>,
}

impl StudentFilter {
    fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

pub async fn list(
    _auth: CurrentUser,
    Query(filter): Query<StudentFilter>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Paged<Student>> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM students WHERE deleted_date IS NULL \
         AND ($1::int IS NULL OR school_id = $1) \
         AND ($2::int IS NULL OR course_id = $2)",
    )
    .bind(filter.school_id)
    .bind(filter.course_id)
    .fetch_one(&pg)
    .await
    .map_err(Error::from)?;

    let items = sqlx::query_as::<_, Student>(
        "SELECT * FROM students WHERE deleted_date IS NULL \
         AND ($1::int IS NULL OR school_id = $1) \
         AND ($2::int IS NULL OR course_id = $2) \
         ORDER BY id LIMIT $3 OFFSET $4",
    )
    .bind(filter.school_id)
    .bind(filter.course_id)
    .bind(filter.page_params().limit())
    .bind(filter.page_params().offset())
    .fetch_all(&pg)
    .await
    .map_err(Error::from)?;

    proceeds(Paged::new(&filter.page_params(), total, items))
}

pub async fn get(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Student> {
    let student = sqlx::query_as::<_, Student>(
        "SELECT * FROM students WHERE id = $1 AND deleted_date IS NULL LIMIT 1",
    )
    .bind(id)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    match student {
        Some(student) => proceeds(student),
        None => breaks(Error::not_found(format!(
            "Student with id `{}` does not exist!",
            id
        ))),
    }
}

pub async fn store(
    _auth: CurrentUser,
    Json(body): Json<StoreStudent>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Student> {
    if body.rut.is_empty() {
        return breaks(Error::validation("`rut` must not be empty"));
    }

    let existing = sqlx::query_scalar::<_, i32>(
        "SELECT id FROM students WHERE rut = $1 AND deleted_date IS NULL LIMIT 1",
    )
    .bind(&body.rut)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;
    if existing.is_some() {
        return breaks(Error::conflict(format!(
            "Student with rut `{}` already exists!",
            body.rut
        )));
    }

    let student = sqlx::query_as::<_, Student>(
        "INSERT INTO students (rut, name, last_name, school_id, course_id, diagnosis) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(&body.rut)
    .bind(&body.name)
    .bind(&body.last_name)
    .bind(body.school_id)
    .bind(body.course_id)
    .bind(&body.diagnosis)
    .fetch_one(&pg)
    .await
    .map_err(Error::from)?;

    proceeds(student)
}

pub async fn update(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Json(body): Json<UpdateStudent>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Student> {
    let student = sqlx::query_as::<_, Student>(
        "UPDATE students SET \
         name = COALESCE($1, name), \
         last_name = COALESCE($2, last_name), \
         school_id = COALESCE($3, school_id), \
         course_id = COALESCE($4, course_id), \
         diagnosis = COALESCE($5, diagnosis) \
         WHERE id = $6 AND deleted_date IS NULL RETURNING *",
    )
    .bind(&body.name)
    .bind(&body.last_name)
    .bind(body.school_id)
    .bind(body.course_id)
    .bind(&body.diagnosis)
    .bind(id)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    match student {
        Some(student) => proceeds(student),
        None => breaks(Error::not_found(format!(
            "Student with id `{}` does not exist!",
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
        "UPDATE students SET deleted_date = NOW() WHERE id = $1 AND deleted_date IS NULL",
    )
    .bind(id)
    .execute(&pg)
    .await
    .map_err(Error::from)?;

    if res.rows_affected() < 1 {
        return breaks(Error::not_found(format!(
            "Student with id `{}` does not exist!",
            id
        )));
    }
    proceeds(Deleted { id })
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreStudent {
    pub rut: String,
    pub name: String,
    pub last_name: String,
    pub school_id: Option<i32>,
    pub course_id: Option<i32>,
    pub diagnosis: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStudent {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub school_id: Option<i32>,
    pub course_id: Option<i32>,
    pub diagnosis: Option<String>,
}
