use axum::extract::{Path, Query};
use axum::{Extension, Json};
use serde::Deserialize;
use sqlx::PgPool;

use crate::err::Error;
use crate::identity::CurrentUser;
use crate::models::{Course, School};
use crate::pagination::{PageParams, Paged};
use crate::{breaks, proceeds, Deleted, Payload};

pub async fn list(
    _auth: CurrentUser,
    Query(params): Query<PageParams>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Paged<School>> {
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM schools WHERE deleted_date IS NULL")
            .fetch_one(&pg)
            .await
            .map_err(Error::from)?;

    let items = sqlx::query_as::<_, School>(
        "SELECT * FROM schools WHERE deleted_date IS NULL ORDER BY id LIMIT $1 OFFSET $2",
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
) -> Payload<School> {
    let school = sqlx::query_as::<_, School>(
        "SELECT * FROM schools WHERE id = $1 AND deleted_date IS NULL LIMIT 1",
    )
    .bind(id)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    match school {
        Some(school) => proceeds(school),
        None => breaks(Error::not_found(format!(
            "School with id `{}` does not exist!",
            id
        ))),
    }
}

pub async fn store(
    _auth: CurrentUser,
    Json(body): Json<StoreSchool>,
    Extension(pg): Extension<PgPool>,
) -> Payload<School> {
    if body.name.is_empty() {
        return breaks(Error::validation("`name` must not be empty"));
    }

    let school = sqlx::query_as::<_, School>(
        "INSERT INTO schools (customer_id, name, rbd, address, commune) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(body.customer_id)
    .bind(&body.name)
    .bind(&body.rbd)
    .bind(&body.address)
    .bind(&body.commune)
    .fetch_one(&pg)
    .await
    .map_err(Error::from)?;

    proceeds(school)
}

pub async fn update(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Json(body): Json<UpdateSchool>,
    Extension(pg): Extension<PgPool>,
) -> Payload<School> {
    let school = sqlx::query_as::<_, School>(
        "UPDATE schools SET \
         name = COALESCE($1, name), \
         rbd = COALESCE($2, rbd), \
         address = COALESCE($3, address), \
         commune = COALESCE($4, commune) \
         WHERE id = $5 AND deleted_date IS NULL RETURNING *",
    )
    .bind(&body.name)
    .bind(&body.rbd)
    .bind(&body.address)
    .bind(&body.commune)
    .bind(id)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    match school {
        Some(school) => proceeds(school),
        None => breaks(Error::not_found(format!(
            "School with id `{}` does not exist!",
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
        "UPDATE schools SET deleted_date = NOW() WHERE id = $1 AND deleted_date IS NULL",
    )
    .bind(id)
    .execute(&pg)
    .await
    .map_err(Error::from)?;

    if res.rows_affected() < 1 {
        return breaks(Error::not_found(format!(
            "School with id `{}` does not exist!",
            id
        )));
    }
    proceeds(Deleted { id })
}

/// Courses hang off their school; listing is school-scoped.
pub async fn list_courses(
    _auth: CurrentUser,
    Path(school_id): Path<i32>,
    Query(params): Query<PageParams>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Paged<Course>> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM courses WHERE school_id = $1 AND deleted_date IS NULL",
    )
    .bind(school_id)
    .fetch_one(&pg)
    .await
    .map_err(Error::from)?;

    let items = sqlx::query_as::<_, Course>(
        "SELECT * FROM courses WHERE school_id = $1 AND deleted_date IS NULL \
         ORDER BY id LIMIT $2 OFFSET $3",
    )
    .bind(school_id)
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(&pg)
    .await
    .map_err(Error::from)?;

    proceeds(Paged::new(&params, total, items))
}

pub async fn store_course(
    _auth: CurrentUser,
    Path(school_id): Path<i32>,
    Json(body): Json<StoreCourse>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Course> {
    if body.name.is_empty() {
        return breaks(Error::validation("`name` must not be empty"));
    }

    let school = sqlx::query_scalar::<_, i32>(
        "SELECT id FROM schools WHERE id = $1 AND deleted_date IS NULL LIMIT 1",
    )
    .bind(school_id)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;
    if school.is_none() {
        return breaks(Error::not_found(format!(
            "School with id `{}` does not exist!",
            school_id
        )));
    }

    let course = sqlx::query_as::<_, Course>(
        "INSERT INTO courses (school_id, name, grade, letter) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(school_id)
    .bind(&body.name)
    .bind(&body.grade)
    .bind(&body.letter)
    .fetch_one(&pg)
    .await
    .map_err(Error::from)?;

    proceeds(course)
}

pub async fn get_course(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Course> {
    let course = sqlx::query_as::<_, Course>(
        "SELECT * FROM courses WHERE id = $1 AND deleted_date IS NULL LIMIT 1",
    )
    .bind(id)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    match course {
        Some(course) => proceeds(course),
        None => breaks(Error::not_found(format!(
            "Course with id `{}` does not exist!",
            id
        ))),
    }
}

pub async fn update_course(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Json(body): Json<UpdateCourse>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Course> {
    let course = sqlx::query_as::<_, Course>(
        "UPDATE courses SET \
         name = COALESCE($1, name), \
         grade = COALESCE($2, grade), \
         letter = COALESCE($3, letter) \
         WHERE id = $4 AND deleted_date IS NULL RETURNING *",
    )
    .bind(&body.name)
    .bind(&body.grade)
    .bind(&body.letter)
    .bind(id)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    match course {
        Some(course) => proceeds(course),
        None => breaks(Error::not_found(format!(
            "Course with id `{}` does not exist!",
            id
        ))),
    }
}

pub async fn delete_course(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Deleted> {
    let res = sqlx::query(
        "UPDATE courses SET deleted_date = NOW() WHERE id = $1 AND deleted_date IS NULL",
    )
    .bind(id)
    .execute(&pg)
    .await
    .map_err(Error::from)?;

    if res.rows_affected() < 1 {
        return breaks(Error::not_found(format!(
            "Course with id `{}` does not exist!",
            id
        )));
    }
    proceeds(Deleted { id })
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSchool {
    pub customer_id: i32,
    pub name: String,
    pub rbd: Option<String>,
    pub address: Option<String>,
    pub commune: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSchool {
    pub name: Option<String>,
    pub rbd: Option<String>,
    pub address: Option<String>,
    pub commune: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreCourse {
    pub name: String,
    pub grade: Option<String>,
    pub letter: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCourse {
    pub name: Option<String>,
    pub grade: Option<String>,
    pub letter: Option<String>,
}
