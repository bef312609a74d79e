use axum::extract::{Path, Query};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::err::Error;
use crate::identity::CurrentUser;
use crate::models::{CurricularAdequacy, SupportPlan};
use crate::pagination::{PageParams, Paged};
use crate::sync::{
    active_children, sync_children, ADEQUACY_STUDENTS, ADEQUACY_SUBJECTS,
    SUPPORT_PLAN_STUDENTS,
};
use crate::{breaks, proceeds, Deleted, Payload};

#[derive(Debug, Clone, Serialize)]
pub struct SupportPlanOut {
    #[serde(flatten)]
    pub plan: SupportPlan,
    pub student_ids: Vec<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdequacyOut {
    #[serde(flatten)]
    pub adequacy: CurricularAdequacy,
    pub student_ids: Vec<i32>,
    pub subject_ids: Vec<i32>,
}

async fn plan_with_links(pg: &PgPool, plan: SupportPlan) -> Result<SupportPlanOut, Error> {
    let student_ids = active_children(pg, &SUPPORT_PLAN_STUDENTS, plan.id).await?;
    Ok(SupportPlanOut { plan, student_ids })
}

async fn adequacy_with_links(
    pg: &PgPool,
    adequacy: CurricularAdequacy,
) -> Result<AdequacyOut, Error> {
    let student_ids = active_children(pg, &ADEQUACY_STUDENTS, adequacy.id).await?;
    let subject_ids = active_children(pg, &ADEQUACY_SUBJECTS, adequacy.id).await?;
    Ok(AdequacyOut {
        adequacy,
        student_ids,
        subject_ids,
    })
}

pub async fn list_plans(
    _auth: CurrentUser,
    Query(params): Query<PageParams>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Paged<SupportPlanOut>> {
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM support_plans WHERE deleted_date IS NULL")
            .fetch_one(&pg)
            .await
            .map_err(Error::from)?;

    let plans = sqlx::query_as::<_, SupportPlan>(
        "SELECT * FROM support_plans WHERE deleted_date IS NULL \
         ORDER BY id LIMIT $1 OFFSET $2",
    )
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(&pg)
    .await
    .map_err(Error::from)?;

    let mut items = Vec::with_capacity(plans.len());
    for plan in plans {
        items.push(plan_with_links(&pg, plan).await?);
    }
    proceeds(Paged::new(&params, total, items))
}

pub async fn get_plan(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Extension(pg): Extension<PgPool>,
) -> Payload<SupportPlanOut> {
    let plan = sqlx::query_as::<_, SupportPlan>(
        "SELECT * FROM support_plans WHERE id = $1 AND deleted_date IS NULL LIMIT 1",
    )
    .bind(id)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    match plan {
        Some(plan) => proceeds(plan_with_links(&pg, plan).await?),
        None => breaks(Error::not_found(format!(
            "Support plan with id `{}` does not exist!",
            id
        ))),
    }
}

pub async fn store_plan(
    _auth: CurrentUser,
    Json(body): Json<StoreSupportPlan>,
    Extension(pg): Extension<PgPool>,
) -> Payload<SupportPlanOut> {
    if body.name.is_empty() {
        return breaks(Error::validation("`name` must not be empty"));
    }

    let plan = sqlx::query_as::<_, SupportPlan>(
        "INSERT INTO support_plans (school_id, name, description, year) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(body.school_id)
    .bind(&body.name)
    .bind(&body.description)
    .bind(body.year)
    .fetch_one(&pg)
    .await
    .map_err(Error::from)?;

    if let Some(student_ids) = &body.student_ids {
        sync_children(&pg, &SUPPORT_PLAN_STUDENTS, plan.id, student_ids).await?;
    }
    proceeds(plan_with_links(&pg, plan).await?)
}

pub async fn update_plan(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Json(body): Json<UpdateSupportPlan>,
    Extension(pg): Extension<PgPool>,
) -> Payload<SupportPlanOut> {
    let plan = sqlx::query_as::<_, SupportPlan>(
        "UPDATE support_plans SET \
         school_id = COALESCE($1, school_id), \
         name = COALESCE($2, name), \
         description = COALESCE($3, description), \
         year = COALESCE($4, year) \
         WHERE id = $5 AND deleted_date IS NULL RETURNING *",
    )
    .bind(body.school_id)
    .bind(&body.name)
    .bind(&body.description)
    .bind(body.year)
    .bind(id)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    let plan = match plan {
        Some(plan) => plan,
        None => {
            return breaks(Error::not_found(format!(
                "Support plan with id `{}` does not exist!",
                id
            )))
        }
    };

    if let Some(student_ids) = &body.student_ids {
        sync_children(&pg, &SUPPORT_PLAN_STUDENTS, plan.id, student_ids).await?;
    }
    proceeds(plan_with_links(&pg, plan).await?)
}

pub async fn delete_plan(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Deleted> {
    let res = sqlx::query(
        "UPDATE support_plans SET deleted_date = NOW() \
         WHERE id = $1 AND deleted_date IS NULL",
    )
    .bind(id)
    .execute(&pg)
    .await
    .map_err(Error::from)?;

    if res.rows_affected() < 1 {
        return breaks(Error::not_found(format!(
            "Support plan with id `{}` does not exist!",
            id
        )));
    }
    proceeds(Deleted { id })
}

pub async fn list_adequacies(
    _auth: CurrentUser,
    Query(params): Query<PageParams>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Paged<AdequacyOut>> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM curricular_adequacies WHERE deleted_date IS NULL",
    )
    .fetch_one(&pg)
    .await
    .map_err(Error::from)?;

    let adequacies = sqlx::query_as::<_, CurricularAdequacy>(
        "SELECT * FROM curricular_adequacies WHERE deleted_date IS NULL \
         ORDER BY id LIMIT $1 OFFSET $2",
    )
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(&pg)
    .await
    .map_err(Error::from)?;

    let mut items = Vec::with_capacity(adequacies.len());
    for adequacy in adequacies {
        items.push(adequacy_with_links(&pg, adequacy).await?);
    }
    proceeds(Paged::new(&params, total, items))
}

pub async fn get_adequacy(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Extension(pg): Extension<PgPool>,
) -> Payload<AdequacyOut> {
    let adequacy = sqlx::query_as::<_, CurricularAdequacy>(
        "SELECT * FROM curricular_adequacies WHERE id = $1 AND deleted_date IS NULL LIMIT 1",
    )
    .bind(id)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    match adequacy {
        Some(adequacy) => proceeds(adequacy_with_links(&pg, adequacy).await?),
        None => breaks(Error::not_found(format!(
            "Curricular adequacy with id `{}` does not exist!",
            id
        ))),
    }
}

pub async fn store_adequacy(
    _auth: CurrentUser,
    Json(body): Json<StoreAdequacy>,
    Extension(pg): Extension<PgPool>,
) -> Payload<AdequacyOut> {
    if body.name.is_empty() {
        return breaks(Error::validation("`name` must not be empty"));
    }

    let adequacy = sqlx::query_as::<_, CurricularAdequacy>(
        "INSERT INTO curricular_adequacies (school_id, name, description) \
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(body.school_id)
    .bind(&body.name)
    .bind(&body.description)
    .fetch_one(&pg)
    .await
    .map_err(Error::from)?;

    if let Some(student_ids) = &body.student_ids {
        sync_children(&pg, &ADEQUACY_STUDENTS, adequacy.id, student_ids).await?;
    }
    if let Some(subject_ids) = &body.subject_ids {
        sync_children(&pg, &ADEQUACY_SUBJECTS, adequacy.id, subject_ids).await?;
    }
    proceeds(adequacy_with_links(&pg, adequacy).await?)
}

pub async fn update_adequacy(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Json(body): Json<UpdateAdequacy>,
    Extension(pg): Extension<PgPool>,
) -> Payload<AdequacyOut> {
    let adequacy = sqlx::query_as::<_, CurricularAdequacy>(
        "UPDATE curricular_adequacies SET \
         school_id = COALESCE($1, school_id), \
         name = COALESCE($2, name), \
         description = COALESCE($3, description) \
         WHERE id = $4 AND deleted_date IS NULL RETURNING *",
    )
    .bind(body.school_id)
    .bind(&body.name)
    .bind(&body.description)
    .bind(id)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    let adequacy = match adequacy {
        Some(adequacy) => adequacy,
        None => {
            return breaks(Error::not_found(format!(
                "Curricular adequacy with id `{}` does not exist!",
                id
            )))
        }
    };

    if let Some(student_ids) = &body.student_ids {
        sync_children(&pg, &ADEQUACY_STUDENTS, adequacy.id, student_ids).await?;
    }
    if let Some(subject_ids) = &body.subject_ids {
        sync_children(&pg, &ADEQUACY_SUBJECTS, adequacy.id, subject_ids).await?;
    }
    proceeds(adequacy_with_links(&pg, adequacy).await?)
}

pub async fn delete_adequacy(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Deleted> {
    let res = sqlx::query(
        "UPDATE curricular_adequacies SET deleted_date = NOW() \
         WHERE id = $1 AND deleted_date IS NULL",
    )
    .bind(id)
    .execute(&pg)
    .await
    .map_err(Error::from)?;

    if res.rows_affected() < 1 {
        return breaks(Error::not_found(format!(
            "Curricular adequacy with id `{}` does not exist!",
            id
        )));
    }
    proceeds(Deleted { id })
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSupportPlan {
    pub school_id: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    pub year: i32,
    pub student_ids: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSupportPlan {
    pub school_id: Option<i32>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub year: Option<i32>,
    pub student_ids: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreAdequacy {
    pub school_id: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    pub student_ids: Option<Vec<i32>>,
    pub subject_ids: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAdequacy {
    pub school_id: Option<i32>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub student_ids: Option<Vec<i32>>,
    pub subject_ids: Option<Vec<i32>>,
}
