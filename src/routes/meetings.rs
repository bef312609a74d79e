use axum::extract::{Path, Query};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::err::Error;
use crate::identity::CurrentUser;
use crate::models::Meeting;
use crate::pagination::{PageParams, Paged};
use crate::sync::{active_children, sync_children, MEETING_PROFESSIONALS};
use crate::{breaks, proceeds, Deleted, Payload};

/// A meeting plus the currently linked professionals.
#[derive(Debug, Clone, Serialize)]
pub struct MeetingOut {
    #[serde(flatten)]
    pub meeting: Meeting,
    pub professional_ids: Vec<i32>,
}

async fn with_links(pg: &PgPool, meeting: Meeting) -> Result<MeetingOut, Error> {
    let professional_ids = active_children(pg, &MEETING_PROFESSIONALS, meeting.id).await?;
    Ok(MeetingOut {
        meeting,
        professional_ids,
    })
}

pub async fn list(
    _auth: CurrentUser,
    Query(params): Query<PageParams>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Paged<MeetingOut>> {
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM meetings WHERE deleted_date IS NULL")
            .fetch_one(&pg)
            .await
            .map_err(Error::from)?;

    let meetings = sqlx::query_as::<_, Meeting>(
        "SELECT * FROM meetings WHERE deleted_date IS NULL \
         ORDER BY meeting_date DESC LIMIT $1 OFFSET $2",
    )
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(&pg)
    .await
    .map_err(Error::from)?;

    let mut items = Vec::with_capacity(meetings.len());
    for meeting in meetings {
        items.push(with_links(&pg, meeting).await?);
    }
    proceeds(Paged::new(&params, total, items))
}

pub async fn get(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Extension(pg): Extension<PgPool>,
) -> Payload<MeetingOut> {
    let meeting = sqlx::query_as::<_, Meeting>(
        "SELECT * FROM meetings WHERE id = $1 AND deleted_date IS NULL LIMIT 1",
    )
    .bind(id)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    match meeting {
        Some(meeting) => proceeds(with_links(&pg, meeting).await?),
        None => breaks(Error::not_found(format!(
            "Meeting with id `{}` does not exist!",
            id
        ))),
    }
}

pub async fn store(
    _auth: CurrentUser,
    Json(body): Json<StoreMeeting>,
    Extension(pg): Extension<PgPool>,
) -> Payload<MeetingOut> {
    if body.topic.is_empty() {
        return breaks(Error::validation("`topic` must not be empty"));
    }

    let meeting = sqlx::query_as::<_, Meeting>(
        "INSERT INTO meetings (school_id, topic, meeting_date, notes) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(body.school_id)
    .bind(&body.topic)
    .bind(body.meeting_date)
    .bind(&body.notes)
    .fetch_one(&pg)
    .await
    .map_err(Error::from)?;

    // Store then sync is two auto-committing steps, not one transaction.
    if let Some(professional_ids) = &body.professional_ids {
        sync_children(&pg, &MEETING_PROFESSIONALS, meeting.id, professional_ids).await?;
    }
    proceeds(with_links(&pg, meeting).await?)
}

pub async fn update(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Json(body): Json<UpdateMeeting>,
    Extension(pg): Extension<PgPool>,
) -> Payload<MeetingOut> {
    let meeting = sqlx::query_as::<_, Meeting>(
        "UPDATE meetings SET \
         school_id = COALESCE($1, school_id), \
         topic = COALESCE($2, topic), \
         meeting_date = COALESCE($3, meeting_date), \
         notes = COALESCE($4, notes) \
         WHERE id = $5 AND deleted_date IS NULL RETURNING *",
    )
    .bind(body.school_id)
    .bind(&body.topic)
    .bind(body.meeting_date)
    .bind(&body.notes)
    .bind(id)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    let meeting = match meeting {
        Some(meeting) => meeting,
        None => {
            return breaks(Error::not_found(format!(
                "Meeting with id `{}` does not exist!",
                id
            )))
        }
    };

    if let Some(professional_ids) = &body.professional_ids {
        sync_children(&pg, &MEETING_PROFESSIONALS, meeting.id, professional_ids).await?;
    }
    proceeds(with_links(&pg, meeting).await?)
}

pub async fn delete(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Deleted> {
    let res = sqlx::query(
        "UPDATE meetings SET deleted_date = NOW() WHERE id = $1 AND deleted_date IS NULL",
    )
    .bind(id)
    .execute(&pg)
    .await
    .map_err(Error::from)?;

    if res.rows_affected() < 1 {
        return breaks(Error::not_found(format!(
            "Meeting with id `{}` does not exist!",
            id
        )));
    }
    proceeds(Deleted { id })
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreMeeting {
    pub school_id: Option<i32>,
    pub topic: String,
    pub meeting_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub professional_ids: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMeeting {
    pub school_id: Option<i32>,
    pub topic: Option<String>,
    pub meeting_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub professional_ids: Option<Vec<i32>>,
}
