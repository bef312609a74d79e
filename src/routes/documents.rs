use axum::extract::{Path, Query};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::err::Error;
use crate::identity::CurrentUser;
use crate::models::DocumentRecord;
use crate::pagination::{PageParams, Paged};
use crate::storage::{read_document, remove_document, write_document};
use crate::{breaks, proceeds, Deleted, Payload};

pub async fn list(
    _auth: CurrentUser,
    Query(params): Query<PageParams>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Paged<DocumentRecord>> {
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE deleted_date IS NULL")
            .fetch_one(&pg)
            .await
            .map_err(Error::from)?;

    let items = sqlx::query_as::<_, DocumentRecord>(
        "SELECT * FROM documents WHERE deleted_date IS NULL ORDER BY id LIMIT $1 OFFSET $2",
    )
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(&pg)
    .await
    .map_err(Error::from)?;

    proceeds(Paged::new(&params, total, items))
}

pub async fn store(
    _auth: CurrentUser,
    Json(body): Json<StoreDocument>,
    Extension(pg): Extension<PgPool>,
    Extension(cfg): Extension<AppConfig>,
) -> Payload<DocumentRecord> {
    if body.file_name.is_empty() {
        return breaks(Error::validation("`file_name` must not be empty"));
    }
    let bytes = match base64::decode(&body.content) {
        Ok(bytes) => bytes,
        Err(_) => return breaks(Error::validation("`content` must be valid base64")),
    };

    let uuid = Uuid::new_v4();
    write_document(&cfg.storage_dir, uuid, &bytes)
        .await
        .map_err(Error::from)?;

    let inserted = sqlx::query_as::<_, DocumentRecord>(
        "INSERT INTO documents (uuid, student_id, file_name, content_type) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(uuid)
    .bind(body.student_id)
    .bind(&body.file_name)
    .bind(&body.content_type)
    .fetch_one(&pg)
    .await;

    // The metadata row is the source of truth; without it the bytes on
    // disk are unreachable, so drop them before reporting the failure.
    let document = match inserted {
        Ok(document) => document,
        Err(err) => {
            if let Err(cleanup) = remove_document(&cfg.storage_dir, uuid).await {
                log::warn!("could not remove orphaned document {}: {}", uuid, cleanup);
            }
            return breaks(Error::from(err));
        }
    };

    log::info!("stored document {} ({} bytes)", uuid, bytes.len());
    proceeds(document)
}

pub async fn get(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Extension(pg): Extension<PgPool>,
    Extension(cfg): Extension<AppConfig>,
) -> Payload<DocumentWithContent> {
    let document = sqlx::query_as::<_, DocumentRecord>(
        "SELECT * FROM documents WHERE id = $1 AND deleted_date IS NULL LIMIT 1",
    )
    .bind(id)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    let document = match document {
        Some(document) => document,
        None => {
            return breaks(Error::not_found(format!(
                "Document with id `{}` does not exist!",
                id
            )))
        }
    };

    let bytes = read_document(&cfg.storage_dir, document.uuid)
        .await
        .map_err(Error::from)?;
    proceeds(DocumentWithContent {
        content: base64::encode(bytes),
        document,
    })
}

pub async fn delete(
    _auth: CurrentUser,
    Path(id): Path<i32>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Deleted> {
    let res = sqlx::query(
        "UPDATE documents SET deleted_date = NOW() WHERE id = $1 AND deleted_date IS NULL",
    )
    .bind(id)
    .execute(&pg)
    .await
    .map_err(Error::from)?;

    if res.rows_affected() < 1 {
        return breaks(Error::not_found(format!(
            "Document with id `{}` does not exist!",
            id
        )));
    }
    // Bytes stay on disk; the row is only soft-deleted.
    proceeds(Deleted { id })
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreDocument {
    pub student_id: Option<i32>,
    pub file_name: String,
    pub content_type: Option<String>,
    /// Base64-encoded file bytes.
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentWithContent {
    #[serde(flatten)]
    pub document: DocumentRecord,
    pub content: String,
}
