use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account row. `rut` is the login identifier; the optional affiliation ids
/// are the fields the token overlay may override per request.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i32,
    pub rut: String,
    pub name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role_id: Option<i32>,
    pub customer_id: Option<i32>,
    pub school_id: Option<i32>,
    pub teaching_id: Option<i32>,
    pub course_id: Option<i32>,
    pub career_type_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub deleted_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct School {
    pub id: i32,
    pub customer_id: i32,
    pub name: String,
    pub rbd: Option<String>,
    pub address: Option<String>,
    pub commune: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: i32,
    pub school_id: i32,
    pub name: String,
    pub grade: Option<String>,
    pub letter: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Student {
    pub id: i32,
    pub rut: String,
    pub name: String,
    pub last_name: String,
    pub school_id: Option<i32>,
    pub course_id: Option<i32>,
    pub diagnosis: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Professional {
    pub id: i32,
    pub rut: String,
    pub name: String,
    pub last_name: String,
    pub specialty: Option<String>,
    pub school_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub deleted_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Meeting {
    pub id: i32,
    pub school_id: Option<i32>,
    pub topic: String,
    pub meeting_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SupportPlan {
    pub id: i32,
    pub school_id: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    pub year: i32,
    pub created_at: DateTime<Utc>,
    pub deleted_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CurricularAdequacy {
    pub id: i32,
    pub school_id: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_date: Option<DateTime<Utc>>,
}

/// Metadata for an uploaded diagnostic document; bytes live on disk under
/// the uuid-derived file name.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DocumentRecord {
    pub id: i32,
    pub uuid: Uuid,
    pub student_id: Option<i32>,
    pub file_name: String,
    pub content_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_date: Option<DateTime<Utc>>,
}
