use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Proof that a user completed every lesson of a series. The series title,
/// lesson count and timings are snapshotted at issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Certificate {
    pub id: Uuid,
    pub user_id: i32,
    pub language_slug: String,
    pub series_slug: String,
    pub series_title: String,
    pub lessons: i32,
    pub watch_time_seconds: i32,
    pub read_time_seconds: i32,
    pub completed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCertificate {
    pub id: Uuid,
    pub user_id: i32,
    pub language_slug: String,
    pub series_slug: String,
    pub series_title: String,
    pub lessons: i32,
    pub watch_time_seconds: i32,
    pub read_time_seconds: i32,
}
