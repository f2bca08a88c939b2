//! Read-only view of the content hierarchy. Totals are maintained by the
//! content service and only count published children.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Language {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub icon: String,
    pub series_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Series {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub language_slug: String,
    pub sections_count: i32,
    pub lessons_count: i32,
    pub watch_time_seconds: i32,
    pub read_time_seconds: i32,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Section {
    pub id: i32,
    pub title: String,
    pub language_slug: String,
    pub series_slug: String,
    pub position: i16,
    pub lessons_count: i32,
    pub watch_time_seconds: i32,
    pub read_time_seconds: i32,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Lesson {
    pub id: i32,
    pub title: String,
    pub language_slug: String,
    pub series_slug: String,
    pub section_id: i32,
    pub position: i16,
    pub watch_time_seconds: i32,
    pub read_time_seconds: i32,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
