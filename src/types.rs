/// Shared types passed between the HTTP layer, the CLI and the services

use serde::Serialize;

use crate::database::models::{Certificate, Language, LanguageProgress, Lesson, LessonProgress};

/// Identifies a language-level progress operation.
#[derive(Debug, Clone, Default)]
pub struct LanguageProgressOptions {
    pub request_id: String,
    pub user_id: i32,
    pub language_slug: String,
}

/// Identifies a series-level progress operation. Staff may work with
/// unpublished content.
#[derive(Debug, Clone, Default)]
pub struct SeriesProgressOptions {
    pub request_id: String,
    pub user_id: i32,
    pub is_staff: bool,
    pub language_slug: String,
    pub series_slug: String,
}

#[derive(Debug, Clone, Default)]
pub struct SectionProgressOptions {
    pub request_id: String,
    pub user_id: i32,
    pub is_staff: bool,
    pub language_slug: String,
    pub series_slug: String,
    pub section_id: i32,
}

#[derive(Debug, Clone, Default)]
pub struct LessonProgressOptions {
    pub request_id: String,
    pub user_id: i32,
    pub is_staff: bool,
    pub language_slug: String,
    pub series_slug: String,
    pub section_id: i32,
    pub lesson_id: i32,
}

/// Paging for per-user listings.
#[derive(Debug, Clone, Default)]
pub struct PageOptions {
    pub request_id: String,
    pub user_id: i32,
    pub offset: i64,
    pub limit: i64,
}

/// Content row together with the caller's progress on it. `created` is set
/// when this call inserted the progress row.
#[derive(Debug, Clone)]
pub struct Tracked<C, P> {
    pub content: C,
    pub progress: P,
    pub created: bool,
}

/// Outcome of completing a lesson. `certificate` is only set by the call that
/// finished the series.
#[derive(Debug, Clone)]
pub struct CompletedLesson {
    pub lesson: Lesson,
    pub progress: LessonProgress,
    pub certificate: Option<Certificate>,
}

#[derive(Debug, Clone)]
pub struct ViewedLanguage {
    pub language: Language,
    pub progress: LanguageProgress,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            offset: self.offset,
            limit: self.limit,
        }
    }
}
