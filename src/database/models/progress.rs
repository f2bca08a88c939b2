//! Per-user progress rows, one struct per hierarchy level.
//!
//! The four levels share a shape: a composite identity (user + content key),
//! back-references to every ancestor row, roll-up counters and the
//! `viewed_at` / `completed_at` timestamps. The back-references are
//! denormalized lookups; the composite key is what ties a row to its parent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Completion state shared by the levels that can be completed.
pub trait ProgressLevel {
    fn completed_at(&self) -> Option<DateTime<Utc>>;

    fn is_completed(&self) -> bool {
        self.completed_at().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LanguageProgress {
    pub id: i32,
    pub user_id: i32,
    pub language_slug: String,
    pub completed_series: i32,
    pub viewed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SeriesProgress {
    pub id: i32,
    pub user_id: i32,
    pub language_slug: String,
    pub series_slug: String,
    pub language_progress_id: i32,
    pub completed_sections: i32,
    pub completed_lessons: i32,
    pub is_current: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub viewed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SectionProgress {
    pub id: i32,
    pub user_id: i32,
    pub language_slug: String,
    pub series_slug: String,
    pub section_id: i32,
    pub language_progress_id: i32,
    pub series_progress_id: i32,
    pub completed_lessons: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub viewed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LessonProgress {
    pub id: i32,
    pub user_id: i32,
    pub language_slug: String,
    pub series_slug: String,
    pub section_id: i32,
    pub lesson_id: i32,
    pub language_progress_id: i32,
    pub series_progress_id: i32,
    pub section_progress_id: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub viewed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressLevel for SeriesProgress {
    fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

impl ProgressLevel for SectionProgress {
    fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

impl ProgressLevel for LessonProgress {
    fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

#[derive(Debug, Clone)]
pub struct NewSeriesProgress {
    pub user_id: i32,
    pub language_slug: String,
    pub series_slug: String,
    pub language_progress_id: i32,
}

#[derive(Debug, Clone)]
pub struct NewSectionProgress {
    pub user_id: i32,
    pub language_slug: String,
    pub series_slug: String,
    pub section_id: i32,
    pub language_progress_id: i32,
    pub series_progress_id: i32,
}

#[derive(Debug, Clone)]
pub struct NewLessonProgress {
    pub user_id: i32,
    pub language_slug: String,
    pub series_slug: String,
    pub section_id: i32,
    pub lesson_id: i32,
    pub language_progress_id: i32,
    pub series_progress_id: i32,
    pub section_progress_id: i32,
}

/// Result of an insert-or-touch: the current row and whether it was created.
#[derive(Debug, Clone)]
pub struct Upserted<T> {
    pub row: T,
    pub created: bool,
}

/// Result of a counter adjustment: the row after the update and whether it
/// was completed immediately before it.
#[derive(Debug, Clone)]
pub struct Adjusted<T> {
    pub row: T,
    pub was_completed: bool,
}

impl<T: ProgressLevel> Adjusted<T> {
    pub fn became_completed(&self) -> bool {
        !self.was_completed && self.row.is_completed()
    }

    pub fn became_incomplete(&self) -> bool {
        self.was_completed && !self.row.is_completed()
    }
}

/// Counter deltas applied to a series row in one statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeriesDelta {
    pub lessons: i32,
    pub sections: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section_progress(completed_at: Option<DateTime<Utc>>) -> SectionProgress {
        let now = Utc::now();
        SectionProgress {
            id: 1,
            user_id: 7,
            language_slug: "rust".to_string(),
            series_slug: "rust-series".to_string(),
            section_id: 3,
            language_progress_id: 1,
            series_progress_id: 1,
            completed_lessons: 0,
            completed_at,
            viewed_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn adjusted_reports_transitions() {
        let completed = Adjusted { row: section_progress(Some(Utc::now())), was_completed: false };
        assert!(completed.became_completed());
        assert!(!completed.became_incomplete());

        let reopened = Adjusted { row: section_progress(None), was_completed: true };
        assert!(reopened.became_incomplete());

        let unchanged = Adjusted { row: section_progress(Some(Utc::now())), was_completed: true };
        assert!(!unchanged.became_completed());
        assert!(!unchanged.became_incomplete());
    }
}
