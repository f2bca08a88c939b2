//! In-process store with the same semantics as the Postgres one.
//!
//! All units of work share one async mutex, so they run strictly one after
//! another. A transaction works on a copy of the state and swaps it in on
//! commit; dropping it without commit discards the copy. Unique keys,
//! foreign keys, check constraints and `ON DELETE CASCADE` links are
//! emulated so service code sees the same errors it would see from Postgres.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Adjusted, Certificate, Language, LanguageProgress, Lesson, LessonProgress, NewCertificate,
    NewLessonProgress, NewSectionProgress, NewSeriesProgress, Section, SectionProgress, Series,
    SeriesDelta, SeriesProgress, Upserted,
};
use crate::database::store::{
    CertificateRepository, ContentReader, ProgressRepository, Store, UnitOfWork,
};

#[derive(Debug, Default, Clone)]
struct MemoryState {
    next_id: i32,
    languages: Vec<Language>,
    series: Vec<Series>,
    sections: Vec<Section>,
    lessons: Vec<Lesson>,
    language_progress: Vec<LanguageProgress>,
    series_progress: Vec<SeriesProgress>,
    section_progress: Vec<SectionProgress>,
    lesson_progress: Vec<LessonProgress>,
    certificates: Vec<Certificate>,
}

impl MemoryState {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Progress rows held by one user, per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounts {
    pub languages: usize,
    pub series: usize,
    pub sections: usize,
    pub lessons: usize,
    pub certificates: usize,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_language(&self, name: &str, slug: &str) -> Language {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let language = Language {
            id: state.next_id(),
            name: name.to_string(),
            slug: slug.to_string(),
            icon: String::new(),
            series_count: 0,
            created_at: now,
            updated_at: now,
        };
        state.languages.push(language.clone());
        language
    }

    /// Published series count towards the language's series total.
    pub async fn add_series(
        &self,
        language_slug: &str,
        title: &str,
        slug: &str,
        is_published: bool,
    ) -> Series {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let series = Series {
            id: state.next_id(),
            title: title.to_string(),
            slug: slug.to_string(),
            description: String::new(),
            language_slug: language_slug.to_string(),
            sections_count: 0,
            lessons_count: 0,
            watch_time_seconds: 0,
            read_time_seconds: 0,
            is_published,
            created_at: now,
            updated_at: now,
        };
        if is_published {
            if let Some(language) = state.languages.iter_mut().find(|l| l.slug == language_slug) {
                language.series_count += 1;
            }
        }
        state.series.push(series.clone());
        series
    }

    pub async fn add_section(
        &self,
        language_slug: &str,
        series_slug: &str,
        title: &str,
        is_published: bool,
    ) -> Section {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let position = state
            .sections
            .iter()
            .filter(|s| s.series_slug == series_slug)
            .count() as i16
            + 1;
        let section = Section {
            id: state.next_id(),
            title: title.to_string(),
            language_slug: language_slug.to_string(),
            series_slug: series_slug.to_string(),
            position,
            lessons_count: 0,
            watch_time_seconds: 0,
            read_time_seconds: 0,
            is_published,
            created_at: now,
            updated_at: now,
        };
        if is_published {
            if let Some(series) = state.series.iter_mut().find(|s| s.slug == series_slug) {
                series.sections_count += 1;
            }
        }
        state.sections.push(section.clone());
        section
    }

    /// A published lesson counts towards its section's totals, and towards
    /// the series totals as well when the section itself is published.
    pub async fn add_lesson(
        &self,
        section: &Section,
        title: &str,
        watch_time_seconds: i32,
        read_time_seconds: i32,
        is_published: bool,
    ) -> Lesson {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let position = state
            .lessons
            .iter()
            .filter(|l| l.section_id == section.id)
            .count() as i16
            + 1;
        let lesson = Lesson {
            id: state.next_id(),
            title: title.to_string(),
            language_slug: section.language_slug.clone(),
            series_slug: section.series_slug.clone(),
            section_id: section.id,
            position,
            watch_time_seconds,
            read_time_seconds,
            is_published,
            created_at: now,
            updated_at: now,
        };

        if is_published {
            let mut section_published = false;
            if let Some(stored) = state.sections.iter_mut().find(|s| s.id == section.id) {
                stored.lessons_count += 1;
                stored.watch_time_seconds += watch_time_seconds;
                stored.read_time_seconds += read_time_seconds;
                section_published = stored.is_published;
            }
            if section_published {
                if let Some(series) = state.series.iter_mut().find(|s| s.slug == section.series_slug) {
                    series.lessons_count += 1;
                    series.watch_time_seconds += watch_time_seconds;
                    series.read_time_seconds += read_time_seconds;
                }
            }
        }

        state.lessons.push(lesson.clone());
        lesson
    }

    pub async fn row_counts(&self, user_id: i32) -> RowCounts {
        let state = self.state.lock().await;
        RowCounts {
            languages: state.language_progress.iter().filter(|p| p.user_id == user_id).count(),
            series: state.series_progress.iter().filter(|p| p.user_id == user_id).count(),
            sections: state.section_progress.iter().filter(|p| p.user_id == user_id).count(),
            lessons: state.lesson_progress.iter().filter(|p| p.user_id == user_id).count(),
            certificates: state.certificates.iter().filter(|c| c.user_id == user_id).count(),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DatabaseError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        debug!("Memory transaction started");
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working: Some(working),
        }))
    }

    async fn connect(&self) -> Result<Box<dyn UnitOfWork>, DatabaseError> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working: None,
        }))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    // Present for transactions; autocommit units write through the guard
    working: Option<MemoryState>,
}

impl MemoryUnitOfWork {
    fn state(&mut self) -> &mut MemoryState {
        match self.working.as_mut() {
            Some(working) => working,
            None => &mut *self.guard,
        }
    }
}

fn not_found(what: &str) -> DatabaseError {
    DatabaseError::NotFound(format!("{} not found", what))
}

fn check_non_negative(column: &str, value: i32) -> Result<(), DatabaseError> {
    if value < 0 {
        return Err(DatabaseError::CheckViolation(format!(
            "{} would become negative",
            column
        )));
    }
    Ok(())
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        let MemoryUnitOfWork { mut guard, working } = *self;
        if let Some(working) = working {
            *guard = working;
            debug!("Memory transaction committed");
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        if self.working.is_some() {
            debug!("Memory transaction rolled back");
        }
        Ok(())
    }
}

#[async_trait]
impl ContentReader for MemoryUnitOfWork {
    async fn get_language(&mut self, slug: &str) -> Result<Option<Language>, DatabaseError> {
        Ok(self.state().languages.iter().find(|l| l.slug == slug).cloned())
    }

    async fn get_series(
        &mut self,
        language_slug: &str,
        series_slug: &str,
    ) -> Result<Option<Series>, DatabaseError> {
        Ok(self
            .state()
            .series
            .iter()
            .find(|s| s.language_slug == language_slug && s.slug == series_slug)
            .cloned())
    }

    async fn get_section(
        &mut self,
        language_slug: &str,
        series_slug: &str,
        section_id: i32,
    ) -> Result<Option<Section>, DatabaseError> {
        Ok(self
            .state()
            .sections
            .iter()
            .find(|s| {
                s.language_slug == language_slug && s.series_slug == series_slug && s.id == section_id
            })
            .cloned())
    }

    async fn get_lesson(
        &mut self,
        language_slug: &str,
        series_slug: &str,
        section_id: i32,
        lesson_id: i32,
    ) -> Result<Option<Lesson>, DatabaseError> {
        Ok(self
            .state()
            .lessons
            .iter()
            .find(|l| {
                l.language_slug == language_slug
                    && l.series_slug == series_slug
                    && l.section_id == section_id
                    && l.id == lesson_id
            })
            .cloned())
    }
}

#[async_trait]
impl ProgressRepository for MemoryUnitOfWork {
    async fn find_language_progress(
        &mut self,
        user_id: i32,
        language_slug: &str,
    ) -> Result<Option<LanguageProgress>, DatabaseError> {
        Ok(self
            .state()
            .language_progress
            .iter()
            .find(|p| p.user_id == user_id && p.language_slug == language_slug)
            .cloned())
    }

    async fn upsert_language_progress(
        &mut self,
        user_id: i32,
        language_slug: &str,
    ) -> Result<Upserted<LanguageProgress>, DatabaseError> {
        let state = self.state();
        if !state.languages.iter().any(|l| l.slug == language_slug) {
            return Err(not_found("language"));
        }

        let now = Utc::now();
        if let Some(existing) = state
            .language_progress
            .iter_mut()
            .find(|p| p.user_id == user_id && p.language_slug == language_slug)
        {
            existing.viewed_at = now;
            existing.updated_at = now;
            return Ok(Upserted { row: existing.clone(), created: false });
        }

        let progress = LanguageProgress {
            id: state.next_id(),
            user_id,
            language_slug: language_slug.to_string(),
            completed_series: 0,
            viewed_at: now,
            created_at: now,
            updated_at: now,
        };
        state.language_progress.push(progress.clone());
        Ok(Upserted { row: progress, created: true })
    }

    async fn adjust_language_completed_series(
        &mut self,
        id: i32,
        delta: i32,
    ) -> Result<LanguageProgress, DatabaseError> {
        let progress = self
            .state()
            .language_progress
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found("language progress"))?;
        let completed_series = progress.completed_series + delta;
        check_non_negative("completed_series", completed_series)?;
        progress.completed_series = completed_series;
        progress.updated_at = Utc::now();
        Ok(progress.clone())
    }

    async fn delete_language_progress(
        &mut self,
        id: i32,
    ) -> Result<Option<LanguageProgress>, DatabaseError> {
        let state = self.state();
        let Some(index) = state.language_progress.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        let removed = state.language_progress.remove(index);
        state.series_progress.retain(|p| p.language_progress_id != id);
        state.section_progress.retain(|p| p.language_progress_id != id);
        state.lesson_progress.retain(|p| p.language_progress_id != id);
        Ok(Some(removed))
    }

    async fn count_language_progress(&mut self, user_id: i32) -> Result<i64, DatabaseError> {
        Ok(self
            .state()
            .language_progress
            .iter()
            .filter(|p| p.user_id == user_id)
            .count() as i64)
    }

    async fn list_language_progress(
        &mut self,
        user_id: i32,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<LanguageProgress>, DatabaseError> {
        let mut rows: Vec<LanguageProgress> = self
            .state()
            .language_progress
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.viewed_at.cmp(&a.viewed_at).then(b.id.cmp(&a.id)));
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn find_series_progress(
        &mut self,
        user_id: i32,
        language_slug: &str,
        series_slug: &str,
    ) -> Result<Option<SeriesProgress>, DatabaseError> {
        Ok(self
            .state()
            .series_progress
            .iter()
            .find(|p| {
                p.user_id == user_id
                    && p.language_slug == language_slug
                    && p.series_slug == series_slug
            })
            .cloned())
    }

    async fn upsert_series_progress(
        &mut self,
        new: &NewSeriesProgress,
    ) -> Result<Upserted<SeriesProgress>, DatabaseError> {
        let state = self.state();
        if !state.series.iter().any(|s| s.slug == new.series_slug) {
            return Err(not_found("series"));
        }
        if !state.language_progress.iter().any(|p| p.id == new.language_progress_id) {
            return Err(not_found("language progress"));
        }

        let now = Utc::now();
        if let Some(existing) = state
            .series_progress
            .iter_mut()
            .find(|p| p.user_id == new.user_id && p.series_slug == new.series_slug)
        {
            existing.viewed_at = now;
            existing.updated_at = now;
            existing.language_progress_id = new.language_progress_id;
            return Ok(Upserted { row: existing.clone(), created: false });
        }

        let progress = SeriesProgress {
            id: state.next_id(),
            user_id: new.user_id,
            language_slug: new.language_slug.clone(),
            series_slug: new.series_slug.clone(),
            language_progress_id: new.language_progress_id,
            completed_sections: 0,
            completed_lessons: 0,
            is_current: false,
            completed_at: None,
            viewed_at: now,
            created_at: now,
            updated_at: now,
        };
        state.series_progress.push(progress.clone());
        Ok(Upserted { row: progress, created: true })
    }

    async fn set_current_series(
        &mut self,
        user_id: i32,
        language_slug: &str,
        series_slug: &str,
    ) -> Result<SeriesProgress, DatabaseError> {
        let now = Utc::now();
        let mut current = None;
        for progress in self
            .state()
            .series_progress
            .iter_mut()
            .filter(|p| p.user_id == user_id && p.language_slug == language_slug)
        {
            if progress.series_slug == series_slug {
                progress.is_current = true;
                progress.updated_at = now;
                current = Some(progress.clone());
            } else if progress.is_current {
                progress.is_current = false;
                progress.updated_at = now;
            }
        }
        current.ok_or_else(|| not_found("series progress"))
    }

    async fn adjust_series_progress(
        &mut self,
        id: i32,
        delta: SeriesDelta,
        total_lessons: i32,
    ) -> Result<Adjusted<SeriesProgress>, DatabaseError> {
        let progress = self
            .state()
            .series_progress
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found("series progress"))?;

        let completed_lessons = progress.completed_lessons + delta.lessons;
        let completed_sections = progress.completed_sections + delta.sections;
        check_non_negative("completed_lessons", completed_lessons)?;
        check_non_negative("completed_sections", completed_sections)?;

        let was_completed = progress.completed_at.is_some();
        progress.completed_lessons = completed_lessons;
        progress.completed_sections = completed_sections;
        progress.completed_at = if total_lessons > 0 && completed_lessons >= total_lessons {
            progress.completed_at.or_else(|| Some(Utc::now()))
        } else {
            None
        };
        progress.updated_at = Utc::now();
        Ok(Adjusted { row: progress.clone(), was_completed })
    }

    async fn delete_series_progress(
        &mut self,
        id: i32,
    ) -> Result<Option<SeriesProgress>, DatabaseError> {
        let state = self.state();
        let Some(index) = state.series_progress.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        let removed = state.series_progress.remove(index);
        state.section_progress.retain(|p| p.series_progress_id != id);
        state.lesson_progress.retain(|p| p.series_progress_id != id);
        Ok(Some(removed))
    }

    async fn find_section_progress(
        &mut self,
        user_id: i32,
        language_slug: &str,
        series_slug: &str,
        section_id: i32,
    ) -> Result<Option<SectionProgress>, DatabaseError> {
        Ok(self
            .state()
            .section_progress
            .iter()
            .find(|p| {
                p.user_id == user_id
                    && p.language_slug == language_slug
                    && p.series_slug == series_slug
                    && p.section_id == section_id
            })
            .cloned())
    }

    async fn upsert_section_progress(
        &mut self,
        new: &NewSectionProgress,
    ) -> Result<Upserted<SectionProgress>, DatabaseError> {
        let state = self.state();
        if !state.sections.iter().any(|s| s.id == new.section_id) {
            return Err(not_found("section"));
        }
        if !state.language_progress.iter().any(|p| p.id == new.language_progress_id) {
            return Err(not_found("language progress"));
        }
        if !state.series_progress.iter().any(|p| p.id == new.series_progress_id) {
            return Err(not_found("series progress"));
        }

        let now = Utc::now();
        if let Some(existing) = state
            .section_progress
            .iter_mut()
            .find(|p| p.user_id == new.user_id && p.section_id == new.section_id)
        {
            existing.viewed_at = now;
            existing.updated_at = now;
            existing.language_progress_id = new.language_progress_id;
            existing.series_progress_id = new.series_progress_id;
            return Ok(Upserted { row: existing.clone(), created: false });
        }

        let progress = SectionProgress {
            id: state.next_id(),
            user_id: new.user_id,
            language_slug: new.language_slug.clone(),
            series_slug: new.series_slug.clone(),
            section_id: new.section_id,
            language_progress_id: new.language_progress_id,
            series_progress_id: new.series_progress_id,
            completed_lessons: 0,
            completed_at: None,
            viewed_at: now,
            created_at: now,
            updated_at: now,
        };
        state.section_progress.push(progress.clone());
        Ok(Upserted { row: progress, created: true })
    }

    async fn adjust_section_progress(
        &mut self,
        id: i32,
        lessons_delta: i32,
        total_lessons: i32,
    ) -> Result<Adjusted<SectionProgress>, DatabaseError> {
        let progress = self
            .state()
            .section_progress
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found("section progress"))?;

        let completed_lessons = progress.completed_lessons + lessons_delta;
        check_non_negative("completed_lessons", completed_lessons)?;

        let was_completed = progress.completed_at.is_some();
        progress.completed_lessons = completed_lessons;
        progress.completed_at = if total_lessons > 0 && completed_lessons >= total_lessons {
            progress.completed_at.or_else(|| Some(Utc::now()))
        } else {
            None
        };
        progress.updated_at = Utc::now();
        Ok(Adjusted { row: progress.clone(), was_completed })
    }

    async fn delete_section_progress(
        &mut self,
        id: i32,
    ) -> Result<Option<SectionProgress>, DatabaseError> {
        let state = self.state();
        let Some(index) = state.section_progress.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        let removed = state.section_progress.remove(index);
        state.lesson_progress.retain(|p| p.section_progress_id != id);
        Ok(Some(removed))
    }

    async fn find_lesson_progress(
        &mut self,
        user_id: i32,
        language_slug: &str,
        series_slug: &str,
        section_id: i32,
        lesson_id: i32,
    ) -> Result<Option<LessonProgress>, DatabaseError> {
        Ok(self
            .state()
            .lesson_progress
            .iter()
            .find(|p| {
                p.user_id == user_id
                    && p.language_slug == language_slug
                    && p.series_slug == series_slug
                    && p.section_id == section_id
                    && p.lesson_id == lesson_id
            })
            .cloned())
    }

    async fn upsert_lesson_progress(
        &mut self,
        new: &NewLessonProgress,
    ) -> Result<Upserted<LessonProgress>, DatabaseError> {
        let state = self.state();
        if !state.lessons.iter().any(|l| l.id == new.lesson_id) {
            return Err(not_found("lesson"));
        }
        if !state.language_progress.iter().any(|p| p.id == new.language_progress_id) {
            return Err(not_found("language progress"));
        }
        if !state.series_progress.iter().any(|p| p.id == new.series_progress_id) {
            return Err(not_found("series progress"));
        }
        if !state.section_progress.iter().any(|p| p.id == new.section_progress_id) {
            return Err(not_found("section progress"));
        }

        let now = Utc::now();
        if let Some(existing) = state
            .lesson_progress
            .iter_mut()
            .find(|p| p.user_id == new.user_id && p.lesson_id == new.lesson_id)
        {
            existing.viewed_at = now;
            existing.updated_at = now;
            existing.language_progress_id = new.language_progress_id;
            existing.series_progress_id = new.series_progress_id;
            existing.section_progress_id = new.section_progress_id;
            return Ok(Upserted { row: existing.clone(), created: false });
        }

        let progress = LessonProgress {
            id: state.next_id(),
            user_id: new.user_id,
            language_slug: new.language_slug.clone(),
            series_slug: new.series_slug.clone(),
            section_id: new.section_id,
            lesson_id: new.lesson_id,
            language_progress_id: new.language_progress_id,
            series_progress_id: new.series_progress_id,
            section_progress_id: new.section_progress_id,
            completed_at: None,
            viewed_at: now,
            created_at: now,
            updated_at: now,
        };
        state.lesson_progress.push(progress.clone());
        Ok(Upserted { row: progress, created: true })
    }

    async fn complete_lesson_progress(
        &mut self,
        id: i32,
    ) -> Result<Option<LessonProgress>, DatabaseError> {
        let Some(progress) = self
            .state()
            .lesson_progress
            .iter_mut()
            .find(|p| p.id == id && p.completed_at.is_none())
        else {
            return Ok(None);
        };
        let now = Utc::now();
        progress.completed_at = Some(now);
        progress.updated_at = now;
        Ok(Some(progress.clone()))
    }

    async fn delete_lesson_progress(
        &mut self,
        id: i32,
    ) -> Result<Option<LessonProgress>, DatabaseError> {
        let state = self.state();
        let Some(index) = state.lesson_progress.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        Ok(Some(state.lesson_progress.remove(index)))
    }
}

#[async_trait]
impl CertificateRepository for MemoryUnitOfWork {
    async fn find_certificate(
        &mut self,
        user_id: i32,
        series_slug: &str,
    ) -> Result<Option<Certificate>, DatabaseError> {
        Ok(self
            .state()
            .certificates
            .iter()
            .find(|c| c.user_id == user_id && c.series_slug == series_slug)
            .cloned())
    }

    async fn find_certificate_by_id(
        &mut self,
        id: Uuid,
    ) -> Result<Option<Certificate>, DatabaseError> {
        Ok(self.state().certificates.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_certificate(
        &mut self,
        new: &NewCertificate,
    ) -> Result<Certificate, DatabaseError> {
        let state = self.state();
        if let Some(existing) = state
            .certificates
            .iter()
            .find(|c| c.user_id == new.user_id && c.series_slug == new.series_slug)
        {
            return Ok(existing.clone());
        }
        if state.certificates.iter().any(|c| c.id == new.id) {
            return Err(DatabaseError::Conflict(format!(
                "certificate {} already exists",
                new.id
            )));
        }

        let now = Utc::now();
        let certificate = Certificate {
            id: new.id,
            user_id: new.user_id,
            language_slug: new.language_slug.clone(),
            series_slug: new.series_slug.clone(),
            series_title: new.series_title.clone(),
            lessons: new.lessons,
            watch_time_seconds: new.watch_time_seconds,
            read_time_seconds: new.read_time_seconds,
            completed_at: now,
            created_at: now,
        };
        state.certificates.push(certificate.clone());
        Ok(certificate)
    }

    async fn delete_certificate(
        &mut self,
        user_id: i32,
        series_slug: &str,
    ) -> Result<u64, DatabaseError> {
        let certificates = &mut self.state().certificates;
        let before = certificates.len();
        certificates.retain(|c| !(c.user_id == user_id && c.series_slug == series_slug));
        Ok((before - certificates.len()) as u64)
    }

    async fn delete_language_certificates(
        &mut self,
        user_id: i32,
        language_slug: &str,
    ) -> Result<u64, DatabaseError> {
        let certificates = &mut self.state().certificates;
        let before = certificates.len();
        certificates.retain(|c| !(c.user_id == user_id && c.language_slug == language_slug));
        Ok((before - certificates.len()) as u64)
    }

    async fn count_certificates(&mut self, user_id: i32) -> Result<i64, DatabaseError> {
        Ok(self
            .state()
            .certificates
            .iter()
            .filter(|c| c.user_id == user_id)
            .count() as i64)
    }

    async fn list_certificates(
        &mut self,
        user_id: i32,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Certificate>, DatabaseError> {
        let mut rows: Vec<Certificate> = self
            .state()
            .certificates
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then(a.id.cmp(&b.id)));
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_language("Rust", "rust").await;
        store.add_series("rust", "Rust Series", "rust-series", true).await;
        store
    }

    #[tokio::test]
    async fn upsert_reports_creation_once() {
        let store = seeded().await;
        let mut uow = store.connect().await.unwrap();

        let first = uow.upsert_language_progress(1, "rust").await.unwrap();
        let second = uow.upsert_language_progress(1, "rust").await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.row.id, second.row.id);
    }

    #[tokio::test]
    async fn upsert_requires_existing_language() {
        let store = seeded().await;
        let mut uow = store.connect().await.unwrap();

        let err = uow.upsert_language_progress(1, "go").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn rollback_discards_changes() {
        let store = seeded().await;

        let mut uow = store.begin().await.unwrap();
        uow.upsert_language_progress(1, "rust").await.unwrap();
        uow.rollback().await.unwrap();

        assert_eq!(store.row_counts(1).await.languages, 0);

        let mut uow = store.begin().await.unwrap();
        uow.upsert_language_progress(1, "rust").await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(store.row_counts(1).await.languages, 1);
    }

    #[tokio::test]
    async fn counters_cannot_go_negative() {
        let store = seeded().await;
        let mut uow = store.connect().await.unwrap();
        let language = uow.upsert_language_progress(1, "rust").await.unwrap().row;

        let err = uow
            .adjust_language_completed_series(language.id, -1)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::CheckViolation(_)));
    }

    #[tokio::test]
    async fn deleting_language_progress_cascades() {
        let store = seeded().await;
        let mut uow = store.connect().await.unwrap();
        let language = uow.upsert_language_progress(1, "rust").await.unwrap().row;
        uow.upsert_series_progress(&NewSeriesProgress {
            user_id: 1,
            language_slug: "rust".to_string(),
            series_slug: "rust-series".to_string(),
            language_progress_id: language.id,
        })
        .await
        .unwrap();
        drop(uow);

        assert_eq!(store.row_counts(1).await.series, 1);

        let mut uow = store.connect().await.unwrap();
        assert!(uow.delete_language_progress(language.id).await.unwrap().is_some());
        drop(uow);

        assert_eq!(store.row_counts(1).await, RowCounts::default());
    }

    #[tokio::test]
    async fn certificate_insert_is_idempotent() {
        let store = seeded().await;
        let mut uow = store.connect().await.unwrap();
        let new = NewCertificate {
            id: Uuid::new_v4(),
            user_id: 1,
            language_slug: "rust".to_string(),
            series_slug: "rust-series".to_string(),
            series_title: "Rust Series".to_string(),
            lessons: 2,
            watch_time_seconds: 0,
            read_time_seconds: 0,
        };

        let first = uow.insert_certificate(&new).await.unwrap();
        let again = uow
            .insert_certificate(&NewCertificate { id: Uuid::new_v4(), ..new })
            .await
            .unwrap();

        assert_eq!(first.id, again.id);
        assert_eq!(uow.count_certificates(1).await.unwrap(), 1);
    }
}
