//! Store seam for the progress engine.
//!
//! Cascade operations are written once against [`UnitOfWork`] and run either
//! inside a transaction ([`Store::begin`]) or in autocommit mode
//! ([`Store::connect`]). Every counter mutation is a single relative update so
//! concurrent completions serialize on the row lock instead of in application
//! code.

use async_trait::async_trait;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Adjusted, Certificate, Language, LanguageProgress, Lesson, LessonProgress, NewCertificate,
    NewLessonProgress, NewSectionProgress, NewSeriesProgress, Section, SectionProgress, Series,
    SeriesDelta, SeriesProgress, Upserted,
};

/// Read-only lookups against the content hierarchy. Each lookup also checks
/// membership: a section is only found under its own series and language.
#[async_trait]
pub trait ContentReader: Send {
    async fn get_language(&mut self, slug: &str) -> Result<Option<Language>, DatabaseError>;

    async fn get_series(
        &mut self,
        language_slug: &str,
        series_slug: &str,
    ) -> Result<Option<Series>, DatabaseError>;

    async fn get_section(
        &mut self,
        language_slug: &str,
        series_slug: &str,
        section_id: i32,
    ) -> Result<Option<Section>, DatabaseError>;

    async fn get_lesson(
        &mut self,
        language_slug: &str,
        series_slug: &str,
        section_id: i32,
        lesson_id: i32,
    ) -> Result<Option<Lesson>, DatabaseError>;
}

#[async_trait]
pub trait ProgressRepository: Send {
    // Language level

    async fn find_language_progress(
        &mut self,
        user_id: i32,
        language_slug: &str,
    ) -> Result<Option<LanguageProgress>, DatabaseError>;

    /// Insert the row, or touch `viewed_at` if it already exists.
    async fn upsert_language_progress(
        &mut self,
        user_id: i32,
        language_slug: &str,
    ) -> Result<Upserted<LanguageProgress>, DatabaseError>;

    async fn adjust_language_completed_series(
        &mut self,
        id: i32,
        delta: i32,
    ) -> Result<LanguageProgress, DatabaseError>;

    /// Delete the row and, by cascade, every descendant progress row.
    async fn delete_language_progress(
        &mut self,
        id: i32,
    ) -> Result<Option<LanguageProgress>, DatabaseError>;

    async fn count_language_progress(&mut self, user_id: i32) -> Result<i64, DatabaseError>;

    /// Most recently viewed first.
    async fn list_language_progress(
        &mut self,
        user_id: i32,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<LanguageProgress>, DatabaseError>;

    // Series level

    async fn find_series_progress(
        &mut self,
        user_id: i32,
        language_slug: &str,
        series_slug: &str,
    ) -> Result<Option<SeriesProgress>, DatabaseError>;

    async fn upsert_series_progress(
        &mut self,
        new: &NewSeriesProgress,
    ) -> Result<Upserted<SeriesProgress>, DatabaseError>;

    /// Flag the series as the user's current one in its language and clear the
    /// flag on every other series of that language.
    async fn set_current_series(
        &mut self,
        user_id: i32,
        language_slug: &str,
        series_slug: &str,
    ) -> Result<SeriesProgress, DatabaseError>;

    /// Apply counter deltas and recompute `completed_at` against
    /// `total_lessons` in one statement.
    async fn adjust_series_progress(
        &mut self,
        id: i32,
        delta: SeriesDelta,
        total_lessons: i32,
    ) -> Result<Adjusted<SeriesProgress>, DatabaseError>;

    async fn delete_series_progress(
        &mut self,
        id: i32,
    ) -> Result<Option<SeriesProgress>, DatabaseError>;

    // Section level

    async fn find_section_progress(
        &mut self,
        user_id: i32,
        language_slug: &str,
        series_slug: &str,
        section_id: i32,
    ) -> Result<Option<SectionProgress>, DatabaseError>;

    async fn upsert_section_progress(
        &mut self,
        new: &NewSectionProgress,
    ) -> Result<Upserted<SectionProgress>, DatabaseError>;

    async fn adjust_section_progress(
        &mut self,
        id: i32,
        lessons_delta: i32,
        total_lessons: i32,
    ) -> Result<Adjusted<SectionProgress>, DatabaseError>;

    async fn delete_section_progress(
        &mut self,
        id: i32,
    ) -> Result<Option<SectionProgress>, DatabaseError>;

    // Lesson level

    async fn find_lesson_progress(
        &mut self,
        user_id: i32,
        language_slug: &str,
        series_slug: &str,
        section_id: i32,
        lesson_id: i32,
    ) -> Result<Option<LessonProgress>, DatabaseError>;

    async fn upsert_lesson_progress(
        &mut self,
        new: &NewLessonProgress,
    ) -> Result<Upserted<LessonProgress>, DatabaseError>;

    /// Set `completed_at` if it is still unset. `None` means the row was
    /// already completed (or is gone) and nothing changed.
    async fn complete_lesson_progress(
        &mut self,
        id: i32,
    ) -> Result<Option<LessonProgress>, DatabaseError>;

    /// Delete the row, returning it as it was at deletion time.
    async fn delete_lesson_progress(
        &mut self,
        id: i32,
    ) -> Result<Option<LessonProgress>, DatabaseError>;
}

#[async_trait]
pub trait CertificateRepository: Send {
    async fn find_certificate(
        &mut self,
        user_id: i32,
        series_slug: &str,
    ) -> Result<Option<Certificate>, DatabaseError>;

    async fn find_certificate_by_id(&mut self, id: Uuid)
        -> Result<Option<Certificate>, DatabaseError>;

    /// Insert unless a certificate already exists for (user, series); in that
    /// case the existing row is returned untouched.
    async fn insert_certificate(
        &mut self,
        new: &NewCertificate,
    ) -> Result<Certificate, DatabaseError>;

    async fn delete_certificate(
        &mut self,
        user_id: i32,
        series_slug: &str,
    ) -> Result<u64, DatabaseError>;

    async fn delete_language_certificates(
        &mut self,
        user_id: i32,
        language_slug: &str,
    ) -> Result<u64, DatabaseError>;

    async fn count_certificates(&mut self, user_id: i32) -> Result<i64, DatabaseError>;

    /// Most recently completed first.
    async fn list_certificates(
        &mut self,
        user_id: i32,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Certificate>, DatabaseError>;
}

#[async_trait]
pub trait UnitOfWork: ContentReader + ProgressRepository + CertificateRepository + Send {
    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Open a Read Committed transaction with deferred constraint checks.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DatabaseError>;

    /// Autocommit unit of work; `commit` and `rollback` are no-ops.
    async fn connect(&self) -> Result<Box<dyn UnitOfWork>, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}
