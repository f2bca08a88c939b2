//! Progress cascade engine.
//!
//! Every mutating operation runs in one unit of work opened with
//! [`Store::begin`]: content membership is validated first, then the progress
//! rows of up to four levels (plus a certificate) are changed, and the unit
//! is committed only if every step succeeded.
//!
//! Content visibility rules:
//! - the entity an operation targets must exist and, for non-staff callers,
//!   be published; otherwise the caller gets `NotFound`;
//! - an unpublished ancestor of a published target is an inconsistency in
//!   the content hierarchy and yields `Invalid`;
//! - resets and deletes ignore publication so users can always clear their
//!   own progress.

mod language;
mod lesson;
mod section;
mod series;

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::database::models::{
    Language, LanguageProgress, Lesson, LessonProgress, NewLessonProgress, NewSectionProgress,
    NewSeriesProgress, Section, SectionProgress, Series, SeriesProgress, Upserted,
};
use crate::database::store::{Store, UnitOfWork};
use crate::services::certificates;
use crate::services::errors::ProgressError;

#[derive(Clone)]
pub struct ProgressService {
    store: Arc<dyn Store>,
}

impl ProgressService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

/// Commit on success, roll back on failure. A failed rollback is logged and
/// the original error is returned.
async fn finalize<T>(
    uow: Box<dyn UnitOfWork>,
    result: Result<T, ProgressError>,
) -> Result<T, ProgressError> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            debug!("Progress transaction committed");
            Ok(value)
        }
        Err(err) => {
            debug!(error = %err, "Rolling back progress transaction");
            if let Err(rollback_err) = uow.rollback().await {
                error!(error = %rollback_err, "Failed to roll back progress transaction");
            }
            Err(err)
        }
    }
}

async fn resolve_language(
    uow: &mut dyn UnitOfWork,
    language_slug: &str,
) -> Result<Language, ProgressError> {
    uow.get_language(language_slug).await?.ok_or_else(|| {
        warn!(language_slug, "Language not found");
        ProgressError::not_found("Language not found")
    })
}

async fn resolve_series(
    uow: &mut dyn UnitOfWork,
    language_slug: &str,
    series_slug: &str,
    include_unpublished: bool,
) -> Result<Series, ProgressError> {
    match uow.get_series(language_slug, series_slug).await? {
        Some(series) if series.is_published || include_unpublished => Ok(series),
        _ => {
            warn!(language_slug, series_slug, "Series not found");
            Err(ProgressError::not_found("Series not found"))
        }
    }
}

/// Ancestor lookup: absence is `NotFound`, an unpublished ancestor `Invalid`.
async fn resolve_parent_series(
    uow: &mut dyn UnitOfWork,
    language_slug: &str,
    series_slug: &str,
    include_unpublished: bool,
) -> Result<Series, ProgressError> {
    let series = uow
        .get_series(language_slug, series_slug)
        .await?
        .ok_or_else(|| ProgressError::not_found("Series not found"))?;
    if !series.is_published && !include_unpublished {
        warn!(language_slug, series_slug, "Series of a published entity is unpublished");
        return Err(ProgressError::invalid("Series is not published"));
    }
    Ok(series)
}

async fn resolve_section(
    uow: &mut dyn UnitOfWork,
    language_slug: &str,
    series_slug: &str,
    section_id: i32,
    include_unpublished: bool,
) -> Result<(Series, Section), ProgressError> {
    let section = match uow.get_section(language_slug, series_slug, section_id).await? {
        Some(section) if section.is_published || include_unpublished => section,
        _ => {
            warn!(language_slug, series_slug, section_id, "Section not found");
            return Err(ProgressError::not_found("Section not found"));
        }
    };
    let series = resolve_parent_series(uow, language_slug, series_slug, include_unpublished).await?;
    Ok((series, section))
}

async fn resolve_lesson(
    uow: &mut dyn UnitOfWork,
    language_slug: &str,
    series_slug: &str,
    section_id: i32,
    lesson_id: i32,
    include_unpublished: bool,
) -> Result<(Series, Section, Lesson), ProgressError> {
    let lesson = match uow
        .get_lesson(language_slug, series_slug, section_id, lesson_id)
        .await?
    {
        Some(lesson) if lesson.is_published || include_unpublished => lesson,
        _ => {
            warn!(language_slug, series_slug, section_id, lesson_id, "Lesson not found");
            return Err(ProgressError::not_found("Lesson not found"));
        }
    };

    let section = uow
        .get_section(language_slug, series_slug, section_id)
        .await?
        .ok_or_else(|| ProgressError::not_found("Section not found"))?;
    if !section.is_published && !include_unpublished {
        warn!(section_id, lesson_id, "Section of a published lesson is unpublished");
        return Err(ProgressError::invalid("Section is not published"));
    }

    let series = resolve_parent_series(uow, language_slug, series_slug, include_unpublished).await?;
    Ok((series, section, lesson))
}

// Ancestor auto-creation. Each level upserts its parent first, so a child
// operation never fails because the parent progress row is missing.

async fn ensure_language(
    uow: &mut dyn UnitOfWork,
    user_id: i32,
    language_slug: &str,
) -> Result<Upserted<LanguageProgress>, ProgressError> {
    Ok(uow.upsert_language_progress(user_id, language_slug).await?)
}

/// Upsert the series row and make it the user's current series.
async fn ensure_series(
    uow: &mut dyn UnitOfWork,
    user_id: i32,
    language_slug: &str,
    series_slug: &str,
) -> Result<Upserted<SeriesProgress>, ProgressError> {
    let language = ensure_language(uow, user_id, language_slug).await?.row;
    let upserted = uow
        .upsert_series_progress(&NewSeriesProgress {
            user_id,
            language_slug: language_slug.to_string(),
            series_slug: series_slug.to_string(),
            language_progress_id: language.id,
        })
        .await?;
    let row = uow
        .set_current_series(user_id, language_slug, series_slug)
        .await?;
    Ok(Upserted {
        row,
        created: upserted.created,
    })
}

async fn ensure_section(
    uow: &mut dyn UnitOfWork,
    user_id: i32,
    section: &Section,
) -> Result<Upserted<SectionProgress>, ProgressError> {
    let series = ensure_series(uow, user_id, &section.language_slug, &section.series_slug)
        .await?
        .row;
    Ok(uow
        .upsert_section_progress(&NewSectionProgress {
            user_id,
            language_slug: section.language_slug.clone(),
            series_slug: section.series_slug.clone(),
            section_id: section.id,
            language_progress_id: series.language_progress_id,
            series_progress_id: series.id,
        })
        .await?)
}

async fn ensure_lesson(
    uow: &mut dyn UnitOfWork,
    user_id: i32,
    section: &Section,
    lesson: &Lesson,
) -> Result<Upserted<LessonProgress>, ProgressError> {
    let parent = ensure_section(uow, user_id, section).await?.row;
    Ok(uow
        .upsert_lesson_progress(&NewLessonProgress {
            user_id,
            language_slug: lesson.language_slug.clone(),
            series_slug: lesson.series_slug.clone(),
            section_id: lesson.section_id,
            lesson_id: lesson.id,
            language_progress_id: parent.language_progress_id,
            series_progress_id: parent.series_progress_id,
            section_progress_id: parent.id,
        })
        .await?)
}

/// Undo the side effects of a series completion: the language counter and
/// the certificate.
async fn uncomplete_series(
    uow: &mut dyn UnitOfWork,
    progress: &SeriesProgress,
) -> Result<(), ProgressError> {
    uow.adjust_language_completed_series(progress.language_progress_id, -1)
        .await?;
    certificates::revoke(uow, progress.user_id, &progress.series_slug).await?;
    debug!(series_slug = %progress.series_slug, "Series no longer completed");
    Ok(())
}

fn check_bound(what: &str, value: i32, total: i32) -> Result<(), ProgressError> {
    if value > total {
        warn!(what, value, total, "Progress counter exceeds content total");
        return Err(ProgressError::invalid(format!(
            "{} exceeds content total ({} > {})",
            what, value, total
        )));
    }
    Ok(())
}
