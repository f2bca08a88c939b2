use tracing::{debug, info, instrument, warn};

use super::{
    check_bound, ensure_lesson, finalize, resolve_lesson, uncomplete_series, ProgressService,
};
use crate::database::models::{Lesson, LessonProgress, ProgressLevel, SeriesDelta};
use crate::database::store::UnitOfWork;
use crate::services::certificates;
use crate::services::errors::ProgressError;
use crate::types::{CompletedLesson, LessonProgressOptions, Tracked};

impl ProgressService {
    /// Start or resume a lesson, creating every missing ancestor row.
    #[instrument(
        skip(self, opts),
        fields(
            request_id = %opts.request_id,
            user_id = opts.user_id,
            language_slug = %opts.language_slug,
            series_slug = %opts.series_slug,
            section_id = opts.section_id,
            lesson_id = opts.lesson_id,
        )
    )]
    pub async fn create_or_update_lesson_progress(
        &self,
        opts: &LessonProgressOptions,
    ) -> Result<Tracked<Lesson, LessonProgress>, ProgressError> {
        info!("Creating or updating lesson progress");

        let mut uow = self.store.begin().await?;
        let result = upsert_lesson_in(&mut *uow, opts).await;
        let tracked = finalize(uow, result).await?;

        info!(created = tracked.created, "Lesson progress saved");
        Ok(tracked)
    }

    #[instrument(
        skip(self, opts),
        fields(
            request_id = %opts.request_id,
            user_id = opts.user_id,
            language_slug = %opts.language_slug,
            series_slug = %opts.series_slug,
            section_id = opts.section_id,
            lesson_id = opts.lesson_id,
        )
    )]
    pub async fn find_lesson_progress(
        &self,
        opts: &LessonProgressOptions,
    ) -> Result<LessonProgress, ProgressError> {
        let mut uow = self.store.connect().await?;
        find_lesson_in(&mut *uow, opts).await
    }

    /// Mark a lesson completed and roll the completion up through section,
    /// series and language. Issues the series certificate when this was the
    /// last lesson. Completing an already completed lesson changes nothing.
    #[instrument(
        skip(self, opts),
        fields(
            request_id = %opts.request_id,
            user_id = opts.user_id,
            language_slug = %opts.language_slug,
            series_slug = %opts.series_slug,
            section_id = opts.section_id,
            lesson_id = opts.lesson_id,
        )
    )]
    pub async fn complete_lesson_progress(
        &self,
        opts: &LessonProgressOptions,
    ) -> Result<CompletedLesson, ProgressError> {
        info!("Completing lesson progress");

        let mut uow = self.store.begin().await?;
        let result = complete_lesson_in(&mut *uow, opts).await;
        let completed = finalize(uow, result).await?;

        info!(
            certificate_issued = completed.certificate.is_some(),
            "Lesson progress completed"
        );
        Ok(completed)
    }

    /// Delete the lesson row. A completed lesson is taken back out of the
    /// section and series counters, which may un-complete both and revoke
    /// the certificate.
    #[instrument(
        skip(self, opts),
        fields(
            request_id = %opts.request_id,
            user_id = opts.user_id,
            language_slug = %opts.language_slug,
            series_slug = %opts.series_slug,
            section_id = opts.section_id,
            lesson_id = opts.lesson_id,
        )
    )]
    pub async fn reset_lesson_progress(
        &self,
        opts: &LessonProgressOptions,
    ) -> Result<(), ProgressError> {
        info!("Resetting lesson progress");

        let mut uow = self.store.begin().await?;
        let result = reset_lesson_in(&mut *uow, opts).await;
        finalize(uow, result).await?;

        info!("Lesson progress reset");
        Ok(())
    }
}

async fn find_lesson_in(
    uow: &mut dyn UnitOfWork,
    opts: &LessonProgressOptions,
) -> Result<LessonProgress, ProgressError> {
    uow.find_lesson_progress(
        opts.user_id,
        &opts.language_slug,
        &opts.series_slug,
        opts.section_id,
        opts.lesson_id,
    )
    .await?
    .ok_or_else(|| {
        warn!("Lesson progress not found");
        ProgressError::not_found("Lesson progress not found")
    })
}

async fn upsert_lesson_in(
    uow: &mut dyn UnitOfWork,
    opts: &LessonProgressOptions,
) -> Result<Tracked<Lesson, LessonProgress>, ProgressError> {
    let (_, section, lesson) = resolve_lesson(
        uow,
        &opts.language_slug,
        &opts.series_slug,
        opts.section_id,
        opts.lesson_id,
        opts.is_staff,
    )
    .await?;
    let upserted = ensure_lesson(uow, opts.user_id, &section, &lesson).await?;
    Ok(Tracked {
        content: lesson,
        progress: upserted.row,
        created: upserted.created,
    })
}

async fn complete_lesson_in(
    uow: &mut dyn UnitOfWork,
    opts: &LessonProgressOptions,
) -> Result<CompletedLesson, ProgressError> {
    let (series, section, lesson) = resolve_lesson(
        uow,
        &opts.language_slug,
        &opts.series_slug,
        opts.section_id,
        opts.lesson_id,
        opts.is_staff,
    )
    .await?;
    // Content totals only count published lessons, staff previews included
    if !lesson.is_published || !section.is_published || !series.is_published {
        warn!("Refusing to complete unpublished content");
        return Err(ProgressError::invalid(
            "Unpublished lessons cannot be completed",
        ));
    }

    let existing = uow
        .find_lesson_progress(
            opts.user_id,
            &opts.language_slug,
            &opts.series_slug,
            opts.section_id,
            opts.lesson_id,
        )
        .await?;
    let progress = match existing {
        Some(progress) if progress.completed_at.is_some() => {
            debug!("Lesson already completed");
            return Ok(CompletedLesson {
                lesson,
                progress,
                certificate: None,
            });
        }
        Some(progress) => progress,
        None => ensure_lesson(uow, opts.user_id, &section, &lesson).await?.row,
    };

    // A concurrent request may have completed the row since it was read
    let Some(progress) = uow.complete_lesson_progress(progress.id).await? else {
        debug!("Lesson completed concurrently");
        let progress = find_lesson_in(uow, opts).await?;
        return Ok(CompletedLesson {
            lesson,
            progress,
            certificate: None,
        });
    };

    let section_progress = uow
        .adjust_section_progress(progress.section_progress_id, 1, section.lessons_count)
        .await?;
    check_bound(
        "completed lessons",
        section_progress.row.completed_lessons,
        section.lessons_count,
    )?;

    let delta = SeriesDelta {
        lessons: 1,
        sections: if section_progress.became_completed() { 1 } else { 0 },
    };
    let series_progress = uow
        .adjust_series_progress(progress.series_progress_id, delta, series.lessons_count)
        .await?;
    check_bound(
        "completed lessons",
        series_progress.row.completed_lessons,
        series.lessons_count,
    )?;
    check_bound(
        "completed sections",
        series_progress.row.completed_sections,
        series.sections_count,
    )?;

    let certificate = if series_progress.became_completed() {
        uow.adjust_language_completed_series(progress.language_progress_id, 1)
            .await?;
        Some(certificates::issue(uow, opts.user_id, &series).await?)
    } else {
        None
    };

    Ok(CompletedLesson {
        lesson,
        progress,
        certificate,
    })
}

async fn reset_lesson_in(
    uow: &mut dyn UnitOfWork,
    opts: &LessonProgressOptions,
) -> Result<(), ProgressError> {
    let (series, section, _) = resolve_lesson(
        uow,
        &opts.language_slug,
        &opts.series_slug,
        opts.section_id,
        opts.lesson_id,
        true,
    )
    .await?;

    let progress = find_lesson_in(uow, opts).await?;
    let deleted = uow
        .delete_lesson_progress(progress.id)
        .await?
        .ok_or_else(|| ProgressError::not_found("Lesson progress not found"))?;

    // Only a completion was rolled up into the ancestors
    if !deleted.is_completed() {
        return Ok(());
    }

    let section_progress = uow
        .adjust_section_progress(deleted.section_progress_id, -1, section.lessons_count)
        .await?;

    let delta = SeriesDelta {
        lessons: -1,
        sections: if section_progress.became_incomplete() { -1 } else { 0 },
    };
    let series_progress = uow
        .adjust_series_progress(deleted.series_progress_id, delta, series.lessons_count)
        .await?;

    if series_progress.became_incomplete() {
        uncomplete_series(uow, &series_progress.row).await?;
    }
    Ok(())
}
