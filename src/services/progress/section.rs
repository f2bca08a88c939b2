use tracing::{info, instrument, warn};

use super::{ensure_section, finalize, resolve_section, uncomplete_series, ProgressService};
use crate::database::models::{ProgressLevel, Section, SectionProgress, SeriesDelta};
use crate::database::store::UnitOfWork;
use crate::services::errors::ProgressError;
use crate::types::{SectionProgressOptions, Tracked};

impl ProgressService {
    /// Start or resume a section, creating series and language rows as needed.
    #[instrument(
        skip(self, opts),
        fields(
            request_id = %opts.request_id,
            user_id = opts.user_id,
            language_slug = %opts.language_slug,
            series_slug = %opts.series_slug,
            section_id = opts.section_id,
        )
    )]
    pub async fn create_or_update_section_progress(
        &self,
        opts: &SectionProgressOptions,
    ) -> Result<Tracked<Section, SectionProgress>, ProgressError> {
        info!("Creating or updating section progress");

        let mut uow = self.store.begin().await?;
        let result = upsert_section_in(&mut *uow, opts).await;
        let tracked = finalize(uow, result).await?;

        info!(created = tracked.created, "Section progress saved");
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
        )
    )]
    pub async fn find_section_progress(
        &self,
        opts: &SectionProgressOptions,
    ) -> Result<SectionProgress, ProgressError> {
        let mut uow = self.store.connect().await?;
        uow.find_section_progress(
            opts.user_id,
            &opts.language_slug,
            &opts.series_slug,
            opts.section_id,
        )
        .await?
        .ok_or_else(|| {
            warn!("Section progress not found");
            ProgressError::not_found("Section progress not found")
        })
    }

    /// Delete the section row and its lesson rows, taking the section's
    /// completed lessons (and the section itself, if complete) back out of
    /// the series counters.
    #[instrument(
        skip(self, opts),
        fields(
            request_id = %opts.request_id,
            user_id = opts.user_id,
            language_slug = %opts.language_slug,
            series_slug = %opts.series_slug,
            section_id = opts.section_id,
        )
    )]
    pub async fn delete_section_progress(
        &self,
        opts: &SectionProgressOptions,
    ) -> Result<(), ProgressError> {
        info!("Deleting section progress");

        let mut uow = self.store.begin().await?;
        let result = delete_section_in(&mut *uow, opts).await;
        finalize(uow, result).await?;

        info!("Section progress deleted");
        Ok(())
    }
}

async fn upsert_section_in(
    uow: &mut dyn UnitOfWork,
    opts: &SectionProgressOptions,
) -> Result<Tracked<Section, SectionProgress>, ProgressError> {
    let (_, section) = resolve_section(
        uow,
        &opts.language_slug,
        &opts.series_slug,
        opts.section_id,
        opts.is_staff,
    )
    .await?;
    let upserted = ensure_section(uow, opts.user_id, &section).await?;
    Ok(Tracked {
        content: section,
        progress: upserted.row,
        created: upserted.created,
    })
}

async fn delete_section_in(
    uow: &mut dyn UnitOfWork,
    opts: &SectionProgressOptions,
) -> Result<(), ProgressError> {
    let (series, _) = resolve_section(
        uow,
        &opts.language_slug,
        &opts.series_slug,
        opts.section_id,
        true,
    )
    .await?;

    let progress = uow
        .find_section_progress(
            opts.user_id,
            &opts.language_slug,
            &opts.series_slug,
            opts.section_id,
        )
        .await?
        .ok_or_else(|| {
            warn!("Section progress not found");
            ProgressError::not_found("Section progress not found")
        })?;

    let deleted = uow
        .delete_section_progress(progress.id)
        .await?
        .ok_or_else(|| ProgressError::not_found("Section progress not found"))?;

    // Nothing was rolled up from an untouched section
    if deleted.completed_lessons == 0 && !deleted.is_completed() {
        return Ok(());
    }

    let delta = SeriesDelta {
        lessons: -deleted.completed_lessons,
        sections: if deleted.is_completed() { -1 } else { 0 },
    };
    let series_progress = uow
        .adjust_series_progress(deleted.series_progress_id, delta, series.lessons_count)
        .await?;

    if series_progress.became_incomplete() {
        uncomplete_series(uow, &series_progress.row).await?;
    }
    Ok(())
}
