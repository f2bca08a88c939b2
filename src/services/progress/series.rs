use tracing::{info, instrument, warn};

use super::{ensure_series, finalize, resolve_series, ProgressService};
use crate::database::models::{ProgressLevel, Series, SeriesProgress};
use crate::database::store::UnitOfWork;
use crate::services::certificates;
use crate::services::errors::ProgressError;
use crate::types::{SeriesProgressOptions, Tracked};

impl ProgressService {
    /// Start or resume a series. Creates the language row if needed and
    /// makes this series the current one in its language.
    #[instrument(
        skip(self, opts),
        fields(
            request_id = %opts.request_id,
            user_id = opts.user_id,
            language_slug = %opts.language_slug,
            series_slug = %opts.series_slug,
        )
    )]
    pub async fn create_or_update_series_progress(
        &self,
        opts: &SeriesProgressOptions,
    ) -> Result<Tracked<Series, SeriesProgress>, ProgressError> {
        info!("Creating or updating series progress");

        let mut uow = self.store.begin().await?;
        let result = upsert_series_in(&mut *uow, opts).await;
        let tracked = finalize(uow, result).await?;

        info!(created = tracked.created, "Series progress saved");
        Ok(tracked)
    }

    #[instrument(
        skip(self, opts),
        fields(
            request_id = %opts.request_id,
            user_id = opts.user_id,
            language_slug = %opts.language_slug,
            series_slug = %opts.series_slug,
        )
    )]
    pub async fn find_series_progress(
        &self,
        opts: &SeriesProgressOptions,
    ) -> Result<SeriesProgress, ProgressError> {
        let mut uow = self.store.connect().await?;
        uow.find_series_progress(opts.user_id, &opts.language_slug, &opts.series_slug)
            .await?
            .ok_or_else(|| {
                warn!("Series progress not found");
                ProgressError::not_found("Series progress not found")
            })
    }

    /// Delete the series row with its section and lesson rows. A completed
    /// series also gives back its language count and its certificate.
    #[instrument(
        skip(self, opts),
        fields(
            request_id = %opts.request_id,
            user_id = opts.user_id,
            language_slug = %opts.language_slug,
            series_slug = %opts.series_slug,
        )
    )]
    pub async fn delete_series_progress(
        &self,
        opts: &SeriesProgressOptions,
    ) -> Result<(), ProgressError> {
        info!("Deleting series progress");

        let mut uow = self.store.begin().await?;
        let result = delete_series_in(&mut *uow, opts).await;
        finalize(uow, result).await?;

        info!("Series progress deleted");
        Ok(())
    }
}

async fn upsert_series_in(
    uow: &mut dyn UnitOfWork,
    opts: &SeriesProgressOptions,
) -> Result<Tracked<Series, SeriesProgress>, ProgressError> {
    let series = resolve_series(uow, &opts.language_slug, &opts.series_slug, opts.is_staff).await?;
    let upserted = ensure_series(uow, opts.user_id, &series.language_slug, &series.slug).await?;
    Ok(Tracked {
        content: series,
        progress: upserted.row,
        created: upserted.created,
    })
}

async fn delete_series_in(
    uow: &mut dyn UnitOfWork,
    opts: &SeriesProgressOptions,
) -> Result<(), ProgressError> {
    resolve_series(uow, &opts.language_slug, &opts.series_slug, true).await?;

    let progress = uow
        .find_series_progress(opts.user_id, &opts.language_slug, &opts.series_slug)
        .await?
        .ok_or_else(|| {
            warn!("Series progress not found");
            ProgressError::not_found("Series progress not found")
        })?;

    let deleted = uow
        .delete_series_progress(progress.id)
        .await?
        .ok_or_else(|| ProgressError::not_found("Series progress not found"))?;

    if deleted.is_completed() {
        uow.adjust_language_completed_series(deleted.language_progress_id, -1)
            .await?;
    }
    certificates::revoke(uow, opts.user_id, &opts.series_slug).await
}
