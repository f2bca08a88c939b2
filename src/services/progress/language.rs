use tracing::{info, instrument, warn};

use super::{finalize, resolve_language, ProgressService};
use crate::database::models::{Language, LanguageProgress};
use crate::database::store::UnitOfWork;
use crate::services::errors::ProgressError;
use crate::types::{LanguageProgressOptions, Page, PageOptions, Tracked, ViewedLanguage};

impl ProgressService {
    /// Start or resume a language. The hierarchy root, so nothing cascades.
    #[instrument(
        skip(self, opts),
        fields(request_id = %opts.request_id, user_id = opts.user_id, language_slug = %opts.language_slug)
    )]
    pub async fn create_or_update_language_progress(
        &self,
        opts: &LanguageProgressOptions,
    ) -> Result<Tracked<Language, LanguageProgress>, ProgressError> {
        info!("Creating or updating language progress");

        let mut uow = self.store.begin().await?;
        let result = upsert_language_in(&mut *uow, opts).await;
        let tracked = finalize(uow, result).await?;

        info!(created = tracked.created, "Language progress saved");
        Ok(tracked)
    }

    #[instrument(
        skip(self, opts),
        fields(request_id = %opts.request_id, user_id = opts.user_id, language_slug = %opts.language_slug)
    )]
    pub async fn find_language_progress(
        &self,
        opts: &LanguageProgressOptions,
    ) -> Result<LanguageProgress, ProgressError> {
        let mut uow = self.store.connect().await?;
        uow.find_language_progress(opts.user_id, &opts.language_slug)
            .await?
            .ok_or_else(|| {
                warn!("Language progress not found");
                ProgressError::not_found("Language progress not found")
            })
    }

    /// Languages the user has started, most recently viewed first.
    #[instrument(skip(self, opts), fields(request_id = %opts.request_id, user_id = opts.user_id))]
    pub async fn list_viewed_languages(
        &self,
        opts: &PageOptions,
    ) -> Result<Page<ViewedLanguage>, ProgressError> {
        let mut uow = self.store.connect().await?;

        let total = uow.count_language_progress(opts.user_id).await?;
        let mut items = Vec::new();
        if total > 0 {
            let rows = uow
                .list_language_progress(opts.user_id, opts.offset, opts.limit)
                .await?;
            for progress in rows {
                let language = uow
                    .get_language(&progress.language_slug)
                    .await?
                    .ok_or_else(|| ProgressError::not_found("Language not found"))?;
                items.push(ViewedLanguage { language, progress });
            }
        }

        info!(total, "Viewed languages listed");
        Ok(Page {
            items,
            total,
            offset: opts.offset,
            limit: opts.limit,
        })
    }

    /// Full reset of a language: the progress subtree goes with the
    /// language row and every certificate earned in the language is removed.
    #[instrument(
        skip(self, opts),
        fields(request_id = %opts.request_id, user_id = opts.user_id, language_slug = %opts.language_slug)
    )]
    pub async fn delete_language_progress(
        &self,
        opts: &LanguageProgressOptions,
    ) -> Result<(), ProgressError> {
        info!("Deleting language progress");

        let mut uow = self.store.begin().await?;
        let result = delete_language_in(&mut *uow, opts).await;
        let certificates = finalize(uow, result).await?;

        info!(certificates, "Language progress deleted");
        Ok(())
    }
}

async fn upsert_language_in(
    uow: &mut dyn UnitOfWork,
    opts: &LanguageProgressOptions,
) -> Result<Tracked<Language, LanguageProgress>, ProgressError> {
    let language = resolve_language(uow, &opts.language_slug).await?;
    let upserted = uow
        .upsert_language_progress(opts.user_id, &opts.language_slug)
        .await?;
    Ok(Tracked {
        content: language,
        progress: upserted.row,
        created: upserted.created,
    })
}

async fn delete_language_in(
    uow: &mut dyn UnitOfWork,
    opts: &LanguageProgressOptions,
) -> Result<u64, ProgressError> {
    let progress = uow
        .find_language_progress(opts.user_id, &opts.language_slug)
        .await?
        .ok_or_else(|| {
            warn!("Language progress not found");
            ProgressError::not_found("Language progress not found")
        })?;

    uow.delete_language_progress(progress.id)
        .await?
        .ok_or_else(|| ProgressError::not_found("Language progress not found"))?;

    Ok(uow
        .delete_language_certificates(opts.user_id, &opts.language_slug)
        .await?)
}
