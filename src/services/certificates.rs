use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::database::models::{Certificate, NewCertificate, Series};
use crate::database::store::{Store, UnitOfWork};
use crate::services::errors::ProgressError;
use crate::types::{Page, PageOptions};

/// Snapshot of a completed series, ready to be stored as a certificate.
pub fn certificate_for(user_id: i32, series: &Series) -> NewCertificate {
    NewCertificate {
        id: Uuid::new_v4(),
        user_id,
        language_slug: series.language_slug.clone(),
        series_slug: series.slug.clone(),
        series_title: series.title.clone(),
        lessons: series.lessons_count,
        watch_time_seconds: series.watch_time_seconds,
        read_time_seconds: series.read_time_seconds,
    }
}

/// Issue the certificate for `series` inside the caller's unit of work.
/// An existing certificate for the same (user, series) is returned as is.
pub(crate) async fn issue(
    uow: &mut dyn UnitOfWork,
    user_id: i32,
    series: &Series,
) -> Result<Certificate, ProgressError> {
    let certificate = uow.insert_certificate(&certificate_for(user_id, series)).await?;
    info!(
        user_id,
        series_slug = %series.slug,
        certificate_id = %certificate.id,
        "Certificate issued"
    );
    Ok(certificate)
}

/// Remove the certificate a user holds for a series, if any.
pub(crate) async fn revoke(
    uow: &mut dyn UnitOfWork,
    user_id: i32,
    series_slug: &str,
) -> Result<(), ProgressError> {
    let removed = uow.delete_certificate(user_id, series_slug).await?;
    if removed > 0 {
        info!(user_id, series_slug, "Certificate revoked");
    }
    Ok(())
}

/// Read side of certificates.
#[derive(Clone)]
pub struct CertificateService {
    store: Arc<dyn Store>,
}

impl CertificateService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Certificates are shareable, so lookup by id is not scoped to a user.
    #[instrument(skip(self))]
    pub async fn find_by_id(&self, request_id: &str, id: Uuid) -> Result<Certificate, ProgressError> {
        let mut uow = self.store.connect().await?;
        match uow.find_certificate_by_id(id).await? {
            Some(certificate) => Ok(certificate),
            None => {
                warn!(%id, "Certificate not found");
                Err(ProgressError::not_found("Certificate not found"))
            }
        }
    }

    #[instrument(skip(self, opts), fields(request_id = %opts.request_id, user_id = opts.user_id))]
    pub async fn list(&self, opts: &PageOptions) -> Result<Page<Certificate>, ProgressError> {
        let mut uow = self.store.connect().await?;

        let total = uow.count_certificates(opts.user_id).await?;
        let items = if total == 0 {
            Vec::new()
        } else {
            uow.list_certificates(opts.user_id, opts.offset, opts.limit).await?
        };

        info!(total, "Certificates listed");
        Ok(Page {
            items,
            total,
            offset: opts.offset,
            limit: opts.limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn snapshots_series_totals() {
        let now = Utc::now();
        let series = Series {
            id: 4,
            title: "Rust Series".to_string(),
            slug: "rust-series".to_string(),
            description: String::new(),
            language_slug: "rust".to_string(),
            sections_count: 1,
            lessons_count: 2,
            watch_time_seconds: 600,
            read_time_seconds: 240,
            is_published: true,
            created_at: now,
            updated_at: now,
        };

        let new = certificate_for(9, &series);
        assert_eq!(new.user_id, 9);
        assert_eq!(new.series_title, "Rust Series");
        assert_eq!(new.language_slug, "rust");
        assert_eq!(new.lessons, 2);
        assert_eq!(new.watch_time_seconds, 600);
        assert_eq!(new.read_time_seconds, 240);
    }
}
