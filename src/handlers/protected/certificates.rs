// handlers/protected/certificates.rs - GET /api/v1/certificates[/:id]

use axum::extract::{Extension, Path, Query, State};
use uuid::Uuid;

use crate::api::dto::CertificateDto;
use crate::app::AppState;
use crate::handlers::protected::PageQuery;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, RequestId};
use crate::types::{Page, PageOptions};

/// The caller's certificates, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Page<CertificateDto>> {
    let (offset, limit) = state.config.progress.page(query.offset, query.limit);
    let opts = PageOptions {
        request_id: request_id.0,
        user_id: user.user_id,
        offset,
        limit,
    };

    let page = state.certificates.list(&opts).await?;
    Ok(ApiResponse::success(page.map(CertificateDto::from)))
}

/// Any authenticated user may view a certificate by id
pub async fn show(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> ApiResult<CertificateDto> {
    let certificate = state.certificates.find_by_id(&request_id.0, id).await?;
    Ok(ApiResponse::success(CertificateDto::from(certificate)))
}
