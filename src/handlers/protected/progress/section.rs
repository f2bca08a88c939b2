use axum::extract::{Extension, Path, State};

use super::SectionPath;
use crate::api::dto::{SectionDto, SectionProgressDto};
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, RequestId};

/// GET /api/v1/languages/:language/series/:series/sections/:section/progress
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(request_id): Extension<RequestId>,
    Path(path): Path<SectionPath>,
) -> ApiResult<SectionProgressDto> {
    let opts = path.options(&user, request_id);
    let progress = state.progress.find_section_progress(&opts).await?;
    Ok(ApiResponse::success(SectionProgressDto::from(progress)))
}

/// POST /api/v1/languages/:language/series/:series/sections/:section/progress
pub async fn post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(request_id): Extension<RequestId>,
    Path(path): Path<SectionPath>,
) -> ApiResult<SectionDto> {
    let opts = path.options(&user, request_id);
    let tracked = state.progress.create_or_update_section_progress(&opts).await?;
    let created = tracked.created;
    Ok(ApiResponse::saved(SectionDto::from(tracked), created))
}

/// DELETE /api/v1/languages/:language/series/:series/sections/:section/progress
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(request_id): Extension<RequestId>,
    Path(path): Path<SectionPath>,
) -> ApiResult<()> {
    let opts = path.options(&user, request_id);
    state.progress.delete_section_progress(&opts).await?;
    Ok(ApiResponse::no_content())
}
