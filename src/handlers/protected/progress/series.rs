use axum::extract::{Extension, Path, State};

use super::SeriesPath;
use crate::api::dto::{SeriesDto, SeriesProgressDto};
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, RequestId};

/// GET /api/v1/languages/:language/series/:series/progress
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(request_id): Extension<RequestId>,
    Path(path): Path<SeriesPath>,
) -> ApiResult<SeriesProgressDto> {
    let opts = path.options(&user, request_id);
    let progress = state.progress.find_series_progress(&opts).await?;
    Ok(ApiResponse::success(SeriesProgressDto::from(progress)))
}

/// POST /api/v1/languages/:language/series/:series/progress
pub async fn post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(request_id): Extension<RequestId>,
    Path(path): Path<SeriesPath>,
) -> ApiResult<SeriesDto> {
    let opts = path.options(&user, request_id);
    let tracked = state.progress.create_or_update_series_progress(&opts).await?;
    let created = tracked.created;
    Ok(ApiResponse::saved(SeriesDto::from(tracked), created))
}

/// DELETE /api/v1/languages/:language/series/:series/progress
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(request_id): Extension<RequestId>,
    Path(path): Path<SeriesPath>,
) -> ApiResult<()> {
    let opts = path.options(&user, request_id);
    state.progress.delete_series_progress(&opts).await?;
    Ok(ApiResponse::no_content())
}
