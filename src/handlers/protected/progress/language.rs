use axum::extract::{Extension, Path, Query, State};

use super::LanguagePath;
use crate::api::dto::{LanguageDto, LanguageProgressDto};
use crate::app::AppState;
use crate::handlers::protected::PageQuery;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, RequestId};
use crate::types::{Page, PageOptions};

/// GET /api/v1/languages/progress - languages the caller has started
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Page<LanguageDto>> {
    let (offset, limit) = state.config.progress.page(query.offset, query.limit);
    let opts = PageOptions {
        request_id: request_id.0,
        user_id: user.user_id,
        offset,
        limit,
    };

    let page = state.progress.list_viewed_languages(&opts).await?;
    Ok(ApiResponse::success(page.map(LanguageDto::from)))
}

/// GET /api/v1/languages/:language/progress
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(request_id): Extension<RequestId>,
    Path(path): Path<LanguagePath>,
) -> ApiResult<LanguageProgressDto> {
    let opts = path.options(&user, request_id);
    let progress = state.progress.find_language_progress(&opts).await?;
    Ok(ApiResponse::success(LanguageProgressDto::from(progress)))
}

/// POST /api/v1/languages/:language/progress
pub async fn post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(request_id): Extension<RequestId>,
    Path(path): Path<LanguagePath>,
) -> ApiResult<LanguageDto> {
    let opts = path.options(&user, request_id);
    let tracked = state.progress.create_or_update_language_progress(&opts).await?;
    let created = tracked.created;
    Ok(ApiResponse::saved(LanguageDto::from(tracked), created))
}

/// DELETE /api/v1/languages/:language/progress - full language reset
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(request_id): Extension<RequestId>,
    Path(path): Path<LanguagePath>,
) -> ApiResult<()> {
    let opts = path.options(&user, request_id);
    state.progress.delete_language_progress(&opts).await?;
    Ok(ApiResponse::no_content())
}
