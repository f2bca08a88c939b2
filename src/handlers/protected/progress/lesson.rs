use axum::extract::{Extension, Path, State};

use super::LessonPath;
use crate::api::dto::{LessonDto, LessonProgressDto};
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, RequestId};

/// GET .../sections/:section/lessons/:lesson/progress
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(request_id): Extension<RequestId>,
    Path(path): Path<LessonPath>,
) -> ApiResult<LessonProgressDto> {
    let opts = path.options(&user, request_id);
    let progress = state.progress.find_lesson_progress(&opts).await?;
    Ok(ApiResponse::success(LessonProgressDto::from(progress)))
}

/// POST .../sections/:section/lessons/:lesson/progress
pub async fn post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(request_id): Extension<RequestId>,
    Path(path): Path<LessonPath>,
) -> ApiResult<LessonDto> {
    let opts = path.options(&user, request_id);
    let tracked = state.progress.create_or_update_lesson_progress(&opts).await?;
    let created = tracked.created;
    Ok(ApiResponse::saved(LessonDto::from(tracked), created))
}

/// PATCH .../sections/:section/lessons/:lesson/progress/complete
///
/// Staff accounts review content but do not earn certificates.
pub async fn complete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(request_id): Extension<RequestId>,
    Path(path): Path<LessonPath>,
) -> ApiResult<LessonDto> {
    if user.is_staff {
        tracing::warn!(user_id = user.user_id, "Staff account tried to complete a lesson");
        return Err(ApiError::forbidden("Staff accounts cannot complete lessons"));
    }

    let opts = path.options(&user, request_id);
    let completed = state.progress.complete_lesson_progress(&opts).await?;
    Ok(ApiResponse::success(LessonDto::from(completed)))
}

/// DELETE .../sections/:section/lessons/:lesson/progress
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(request_id): Extension<RequestId>,
    Path(path): Path<LessonPath>,
) -> ApiResult<()> {
    let opts = path.options(&user, request_id);
    state.progress.reset_lesson_progress(&opts).await?;
    Ok(ApiResponse::no_content())
}
