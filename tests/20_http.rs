mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use tower::ServiceExt;

use common::*;

#[tokio::test]
async fn health_and_root_are_public() {
    let fx = Fixture::new().await;
    let app = fx.app();

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");

    let (status, body) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn progress_requires_a_valid_token() {
    let fx = Fixture::new().await;
    let app = fx.app();
    let uri = lesson_path(&fx.lessons[0]);

    let (status, body) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let forged = kiwi_progress::auth::generate_jwt(
        &kiwi_progress::auth::Claims::new(USER, false, 1),
        "some-other-secret",
    )
    .expect("token");
    let (status, _) = send(&app, Method::POST, &uri, Some(&forged)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn creating_progress_answers_created_then_ok() {
    let fx = Fixture::new().await;
    let app = fx.app();
    let token = token(USER, false);
    let uri = lesson_path(&fx.lessons[0]);

    let (status, body) = send(&app, Method::POST, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["id"], fx.lessons[0].id);
    assert!(body["data"]["progress"]["completedAt"].is_null());
    assert!(body["data"].get("certificate").is_none());

    let (status, again) = send(&app, Method::POST, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["data"]["progress"]["id"], body["data"]["progress"]["id"]);

    let (status, section) = send(&app, Method::GET, &section_path(&fx.section), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(section["data"]["completedLessons"], 0);
}

#[tokio::test]
async fn completing_the_last_lesson_returns_the_certificate() {
    let fx = Fixture::new().await;
    let app = fx.app();
    let other = token(OTHER_USER, false);
    let token = token(USER, false);

    let first = format!("{}/complete", lesson_path(&fx.lessons[0]));
    let (status, body) = send(&app, Method::PATCH, &first, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["progress"]["completedAt"].is_string());
    assert!(body["data"].get("certificate").is_none());

    let last = format!("{}/complete", lesson_path(&fx.lessons[1]));
    let (status, body) = send(&app, Method::PATCH, &last, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let certificate = &body["data"]["certificate"];
    assert_eq!(certificate["seriesTitle"], "Rust Series");
    assert_eq!(certificate["lessons"], 2);
    assert_eq!(certificate["userId"], USER);

    let (status, list) = send(&app, Method::GET, "/api/v1/certificates", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["data"]["total"], 1);
    assert_eq!(list["data"]["items"][0]["id"], certificate["id"]);

    // Certificates can be shared with other users
    let id = certificate["id"].as_str().expect("certificate id");
    let (status, shown) = send(&app, Method::GET, &format!("/api/v1/certificates/{}", id), Some(&other)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shown["data"]["seriesSlug"], SERIES);

    let (status, languages) = send(&app, Method::GET, "/api/v1/languages/progress", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(languages["data"]["total"], 1);
    assert_eq!(languages["data"]["items"][0]["slug"], LANGUAGE);
    assert_eq!(languages["data"]["items"][0]["seriesCount"], 2);
    assert_eq!(languages["data"]["items"][0]["progress"]["completedSeries"], 1);
}

#[tokio::test]
async fn staff_cannot_complete_lessons() {
    let fx = Fixture::new().await;
    let app = fx.app();
    let staff = token(STAFF, true);

    let uri = format!("{}/complete", lesson_path(&fx.lessons[0]));
    let (status, body) = send(&app, Method::PATCH, &uri, Some(&staff)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
    assert_eq!(fx.store.row_counts(STAFF).await.lessons, 0);
}

#[tokio::test]
async fn reset_answers_no_content_and_removes_the_row() {
    let fx = Fixture::new().await;
    let app = fx.app();
    let token = token(USER, false);
    let uri = lesson_path(&fx.lessons[0]);

    send(&app, Method::PATCH, &format!("{}/complete", uri), Some(&token)).await;

    let (status, body) = send(&app, Method::DELETE, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, body) = send(&app, Method::GET, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = send(&app, Method::GET, &section_path(&fx.section), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completedLessons"], 0);
}

#[tokio::test]
async fn unpublished_ancestor_is_unprocessable() {
    let fx = Fixture::new().await;
    let app = fx.app();
    let token = token(USER, false);

    let uri = format!("{}/complete", lesson_path(&fx.draft_lesson));
    let (status, body) = send(&app, Method::PATCH, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "UNPROCESSABLE_ENTITY");

    let uri = format!("/api/v1/languages/{}/series/{}/progress", LANGUAGE, DRAFT_SERIES);
    let (status, _) = send(&app, Method::POST, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_section_id_is_rejected() {
    let fx = Fixture::new().await;
    let app = fx.app();
    let token = token(USER, false);

    let uri = format!("/api/v1/languages/{}/series/{}/sections/abc/progress", LANGUAGE, SERIES);
    let (status, _) = send(&app, Method::POST, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn language_reset_clears_everything() {
    let fx = Fixture::new().await;
    let app = fx.app();
    let token = token(USER, false);

    send(&app, Method::PATCH, &format!("{}/complete", lesson_path(&fx.lessons[0])), Some(&token)).await;
    send(&app, Method::PATCH, &format!("{}/complete", lesson_path(&fx.lessons[1])), Some(&token)).await;

    let uri = format!("/api/v1/languages/{}/progress", LANGUAGE);
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = send(&app, Method::GET, "/api/v1/certificates", Some(&token)).await;
    assert_eq!(list["data"]["total"], 0);
}

#[tokio::test]
async fn request_id_is_echoed() {
    let fx = Fixture::new().await;
    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .expect("request");

    let response = fx.app().oneshot(request).await.expect("response");
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-123")
    );
}
