#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use kiwi_progress::app::{router, AppState};
use kiwi_progress::auth::{generate_jwt, Claims};
use kiwi_progress::config::AppConfig;
use kiwi_progress::database::models::{Lesson, Section};
use kiwi_progress::database::MemoryStore;
use kiwi_progress::services::{CertificateService, ProgressService};
use kiwi_progress::types::{
    LanguageProgressOptions, LessonProgressOptions, PageOptions, SectionProgressOptions,
    SeriesProgressOptions,
};

pub const LANGUAGE: &str = "rust";
pub const SERIES: &str = "rust-series";
pub const ASYNC_SERIES: &str = "async-series";
pub const DRAFT_SERIES: &str = "draft-series";

pub const USER: i32 = 7;
pub const OTHER_USER: i32 = 8;
pub const STAFF: i32 = 99;

/// Seeded content:
///
/// - `rust-series`: one section with two published lessons and one draft lesson
/// - `async-series`: two sections with one lesson each
/// - `draft-series`: unpublished, with a published section and lesson
pub struct Fixture {
    pub store: MemoryStore,
    pub progress: ProgressService,
    pub certificates: CertificateService,
    pub section: Section,
    pub lessons: Vec<Lesson>,
    pub hidden_lesson: Lesson,
    pub async_sections: Vec<Section>,
    pub async_lessons: Vec<Lesson>,
    pub draft_section: Section,
    pub draft_lesson: Lesson,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = MemoryStore::new();
        store.add_language("Rust", LANGUAGE).await;

        store.add_series(LANGUAGE, "Rust Series", SERIES, true).await;
        let section = store.add_section(LANGUAGE, SERIES, "Basics", true).await;
        let lessons = vec![
            store.add_lesson(&section, "Ownership", 300, 120, true).await,
            store.add_lesson(&section, "Borrowing", 200, 60, true).await,
        ];
        let hidden_lesson = store.add_lesson(&section, "Lifetimes", 400, 90, false).await;

        store.add_series(LANGUAGE, "Async Rust", ASYNC_SERIES, true).await;
        let async_sections = vec![
            store.add_section(LANGUAGE, ASYNC_SERIES, "Futures", true).await,
            store.add_section(LANGUAGE, ASYNC_SERIES, "Runtimes", true).await,
        ];
        let async_lessons = vec![
            store.add_lesson(&async_sections[0], "Polling", 100, 50, true).await,
            store.add_lesson(&async_sections[1], "Tokio", 200, 25, true).await,
        ];

        store.add_series(LANGUAGE, "Draft", DRAFT_SERIES, false).await;
        let draft_section = store.add_section(LANGUAGE, DRAFT_SERIES, "Soon", true).await;
        let draft_lesson = store.add_lesson(&draft_section, "Coming soon", 60, 60, true).await;

        let shared = Arc::new(store.clone());
        Self {
            progress: ProgressService::new(shared.clone()),
            certificates: CertificateService::new(shared),
            store,
            section,
            lessons,
            hidden_lesson,
            async_sections,
            async_lessons,
            draft_section,
            draft_lesson,
        }
    }

    pub fn app(&self) -> Router {
        let state = AppState::new(Arc::new(self.store.clone()), AppConfig::development());
        router(state)
    }
}

pub fn request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn language_opts(user_id: i32) -> LanguageProgressOptions {
    LanguageProgressOptions {
        request_id: request_id(),
        user_id,
        language_slug: LANGUAGE.to_string(),
    }
}

pub fn series_opts(user_id: i32, series_slug: &str) -> SeriesProgressOptions {
    SeriesProgressOptions {
        request_id: request_id(),
        user_id,
        is_staff: false,
        language_slug: LANGUAGE.to_string(),
        series_slug: series_slug.to_string(),
    }
}

pub fn section_opts(user_id: i32, section: &Section) -> SectionProgressOptions {
    SectionProgressOptions {
        request_id: request_id(),
        user_id,
        is_staff: false,
        language_slug: section.language_slug.clone(),
        series_slug: section.series_slug.clone(),
        section_id: section.id,
    }
}

pub fn lesson_opts(user_id: i32, lesson: &Lesson) -> LessonProgressOptions {
    LessonProgressOptions {
        request_id: request_id(),
        user_id,
        is_staff: false,
        language_slug: lesson.language_slug.clone(),
        series_slug: lesson.series_slug.clone(),
        section_id: lesson.section_id,
        lesson_id: lesson.id,
    }
}

pub fn page_opts(user_id: i32, offset: i64, limit: i64) -> PageOptions {
    PageOptions {
        request_id: request_id(),
        user_id,
        offset,
        limit,
    }
}

/// Bearer token signed with the development secret
pub fn token(user_id: i32, is_staff: bool) -> String {
    let secret = AppConfig::development().security.jwt_secret;
    generate_jwt(&Claims::new(user_id, is_staff, 1), &secret).expect("token")
}

pub fn lesson_path(lesson: &Lesson) -> String {
    format!(
        "/api/v1/languages/{}/series/{}/sections/{}/lessons/{}/progress",
        lesson.language_slug, lesson.series_slug, lesson.section_id, lesson.id
    )
}

pub fn section_path(section: &Section) -> String {
    format!(
        "/api/v1/languages/{}/series/{}/sections/{}/progress",
        section.language_slug, section.series_slug, section.id
    )
}

/// Send one request through the router and decode the JSON body, if any.
pub async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = builder.body(Body::empty()).expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}
