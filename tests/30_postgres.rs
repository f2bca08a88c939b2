//! Cascade behaviour against a real Postgres server.
//!
//! Each test creates its own scratch database on the server named by
//! `DATABASE_URL`, applies the migrations, seeds a small catalog and drops
//! the database when done.
//!
//! Run with: DATABASE_URL="postgres://localhost/postgres" cargo test --test 30_postgres -- --ignored --test-threads=1

mod common;

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use kiwi_progress::config::AppConfig;
use kiwi_progress::database::manager::connection_string;
use kiwi_progress::database::models::{Lesson, NewCertificate, Section};
use kiwi_progress::database::{DatabaseError, PgStore, Store};
use kiwi_progress::services::{CertificateService, ProgressError, ProgressService};

use common::*;

struct Scratch {
    name: String,
    admin: PgPool,
    store: PgStore,
    progress: ProgressService,
    certificates: CertificateService,
    section: Section,
    lessons: Vec<Lesson>,
}

impl Scratch {
    async fn new() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = AppConfig::from_env().database;
        config.name = None;
        config.max_connections = config.max_connections.max(4);

        let admin = PgPoolOptions::new()
            .max_connections(1)
            .connect(&connection_string(&config)?)
            .await
            .context("DATABASE_URL must point at a reachable Postgres server")?;

        let name = format!("kiwi_test_{}", Uuid::new_v4().simple());
        sqlx::query(&format!("CREATE DATABASE {}", name))
            .execute(&admin)
            .await?;

        config.name = Some(name.clone());
        let store = PgStore::connect(&config).await?;
        store.migrate().await?;

        let content = PgPoolOptions::new()
            .max_connections(1)
            .connect(&connection_string(&config)?)
            .await?;
        let (section, lessons) = seed(&content).await?;
        content.close().await;

        let shared: Arc<dyn Store> = Arc::new(store.clone());
        Ok(Self {
            name,
            admin,
            progress: ProgressService::new(shared.clone()),
            certificates: CertificateService::new(shared),
            store,
            section,
            lessons,
        })
    }

    async fn finish(self) -> Result<()> {
        self.store.close().await;
        sqlx::query(&format!("DROP DATABASE IF EXISTS {} WITH (FORCE)", self.name))
            .execute(&self.admin)
            .await?;
        self.admin.close().await;
        Ok(())
    }
}

/// `rust-series`: one section with two lessons. `async-series`: one lesson.
async fn seed(pool: &PgPool) -> Result<(Section, Vec<Lesson>)> {
    sqlx::query("INSERT INTO languages (name, slug, series_count) VALUES ('Rust', $1, 2)")
        .bind(LANGUAGE)
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO series (title, slug, language_slug, sections_count, lessons_count,
                            watch_time_seconds, read_time_seconds, is_published)
        VALUES ('Rust Series', $1, $3, 1, 2, 500, 180, true),
               ('Async Rust', $2, $3, 1, 1, 100, 50, true)
        "#,
    )
    .bind(SERIES)
    .bind(ASYNC_SERIES)
    .bind(LANGUAGE)
    .execute(pool)
    .await?;

    let insert_section = r#"
        INSERT INTO sections (title, language_slug, series_slug, position, lessons_count,
                              watch_time_seconds, read_time_seconds, is_published)
        VALUES ($1, $2, $3, 1, $4, $5, $6, true)
        RETURNING *
    "#;
    let section = sqlx::query_as::<_, Section>(insert_section)
        .bind("Basics")
        .bind(LANGUAGE)
        .bind(SERIES)
        .bind(2)
        .bind(500)
        .bind(180)
        .fetch_one(pool)
        .await?;
    let async_section = sqlx::query_as::<_, Section>(insert_section)
        .bind("Futures")
        .bind(LANGUAGE)
        .bind(ASYNC_SERIES)
        .bind(1)
        .bind(100)
        .bind(50)
        .fetch_one(pool)
        .await?;

    let insert_lesson = r#"
        INSERT INTO lessons (title, language_slug, series_slug, section_id, position,
                             watch_time_seconds, read_time_seconds, is_published)
        VALUES ($1, $2, $3, $4, $5, $6, $7, true)
        RETURNING *
    "#;
    let mut lessons = Vec::new();
    for (position, (title, watch, read)) in [("Ownership", 300, 120), ("Borrowing", 200, 60)]
        .into_iter()
        .enumerate()
    {
        let lesson = sqlx::query_as::<_, Lesson>(insert_lesson)
            .bind(title)
            .bind(LANGUAGE)
            .bind(SERIES)
            .bind(section.id)
            .bind(position as i16 + 1)
            .bind(watch)
            .bind(read)
            .fetch_one(pool)
            .await?;
        lessons.push(lesson);
    }
    sqlx::query(insert_lesson)
        .bind("Polling")
        .bind(LANGUAGE)
        .bind(ASYNC_SERIES)
        .bind(async_section.id)
        .bind(1_i16)
        .bind(100)
        .bind(50)
        .execute(pool)
        .await?;

    Ok((section, lessons))
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn pg_reset_of_first_lesson_keeps_the_second_completion() -> Result<()> {
    let db = Scratch::new().await?;

    db.progress.complete_lesson_progress(&lesson_opts(USER, &db.lessons[0])).await?;
    let last = db.progress.complete_lesson_progress(&lesson_opts(USER, &db.lessons[1])).await?;
    let certificate = last.certificate.expect("certificate on the final lesson");
    assert_eq!(certificate.lessons, 2);
    assert_eq!(certificate.watch_time_seconds, 500);

    db.progress.reset_lesson_progress(&lesson_opts(USER, &db.lessons[0])).await?;

    let second = db.progress.find_lesson_progress(&lesson_opts(USER, &db.lessons[1])).await?;
    assert!(second.completed_at.is_some());

    let section = db.progress.find_section_progress(&section_opts(USER, &db.section)).await?;
    assert_eq!(section.completed_lessons, 1);
    assert!(section.completed_at.is_none());

    let series = db.progress.find_series_progress(&series_opts(USER, SERIES)).await?;
    assert_eq!(series.completed_lessons, 1);
    assert_eq!(series.completed_sections, 0);
    assert!(series.completed_at.is_none());

    let language = db.progress.find_language_progress(&language_opts(USER)).await?;
    assert_eq!(language.completed_series, 0);
    assert_eq!(db.certificates.list(&page_opts(USER, 0, 10)).await?.total, 0);

    db.finish().await
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn pg_upserts_report_creation_and_move_the_current_series() -> Result<()> {
    let db = Scratch::new().await?;

    let first = db.progress.create_or_update_lesson_progress(&lesson_opts(USER, &db.lessons[0])).await?;
    assert!(first.created);
    let again = db.progress.create_or_update_lesson_progress(&lesson_opts(USER, &db.lessons[0])).await?;
    assert!(!again.created);
    assert_eq!(first.progress.id, again.progress.id);

    let switched = db.progress.create_or_update_series_progress(&series_opts(USER, ASYNC_SERIES)).await?;
    assert!(switched.created);
    assert!(switched.progress.is_current);

    let previous = db.progress.find_series_progress(&series_opts(USER, SERIES)).await?;
    assert!(!previous.is_current);

    db.finish().await
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn pg_duplicate_completion_of_last_lesson_issues_one_certificate() -> Result<()> {
    let db = Scratch::new().await?;

    db.progress.complete_lesson_progress(&lesson_opts(USER, &db.lessons[0])).await?;

    let tab_a = lesson_opts(USER, &db.lessons[1]);
    let tab_b = lesson_opts(USER, &db.lessons[1]);
    let (a, b) = tokio::join!(
        db.progress.complete_lesson_progress(&tab_a),
        db.progress.complete_lesson_progress(&tab_b),
    );
    let (a, b) = (a?, b?);
    let issued = [a.certificate.is_some(), b.certificate.is_some()];
    assert_eq!(issued.iter().filter(|issued| **issued).count(), 1);

    let series = db.progress.find_series_progress(&series_opts(USER, SERIES)).await?;
    assert_eq!(series.completed_lessons, 2);
    assert!(series.completed_at.is_some());

    let language = db.progress.find_language_progress(&language_opts(USER)).await?;
    assert_eq!(language.completed_series, 1);
    assert_eq!(db.certificates.list(&page_opts(USER, 0, 10)).await?.total, 1);

    db.finish().await
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn pg_concurrent_completions_in_one_section_both_count() -> Result<()> {
    let db = Scratch::new().await?;

    for lesson in &db.lessons {
        db.progress.create_or_update_lesson_progress(&lesson_opts(USER, lesson)).await?;
    }

    let first = lesson_opts(USER, &db.lessons[0]);
    let second = lesson_opts(USER, &db.lessons[1]);
    let (a, b) = tokio::join!(
        db.progress.complete_lesson_progress(&first),
        db.progress.complete_lesson_progress(&second),
    );
    let (a, b) = (a?, b?);
    assert_eq!(
        [a.certificate.is_some(), b.certificate.is_some()]
            .iter()
            .filter(|issued| **issued)
            .count(),
        1
    );

    let section = db.progress.find_section_progress(&section_opts(USER, &db.section)).await?;
    assert_eq!(section.completed_lessons, 2);
    assert!(section.completed_at.is_some());

    let series = db.progress.find_series_progress(&series_opts(USER, SERIES)).await?;
    assert_eq!(series.completed_lessons, 2);
    assert_eq!(series.completed_sections, 1);

    let language = db.progress.find_language_progress(&language_opts(USER)).await?;
    assert_eq!(language.completed_series, 1);

    db.finish().await
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn pg_concurrent_series_switches_leave_one_current_series() -> Result<()> {
    let db = Scratch::new().await?;

    let rust = series_opts(USER, SERIES);
    let async_rust = series_opts(USER, ASYNC_SERIES);
    let (a, b) = tokio::join!(
        db.progress.create_or_update_series_progress(&rust),
        db.progress.create_or_update_series_progress(&async_rust),
    );
    for result in [&a, &b] {
        assert!(matches!(result, Ok(_) | Err(ProgressError::Conflict(_))));
    }

    let mut current = 0;
    for opts in [&rust, &async_rust] {
        if let Ok(progress) = db.progress.find_series_progress(opts).await {
            current += progress.is_current as usize;
        }
    }
    assert_eq!(current, 1);

    db.finish().await
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn pg_store_constraints_are_classified() -> Result<()> {
    let db = Scratch::new().await?;

    let mut uow = db.store.connect().await?;
    let new = |id| NewCertificate {
        id,
        user_id: USER,
        language_slug: LANGUAGE.to_string(),
        series_slug: SERIES.to_string(),
        series_title: "Rust Series".to_string(),
        lessons: 2,
        watch_time_seconds: 500,
        read_time_seconds: 180,
    };
    let first = uow.insert_certificate(&new(Uuid::new_v4())).await?;
    let second = uow.insert_certificate(&new(Uuid::new_v4())).await?;
    assert_eq!(first.id, second.id);

    let language = uow.upsert_language_progress(USER, LANGUAGE).await?.row;
    let err = uow
        .adjust_language_completed_series(language.id, -1)
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::CheckViolation(_)));
    drop(uow);

    db.finish().await
}
