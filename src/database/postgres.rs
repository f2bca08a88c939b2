use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{ConnectOptions, FromRow, PgConnection, PgPool, Postgres, Row, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::database::manager::{connection_string, DatabaseError};
use crate::database::models::{
    Adjusted, Certificate, Language, LanguageProgress, Lesson, LessonProgress, NewCertificate,
    NewLessonProgress, NewSectionProgress, NewSeriesProgress, Section, SectionProgress, Series,
    SeriesDelta, SeriesProgress, Upserted,
};
use crate::database::store::{
    CertificateRepository, ContentReader, ProgressRepository, Store, UnitOfWork,
};

/// Postgres-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let connection_string = connection_string(config)?;
        let mut options = PgConnectOptions::from_str(&connection_string)
            .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if !config.enable_query_logging {
            options = options.disable_statement_logging();
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect_with(options)
            .await?;

        info!(max_connections = config.max_connections, "Created database pool");
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED, READ WRITE")
            .execute(&mut *tx)
            .await?;
        sqlx::query("SET CONSTRAINTS ALL DEFERRED")
            .execute(&mut *tx)
            .await?;
        debug!("Transaction started");
        Ok(Box::new(PgUnitOfWork {
            executor: Executor::Transaction(tx),
        }))
    }

    async fn connect(&self) -> Result<Box<dyn UnitOfWork>, DatabaseError> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(PgUnitOfWork {
            executor: Executor::Connection(conn),
        }))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

enum Executor {
    Transaction(Transaction<'static, Postgres>),
    Connection(PoolConnection<Postgres>),
}

pub struct PgUnitOfWork {
    executor: Executor,
}

impl PgUnitOfWork {
    fn conn(&mut self) -> &mut PgConnection {
        match &mut self.executor {
            Executor::Transaction(tx) => &mut **tx,
            Executor::Connection(conn) => &mut **conn,
        }
    }
}

fn upserted<T>(row: PgRow) -> Result<Upserted<T>, DatabaseError>
where
    T: for<'r> FromRow<'r, PgRow>,
{
    Ok(Upserted {
        created: row.try_get("created")?,
        row: T::from_row(&row)?,
    })
}

fn adjusted<T>(row: PgRow) -> Result<Adjusted<T>, DatabaseError>
where
    T: for<'r> FromRow<'r, PgRow>,
{
    Ok(Adjusted {
        was_completed: row.try_get("was_completed")?,
        row: T::from_row(&row)?,
    })
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        if let Executor::Transaction(tx) = self.executor {
            tx.commit().await?;
            debug!("Transaction committed");
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        if let Executor::Transaction(tx) = self.executor {
            tx.rollback().await?;
            debug!("Transaction rolled back");
        }
        Ok(())
    }
}

#[async_trait]
impl ContentReader for PgUnitOfWork {
    async fn get_language(&mut self, slug: &str) -> Result<Option<Language>, DatabaseError> {
        let language = sqlx::query_as::<_, Language>("SELECT * FROM languages WHERE slug = $1 LIMIT 1")
            .bind(slug)
            .fetch_optional(self.conn())
            .await?;
        Ok(language)
    }

    async fn get_series(
        &mut self,
        language_slug: &str,
        series_slug: &str,
    ) -> Result<Option<Series>, DatabaseError> {
        let series = sqlx::query_as::<_, Series>(
            "SELECT * FROM series WHERE language_slug = $1 AND slug = $2 LIMIT 1",
        )
        .bind(language_slug)
        .bind(series_slug)
        .fetch_optional(self.conn())
        .await?;
        Ok(series)
    }

    async fn get_section(
        &mut self,
        language_slug: &str,
        series_slug: &str,
        section_id: i32,
    ) -> Result<Option<Section>, DatabaseError> {
        let section = sqlx::query_as::<_, Section>(
            r#"
            SELECT * FROM sections
            WHERE language_slug = $1 AND series_slug = $2 AND id = $3
            LIMIT 1
            "#,
        )
        .bind(language_slug)
        .bind(series_slug)
        .bind(section_id)
        .fetch_optional(self.conn())
        .await?;
        Ok(section)
    }

    async fn get_lesson(
        &mut self,
        language_slug: &str,
        series_slug: &str,
        section_id: i32,
        lesson_id: i32,
    ) -> Result<Option<Lesson>, DatabaseError> {
        let lesson = sqlx::query_as::<_, Lesson>(
            r#"
            SELECT * FROM lessons
            WHERE language_slug = $1 AND series_slug = $2 AND section_id = $3 AND id = $4
            LIMIT 1
            "#,
        )
        .bind(language_slug)
        .bind(series_slug)
        .bind(section_id)
        .bind(lesson_id)
        .fetch_optional(self.conn())
        .await?;
        Ok(lesson)
    }
}

#[async_trait]
impl ProgressRepository for PgUnitOfWork {
    async fn find_language_progress(
        &mut self,
        user_id: i32,
        language_slug: &str,
    ) -> Result<Option<LanguageProgress>, DatabaseError> {
        let progress = sqlx::query_as::<_, LanguageProgress>(
            "SELECT * FROM language_progress WHERE user_id = $1 AND language_slug = $2 LIMIT 1",
        )
        .bind(user_id)
        .bind(language_slug)
        .fetch_optional(self.conn())
        .await?;
        Ok(progress)
    }

    async fn upsert_language_progress(
        &mut self,
        user_id: i32,
        language_slug: &str,
    ) -> Result<Upserted<LanguageProgress>, DatabaseError> {
        // xmax = 0 only holds for a freshly inserted tuple
        let row = sqlx::query(
            r#"
            INSERT INTO language_progress (user_id, language_slug)
            VALUES ($1, $2)
            ON CONFLICT (user_id, language_slug)
            DO UPDATE SET viewed_at = now(), updated_at = now()
            RETURNING *, (xmax = 0) AS created
            "#,
        )
        .bind(user_id)
        .bind(language_slug)
        .fetch_one(self.conn())
        .await?;
        upserted(row)
    }

    async fn adjust_language_completed_series(
        &mut self,
        id: i32,
        delta: i32,
    ) -> Result<LanguageProgress, DatabaseError> {
        let progress = sqlx::query_as::<_, LanguageProgress>(
            r#"
            UPDATE language_progress
            SET completed_series = completed_series + $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_one(self.conn())
        .await?;
        Ok(progress)
    }

    async fn delete_language_progress(
        &mut self,
        id: i32,
    ) -> Result<Option<LanguageProgress>, DatabaseError> {
        let progress = sqlx::query_as::<_, LanguageProgress>(
            "DELETE FROM language_progress WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(self.conn())
        .await?;
        Ok(progress)
    }

    async fn count_language_progress(&mut self, user_id: i32) -> Result<i64, DatabaseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM language_progress WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.conn())
            .await?;
        Ok(count.0)
    }

    async fn list_language_progress(
        &mut self,
        user_id: i32,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<LanguageProgress>, DatabaseError> {
        let progress = sqlx::query_as::<_, LanguageProgress>(
            r#"
            SELECT * FROM language_progress
            WHERE user_id = $1
            ORDER BY viewed_at DESC, id DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(self.conn())
        .await?;
        Ok(progress)
    }

    async fn find_series_progress(
        &mut self,
        user_id: i32,
        language_slug: &str,
        series_slug: &str,
    ) -> Result<Option<SeriesProgress>, DatabaseError> {
        let progress = sqlx::query_as::<_, SeriesProgress>(
            r#"
            SELECT * FROM series_progress
            WHERE user_id = $1 AND language_slug = $2 AND series_slug = $3
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(language_slug)
        .bind(series_slug)
        .fetch_optional(self.conn())
        .await?;
        Ok(progress)
    }

    async fn upsert_series_progress(
        &mut self,
        new: &NewSeriesProgress,
    ) -> Result<Upserted<SeriesProgress>, DatabaseError> {
        let row = sqlx::query(
            r#"
            INSERT INTO series_progress (user_id, language_slug, series_slug, language_progress_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, series_slug)
            DO UPDATE SET
                viewed_at = now(),
                updated_at = now(),
                language_progress_id = EXCLUDED.language_progress_id
            RETURNING *, (xmax = 0) AS created
            "#,
        )
        .bind(new.user_id)
        .bind(&new.language_slug)
        .bind(&new.series_slug)
        .bind(new.language_progress_id)
        .fetch_one(self.conn())
        .await?;
        upserted(row)
    }

    async fn set_current_series(
        &mut self,
        user_id: i32,
        language_slug: &str,
        series_slug: &str,
    ) -> Result<SeriesProgress, DatabaseError> {
        // Clear first: the partial unique index is checked row by row
        sqlx::query(
            r#"
            UPDATE series_progress
            SET is_current = false, updated_at = now()
            WHERE user_id = $1 AND language_slug = $2 AND series_slug <> $3 AND is_current
            "#,
        )
        .bind(user_id)
        .bind(language_slug)
        .bind(series_slug)
        .execute(self.conn())
        .await?;

        let progress = sqlx::query_as::<_, SeriesProgress>(
            r#"
            UPDATE series_progress
            SET is_current = true, updated_at = now()
            WHERE user_id = $1 AND language_slug = $2 AND series_slug = $3
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(language_slug)
        .bind(series_slug)
        .fetch_one(self.conn())
        .await?;
        Ok(progress)
    }

    async fn adjust_series_progress(
        &mut self,
        id: i32,
        delta: SeriesDelta,
        total_lessons: i32,
    ) -> Result<Adjusted<SeriesProgress>, DatabaseError> {
        let row = sqlx::query(
            r#"
            WITH previous AS (
                SELECT id, completed_at FROM series_progress WHERE id = $1 FOR UPDATE
            )
            UPDATE series_progress AS sp
            SET completed_lessons = sp.completed_lessons + $2,
                completed_sections = sp.completed_sections + $3,
                completed_at = CASE
                    WHEN $4 > 0 AND sp.completed_lessons + $2 >= $4 THEN COALESCE(sp.completed_at, now())
                    ELSE NULL
                END,
                updated_at = now()
            FROM previous
            WHERE sp.id = previous.id
            RETURNING sp.*, (previous.completed_at IS NOT NULL) AS was_completed
            "#,
        )
        .bind(id)
        .bind(delta.lessons)
        .bind(delta.sections)
        .bind(total_lessons)
        .fetch_one(self.conn())
        .await?;
        adjusted(row)
    }

    async fn delete_series_progress(
        &mut self,
        id: i32,
    ) -> Result<Option<SeriesProgress>, DatabaseError> {
        let progress = sqlx::query_as::<_, SeriesProgress>(
            "DELETE FROM series_progress WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(self.conn())
        .await?;
        Ok(progress)
    }

    async fn find_section_progress(
        &mut self,
        user_id: i32,
        language_slug: &str,
        series_slug: &str,
        section_id: i32,
    ) -> Result<Option<SectionProgress>, DatabaseError> {
        let progress = sqlx::query_as::<_, SectionProgress>(
            r#"
            SELECT * FROM section_progress
            WHERE user_id = $1 AND language_slug = $2 AND series_slug = $3 AND section_id = $4
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(language_slug)
        .bind(series_slug)
        .bind(section_id)
        .fetch_optional(self.conn())
        .await?;
        Ok(progress)
    }

    async fn upsert_section_progress(
        &mut self,
        new: &NewSectionProgress,
    ) -> Result<Upserted<SectionProgress>, DatabaseError> {
        let row = sqlx::query(
            r#"
            INSERT INTO section_progress (
                user_id, language_slug, series_slug, section_id,
                language_progress_id, series_progress_id
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, section_id)
            DO UPDATE SET
                viewed_at = now(),
                updated_at = now(),
                language_progress_id = EXCLUDED.language_progress_id,
                series_progress_id = EXCLUDED.series_progress_id
            RETURNING *, (xmax = 0) AS created
            "#,
        )
        .bind(new.user_id)
        .bind(&new.language_slug)
        .bind(&new.series_slug)
        .bind(new.section_id)
        .bind(new.language_progress_id)
        .bind(new.series_progress_id)
        .fetch_one(self.conn())
        .await?;
        upserted(row)
    }

    async fn adjust_section_progress(
        &mut self,
        id: i32,
        lessons_delta: i32,
        total_lessons: i32,
    ) -> Result<Adjusted<SectionProgress>, DatabaseError> {
        let row = sqlx::query(
            r#"
            WITH previous AS (
                SELECT id, completed_at FROM section_progress WHERE id = $1 FOR UPDATE
            )
            UPDATE section_progress AS sp
            SET completed_lessons = sp.completed_lessons + $2,
                completed_at = CASE
                    WHEN $3 > 0 AND sp.completed_lessons + $2 >= $3 THEN COALESCE(sp.completed_at, now())
                    ELSE NULL
                END,
                updated_at = now()
            FROM previous
            WHERE sp.id = previous.id
            RETURNING sp.*, (previous.completed_at IS NOT NULL) AS was_completed
            "#,
        )
        .bind(id)
        .bind(lessons_delta)
        .bind(total_lessons)
        .fetch_one(self.conn())
        .await?;
        adjusted(row)
    }

    async fn delete_section_progress(
        &mut self,
        id: i32,
    ) -> Result<Option<SectionProgress>, DatabaseError> {
        let progress = sqlx::query_as::<_, SectionProgress>(
            "DELETE FROM section_progress WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(self.conn())
        .await?;
        Ok(progress)
    }

    async fn find_lesson_progress(
        &mut self,
        user_id: i32,
        language_slug: &str,
        series_slug: &str,
        section_id: i32,
        lesson_id: i32,
    ) -> Result<Option<LessonProgress>, DatabaseError> {
        let progress = sqlx::query_as::<_, LessonProgress>(
            r#"
            SELECT * FROM lesson_progress
            WHERE user_id = $1
              AND language_slug = $2
              AND series_slug = $3
              AND section_id = $4
              AND lesson_id = $5
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(language_slug)
        .bind(series_slug)
        .bind(section_id)
        .bind(lesson_id)
        .fetch_optional(self.conn())
        .await?;
        Ok(progress)
    }

    async fn upsert_lesson_progress(
        &mut self,
        new: &NewLessonProgress,
    ) -> Result<Upserted<LessonProgress>, DatabaseError> {
        let row = sqlx::query(
            r#"
            INSERT INTO lesson_progress (
                user_id, language_slug, series_slug, section_id, lesson_id,
                language_progress_id, series_progress_id, section_progress_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, lesson_id)
            DO UPDATE SET
                viewed_at = now(),
                updated_at = now(),
                language_progress_id = EXCLUDED.language_progress_id,
                series_progress_id = EXCLUDED.series_progress_id,
                section_progress_id = EXCLUDED.section_progress_id
            RETURNING *, (xmax = 0) AS created
            "#,
        )
        .bind(new.user_id)
        .bind(&new.language_slug)
        .bind(&new.series_slug)
        .bind(new.section_id)
        .bind(new.lesson_id)
        .bind(new.language_progress_id)
        .bind(new.series_progress_id)
        .bind(new.section_progress_id)
        .fetch_one(self.conn())
        .await?;
        upserted(row)
    }

    async fn complete_lesson_progress(
        &mut self,
        id: i32,
    ) -> Result<Option<LessonProgress>, DatabaseError> {
        let progress = sqlx::query_as::<_, LessonProgress>(
            r#"
            UPDATE lesson_progress
            SET completed_at = now(), updated_at = now()
            WHERE id = $1 AND completed_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(self.conn())
        .await?;
        Ok(progress)
    }

    async fn delete_lesson_progress(
        &mut self,
        id: i32,
    ) -> Result<Option<LessonProgress>, DatabaseError> {
        let progress = sqlx::query_as::<_, LessonProgress>(
            "DELETE FROM lesson_progress WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(self.conn())
        .await?;
        Ok(progress)
    }
}

#[async_trait]
impl CertificateRepository for PgUnitOfWork {
    async fn find_certificate(
        &mut self,
        user_id: i32,
        series_slug: &str,
    ) -> Result<Option<Certificate>, DatabaseError> {
        let certificate = sqlx::query_as::<_, Certificate>(
            "SELECT * FROM certificates WHERE user_id = $1 AND series_slug = $2 LIMIT 1",
        )
        .bind(user_id)
        .bind(series_slug)
        .fetch_optional(self.conn())
        .await?;
        Ok(certificate)
    }

    async fn find_certificate_by_id(
        &mut self,
        id: Uuid,
    ) -> Result<Option<Certificate>, DatabaseError> {
        let certificate = sqlx::query_as::<_, Certificate>("SELECT * FROM certificates WHERE id = $1")
            .bind(id)
            .fetch_optional(self.conn())
            .await?;
        Ok(certificate)
    }

    async fn insert_certificate(
        &mut self,
        new: &NewCertificate,
    ) -> Result<Certificate, DatabaseError> {
        let inserted = sqlx::query_as::<_, Certificate>(
            r#"
            INSERT INTO certificates (
                id, user_id, language_slug, series_slug, series_title,
                lessons, watch_time_seconds, read_time_seconds
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, series_slug) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(new.id)
        .bind(new.user_id)
        .bind(&new.language_slug)
        .bind(&new.series_slug)
        .bind(&new.series_title)
        .bind(new.lessons)
        .bind(new.watch_time_seconds)
        .bind(new.read_time_seconds)
        .fetch_optional(self.conn())
        .await?;

        match inserted {
            Some(certificate) => Ok(certificate),
            None => self
                .find_certificate(new.user_id, &new.series_slug)
                .await?
                .ok_or_else(|| DatabaseError::Conflict("certificate insert raced with a delete".to_string())),
        }
    }

    async fn delete_certificate(
        &mut self,
        user_id: i32,
        series_slug: &str,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM certificates WHERE user_id = $1 AND series_slug = $2")
            .bind(user_id)
            .bind(series_slug)
            .execute(self.conn())
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_language_certificates(
        &mut self,
        user_id: i32,
        language_slug: &str,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM certificates WHERE user_id = $1 AND language_slug = $2")
            .bind(user_id)
            .bind(language_slug)
            .execute(self.conn())
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_certificates(&mut self, user_id: i32) -> Result<i64, DatabaseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM certificates WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.conn())
            .await?;
        Ok(count.0)
    }

    async fn list_certificates(
        &mut self,
        user_id: i32,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Certificate>, DatabaseError> {
        let certificates = sqlx::query_as::<_, Certificate>(
            r#"
            SELECT * FROM certificates
            WHERE user_id = $1
            ORDER BY completed_at DESC, id
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(self.conn())
        .await?;
        Ok(certificates)
    }
}
