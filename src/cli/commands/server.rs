use std::sync::Arc;

use crate::app;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::models::Lesson;
use crate::database::{MemoryStore, PgStore};

pub async fn migrate(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = PgStore::connect(&config.database).await?;
    store.migrate().await?;
    store.close().await;

    output_success(&output_format, "Migrations applied", None)
}

pub async fn serve(mut config: AppConfig, memory: bool, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.api.port = port;
    }

    if memory {
        tracing::warn!("Serving from the in-memory store; nothing will be persisted");
        let store = demo_store().await;
        tracing::info!(
            language = DEMO_LANGUAGE,
            series = DEMO_SERIES,
            "Seeded demo catalog"
        );
        return app::serve_with(Arc::new(store), config).await;
    }

    app::serve(config).await
}

const DEMO_LANGUAGE: &str = "rust";
const DEMO_SERIES: &str = "rust-fundamentals";

/// Small published catalog so the progress routes have something to track.
async fn demo_store() -> MemoryStore {
    let store = MemoryStore::new();
    seed_demo_catalog(&store).await;
    store
}

async fn seed_demo_catalog(store: &MemoryStore) -> Vec<Lesson> {
    store.add_language("Rust", DEMO_LANGUAGE).await;
    store
        .add_series(DEMO_LANGUAGE, "Rust Fundamentals", DEMO_SERIES, true)
        .await;

    let basics = store
        .add_section(DEMO_LANGUAGE, DEMO_SERIES, "Getting Started", true)
        .await;
    let ownership = store
        .add_section(DEMO_LANGUAGE, DEMO_SERIES, "Ownership", true)
        .await;

    vec![
        store.add_lesson(&basics, "Hello, Cargo", 300, 120, true).await,
        store.add_lesson(&basics, "Variables and Mutability", 240, 90, true).await,
        store.add_lesson(&ownership, "Moves and Copies", 420, 150, true).await,
        store.add_lesson(&ownership, "Borrowing", 360, 120, true).await,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Store;
    use crate::services::ProgressService;
    use crate::types::LessonProgressOptions;

    #[tokio::test]
    async fn demo_catalog_can_be_completed() {
        let store = MemoryStore::new();
        let lessons = seed_demo_catalog(&store).await;

        let mut uow = store.connect().await.unwrap();
        let series = uow.get_series(DEMO_LANGUAGE, DEMO_SERIES).await.unwrap().unwrap();
        assert_eq!(series.sections_count, 2);
        assert_eq!(series.lessons_count, 4);
        drop(uow);

        let progress = ProgressService::new(Arc::new(store));
        let mut certificate = None;
        for lesson in &lessons {
            let opts = LessonProgressOptions {
                request_id: "demo".to_string(),
                user_id: 1,
                is_staff: false,
                language_slug: lesson.language_slug.clone(),
                series_slug: lesson.series_slug.clone(),
                section_id: lesson.section_id,
                lesson_id: lesson.id,
            };
            certificate = progress.complete_lesson_progress(&opts).await.unwrap().certificate;
        }
        assert_eq!(certificate.unwrap().lessons, 4);
    }
}
