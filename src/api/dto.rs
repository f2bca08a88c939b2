//! JSON shapes returned by the HTTP API. Each content DTO carries the
//! caller's progress on that entity.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::database::models::{
    Certificate, Language, LanguageProgress, Lesson, LessonProgress, Section, SectionProgress,
    Series, SeriesProgress,
};
use crate::types::{CompletedLesson, Tracked, ViewedLanguage};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageProgressDto {
    pub id: i32,
    pub completed_series: i32,
    pub viewed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageDto {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub icon: String,
    pub series_count: i32,
    pub progress: LanguageProgressDto,
}

impl From<LanguageProgress> for LanguageProgressDto {
    fn from(progress: LanguageProgress) -> Self {
        Self {
            id: progress.id,
            completed_series: progress.completed_series,
            viewed_at: progress.viewed_at,
        }
    }
}

impl LanguageDto {
    fn new(language: Language, progress: LanguageProgress) -> Self {
        Self {
            id: language.id,
            name: language.name,
            slug: language.slug,
            icon: language.icon,
            series_count: language.series_count,
            progress: progress.into(),
        }
    }
}

impl From<Tracked<Language, LanguageProgress>> for LanguageDto {
    fn from(tracked: Tracked<Language, LanguageProgress>) -> Self {
        Self::new(tracked.content, tracked.progress)
    }
}

impl From<ViewedLanguage> for LanguageDto {
    fn from(viewed: ViewedLanguage) -> Self {
        Self::new(viewed.language, viewed.progress)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesProgressDto {
    pub id: i32,
    pub completed_sections: i32,
    pub completed_lessons: i32,
    pub is_current: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub viewed_at: DateTime<Utc>,
}

impl From<SeriesProgress> for SeriesProgressDto {
    fn from(progress: SeriesProgress) -> Self {
        Self {
            id: progress.id,
            completed_sections: progress.completed_sections,
            completed_lessons: progress.completed_lessons,
            is_current: progress.is_current,
            completed_at: progress.completed_at,
            viewed_at: progress.viewed_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesDto {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub language_slug: String,
    pub sections_count: i32,
    pub lessons_count: i32,
    pub watch_time_seconds: i32,
    pub read_time_seconds: i32,
    pub is_published: bool,
    pub progress: SeriesProgressDto,
}

impl From<Tracked<Series, SeriesProgress>> for SeriesDto {
    fn from(tracked: Tracked<Series, SeriesProgress>) -> Self {
        let Tracked { content: series, progress, .. } = tracked;
        Self {
            id: series.id,
            title: series.title,
            slug: series.slug,
            description: series.description,
            language_slug: series.language_slug,
            sections_count: series.sections_count,
            lessons_count: series.lessons_count,
            watch_time_seconds: series.watch_time_seconds,
            read_time_seconds: series.read_time_seconds,
            is_published: series.is_published,
            progress: progress.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionProgressDto {
    pub id: i32,
    pub completed_lessons: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub viewed_at: DateTime<Utc>,
}

impl From<SectionProgress> for SectionProgressDto {
    fn from(progress: SectionProgress) -> Self {
        Self {
            id: progress.id,
            completed_lessons: progress.completed_lessons,
            completed_at: progress.completed_at,
            viewed_at: progress.viewed_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDto {
    pub id: i32,
    pub title: String,
    pub language_slug: String,
    pub series_slug: String,
    pub position: i16,
    pub lessons_count: i32,
    pub watch_time_seconds: i32,
    pub read_time_seconds: i32,
    pub is_published: bool,
    pub progress: SectionProgressDto,
}

impl From<Tracked<Section, SectionProgress>> for SectionDto {
    fn from(tracked: Tracked<Section, SectionProgress>) -> Self {
        let Tracked { content: section, progress, .. } = tracked;
        Self {
            id: section.id,
            title: section.title,
            language_slug: section.language_slug,
            series_slug: section.series_slug,
            position: section.position,
            lessons_count: section.lessons_count,
            watch_time_seconds: section.watch_time_seconds,
            read_time_seconds: section.read_time_seconds,
            is_published: section.is_published,
            progress: progress.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgressDto {
    pub id: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub viewed_at: DateTime<Utc>,
}

impl From<LessonProgress> for LessonProgressDto {
    fn from(progress: LessonProgress) -> Self {
        Self {
            id: progress.id,
            completed_at: progress.completed_at,
            viewed_at: progress.viewed_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDto {
    pub id: i32,
    pub title: String,
    pub language_slug: String,
    pub series_slug: String,
    pub section_id: i32,
    pub position: i16,
    pub watch_time_seconds: i32,
    pub read_time_seconds: i32,
    pub is_published: bool,
    pub progress: LessonProgressDto,
    /// Only present on the completion that finished the series
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<CertificateDto>,
}

impl LessonDto {
    fn new(lesson: Lesson, progress: LessonProgress, certificate: Option<Certificate>) -> Self {
        Self {
            id: lesson.id,
            title: lesson.title,
            language_slug: lesson.language_slug,
            series_slug: lesson.series_slug,
            section_id: lesson.section_id,
            position: lesson.position,
            watch_time_seconds: lesson.watch_time_seconds,
            read_time_seconds: lesson.read_time_seconds,
            is_published: lesson.is_published,
            progress: progress.into(),
            certificate: certificate.map(CertificateDto::from),
        }
    }
}

impl From<Tracked<Lesson, LessonProgress>> for LessonDto {
    fn from(tracked: Tracked<Lesson, LessonProgress>) -> Self {
        Self::new(tracked.content, tracked.progress, None)
    }
}

impl From<CompletedLesson> for LessonDto {
    fn from(completed: CompletedLesson) -> Self {
        Self::new(completed.lesson, completed.progress, completed.certificate)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateDto {
    pub id: Uuid,
    pub user_id: i32,
    pub language_slug: String,
    pub series_slug: String,
    pub series_title: String,
    pub lessons: i32,
    pub watch_time_seconds: i32,
    pub read_time_seconds: i32,
    pub completed_at: DateTime<Utc>,
}

impl From<Certificate> for CertificateDto {
    fn from(certificate: Certificate) -> Self {
        Self {
            id: certificate.id,
            user_id: certificate.user_id,
            language_slug: certificate.language_slug,
            series_slug: certificate.series_slug,
            series_title: certificate.series_title,
            lessons: certificate.lessons,
            watch_time_seconds: certificate.watch_time_seconds,
            read_time_seconds: certificate.read_time_seconds,
            completed_at: certificate.completed_at,
        }
    }
}
