//! Progress endpoints under `/api/v1/languages/...`.
//!
//! Handlers only translate between HTTP and the progress service: path and
//! auth context become an options struct, the service result becomes a DTO.

pub mod language;
pub mod lesson;
pub mod section;
pub mod series;

use serde::Deserialize;

use crate::middleware::{AuthUser, RequestId};
use crate::types::{
    LanguageProgressOptions, LessonProgressOptions, SectionProgressOptions, SeriesProgressOptions,
};

#[derive(Debug, Deserialize)]
pub struct LanguagePath {
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct SeriesPath {
    pub language: String,
    pub series: String,
}

#[derive(Debug, Deserialize)]
pub struct SectionPath {
    pub language: String,
    pub series: String,
    pub section: i32,
}

#[derive(Debug, Deserialize)]
pub struct LessonPath {
    pub language: String,
    pub series: String,
    pub section: i32,
    pub lesson: i32,
}

impl LanguagePath {
    fn options(self, user: &AuthUser, request_id: RequestId) -> LanguageProgressOptions {
        LanguageProgressOptions {
            request_id: request_id.0,
            user_id: user.user_id,
            language_slug: self.language,
        }
    }
}

impl SeriesPath {
    fn options(self, user: &AuthUser, request_id: RequestId) -> SeriesProgressOptions {
        SeriesProgressOptions {
            request_id: request_id.0,
            user_id: user.user_id,
            is_staff: user.is_staff,
            language_slug: self.language,
            series_slug: self.series,
        }
    }
}

impl SectionPath {
    fn options(self, user: &AuthUser, request_id: RequestId) -> SectionProgressOptions {
        SectionProgressOptions {
            request_id: request_id.0,
            user_id: user.user_id,
            is_staff: user.is_staff,
            language_slug: self.language,
            series_slug: self.series,
            section_id: self.section,
        }
    }
}

impl LessonPath {
    fn options(self, user: &AuthUser, request_id: RequestId) -> LessonProgressOptions {
        LessonProgressOptions {
            request_id: request_id.0,
            user_id: user.user_id,
            is_staff: user.is_staff,
            language_slug: self.language,
            series_slug: self.series,
            section_id: self.section,
            lesson_id: self.lesson,
        }
    }
}
