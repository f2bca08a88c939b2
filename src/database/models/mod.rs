pub mod certificate;
pub mod content;
pub mod progress;

pub use certificate::{Certificate, NewCertificate};
pub use content::{Language, Lesson, Section, Series};
pub use progress::{
    Adjusted, LanguageProgress, LessonProgress, NewLessonProgress, NewSectionProgress,
    NewSeriesProgress, ProgressLevel, SectionProgress, SeriesDelta, SeriesProgress, Upserted,
};
