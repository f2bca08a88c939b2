pub mod certificates;
pub mod errors;
pub mod progress;

pub use certificates::CertificateService;
pub use errors::ProgressError;
pub use progress::ProgressService;
