//! Newsletter source registry: models and persistence.

mod model;
mod repository;

pub use model::{NewsletterSource, OperatingStatus, SourceLanguage};
pub use repository::SourceRepository;
