//! Incoming mail: parsed form, persisted record, and storage.

mod model;
mod repository;

pub use model::{MailRecord, ParsedMail, Summary};
pub use repository::MailRepository;
