//! Storage layer: source documents in, run outputs out.

mod error;
pub mod reports;
pub mod source;

pub use error::StoreError;
pub use reports::{ReportStore, SavedRun};
pub use source::load_pages;
