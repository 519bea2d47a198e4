//! Analysis pipeline: runs the six stages over a contract and assembles
//! the resulting state and report.

mod config;
mod pipeline;
mod report;
mod state;

pub use config::{DEFAULT_TITLE, PipelineConfig};
pub use pipeline::Pipeline;
pub use report::{ClauseEntry, RiskReport};
pub use state::{AnalysisState, AuditRecord, Stage, StageError};
