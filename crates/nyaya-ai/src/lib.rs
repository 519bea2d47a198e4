//! Judgment layer: the oracle seam, prompts, response validation with
//! conservative defaults, rate-limit backoff, and the hosted LLM client.

pub mod analyst;
pub mod oracle;
pub mod prompts;
pub mod response;
pub mod retry;

#[cfg(feature = "http")]
pub mod gemini;

pub use analyst::{Analyst, ContentCaps};
pub use oracle::{Oracle, OracleError, OracleRequest, ScriptedOracle, Task};
pub use prompts::SummaryContext;
pub use retry::{RetryPolicy, with_backoff};

#[cfg(feature = "http")]
pub use gemini::{GeminiConfig, GeminiOracle};
