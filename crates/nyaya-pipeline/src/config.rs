use std::time::Duration;

use nyaya_ai::{ContentCaps, RetryPolicy};

pub const DEFAULT_TITLE: &str = "Contract Analysis";

/// Pipeline settings. Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub retry: RetryPolicy,
    /// Pause between consecutive citation or redline calls.
    pub call_delay: Duration,
    pub caps: ContentCaps,
    /// Heading of the annotated document.
    pub title: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            call_delay: Duration::from_secs(2),
            caps: ContentCaps::default(),
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

impl PipelineConfig {
    /// No backoff waits and no call spacing.
    pub fn immediate() -> Self {
        Self {
            retry: RetryPolicy::immediate(),
            call_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}
