//! The judgment oracle seam.
//!
//! Every qualitative judgment (clause type, risk level, citation, rewrite
//! advice, plain-language summary) comes from an [`Oracle`]. The pipeline only
//! ever sees this trait, so it runs against [`ScriptedOracle`] in tests and
//! against the hosted model client in production.

use std::fmt;
use std::sync::{LazyLock, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nyaya_core::ClauseId;
use regex::Regex;
use thiserror::Error;

static RETRY_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)retry in (\d+(?:\.\d+)?)").unwrap());

/// Which judgment a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    Classify,
    Risk,
    Cite,
    Redline,
    Summarize,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classify => "classify",
            Self::Risk => "risk",
            Self::Cite => "cite",
            Self::Redline => "redline",
            Self::Summarize => "summarize",
        }
    }

    /// Sampling temperature: near-deterministic for lookups, looser for prose.
    pub fn temperature(&self) -> f32 {
        match self {
            Self::Classify | Self::Cite => 0.1,
            Self::Risk => 0.2,
            Self::Redline | Self::Summarize => 0.3,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OracleRequest {
    pub task: Task,
    /// `None` for document-level requests (summary).
    pub clause_id: Option<ClauseId>,
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
}

impl OracleRequest {
    pub fn new(
        task: Task,
        clause_id: Option<ClauseId>,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Self {
        Self {
            task,
            clause_id,
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature: task.temperature(),
        }
    }
}

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    /// The oracle answered, but not with anything a validator can read.
    #[error("malformed oracle response: {0}")]
    Malformed(String),

    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

impl OracleError {
    /// Rate-limit failures are the only ones worth retrying.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Server { status, body } => *status == 429 || mentions_rate_limit(body),
            Self::Unavailable(msg) => mentions_rate_limit(msg),
            _ => false,
        }
    }

    /// Server-suggested wait before the next attempt, if one was given.
    pub fn retry_hint(&self) -> Option<Duration> {
        match self {
            Self::RateLimited {
                retry_after: Some(d),
                ..
            } => Some(*d),
            Self::RateLimited { message, .. } => parse_retry_hint(message),
            Self::Server { body, .. } => parse_retry_hint(body),
            Self::Unavailable(msg) => parse_retry_hint(msg),
            _ => None,
        }
    }
}

fn mentions_rate_limit(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("429") || lower.contains("quota") || lower.contains("rate limit")
}

/// Parse `"... retry in 23.5s ..."` style hints.
pub fn parse_retry_hint(text: &str) -> Option<Duration> {
    let caps = RETRY_HINT.captures(text)?;
    let secs: f64 = caps[1].parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

/// Source of opaque, structured judgments.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Answer one request with the raw response text (expected to hold JSON).
    async fn complete(&self, request: &OracleRequest) -> Result<String, OracleError>;

    fn model(&self) -> &str {
        "unknown"
    }
}

type Responder = dyn Fn(&OracleRequest) -> Result<String, OracleError> + Send + Sync;

/// In-memory oracle answering from a closure. Records every request.
pub struct ScriptedOracle {
    responder: Box<Responder>,
    calls: Mutex<Vec<OracleRequest>>,
}

impl ScriptedOracle {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&OracleRequest) -> Result<String, OracleError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in order.
    pub fn calls(&self) -> Vec<OracleRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_for(&self, task: Task) -> usize {
        self.calls().iter().filter(|r| r.task == task).count()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, request: &OracleRequest) -> Result<String, OracleError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        (self.responder)(request)
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
