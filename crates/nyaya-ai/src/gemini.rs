//! HTTP oracle backed by the Gemini `generateContent` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::oracle::parse_retry_hint;
use crate::{Oracle, OracleError, OracleRequest};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// Like `https://generativelanguage.googleapis.com` (no trailing slash).
    pub base_url: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

pub struct GeminiOracle {
    client: reqwest::Client,
    config: GeminiConfig,
}

// ── Wire types ──

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .find_map(|p| p.text)
    }
}

fn request_body(request: &OracleRequest) -> GenerateRequest<'_> {
    GenerateRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: &request.system_prompt,
            }],
        },
        contents: vec![Content {
            role: Some("user"),
            parts: vec![Part {
                text: &request.user_prompt,
            }],
        }],
        generation_config: GenerationConfig {
            temperature: request.temperature,
            response_mime_type: "application/json",
        },
    }
}

impl GeminiOracle {
    pub fn new(mut config: GeminiConfig) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }
}

#[async_trait]
impl Oracle for GeminiOracle {
    async fn complete(&self, request: &OracleRequest) -> Result<String, OracleError> {
        let url = self.endpoint();
        debug!(url = %url, task = %request.task, "calling model");

        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request_body(request))
            .send()
            .await?;
        let status = resp.status();
        if status.as_u16() == 429 {
            let body = resp.text().await.unwrap_or_default();
            return Err(OracleError::RateLimited {
                retry_after: parse_retry_hint(&body),
                message: body,
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OracleError::Server {
                status: status.as_u16(),
                body,
            });
        }

        // A gateway page or truncated body is an unusable reply, not a transport failure.
        let body = resp.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| OracleError::Malformed(format!("response body is not JSON: {e}")))?;
        let text = parsed
            .into_text()
            .ok_or_else(|| OracleError::Malformed("response has no candidate text".into()))?;
        info!(task = %request.task, chars = text.len(), "model responded");
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::Task;

    /// Answer a single request with `status`, `content_type` and `body`.
    async fn serve_once(status: &str, content_type: &str, body: &str) -> GeminiOracle {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\
             Connection: close\r\n\r\n{body}",
            body.len()
        );
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        let mut config = GeminiConfig::new("test-key");
        config.base_url = format!("http://{addr}");
        GeminiOracle::new(config)
    }

    /// Drain headers and a `Content-Length` body so the client sees a clean close.
    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            let Some(head_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let length = text[..head_end]
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + length {
                return;
            }
        }
    }

    fn request() -> OracleRequest {
        OracleRequest::new(Task::Risk, None, "system", "user")
    }

    #[tokio::test]
    async fn html_body_is_malformed_not_transport_error() {
        let oracle = serve_once("200 OK", "text/html", "<html>gateway</html>").await;
        let err = oracle.complete(&request()).await.unwrap_err();
        assert!(matches!(err, OracleError::Malformed(_)), "got {err:?}");
        assert!(!err.is_rate_limit());
    }

    #[tokio::test]
    async fn candidate_text_is_returned() {
        let body = r#"{"candidates": [{"content": {"parts": [{"text": "{\"risk_level\": \"Low\"}"}]}}]}"#;
        let oracle = serve_once("200 OK", "application/json", body).await;
        let text = oracle.complete(&request()).await.unwrap();
        assert_eq!(text, r#"{"risk_level": "Low"}"#);
    }

    #[tokio::test]
    async fn status_429_is_rate_limited_with_hint() {
        let oracle = serve_once(
            "429 Too Many Requests",
            "application/json",
            r#"{"error": {"message": "Quota exceeded. Please retry in 7s."}}"#,
        )
        .await;
        let err = oracle.complete(&request()).await.unwrap_err();
        assert!(err.is_rate_limit());
        assert_eq!(err.retry_hint(), Some(std::time::Duration::from_secs(7)));
    }

    #[tokio::test]
    async fn server_error_keeps_status() {
        let oracle = serve_once("503 Service Unavailable", "text/plain", "overloaded").await;
        let err = oracle.complete(&request()).await.unwrap_err();
        assert!(matches!(err, OracleError::Server { status: 503, .. }), "got {err:?}");
    }

    #[test]
    fn request_body_shape() {
        let req = OracleRequest::new(Task::Cite, None, "be careful", "clause text");
        let json = serde_json::to_value(request_body(&req)).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be careful");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "clause text");
        assert_eq!(
            json["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn response_text_extraction() {
        let json = r#"{"candidates": [{"content": {"role": "model",
                       "parts": [{"text": "{\"found\": false}"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.into_text().as_deref(), Some("{\"found\": false}"));

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert_eq!(empty.into_text(), None);

        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert_eq!(blocked.into_text(), None);
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let mut config = GeminiConfig::new("k").with_model("gemini-2.5-pro");
        config.base_url = "http://localhost:8080/".into();
        let oracle = GeminiOracle::new(config);
        assert_eq!(
            oracle.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-2.5-pro:generateContent"
        );
        assert_eq!(oracle.model(), "gemini-2.5-pro");
    }
}
