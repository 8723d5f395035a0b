//! Correction via the remote HTTP service
//!
//! Posts `{ text, language }` as JSON to `{endpoint}/corrections` and
//! validates the `{ correction: { correctedText, changes }, usage }` reply.
//! Redirects are never followed, and a client-side budget caps the number
//! of requests per rolling minute.

use super::{CorrectionRequest, CorrectionResult, CorrectionService, TextChange, Usage};
use crate::config::ServiceConfig;
use crate::error::CorrectionError;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Remote corrector using the correction service's JSON API
pub struct RemoteCorrector {
    /// Full URL of the corrections resource
    url: String,
    /// Optional bearer token
    api_token: Option<String>,
    /// Request timeout
    timeout: Duration,
    agent: ureq::Agent,
    limiter: RateLimiter,
}

impl RemoteCorrector {
    /// Create a new remote corrector from config
    pub fn new(config: &ServiceConfig) -> Result<Self, CorrectionError> {
        let endpoint = config.endpoint.trim();

        // Validate endpoint URL format
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(CorrectionError::ConfigError(format!(
                "service endpoint must start with http:// or https://, got: {}",
                endpoint
            )));
        }

        // Warn about non-HTTPS for non-localhost endpoints
        if endpoint.starts_with("http://")
            && !endpoint.contains("localhost")
            && !endpoint.contains("127.0.0.1")
            && !endpoint.contains("[::1]")
        {
            tracing::warn!(
                "Service endpoint uses HTTP without TLS. Selected text will be transmitted unencrypted!"
            );
        }

        // Check for API token in config or environment
        let api_token = config
            .api_token
            .clone()
            .or_else(|| std::env::var("TEXTFIX_API_TOKEN").ok())
            .filter(|token| !token.trim().is_empty());

        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let url = format!("{}/corrections", endpoint.trim_end_matches('/'));

        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .redirects(0)
            .build();

        tracing::info!(
            "Configured correction service: url={}, timeout={}s, auth={}",
            url,
            timeout.as_secs(),
            if api_token.is_some() { "bearer" } else { "none" }
        );

        Ok(Self {
            url,
            api_token,
            timeout,
            agent,
            limiter: RateLimiter::new(config.max_requests_per_minute, Duration::from_secs(60)),
        })
    }
}

#[async_trait::async_trait]
impl CorrectionService for RemoteCorrector {
    async fn correct(&self, request: &CorrectionRequest) -> Result<CorrectionResult, CorrectionError> {
        if !self.limiter.try_acquire() {
            tracing::warn!("Request budget exhausted, not contacting the service");
            return Err(CorrectionError::RateLimited);
        }

        tracing::debug!(
            "Sending {} chars ({}) to {}",
            request.text.chars().count(),
            request.language,
            self.url
        );

        let start = Instant::now();
        let agent = self.agent.clone();
        let url = self.url.clone();
        let token = self.api_token.clone();
        let request = request.clone();

        let result = tokio::task::spawn_blocking(move || {
            post_correction(&agent, &url, token.as_deref(), &request)
        })
        .await
        .map_err(|e| CorrectionError::Network(format!("request task failed: {}", e)))?;

        match &result {
            Ok(correction) => tracing::info!(
                "Correction received in {:.2}s ({} changes, {} remaining this month)",
                start.elapsed().as_secs_f32(),
                correction.changes.len(),
                correction.usage.remaining
            ),
            Err(e) => tracing::warn!(
                "Correction failed after {:.2}s (timeout {}s): {}",
                start.elapsed().as_secs_f32(),
                self.timeout.as_secs(),
                e
            ),
        }

        result
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

/// Blocking POST of one correction request
fn post_correction(
    agent: &ureq::Agent,
    url: &str,
    token: Option<&str>,
    request: &CorrectionRequest,
) -> Result<CorrectionResult, CorrectionError> {
    let mut call = agent
        .post(url)
        .set("Content-Type", "application/json")
        .set("X-Client-Version", env!("CARGO_PKG_VERSION"));

    // Add authorization if a token is configured
    if let Some(token) = token {
        call = call.set("Authorization", &format!("Bearer {}", token));
    }

    let response = call
        .send_json(request)
        .map_err(|e| match e {
            ureq::Error::Status(code, resp) => {
                let body = resp.into_string().unwrap_or_default();
                CorrectionError::Remote {
                    status: code,
                    message: error_message(code, &body),
                }
            }
            ureq::Error::Transport(t) => CorrectionError::Network(t.to_string()),
        })?;

    let status = response.status();
    if !(200..300).contains(&status) {
        // Only reachable for 3xx, since redirects are disabled
        return Err(CorrectionError::Remote {
            status,
            message: format!("Server returned {}", status),
        });
    }

    let body = response
        .into_string()
        .map_err(|e| CorrectionError::InvalidResponse(format!("unreadable body: {}", e)))?;

    parse_correction_body(&body)
}

/// Extract the user-facing message from an error body
///
/// The service replies with `{ "message": "..." }` or a list of validation
/// messages; anything else falls back to the status code.
fn error_message(status: u16, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|json| json.get("message"))
        .and_then(|message| match message {
            Value::String(text) => Some(text.clone()),
            Value::Array(items) => {
                let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                (!parts.is_empty()).then(|| parts.join(", "))
            }
            _ => None,
        });

    message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Server returned {}", status))
}

/// Validate a success body and convert it to a [`CorrectionResult`]
///
/// `correction.correctedText` must be a non-empty string. Change annotations
/// and usage counters are informational: malformed ones are dropped.
pub fn parse_correction_body(body: &str) -> Result<CorrectionResult, CorrectionError> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| CorrectionError::InvalidResponse(format!("not JSON: {}", e)))?;

    let corrected_text = match json.pointer("/correction/correctedText") {
        Some(Value::String(text)) if !text.is_empty() => text.clone(),
        Some(Value::String(_)) => {
            return Err(CorrectionError::InvalidResponse(
                "empty correctedText".to_string(),
            ))
        }
        Some(other) => {
            return Err(CorrectionError::InvalidResponse(format!(
                "correctedText is not a string ({})",
                json_type(other)
            )))
        }
        None => {
            return Err(CorrectionError::InvalidResponse(
                "missing correction.correctedText".to_string(),
            ))
        }
    };

    let changes = match json.pointer("/correction/changes") {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => serde_json::from_value::<Vec<TextChange>>(value.clone()).unwrap_or_else(|e| {
            tracing::debug!("Ignoring malformed change list: {}", e);
            Vec::new()
        }),
    };

    let usage = json
        .get("usage")
        .and_then(|value| serde_json::from_value::<Usage>(value.clone()).ok())
        .unwrap_or_default();

    Ok(CorrectionResult {
        corrected_text,
        changes,
        usage,
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Sliding-window request budget
pub struct RateLimiter {
    /// Requests allowed per window; 0 disables the limit
    max: usize,
    window: Duration,
    sent: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max: usize, window: Duration) -> Self {
        Self {
            max,
            window,
            sent: Mutex::new(VecDeque::new()),
        }
    }

    /// Record a request now if the budget allows it
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&self, now: Instant) -> bool {
        if self.max == 0 {
            return true;
        }

        let mut sent = self.sent.lock().unwrap_or_else(|e| e.into_inner());
        while let Some(&oldest) = sent.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                sent.pop_front();
            } else {
                break;
            }
        }

        if sent.len() >= self.max {
            return false;
        }
        sent.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correction::{ChangeKind, Language};
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;

    fn service_config(endpoint: &str) -> ServiceConfig {
        ServiceConfig {
            endpoint: endpoint.to_string(),
            api_token: Some("test-token".to_string()),
            timeout_secs: 5,
            max_requests_per_minute: 60,
        }
    }

    /// Accept one HTTP request, answer with `status` and `body`, and hand
    /// back the raw request text.
    fn serve_once(status: &'static str, body: &'static str) -> (String, std::thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut head = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
                head.push_str(&line);
            }

            let mut request_body = vec![0u8; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();

            head + "\r\n" + &String::from_utf8_lossy(&request_body)
        });

        (endpoint, handle)
    }

    fn request(text: &str) -> CorrectionRequest {
        CorrectionRequest {
            text: text.to_string(),
            language: Language::Pt,
        }
    }

    #[test]
    fn test_config_validation_invalid_url() {
        let result = RemoteCorrector::new(&service_config("not-a-url"));
        assert!(result.is_err());
        assert!(result.err().unwrap().to_string().contains("http://"));
    }

    #[test]
    fn test_url_joins_corrections_path() {
        let corrector = RemoteCorrector::new(&service_config("http://localhost:3333/")).unwrap();
        assert_eq!(corrector.url, "http://localhost:3333/corrections");
        assert_eq!(corrector.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_valid_body() {
        let body = r#"{
            "correction": {
                "id": "c1",
                "correctedText": "Eu vou para a escola",
                "changes": [
                    {"type": "grammar", "original": "vai", "corrected": "vou", "explanation": "conjugation"}
                ]
            },
            "usage": {"monthly": 3, "limit": 100, "remaining": 97}
        }"#;

        let result = parse_correction_body(body).unwrap();
        assert_eq!(result.corrected_text, "Eu vou para a escola");
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].kind, ChangeKind::Grammar);
        assert_eq!(result.usage.remaining, 97);
    }

    #[test]
    fn test_parse_null_changes_and_missing_usage() {
        let body = r#"{"correction": {"correctedText": "ok", "changes": null}}"#;
        let result = parse_correction_body(body).unwrap();
        assert!(result.changes.is_empty());
        assert_eq!(result.usage, Usage::default());
    }

    #[test]
    fn test_parse_rejects_missing_or_non_string_text() {
        for body in [
            r#"{"correction": {}}"#,
            r#"{"correction": {"correctedText": 42}}"#,
            r#"{"correction": {"correctedText": ""}}"#,
            r#"{"usage": {}}"#,
            "<html>oops</html>",
        ] {
            let err = parse_correction_body(body).unwrap_err();
            assert!(
                matches!(err, CorrectionError::InvalidResponse(_)),
                "body {:?} gave {:?}",
                body,
                err
            );
        }
    }

    #[test]
    fn test_error_message_variants() {
        assert_eq!(error_message(400, r#"{"message": "text too short"}"#), "text too short");
        assert_eq!(
            error_message(400, r#"{"message": ["text must be a string", "language invalid"]}"#),
            "text must be a string, language invalid"
        );
        assert_eq!(error_message(500, "Internal Server Error"), "Server returned 500");
        assert_eq!(error_message(502, r#"{"message": ""}"#), "Server returned 502");
    }

    #[test]
    fn test_rate_limiter_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.try_acquire_at(start));
        assert!(limiter.try_acquire_at(start + Duration::from_secs(1)));
        assert!(!limiter.try_acquire_at(start + Duration::from_secs(2)));
        // The first request leaves the window
        assert!(limiter.try_acquire_at(start + Duration::from_secs(60)));
        assert!(!limiter.try_acquire_at(start + Duration::from_secs(60)));
    }

    #[test]
    fn test_rate_limiter_disabled() {
        let limiter = RateLimiter::new(0, Duration::from_secs(60));
        for _ in 0..1000 {
            assert!(limiter.try_acquire());
        }
    }

    #[tokio::test]
    async fn test_correct_over_http() {
        let (endpoint, server) = serve_once(
            "200 OK",
            r#"{"correction":{"correctedText":"Eu vou para a escola","changes":[]},"usage":{"monthly":1,"limit":10,"remaining":9}}"#,
        );
        let corrector = RemoteCorrector::new(&service_config(&endpoint)).unwrap();

        let result = corrector.correct(&request("Eu vai pra escola")).await.unwrap();
        assert_eq!(result.corrected_text, "Eu vou para a escola");
        assert_eq!(result.usage.remaining, 9);

        let raw = server.join().unwrap();
        assert!(raw.starts_with("POST /corrections"));
        let lower = raw.to_ascii_lowercase();
        assert!(lower.contains("authorization: bearer test-token"));
        assert!(lower.contains("x-client-version:"));
        assert!(raw.contains(r#""language":"pt""#));
        assert!(raw.contains(r#""text":"Eu vai pra escola""#));
    }

    #[tokio::test]
    async fn test_server_error_is_remote_failure() {
        let (endpoint, server) =
            serve_once("500 Internal Server Error", r#"{"statusCode":500,"message":"Internal server error"}"#);
        let corrector = RemoteCorrector::new(&service_config(&endpoint)).unwrap();

        let err = corrector.correct(&request("texto")).await.unwrap_err();
        match err {
            CorrectionError::Remote { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal server error");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        server.join().unwrap();
    }

    #[tokio::test]
    async fn test_rate_limited_before_network() {
        let mut config = service_config("http://127.0.0.1:9");
        config.max_requests_per_minute = 1;
        let corrector = RemoteCorrector::new(&config).unwrap();
        // Consume the only slot without a request
        assert!(corrector.limiter.try_acquire());

        let err = corrector.correct(&request("texto")).await.unwrap_err();
        assert!(matches!(err, CorrectionError::RateLimited));
    }
}
