//! AI-assisted parse escalation (§4.G). Triggered when the regex parser's
//! confidence falls below 0.7; bounded by `ai_parse.timeout_secs` and
//! expected to finish within `ai_parse.target_secs` under normal load.

use async_trait::async_trait;
use resolver_core::error::ErrorCode;
use resolver_core::model::ParseCandidate;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{code}: {detail}")]
pub struct AiParseError {
    pub code: ErrorCode,
    pub detail: String,
}

impl AiParseError {
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self { code, detail: detail.into() }
    }
}

/// The AI backend this job calls out to. Supplied by the caller (§6): the
/// engine depends only on this trait, never on a concrete AI SDK.
#[async_trait]
pub trait AiClient: Send + Sync {
    async fn infer_parse(&self, filename: &str, weak_guess: &ParseCandidate) -> Result<ParseCandidate, AiParseError>;
}

pub struct AiParseJob<C: AiClient> {
    client: C,
    timeout: Duration,
}

impl<C: AiClient> AiParseJob<C> {
    pub fn new(client: C, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Escalates `weak_guess` (the regex parser's low-confidence output) to
    /// the AI client, enforcing the configured timeout regardless of how
    /// long the client implementation would otherwise take.
    pub async fn escalate(&self, filename: &str, weak_guess: &ParseCandidate) -> Result<ParseCandidate, AiParseError> {
        match tokio::time::timeout(self.timeout, self.client.infer_parse(filename, weak_guess)).await {
            Ok(result) => result,
            Err(_) => Err(AiParseError::new(ErrorCode::AiTimeout, "AI parse escalation timed out")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resolver_core::model::ParserOrigin;

    struct SlowClient;

    #[async_trait]
    impl AiClient for SlowClient {
        async fn infer_parse(&self, _filename: &str, _weak_guess: &ParseCandidate) -> Result<ParseCandidate, AiParseError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(ParseCandidate::new("f.mkv", "Resolved Title", ParserOrigin::Ai).with_confidence(0.9))
        }
    }

    struct FailingClient;

    #[async_trait]
    impl AiClient for FailingClient {
        async fn infer_parse(&self, _filename: &str, _weak_guess: &ParseCandidate) -> Result<ParseCandidate, AiParseError> {
            Err(AiParseError::new(ErrorCode::AiProviderError, "upstream 500"))
        }
    }

    #[tokio::test]
    async fn successful_escalation_returns_ai_origin_candidate() {
        let job = AiParseJob::new(SlowClient, Duration::from_millis(500));
        let weak = ParseCandidate::new("f.mkv", "f", ParserOrigin::Regex);
        let result = job.escalate("f.mkv", &weak).await.unwrap();
        assert_eq!(result.parser_origin, ParserOrigin::Ai);
        assert!(result.is_confident());
    }

    #[tokio::test]
    async fn slow_client_hits_configured_timeout() {
        let job = AiParseJob::new(SlowClient, Duration::from_millis(5));
        let weak = ParseCandidate::new("f.mkv", "f", ParserOrigin::Regex);
        let err = job.escalate("f.mkv", &weak).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AiTimeout);
    }

    #[tokio::test]
    async fn client_error_propagates_code() {
        let job = AiParseJob::new(FailingClient, Duration::from_millis(500));
        let weak = ParseCandidate::new("f.mkv", "f", ParserOrigin::Regex);
        let err = job.escalate("f.mkv", &weak).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AiProviderError);
    }
}
