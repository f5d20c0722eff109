//! The core resolution steps (§4.H steps 2-5), factored out of
//! [`crate::engine::Engine`] so both a first-time `resolve()` call and a
//! retried [`crate::executor::OrchestratorExecutor`] dispatch share exactly
//! the same parse/cache/provider-chain logic.

use resolver_cache::key as cache_key;
use resolver_core::error::{ErrorCode, ProviderError};
use resolver_core::model::{CacheClass, MediaIdentity, ParseCandidate, ProviderKind};
use resolver_parser::AiParseError;
use resolver_providers::ProviderAdapter;

use crate::shared::Shared;

/// §4.H step 2: run the regex parser, escalating to the AI parser when its
/// confidence is below 0.7. AI results are cached under `class=ai-parse`
/// keyed by a content-address of the candidate title (§4.G).
pub async fn parse_filename(shared: &Shared, filename: &str) -> Result<ParseCandidate, AiParseError> {
    let candidate = shared.parser.parse(filename);
    if candidate.is_confident() {
        return Ok(candidate);
    }

    let client = shared
        .ai_client
        .as_ref()
        .ok_or_else(|| AiParseError::new(ErrorCode::ParseUnparseable, "no AI client configured for a low-confidence parse"))?;

    let ai_key = cache_key::ai_parse_key(&candidate.title);
    if let Ok(Some(bytes)) = shared.cache.get(&ai_key).await {
        if let Ok(cached) = serde_json::from_slice::<ParseCandidate>(&bytes) {
            return Ok(cached);
        }
    }

    let timeout = shared.config.ai_parse.timeout();
    match tokio::time::timeout(timeout, client.infer_parse(filename, &candidate)).await {
        Ok(Ok(ai_candidate)) => {
            if let Ok(serialized) = serde_json::to_vec(&ai_candidate) {
                let _ = shared.cache.put(ai_key, serialized, CacheClass::AiParse).await;
            }
            Ok(ai_candidate)
        }
        Ok(Err(err)) => Err(err),
        Err(_) => Err(AiParseError::new(ErrorCode::AiTimeout, "AI parse escalation timed out")),
    }
}

/// §4.H steps 3-5: cache lookup, the fixed TMDb -> Douban -> Wikipedia
/// provider chain gated by circuit breaker and rate limiter, then the
/// AI-assisted keyword-escalation adapter if every metadata provider came up
/// empty. Returns every provider failure observed so the caller can apply
/// the Error Classifier (§4.L).
pub async fn attempt_metadata(shared: &Shared, candidate: &ParseCandidate) -> Result<MediaIdentity, Vec<ProviderError>> {
    let key = cache_key::candidate_key(&candidate.title, candidate.year, candidate.season, candidate.episode);

    if let Ok(Some(bytes)) = shared.cache.get(&key).await {
        if let Ok(identity) = serde_json::from_slice::<MediaIdentity>(&bytes) {
            return Ok(identity);
        }
    }

    let mut failures = Vec::new();

    for provider_kind in shared.config.provider_order.clone() {
        if let Some(adapter) = shared.providers.get(&provider_kind) {
            if let Some(identity) = try_gated_adapter(shared, provider_kind, adapter.as_ref(), candidate, &key, &mut failures).await {
                return Ok(identity);
            }
        }
    }

    if let Some(ai_assisted) = shared.ai_assisted.clone() {
        if let Some(identity) =
            try_gated_adapter(shared, ProviderKind::AiAssisted, ai_assisted.as_ref(), candidate, &key, &mut failures).await
        {
            return Ok(identity);
        }
    }

    Err(failures)
}

/// One gated provider attempt: circuit breaker, then rate limiter, then the
/// call itself. A rejected circuit contributes a retryable
/// `MetadataCircuitOpen` failure rather than being skipped silently (§4.D:
/// "the orchestrator treats this as the same outcome as a retryable
/// failure"), so the chain still falls through to the next provider but the
/// overall resolution still lands on `PendingRetry` if every provider is
/// gated off. Every other outcome records exactly one success/failure
/// against the breaker, matching its try_acquire/record contract.
async fn try_gated_adapter(
    shared: &Shared,
    kind: ProviderKind,
    adapter: &dyn ProviderAdapter,
    candidate: &ParseCandidate,
    cache_key: &str,
    failures: &mut Vec<ProviderError>,
) -> Option<MediaIdentity> {
    if !shared.breakers.try_acquire(kind) {
        failures.push(ProviderError::new(ErrorCode::MetadataCircuitOpen, format!("{} circuit is open", kind.as_str())));
        return None;
    }

    if let Err(rejection) = shared.limiters.try_acquire(kind) {
        shared.breakers.record_failure(kind);
        failures.push(ProviderError::new(
            ErrorCode::MetadataRateLimited,
            format!("rate limited, retry after {}ms", rejection.retry_after_millis),
        ));
        return None;
    }

    match adapter.search(candidate).await {
        Ok(identity) => {
            shared.breakers.record_success(kind);
            if let Ok(serialized) = serde_json::to_vec(&identity) {
                let _ = shared.cache.put(cache_key.to_string(), serialized, CacheClass::Metadata).await;
            }
            Some(identity)
        }
        Err(err) => {
            shared.breakers.record_failure(kind);
            failures.push(err);
            None
        }
    }
}
