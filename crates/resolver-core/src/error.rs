//! Error taxonomy (§7) and the generic [`ResolverError`] wrapper.
//!
//! `ResolverError<E>` is a handful of typed resilience-layer variants plus
//! an `Application(E)` escape hatch, so composing circuit breaker / rate
//! limiter / provider errors doesn't require a `From` impl per layer.

use std::fmt;
use std::time::Duration;

/// Error codes from §7. Prefixes distinguish the originating subsystem;
/// these are codes, not types, so they serialize cleanly into `RetryItem.last_error_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ParseUnparseable,
    AiTimeout,
    AiQuotaExhausted,
    AiProviderError,
    MetadataTimeout,
    MetadataRateLimited,
    MetadataUnavailable,
    MetadataCircuitOpen,
    MetadataGatewayError,
    MetadataNetworkError,
    MetadataNoResults,
    MetadataNotFound,
    MetadataInvalidInput,
    MetadataUnauthorized,
    CacheUnavailable,
    RetryExhausted,
}

impl ErrorCode {
    /// The Error Classifier (§4.L): pure function from code to retryable-ness.
    pub fn is_retryable(self) -> bool {
        use ErrorCode::*;
        match self {
            AiTimeout | AiProviderError => true,
            AiQuotaExhausted => false,
            MetadataTimeout | MetadataRateLimited | MetadataUnavailable | MetadataCircuitOpen
            | MetadataGatewayError | MetadataNetworkError => true,
            MetadataNoResults | MetadataNotFound | MetadataInvalidInput | MetadataUnauthorized => false,
            ParseUnparseable => false,
            CacheUnavailable => false,
            RetryExhausted => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        use ErrorCode::*;
        match self {
            ParseUnparseable => "PARSE_UNPARSEABLE",
            AiTimeout => "AI_TIMEOUT",
            AiQuotaExhausted => "AI_QUOTA_EXHAUSTED",
            AiProviderError => "AI_PROVIDER_ERROR",
            MetadataTimeout => "METADATA_TIMEOUT",
            MetadataRateLimited => "METADATA_RATE_LIMITED",
            MetadataUnavailable => "METADATA_UNAVAILABLE",
            MetadataCircuitOpen => "METADATA_CIRCUIT_OPEN",
            MetadataGatewayError => "METADATA_GATEWAY_ERROR",
            MetadataNetworkError => "METADATA_NETWORK_ERROR",
            MetadataNoResults => "METADATA_NO_RESULTS",
            MetadataNotFound => "METADATA_NOT_FOUND",
            MetadataInvalidInput => "METADATA_INVALID_INPUT",
            MetadataUnauthorized => "METADATA_UNAUTHORIZED",
            CacheUnavailable => "CACHE_UNAVAILABLE",
            RetryExhausted => "RETRY_EXHAUSTED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error surfaced by a provider adapter, carrying a code (for the
/// classifier) and an opaque, already-redacted detail string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {detail}")]
pub struct ProviderError {
    pub code: ErrorCode,
    pub detail: String,
}

impl ProviderError {
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

/// Unified error type for composed resilience layers, generic over the
/// wrapped application error `E`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolverError<E> {
    #[error("circuit breaker for {provider} is open")]
    CircuitOpen { provider: &'static str },

    #[error("rate limited for {provider}, retry after {retry_after:?}")]
    RateLimited {
        provider: &'static str,
        retry_after: Option<Duration>,
    },

    #[error("cache unavailable: {detail}")]
    CacheUnavailable { detail: String },

    #[error(transparent)]
    Application(#[from] E),
}

impl<E> ResolverError<E> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResolverError::CircuitOpen { .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ResolverError::RateLimited { .. })
    }

    pub fn application_error(self) -> Option<E> {
        match self {
            ResolverError::Application(e) => Some(e),
            _ => None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ResolverError::CircuitOpen { .. } => ErrorCode::MetadataCircuitOpen,
            ResolverError::RateLimited { .. } => ErrorCode::MetadataRateLimited,
            ResolverError::CacheUnavailable { .. } => ErrorCode::CacheUnavailable,
            ResolverError::Application(_) => ErrorCode::MetadataUnavailable,
        }
    }
}
