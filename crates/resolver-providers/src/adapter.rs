//! The uniform surface every metadata provider presents to the orchestrator
//! (§4.C). Adapters never retry or rate-limit themselves; that's the
//! orchestrator's job layered on top via `resolver-circuitbreaker` and
//! `resolver-ratelimiter`.

use async_trait::async_trait;
use resolver_core::error::ProviderError;
use resolver_core::model::{MediaIdentity, ParseCandidate, ProviderKind};

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn search(&self, candidate: &ParseCandidate) -> Result<MediaIdentity, ProviderError>;
}

/// Preferred language order for titles/overviews that support localization
/// (§4.C): Traditional Chinese, then Simplified Chinese, then English.
pub const LANGUAGE_PREFERENCE: [&str; 3] = ["zh-TW", "zh-CN", "en"];

pub fn pick_preferred<'a>(by_language: &'a [(&'a str, &'a str)]) -> Option<&'a str> {
    for lang in LANGUAGE_PREFERENCE {
        if let Some((_, value)) = by_language.iter().find(|(l, _)| *l == lang) {
            return Some(value);
        }
    }
    by_language.first().map(|(_, v)| *v)
}
