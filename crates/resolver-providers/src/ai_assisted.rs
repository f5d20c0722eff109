//! AI-assisted provider adapter (§4.C, §4.H edge case): when the three
//! metadata providers all fail to find a match for the parsed title, this
//! adapter asks an AI client to generate alternative search keywords and
//! retries the same providers with each keyword in turn.

use crate::adapter::ProviderAdapter;
use async_trait::async_trait;
use resolver_core::error::{ErrorCode, ProviderError};
use resolver_core::model::{MediaIdentity, ParseCandidate, ProviderKind};
use std::sync::Arc;

#[async_trait]
pub trait AiKeywordClient: Send + Sync {
    /// Generates up to `max_alternatives` alternative search titles for a
    /// filename that none of the metadata providers could resolve.
    async fn generate_keywords(&self, candidate: &ParseCandidate, max_alternatives: u8) -> Result<Vec<String>, ProviderError>;
}

pub struct AiAssistedAdapter<C: AiKeywordClient> {
    client: C,
    underlying: Vec<Arc<dyn ProviderAdapter>>,
    max_alternatives: u8,
}

impl<C: AiKeywordClient> AiAssistedAdapter<C> {
    pub fn new(client: C, underlying: Vec<Arc<dyn ProviderAdapter>>, max_alternatives: u8) -> Self {
        Self { client, underlying, max_alternatives }
    }
}

#[async_trait]
impl<C: AiKeywordClient> ProviderAdapter for AiAssistedAdapter<C> {
    fn kind(&self) -> ProviderKind {
        ProviderKind::AiAssisted
    }

    async fn search(&self, candidate: &ParseCandidate) -> Result<MediaIdentity, ProviderError> {
        let keywords = self.client.generate_keywords(candidate, self.max_alternatives).await?;
        if keywords.is_empty() {
            return Err(ProviderError::new(ErrorCode::MetadataNoResults, "AI produced no alternative keywords"));
        }

        for keyword in keywords {
            let retry_candidate = ParseCandidate {
                title: keyword,
                ..candidate.clone()
            };
            for adapter in &self.underlying {
                if let Ok(identity) = adapter.search(&retry_candidate).await {
                    return Ok(identity);
                }
            }
        }

        Err(ProviderError::new(ErrorCode::MetadataNoResults, "no provider matched any AI-generated keyword"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resolver_core::model::{now_unix, MediaKind, ParserOrigin, ProviderOrigin};

    struct StubKeywordClient(Vec<String>);

    #[async_trait]
    impl AiKeywordClient for StubKeywordClient {
        async fn generate_keywords(&self, _candidate: &ParseCandidate, _max: u8) -> Result<Vec<String>, ProviderError> {
            Ok(self.0.clone())
        }
    }

    struct MatchOnTitle(&'static str);

    #[async_trait]
    impl ProviderAdapter for MatchOnTitle {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Tmdb
        }

        async fn search(&self, candidate: &ParseCandidate) -> Result<MediaIdentity, ProviderError> {
            if candidate.title == self.0 {
                Ok(MediaIdentity {
                    kind: MediaKind::Movie,
                    provider_id: "1".into(),
                    provider_origin: ProviderOrigin::Tmdb,
                    title_primary: self.0.to_string(),
                    title_original: self.0.to_string(),
                    title_alternatives: Vec::new(),
                    year: None,
                    overview: None,
                    genres: Vec::new(),
                    cast: Vec::new(),
                    crew: Vec::new(),
                    poster_ref: None,
                    fetched_at: now_unix(),
                    season: None,
                    episode: None,
                })
            } else {
                Err(ProviderError::new(ErrorCode::MetadataNoResults, "no match"))
            }
        }
    }

    #[tokio::test]
    async fn retries_each_keyword_until_a_provider_matches() {
        let underlying: Vec<Arc<dyn ProviderAdapter>> = vec![Arc::new(MatchOnTitle("Correct Title"))];
        let adapter = AiAssistedAdapter::new(
            StubKeywordClient(vec!["Wrong Guess".into(), "Correct Title".into()]),
            underlying,
            4,
        );
        let candidate = ParseCandidate::new("f.mkv", "garbled name", ParserOrigin::Regex);
        let identity = adapter.search(&candidate).await.unwrap();
        assert_eq!(identity.title_primary, "Correct Title");
    }

    #[tokio::test]
    async fn no_keywords_is_no_results() {
        let underlying: Vec<Arc<dyn ProviderAdapter>> = vec![Arc::new(MatchOnTitle("X"))];
        let adapter = AiAssistedAdapter::new(StubKeywordClient(vec![]), underlying, 4);
        let candidate = ParseCandidate::new("f.mkv", "garbled name", ParserOrigin::Regex);
        let err = adapter.search(&candidate).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MetadataNoResults);
    }
}
