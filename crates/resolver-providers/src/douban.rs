//! Douban adapter (§4.C): a Chinese-language metadata source with a much
//! tighter rate limit than TMDb (1 call / 2s, §6 defaults).

use crate::adapter::{pick_preferred, ProviderAdapter};
use crate::http::HttpClient;
use async_trait::async_trait;
use resolver_core::error::{ErrorCode, ProviderError};
use resolver_core::model::{now_unix, MediaIdentity, MediaKind, ParseCandidate, ProviderKind, ProviderOrigin};
use std::sync::Arc;

pub struct DoubanAdapter {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl DoubanAdapter {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            base_url: "https://api.douban.com/v2".to_string(),
        }
    }

    fn search_url(&self, candidate: &ParseCandidate) -> String {
        format!("{}/movie/search?q={}", self.base_url, urlencoding::encode(&candidate.title))
    }
}

#[async_trait]
impl ProviderAdapter for DoubanAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Douban
    }

    async fn search(&self, candidate: &ParseCandidate) -> Result<MediaIdentity, ProviderError> {
        let body = self.http.get_json(&self.search_url(candidate)).await?;
        let first = body
            .get("subjects")
            .and_then(|r| r.as_array())
            .and_then(|arr| arr.first())
            .ok_or_else(|| ProviderError::new(ErrorCode::MetadataNoResults, "no Douban results"))?;

        let native_title = first.get("title").and_then(|v| v.as_str()).unwrap_or(&candidate.title);
        let title_original = first.get("original_title").and_then(|v| v.as_str()).unwrap_or(native_title).to_string();

        let by_language = [("zh-CN", native_title), ("en", title_original.as_str())];
        let title_primary = pick_preferred(&by_language).map(str::to_string).unwrap_or_else(|| native_title.to_string());
        let year = first
            .get("year")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<u16>().ok())
            .or(candidate.year);

        Ok(MediaIdentity {
            kind: if candidate.is_episodic() { MediaKind::Series } else { MediaKind::Movie },
            provider_id: first.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            provider_origin: ProviderOrigin::Douban,
            title_primary,
            title_original,
            title_alternatives: Vec::new(),
            year,
            overview: first.get("summary").and_then(|v| v.as_str()).map(str::to_string),
            genres: Vec::new(),
            cast: Vec::new(),
            crew: Vec::new(),
            poster_ref: first
                .get("images")
                .and_then(|i| i.get("large"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
            fetched_at: now_unix(),
            season: candidate.season,
            episode: candidate.episode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resolver_core::model::ParserOrigin;
    use serde_json::json;

    struct StubHttp(serde_json::Value);

    #[async_trait]
    impl HttpClient for StubHttp {
        async fn get_json_with_headers(&self, _url: &str, _headers: &[(&str, &str)]) -> Result<serde_json::Value, ProviderError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn maps_first_subject_to_media_identity() {
        let http = Arc::new(StubHttp(json!({
            "subjects": [{"id": "1292052", "title": "肖申克的救赎", "year": "1994"}]
        })));
        let adapter = DoubanAdapter::new(http);
        let candidate = ParseCandidate::new("f.mkv", "Shawshank", ParserOrigin::Regex);
        let identity = adapter.search(&candidate).await.unwrap();
        assert_eq!(identity.title_primary, "肖申克的救赎");
        assert_eq!(identity.year, Some(1994));
    }

    #[tokio::test]
    async fn empty_subjects_is_no_results() {
        let http = Arc::new(StubHttp(json!({"subjects": []})));
        let adapter = DoubanAdapter::new(http);
        let candidate = ParseCandidate::new("f.mkv", "Unknown", ParserOrigin::Regex);
        let err = adapter.search(&candidate).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MetadataNoResults);
    }
}
