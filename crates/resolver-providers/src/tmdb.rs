//! TMDb adapter (§4.C): the primary metadata source, queried first by
//! default (`provider_order`).

use crate::adapter::{pick_preferred, ProviderAdapter};
use crate::http::HttpClient;
use async_trait::async_trait;
use resolver_core::error::{ErrorCode, ProviderError};
use resolver_core::model::{now_unix, MediaIdentity, MediaKind, ParseCandidate, ProviderKind, ProviderOrigin};
use std::sync::Arc;

pub struct TmdbAdapter {
    http: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
}

impl TmdbAdapter {
    pub fn new(http: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: "https://api.themoviedb.org/3".to_string(),
        }
    }

    fn search_url(&self, candidate: &ParseCandidate) -> String {
        let endpoint = if candidate.is_episodic() { "search/tv" } else { "search/movie" };
        let mut url = format!(
            "{}/{endpoint}?api_key={}&query={}&language=zh-TW",
            self.base_url,
            self.api_key,
            urlencoding::encode(&candidate.title)
        );
        if let Some(year) = candidate.year {
            let year_param = if candidate.is_episodic() { "first_air_date_year" } else { "year" };
            url.push_str(&format!("&{year_param}={year}"));
        }
        url
    }

    fn append_translations_url(&self, id: &str, is_episodic: bool) -> String {
        let endpoint = if is_episodic { "tv" } else { "movie" };
        format!("{}/{endpoint}/{id}/translations?api_key={}", self.base_url, self.api_key)
    }
}

/// TMDb's `/translations` endpoint returns a flat `translations[]` array of
/// `{iso_639_1, data: {title|name}}` entries rather than a per-language map,
/// so this extracts the `(language, title)` pairs `pick_preferred` expects.
fn translations_by_language(body: &serde_json::Value) -> Vec<(&str, &str)> {
    body.get("translations")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|entry| {
                    let lang = entry.get("iso_639_1").and_then(|v| v.as_str())?;
                    let title = entry
                        .get("data")
                        .and_then(|d| d.get("title").or_else(|| d.get("name")))
                        .and_then(|v| v.as_str())
                        .filter(|s| !s.is_empty())?;
                    Some((lang, title))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl ProviderAdapter for TmdbAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Tmdb
    }

    async fn search(&self, candidate: &ParseCandidate) -> Result<MediaIdentity, ProviderError> {
        let body = self.http.get_json(&self.search_url(candidate)).await?;
        let first = body
            .get("results")
            .and_then(|r| r.as_array())
            .and_then(|arr| arr.first())
            .ok_or_else(|| ProviderError::new(ErrorCode::MetadataNoResults, "no TMDb results"))?;

        let kind = if candidate.is_episodic() { MediaKind::Series } else { MediaKind::Movie };
        let queried_title = first
            .get("title")
            .or_else(|| first.get("name"))
            .and_then(|v| v.as_str())
            .unwrap_or(&candidate.title)
            .to_string();
        let title_original = first
            .get("original_title")
            .or_else(|| first.get("original_name"))
            .and_then(|v| v.as_str())
            .unwrap_or(&queried_title)
            .to_string();
        let provider_id = first.get("id").map(|v| v.to_string()).unwrap_or_default();

        let title_primary = if !provider_id.is_empty() {
            match self
                .http
                .get_json(&self.append_translations_url(&provider_id, candidate.is_episodic()))
                .await
            {
                Ok(translations) => {
                    let by_language = translations_by_language(&translations);
                    pick_preferred(&by_language).map(str::to_string).unwrap_or(queried_title)
                }
                Err(_) => queried_title,
            }
        } else {
            queried_title
        };

        Ok(MediaIdentity {
            kind,
            provider_id,
            provider_origin: ProviderOrigin::Tmdb,
            title_primary,
            title_original,
            title_alternatives: Vec::new(),
            year: candidate.year,
            overview: first.get("overview").and_then(|v| v.as_str()).map(str::to_string),
            genres: Vec::new(),
            cast: Vec::new(),
            crew: Vec::new(),
            poster_ref: first.get("poster_path").and_then(|v| v.as_str()).map(str::to_string),
            fetched_at: now_unix(),
            season: candidate.season,
            episode: candidate.episode,
        })
    }
}
