//! Wikipedia adapter (§4.C): the fallback source when neither TMDb nor
//! Douban has an entry. The only provider allowed to omit `poster_ref`
//! (§3 invariant). A distinctive User-Agent is required by the MediaWiki
//! API's etiquette policy, so every request carries one explicitly instead
//! of relying on reqwest's default.

use crate::adapter::{pick_preferred, ProviderAdapter};
use crate::http::HttpClient;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use resolver_core::error::{ErrorCode, ProviderError};
use resolver_core::model::{now_unix, MediaIdentity, MediaKind, ParseCandidate, ProviderKind, ProviderOrigin};
use std::collections::HashMap;
use std::sync::Arc;

const USER_AGENT: &str = "media-resolver/0.1 (metadata resolution bot; see repository for contact)";

static INFOBOX_FIELD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*\|\s*([A-Za-z_][A-Za-z0-9_ ]*?)\s*=\s*(.*)$").unwrap());

pub struct WikipediaAdapter {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl WikipediaAdapter {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            base_url: "https://en.wikipedia.org/w/api.php".to_string(),
        }
    }

    fn search_url(&self, candidate: &ParseCandidate) -> String {
        format!(
            "{}?action=query&list=search&format=json&srsearch={}",
            self.base_url,
            urlencoding::encode(&candidate.title)
        )
    }

    fn wikitext_url(&self, page_title: &str) -> String {
        format!(
            "{}?action=parse&prop=wikitext&format=json&page={}",
            self.base_url,
            urlencoding::encode(page_title)
        )
    }
}

/// Locates the first `{{Infobox ...}}` template (film, television, television
/// season, ...) by brace-depth matching and returns its `|key = value` pairs.
/// `None` if no Infobox template is present at all.
fn extract_infobox_fields(wikitext: &str) -> Option<HashMap<String, String>> {
    let lower = wikitext.to_ascii_lowercase();
    let start = lower.find("{{infobox")?;

    let mut depth = 0i32;
    let mut end = None;
    let mut i = start;
    while i + 1 < wikitext.len() {
        match &wikitext[i..i + 2] {
            "{{" => {
                depth += 1;
                i += 2;
            }
            "}}" => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    end = Some(i);
                    break;
                }
            }
            _ => i += 1,
        }
    }
    let end = end?;
    let body = &wikitext[start..end];

    let mut fields = HashMap::new();
    for cap in INFOBOX_FIELD.captures_iter(body) {
        let key = cap[1].trim().to_ascii_lowercase();
        let value = clean_wiki_markup(cap[2].trim());
        if !value.is_empty() {
            fields.insert(key, value);
        }
    }
    Some(fields)
}

/// Strips the common wikitext markup found inside Infobox field values:
/// `[[target|display]]` wikilinks keep `display`, bare `[[target]]` keeps
/// `target`, and `{{template|args}}` templates are dropped entirely since
/// they're almost always formatting (`{{nowrap|...}}`) rather than content.
fn clean_wiki_markup(value: &str) -> String {
    let mut out = String::new();
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '[' && chars.peek() == Some(&'[') {
            chars.next();
            let mut link = String::new();
            while let Some(&c2) = chars.peek() {
                if c2 == ']' {
                    chars.next();
                    if chars.peek() == Some(&']') {
                        chars.next();
                    }
                    break;
                }
                link.push(c2);
                chars.next();
            }
            let display = link.rsplit('|').next().unwrap_or(&link);
            out.push_str(display);
        } else if c == '{' && chars.peek() == Some(&'{') {
            chars.next();
            let mut depth = 1;
            while let Some(c2) = chars.next() {
                if c2 == '{' && chars.peek() == Some(&'{') {
                    chars.next();
                    depth += 1;
                } else if c2 == '}' && chars.peek() == Some(&'}') {
                    chars.next();
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
            }
        } else {
            out.push(c);
        }
    }
    out.trim().trim_matches('\'').trim().to_string()
}

#[async_trait]
impl ProviderAdapter for WikipediaAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Wikipedia
    }

    async fn search(&self, candidate: &ParseCandidate) -> Result<MediaIdentity, ProviderError> {
        let headers = [("User-Agent", USER_AGENT)];

        let body = self.http.get_json_with_headers(&self.search_url(candidate), &headers).await?;
        let first = body
            .get("query")
            .and_then(|q| q.get("search"))
            .and_then(|s| s.as_array())
            .and_then(|arr| arr.first())
            .ok_or_else(|| ProviderError::new(ErrorCode::MetadataNoResults, "no Wikipedia results"))?;

        let page_title = first.get("title").and_then(|v| v.as_str()).unwrap_or(&candidate.title).to_string();
        let page_id = first.get("pageid").map(|v| v.to_string()).unwrap_or_default();
        let snippet_overview = first
            .get("snippet")
            .and_then(|v| v.as_str())
            .map(|s| s.replace("<span class=\"searchmatch\">", "").replace("</span>", ""));

        let parse_body = self.http.get_json_with_headers(&self.wikitext_url(&page_title), &headers).await?;
        let wikitext = parse_body
            .get("parse")
            .and_then(|p| p.get("wikitext"))
            .and_then(|w| w.get("*"))
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let fields = extract_infobox_fields(wikitext).ok_or_else(|| {
            ProviderError::new(ErrorCode::MetadataNoResults, format!("no Infobox template on \"{page_title}\""))
        })?;

        let by_language: Vec<(&str, &str)> = [
            fields.get("traditional").map(|v| ("zh-TW", v.as_str())),
            fields.get("simplified").map(|v| ("zh-CN", v.as_str())),
            fields.get("name").map(|v| ("en", v.as_str())),
        ]
        .into_iter()
        .flatten()
        .collect();

        let title_primary = pick_preferred(&by_language).map(str::to_string).unwrap_or_else(|| page_title.clone());

        if title_primary.trim().is_empty() {
            return Err(ProviderError::new(ErrorCode::MetadataNoResults, format!("Infobox on \"{page_title}\" has no name field")));
        }

        Ok(MediaIdentity {
            kind: if candidate.is_episodic() { MediaKind::Series } else { MediaKind::Movie },
            provider_id: page_id,
            provider_origin: ProviderOrigin::Wikipedia,
            title_primary,
            title_original: fields.get("name").cloned().unwrap_or(page_title),
            title_alternatives: Vec::new(),
            year: candidate.year,
            overview: snippet_overview,
            genres: Vec::new(),
            cast: Vec::new(),
            crew: Vec::new(),
            poster_ref: None,
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
    use serde_json::{json, Value};
    use std::sync::Mutex;

    struct StubHttp {
        responses: Mutex<Vec<Value>>,
        seen_headers: Mutex<Vec<Vec<(String, String)>>>,
    }

    impl StubHttp {
        fn new(responses: Vec<Value>) -> Self {
            Self {
                responses: Mutex::new(responses),
                seen_headers: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for StubHttp {
        async fn get_json_with_headers(&self, _url: &str, headers: &[(&str, &str)]) -> Result<serde_json::Value, ProviderError> {
            self.seen_headers
                .lock()
                .unwrap()
                .push(headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect());
            let mut responses = self.responses.lock().unwrap();
            Ok(responses.remove(0))
        }
    }

    fn search_response(title: &str, pageid: u64) -> Value {
        json!({"query": {"search": [{"title": title, "pageid": pageid, "snippet": "A <span class=\"searchmatch\">film</span>."}]}})
    }

    fn wikitext_response(wikitext: &str) -> Value {
        json!({"parse": {"wikitext": {"*": wikitext}}})
    }

    #[tokio::test]
    async fn extracts_traditional_chinese_title_from_infobox() {
        let wikitext = "{{Infobox film\n| name = Spirited Away\n| traditional = 神隱少女\n| simplified = 千与千寻\n}}";
        let http = Arc::new(StubHttp::new(vec![search_response("Spirited Away", 42), wikitext_response(wikitext)]));
        let adapter = WikipediaAdapter::new(http.clone());
        let candidate = ParseCandidate::new("f.mkv", "Spirited Away", ParserOrigin::Regex);

        let identity = adapter.search(&candidate).await.unwrap();

        assert_eq!(identity.title_primary, "神隱少女");
        assert_eq!(identity.title_original, "Spirited Away");
        assert!(identity.poster_ref.is_none());
        assert_eq!(identity.overview.as_deref(), Some("A film."));
        let headers = http.seen_headers.lock().unwrap();
        assert!(headers.iter().all(|h| h.iter().any(|(k, v)| k == "User-Agent" && v == USER_AGENT)));
    }

    #[tokio::test]
    async fn falls_back_to_english_name_when_no_chinese_variant_present() {
        let wikitext = "{{Infobox film\n| name = Arrival\n| director = Denis Villeneuve\n}}";
        let http = Arc::new(StubHttp::new(vec![search_response("Arrival", 7), wikitext_response(wikitext)]));
        let adapter = WikipediaAdapter::new(http);
        let candidate = ParseCandidate::new("f.mkv", "Arrival", ParserOrigin::Regex);

        let identity = adapter.search(&candidate).await.unwrap();
        assert_eq!(identity.title_primary, "Arrival");
    }

    #[tokio::test]
    async fn missing_infobox_is_no_results() {
        let http = Arc::new(StubHttp::new(vec![search_response("Obscure Page", 1), wikitext_response("Just prose, no template.")]));
        let adapter = WikipediaAdapter::new(http);
        let candidate = ParseCandidate::new("f.mkv", "Obscure Page", ParserOrigin::Regex);

        let err = adapter.search(&candidate).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MetadataNoResults);
    }

    #[tokio::test]
    async fn empty_search_is_no_results() {
        let http = Arc::new(StubHttp::new(vec![json!({"query": {"search": []}})]));
        let adapter = WikipediaAdapter::new(http);
        let candidate = ParseCandidate::new("f.mkv", "Unknown", ParserOrigin::Regex);
        let err = adapter.search(&candidate).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MetadataNoResults);
    }
}
