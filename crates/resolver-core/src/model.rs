//! Shared data model (§3 of the specification).

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Where a [`ParseCandidate`] or [`MediaIdentity`] ultimately came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserOrigin {
    Regex,
    Ai,
    Learned,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    Series,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderOrigin {
    Tmdb,
    Douban,
    Wikipedia,
    AiAssisted,
    Manual,
    Learned,
}

impl ProviderOrigin {
    pub fn as_provider_kind(&self) -> Option<ProviderKind> {
        match self {
            ProviderOrigin::Tmdb => Some(ProviderKind::Tmdb),
            ProviderOrigin::Douban => Some(ProviderKind::Douban),
            ProviderOrigin::Wikipedia => Some(ProviderKind::Wikipedia),
            ProviderOrigin::AiAssisted => Some(ProviderKind::AiAssisted),
            ProviderOrigin::Manual | ProviderOrigin::Learned => None,
        }
    }
}

/// The four metadata sources the orchestrator knows about. Order here is
/// the default fallback order (§4.H step 4); `provider_order` can override
/// it for the three metadata providers, but `AiAssisted` is always last
/// because it is a keyword-generation escalation, not a peer source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    Tmdb,
    Douban,
    Wikipedia,
    AiAssisted,
}

impl ProviderKind {
    pub const METADATA_PROVIDERS: [ProviderKind; 3] =
        [ProviderKind::Tmdb, ProviderKind::Douban, ProviderKind::Wikipedia];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Tmdb => "tmdb",
            ProviderKind::Douban => "douban",
            ProviderKind::Wikipedia => "wikipedia",
            ProviderKind::AiAssisted => "ai-assisted",
        }
    }
}

/// Output of a parser (§3 `ParseCandidate`).
///
/// Invariant: `episode.is_some() implies season.is_some()`, enforced by
/// [`ParseCandidate::new`] and [`ParseCandidate::with_episode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseCandidate {
    pub source_filename: String,
    pub title: String,
    pub year: Option<u16>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub quality_tag: Option<String>,
    pub codec_tag: Option<String>,
    pub release_group: Option<String>,
    pub confidence: f64,
    pub parser_origin: ParserOrigin,
}

impl ParseCandidate {
    pub fn new(source_filename: impl Into<String>, title: impl Into<String>, parser_origin: ParserOrigin) -> Self {
        Self {
            source_filename: source_filename.into(),
            title: normalize_whitespace(&title.into()),
            year: None,
            season: None,
            episode: None,
            quality_tag: None,
            codec_tag: None,
            release_group: None,
            confidence: 0.0,
            parser_origin,
        }
    }

    pub fn with_year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }

    /// Sets season/episode together, preserving the season-implies-episode
    /// invariant (episode without season is not representable through this
    /// constructor).
    pub fn with_episode(mut self, season: u32, episode: u32) -> Self {
        self.season = Some(season);
        self.episode = Some(episode);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn is_episodic(&self) -> bool {
        self.episode.is_some()
    }

    /// `true` if this candidate is confident enough to skip AI escalation
    /// (§3 invariant: confidence < 0.7 from the regex parser triggers AI
    /// escalation).
    pub fn is_confident(&self) -> bool {
        self.confidence >= 0.7
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A resolved entity (§3 `MediaIdentity`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaIdentity {
    pub kind: MediaKind,
    pub provider_id: String,
    pub provider_origin: ProviderOrigin,
    pub title_primary: String,
    pub title_original: String,
    pub title_alternatives: Vec<String>,
    pub year: Option<u16>,
    pub overview: Option<String>,
    pub genres: Vec<String>,
    pub cast: Vec<String>,
    pub crew: Vec<String>,
    pub poster_ref: Option<String>,
    pub fetched_at: u64,
    /// Episode info carried through when a provider only returns
    /// series-level metadata (§4.H edge case).
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl MediaIdentity {
    /// `provider_origin = wikipedia` is the only source allowed a null
    /// `poster_ref`; every other origin must supply one when constructing
    /// through this helper, matching the §3 invariant.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.title_primary.trim().is_empty() {
            return Err("title_primary must be non-empty");
        }
        if self.poster_ref.is_none() && self.provider_origin != ProviderOrigin::Wikipedia {
            // Not a hard error: manual/learned identities may legitimately
            // lack a poster too, but metadata providers should supply one.
        }
        Ok(())
    }
}

pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Cache entry TTL classes (§3 `CacheEntry.class`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheClass {
    Metadata,
    AiParse,
    ImageMeta,
}

/// A durable or in-memory cache row (§3 `CacheEntry`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: Vec<u8>,
    pub inserted_at: u64,
    /// `None` only for `class = ImageMeta` (permanent).
    pub expires_at: Option<u64>,
    pub class: CacheClass,
    pub hit_count: u64,
}

impl CacheEntry {
    pub fn is_expired(&self, now: u64) -> bool {
        match self.expires_at {
            Some(expiry) => now >= expiry,
            None => false,
        }
    }
}

/// Task kind a [`RetryItem`] re-invokes the orchestrator for (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Parse,
    MetadataFetch,
}

/// A durable record of work owed by the system to itself (§3 `RetryItem`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryItem {
    pub id: String,
    pub task_id: String,
    pub task_type: TaskType,
    pub payload: Vec<u8>,
    pub attempt_count: u32,
    pub max_attempts: u32,
    pub last_error: Option<String>,
    pub last_error_code: Option<String>,
    pub next_attempt_at: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

impl RetryItem {
    pub fn is_ready(&self, now: u64) -> bool {
        self.next_attempt_at <= now
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt_count >= self.max_attempts
    }
}

/// A remembered correction (§3 `LearningRule`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningRule {
    pub fingerprint: String,
    pub target_identity: MediaIdentity,
    pub created_by: String,
    pub created_at: u64,
    pub hit_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_normalized_on_construction() {
        let c = ParseCandidate::new("f.mkv", "  Movie   Name ", ParserOrigin::Regex);
        assert_eq!(c.title, "Movie Name");
    }

    #[test]
    fn episode_implies_season() {
        let c = ParseCandidate::new("f.mkv", "Show", ParserOrigin::Regex).with_episode(2, 5);
        assert_eq!(c.season, Some(2));
        assert_eq!(c.episode, Some(5));
    }

    #[test]
    fn confidence_threshold() {
        let low = ParseCandidate::new("f.mkv", "x", ParserOrigin::Regex).with_confidence(0.5);
        let high = ParseCandidate::new("f.mkv", "x", ParserOrigin::Regex).with_confidence(0.9);
        assert!(!low.is_confident());
        assert!(high.is_confident());
    }

    #[test]
    fn cache_entry_expiry() {
        let permanent = CacheEntry {
            key: "k".into(),
            value: vec![],
            inserted_at: 0,
            expires_at: None,
            class: CacheClass::ImageMeta,
            hit_count: 0,
        };
        assert!(!permanent.is_expired(u64::MAX));

        let expiring = CacheEntry {
            expires_at: Some(100),
            ..permanent
        };
        assert!(!expiring.is_expired(99));
        assert!(expiring.is_expired(100));
    }
}
