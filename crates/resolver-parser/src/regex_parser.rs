//! Structural filename parsing (§4.F). Extracts title, year, season/episode,
//! quality, codec and release-group tags with plain regexes, then scores a
//! confidence that determines whether AI escalation (§4.G) is needed.

use once_cell::sync::Lazy;
use regex::Regex;
use resolver_core::model::{ParseCandidate, ParserOrigin};
use std::time::Instant;

static SEASON_EPISODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[\. _-]s(\d{1,2})e(\d{1,3})[\. _-]?").unwrap());
static SEASON_EPISODE_X: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[\. _-](\d{1,2})x(\d{1,3})[\. _-]").unwrap());
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\(\[\.\s](19\d{2}|20\d{2})[\)\]\.\s]").unwrap());
static QUALITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(2160p|1080p|720p|480p|4k|hdr10?|uhd)\b").unwrap());
static CODEC: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(x264|x265|h\.?264|h\.?265|hevc|avc|av1)\b").unwrap());
static RELEASE_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"-([A-Za-z0-9]+)$").unwrap());
static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\[\(][^\[\]\(\)]*[\]\)]").unwrap());
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\._]+").unwrap());

pub struct RegexParser;

impl RegexParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses `filename` into a [`ParseCandidate`]. Structural only; never
    /// performs I/O, so it stays well within the §4.F 100ms budget.
    pub fn parse(&self, filename: &str) -> ParseCandidate {
        let started = Instant::now();
        let stem = strip_extension(filename);
        let normalized = SEPARATORS.replace_all(&stem, " ").to_string();

        let quality_tag = QUALITY.find(&normalized).map(|m| m.as_str().to_string());
        let codec_tag = CODEC.find(&normalized).map(|m| m.as_str().to_string());
        let release_group = RELEASE_GROUP
            .captures(&stem)
            .map(|c| c[1].to_string())
            .filter(|g| !looks_like_quality_or_codec(g));

        let (season, episode, title_end) = extract_episode(&normalized);
        let year = extract_year(&normalized);

        let title_bound = title_end.unwrap_or_else(|| {
            year.map(|(_, pos)| pos).unwrap_or(normalized.len())
        });
        let title = normalized[..title_bound.min(normalized.len())].trim().to_string();

        let mut candidate = ParseCandidate::new(filename, title, ParserOrigin::Regex);
        if let Some((year, _)) = year {
            candidate = candidate.with_year(year);
        }
        if let (Some(s), Some(e)) = (season, episode) {
            candidate = candidate.with_episode(s, e);
        }
        candidate.quality_tag = quality_tag;
        candidate.codec_tag = codec_tag;
        candidate.release_group = release_group;

        let confidence = score_confidence(&candidate, &stem);
        candidate = candidate.with_confidence(confidence);

        debug_assert!(started.elapsed().as_millis() < 100, "regex parse exceeded its latency budget");
        candidate
    }
}

impl Default for RegexParser {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_extension(filename: &str) -> String {
    match filename.rfind('.') {
        Some(idx) if filename.len() - idx <= 5 => filename[..idx].to_string(),
        _ => filename.to_string(),
    }
}

fn looks_like_quality_or_codec(s: &str) -> bool {
    QUALITY.is_match(s) || CODEC.is_match(s)
}

fn extract_episode(normalized: &str) -> (Option<u32>, Option<u32>, Option<usize>) {
    if let Some(caps) = SEASON_EPISODE.captures(normalized) {
        let m = caps.get(0).unwrap();
        return (
            caps[1].parse().ok(),
            caps[2].parse().ok(),
            Some(m.start()),
        );
    }
    if let Some(caps) = SEASON_EPISODE_X.captures(normalized) {
        let m = caps.get(0).unwrap();
        return (
            caps[1].parse().ok(),
            caps[2].parse().ok(),
            Some(m.start()),
        );
    }
    (None, None, None)
}

fn extract_year(normalized: &str) -> Option<(u16, usize)> {
    YEAR.captures(normalized).and_then(|caps| {
        let m = caps.get(1)?;
        caps[1].parse::<u16>().ok().map(|y| (y, m.start()))
    })
}

/// Penalizes: unexplained bracketed segments (fansub tags the regex parser
/// didn't recognize), missing year when no season/episode was found either,
/// and implausibly short titles (§4.F, §4.G escalation trigger at < 0.7).
fn score_confidence(candidate: &ParseCandidate, stem: &str) -> f64 {
    let mut score: f64 = 1.0;

    let unexplained_brackets = BRACKETED
        .find_iter(stem)
        .filter(|m| {
            let text = m.as_str();
            !QUALITY.is_match(text) && !CODEC.is_match(text) && !YEAR.is_match(text)
        })
        .count();
    score -= 0.2 * unexplained_brackets as f64;

    if candidate.year.is_none() && !candidate.is_episodic() {
        score -= 0.3;
    }

    if candidate.title.chars().filter(|c| c.is_alphanumeric()).count() < 3 {
        score -= 0.4;
    }

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_movie_with_year_and_tags() {
        let parser = RegexParser::new();
        let c = parser.parse("The.Matrix.1999.1080p.BluRay.x264-GROUP.mkv");
        assert_eq!(c.title, "The Matrix");
        assert_eq!(c.year, Some(1999));
        assert_eq!(c.quality_tag.as_deref(), Some("1080p"));
        assert_eq!(c.codec_tag.as_deref(), Some("x264"));
        assert_eq!(c.release_group.as_deref(), Some("GROUP"));
        assert!(c.is_confident());
    }

    #[test]
    fn parses_series_with_season_episode() {
        let parser = RegexParser::new();
        let c = parser.parse("Show.Name.S02E05.720p.mkv");
        assert_eq!(c.title, "Show Name");
        assert_eq!(c.season, Some(2));
        assert_eq!(c.episode, Some(5));
        assert!(c.is_episodic());
    }

    #[test]
    fn supports_x_notation_for_season_episode() {
        let parser = RegexParser::new();
        let c = parser.parse("Show Name 2x05.mkv");
        assert_eq!(c.season, Some(2));
        assert_eq!(c.episode, Some(5));
    }

    #[test]
    fn unexplained_brackets_lower_confidence() {
        let parser = RegexParser::new();
        let clean = parser.parse("The.Matrix.1999.1080p.mkv");
        let fansub = parser.parse("[FanGroup][Random Tag] Unknown Show [Weird].mkv");
        assert!(fansub.confidence < clean.confidence);
    }

    #[test]
    fn missing_year_and_episode_triggers_low_confidence() {
        let parser = RegexParser::new();
        let c = parser.parse("some_random_video_file.mkv");
        assert!(!c.is_confident());
    }
}
