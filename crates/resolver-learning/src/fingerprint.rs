//! Fingerprinting (§3 `LearningRule.fingerprint`, §4.K, §9 Open Question:
//! "what exactly is a fingerprint?"). Decision recorded in DESIGN.md: strip
//! the extension and every tag the regex parser already recognizes
//! (quality, codec, release group, season/episode, year), lowercase what's
//! left, and collapse whitespace. Two filenames that differ only by
//! encoding/release metadata collapse to the same fingerprint, so a
//! manual correction made for one release of a title applies to every
//! other release of it.

use once_cell::sync::Lazy;
use regex::Regex;

static SEASON_EPISODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[\. _-]s\d{1,2}e\d{1,3}[\. _-]?").unwrap());
static SEASON_EPISODE_X: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[\. _-]\d{1,2}x\d{1,3}[\. _-]").unwrap());
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\(\[\.\s](?:19\d{2}|20\d{2})[\)\]\.\s]").unwrap());
static QUALITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(2160p|1080p|720p|480p|4k|hdr10?|uhd)\b").unwrap());
static CODEC: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(x264|x265|h\.?264|h\.?265|hevc|avc|av1)\b").unwrap());
static RELEASE_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"-[A-Za-z0-9]+$").unwrap());
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\._\-]+").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

pub fn fingerprint(filename: &str) -> String {
    let stem = strip_extension(filename);
    let stem = RELEASE_GROUP.replace(&stem, "");
    let stem = SEASON_EPISODE.replace_all(&stem, " ");
    let stem = SEASON_EPISODE_X.replace_all(&stem, " ");
    let stem = YEAR.replace_all(&stem, " ");
    let stem = QUALITY.replace_all(&stem, " ");
    let stem = CODEC.replace_all(&stem, " ");
    let stem = SEPARATORS.replace_all(&stem, " ");
    let stem = WHITESPACE.replace_all(stem.trim(), " ");
    stem.to_lowercase()
}

fn strip_extension(filename: &str) -> String {
    match filename.rfind('.') {
        Some(idx) if filename.len() - idx <= 5 => filename[..idx].to_string(),
        _ => filename.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn different_releases_of_the_same_title_collapse() {
        let a = fingerprint("The.Matrix.1999.1080p.BluRay.x264-GROUP.mkv");
        let b = fingerprint("the_matrix_1999_720p_x265-OTHER.mp4");
        assert_eq!(a, b);
    }

    #[test]
    fn different_episodes_collapse_to_the_same_show_fingerprint() {
        let a = fingerprint("Show.Name.S01E01.720p.mkv");
        let b = fingerprint("Show.Name.S01E02.1080p.mkv");
        assert_eq!(a, b);
    }

    #[test]
    fn different_titles_do_not_collapse() {
        assert_ne!(fingerprint("Movie A.2020.mkv"), fingerprint("Movie B.2020.mkv"));
    }
}
