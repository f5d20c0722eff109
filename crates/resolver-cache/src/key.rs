//! Cache key schema (§3, §6): `{source}:{kind}:{identifier}:{schema_version}`.
//! Bumping `SCHEMA_VERSION` invalidates every previously written key without
//! needing a migration, since lookups under the old version simply miss.

pub const SCHEMA_VERSION: u32 = 1;

pub fn metadata_key(provider: &str, identifier: &str) -> String {
    format!("metadata:{provider}:{identifier}:{SCHEMA_VERSION}")
}

pub fn image_meta_key(provider: &str, identifier: &str) -> String {
    format!("image-meta:{provider}:{identifier}:{SCHEMA_VERSION}")
}

/// AI-parse results are keyed by a content address of the normalized
/// filename rather than the filename itself, so keys stay a fixed size and
/// two filenames differing only by whitespace hit the same entry.
pub fn ai_parse_key(normalized_filename: &str) -> String {
    let digest = blake3::hash(normalized_filename.as_bytes());
    format!("ai-parse:content:{}:{SCHEMA_VERSION}", digest.to_hex())
}

/// Metadata cache key for a parse candidate, used before a provider (and
/// therefore a `provider_id`) is known. Content-addressed over the fields
/// that identify the work, so two candidates parsed from different
/// filenames for the same title/year/episode share a cache entry.
pub fn candidate_key(title: &str, year: Option<u16>, season: Option<u32>, episode: Option<u32>) -> String {
    let composite = format!(
        "{}|{}|{}|{}",
        title.trim().to_lowercase(),
        year.map(|y| y.to_string()).unwrap_or_default(),
        season.map(|s| s.to_string()).unwrap_or_default(),
        episode.map(|e| e.to_string()).unwrap_or_default(),
    );
    let digest = blake3::hash(composite.as_bytes());
    format!("metadata:candidate:{}:{SCHEMA_VERSION}", digest.to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_key_encodes_schema_version() {
        assert_eq!(metadata_key("tmdb", "603"), format!("metadata:tmdb:603:{SCHEMA_VERSION}"));
    }

    #[test]
    fn ai_parse_key_is_stable_for_same_input() {
        assert_eq!(ai_parse_key("show.s01e02.mkv"), ai_parse_key("show.s01e02.mkv"));
        assert_ne!(ai_parse_key("show.s01e02.mkv"), ai_parse_key("show.s01e03.mkv"));
    }

    #[test]
    fn candidate_key_ignores_case() {
        assert_eq!(
            candidate_key("Movie Name", Some(2020), None, None),
            candidate_key("movie name", Some(2020), None, None)
        );
    }

    #[test]
    fn candidate_key_distinguishes_episodes() {
        assert_ne!(
            candidate_key("Show", Some(2020), Some(1), Some(1)),
            candidate_key("Show", Some(2020), Some(1), Some(2))
        );
    }
}
