//! Engine-wide configuration (§6 "Configuration").
//!
//! The core recognizes these options and validates them; *loading* them from
//! a file or environment is explicitly a collaborator concern (§1 Non-goals).

use crate::model::ProviderKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffSettings {
    pub base_secs: u64,
    pub multiplier: f64,
    pub cap_secs: u64,
    pub jitter_pct: f64,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            base_secs: 1,
            multiplier: 2.0,
            cap_secs: 8,
            jitter_pct: 0.10,
        }
    }
}

impl BackoffSettings {
    pub fn base(&self) -> Duration {
        secs(self.base_secs)
    }
    pub fn cap(&self) -> Duration {
        secs(self.cap_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub failure_window_secs: u64,
    pub recovery_timeout_secs: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window_secs: 60,
            recovery_timeout_secs: 60,
        }
    }
}

impl BreakerSettings {
    pub fn failure_window(&self) -> Duration {
        secs(self.failure_window_secs)
    }
    pub fn recovery_timeout(&self) -> Duration {
        secs(self.recovery_timeout_secs)
    }
}

/// Token-bucket sizing for one provider: `calls` permits refilled uniformly
/// every `per`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatePolicy {
    pub calls: u32,
    pub per_secs: u64,
}

impl RatePolicy {
    pub fn new(calls: u32, per: Duration) -> Self {
        Self {
            calls,
            per_secs: per.as_secs().max(1),
        }
    }
    pub fn per(&self) -> Duration {
        secs(self.per_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub per_provider: HashMap<ProviderKind, RatePolicy>,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        let mut per_provider = HashMap::new();
        // §4.C declared policies.
        per_provider.insert(ProviderKind::Tmdb, RatePolicy::new(40, secs(10)));
        per_provider.insert(ProviderKind::Douban, RatePolicy::new(1, secs(2)));
        per_provider.insert(ProviderKind::Wikipedia, RatePolicy::new(1, secs(1)));
        per_provider.insert(ProviderKind::AiAssisted, RatePolicy::new(10, secs(60)));
        Self { per_provider }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheTtlSettings {
    pub metadata_secs: u64,
    pub ai_parse_secs: u64,
    pub memory_cache_bytes: u64,
}

impl Default for CacheTtlSettings {
    fn default() -> Self {
        Self {
            metadata_secs: 24 * 3600,
            ai_parse_secs: 30 * 24 * 3600,
            memory_cache_bytes: 100 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiParseSettings {
    pub timeout_secs: u64,
    pub target_secs: u64,
    pub max_alternatives: u8,
}

impl Default for AiParseSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            target_secs: 10,
            max_alternatives: 4,
        }
    }
}

impl AiParseSettings {
    pub fn timeout(&self) -> Duration {
        secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub tick_secs: u64,
    pub max_concurrent: usize,
    pub grace_secs: u64,
    pub max_retry_attempts: u32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_secs: 1,
            max_concurrent: 5,
            grace_secs: 30,
            max_retry_attempts: 4,
        }
    }
}

impl SchedulerSettings {
    pub fn tick(&self) -> Duration {
        secs(self.tick_secs)
    }
    pub fn grace(&self) -> Duration {
        secs(self.grace_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub provider_order: Vec<ProviderKind>,
    pub backoff: BackoffSettings,
    pub breaker: BreakerSettings,
    pub rate_limits: RateLimitSettings,
    pub cache_ttl: CacheTtlSettings,
    pub ai_parse: AiParseSettings,
    pub scheduler: SchedulerSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider_order: ProviderKind::METADATA_PROVIDERS.to_vec(),
            backoff: BackoffSettings::default(),
            breaker: BreakerSettings::default(),
            rate_limits: RateLimitSettings::default(),
            cache_ttl: CacheTtlSettings::default(),
            ai_parse: AiParseSettings::default(),
            scheduler: SchedulerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("provider_order must list only metadata providers (tmdb/douban/wikipedia)")]
    InvalidProviderOrder,
    #[error("breaker_failure_threshold must be > 0")]
    InvalidFailureThreshold,
    #[error("scheduler_max_concurrent must be > 0")]
    InvalidMaxConcurrent,
    #[error("max_retry_attempts must be > 0")]
    InvalidMaxAttempts,
    #[error("backoff multiplier must be >= 1.0")]
    InvalidBackoffMultiplier,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider_order.is_empty()
            || self
                .provider_order
                .iter()
                .any(|p| *p == ProviderKind::AiAssisted)
        {
            return Err(ConfigError::InvalidProviderOrder);
        }
        if self.breaker.failure_threshold == 0 {
            return Err(ConfigError::InvalidFailureThreshold);
        }
        if self.scheduler.max_concurrent == 0 {
            return Err(ConfigError::InvalidMaxConcurrent);
        }
        if self.scheduler.max_retry_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts);
        }
        if self.backoff.multiplier < 1.0 {
            return Err(ConfigError::InvalidBackoffMultiplier);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_ai_assisted_in_provider_order() {
        let mut cfg = EngineConfig::default();
        cfg.provider_order.push(ProviderKind::AiAssisted);
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidProviderOrder));
    }

    #[test]
    fn rejects_zero_failure_threshold() {
        let mut cfg = EngineConfig::default();
        cfg.breaker.failure_threshold = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidFailureThreshold));
    }
}
