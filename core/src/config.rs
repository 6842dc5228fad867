use crate::error::{Result, SearchError};
use serde::Deserialize;
use std::time::Duration;

/// Tunables shared by the engine and the orchestrator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of hits a single search returns.
    pub max_results: usize,
    /// Quiet period after the last query edit before a search is dispatched.
    pub debounce_ms: u64,
    /// Fraction of OR-combined term clauses a hit must satisfy.
    pub min_should_match_ratio: f64,
    /// Minimum-should-match is imposed only when the clause count exceeds this.
    pub min_should_match_threshold: usize,
    /// Clauses past this count are dropped from a multi-term query.
    pub max_clause_count: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 100,
            debounce_ms: 300,
            min_should_match_ratio: 0.6,
            min_should_match_threshold: 1,
            max_clause_count: 1024,
        }
    }
}

impl SearchConfig {
    /// Defaults overlaid with `SEARCH_MAX_RESULTS`, `SEARCH_DEBOUNCE_MS` and
    /// `SEARCH_MIN_SHOULD_MATCH` when they are set and parse.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("SEARCH_MAX_RESULTS") {
            cfg.max_results = parse_env("SEARCH_MAX_RESULTS", &v)?;
        }
        if let Ok(v) = std::env::var("SEARCH_DEBOUNCE_MS") {
            cfg.debounce_ms = parse_env("SEARCH_DEBOUNCE_MS", &v)?;
        }
        if let Ok(v) = std::env::var("SEARCH_MIN_SHOULD_MATCH") {
            cfg.min_should_match_ratio = parse_env("SEARCH_MIN_SHOULD_MATCH", &v)?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_results == 0 {
            return Err(SearchError::Config("max_results must be positive".into()));
        }
        if !(self.min_should_match_ratio > 0.0 && self.min_should_match_ratio <= 1.0) {
            return Err(SearchError::Config(format!(
                "min_should_match_ratio must be in (0, 1], got {}",
                self.min_should_match_ratio
            )));
        }
        if self.max_clause_count == 0 {
            return Err(SearchError::Config("max_clause_count must be positive".into()));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| SearchError::Config(format!("{name}={raw:?} is not a valid value")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let cfg = SearchConfig::from_json(r#"{ "debounce_ms": 50 }"#).unwrap();
        assert_eq!(cfg.debounce_ms, 50);
        assert_eq!(cfg.max_results, 100);
        assert!((cfg.min_should_match_ratio - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_out_of_range_ratio() {
        let err = SearchConfig::from_json(r#"{ "min_should_match_ratio": 1.5 }"#).unwrap_err();
        assert_eq!(err.code(), "INVALID_CONFIG");
    }
}
