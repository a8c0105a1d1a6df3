use crate::error::{AppError, Result};
use crate::types::{NormalizationMethod, SelectionStrategy};

/// Maximum members of each of the A, B and C shortlists.
pub const LIST_SIZE: usize = 21;

/// Micro strategy: how many of each keyword's best listings enter the shared pool.
pub const MICRO_PER_KEYWORD: usize = 10;

/// Balanced strategy, phase 1: listings seeded into A per keyword.
pub const BALANCED_SEED_PER_KEYWORD: usize = 3;

/// Balanced strategy, phase 2: hard cap on a single keyword's share of A.
pub const BALANCED_KEYWORD_CAP: usize = 5;

/// Rising star tier: maximum listing age in days (inclusive).
pub const RISING_STAR_MAX_AGE_DAYS: f64 = 60.0;

/// Rising star tier: minimum estimated sales (inclusive).
pub const RISING_STAR_MIN_SALES: f64 = 5.0;

/// Price optimizer tier: fixed top percent by revenue/price ratio.
pub const PRICE_OPTIMIZER_TOP_PERCENT: f64 = 10.0;

/// Rank index blend: `composite * W + opportunity * W + tiers * TIER_POINTS * W`.
pub mod rank_blend {
    pub const COMPOSITE_WEIGHT: f64 = 0.6;
    pub const OPPORTUNITY_WEIGHT: f64 = 0.3;
    pub const TIER_POINTS: f64 = 5.0;
    pub const TIER_WEIGHT: f64 = 0.1;
}

/// Opportunity sigmoid: raw opportunity of `CENTER` maps to a score of 50.
pub const OPPORTUNITY_SIGMOID_CENTER: f64 = 3.0;

/// Age bell curve `exp(-((ln(age) - PEAK_LN)^2) / 2)`; e^4 ≈ 55 days.
pub const AGE_BELL_PEAK_LN: f64 = 4.0;

pub const DEFAULT_API_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq)]
pub struct PreloadFile {
    pub path: String,
    /// Explicit keyword; derived from the file name when absent.
    pub keyword: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub api_port: u16,
    /// CSV exports loaded at startup (PRELOAD_FILES, comma-separated `path[=keyword]`).
    /// Example: "exports/wall-art.csv=wall art,exports/mugs.csv"
    pub preload_files: Vec<PreloadFile>,
    /// Initial normalization method (DEFAULT_NORMALIZATION).
    pub default_normalization: NormalizationMethod,
    /// Initial selection strategy (DEFAULT_SELECTION_STRATEGY).
    pub default_strategy: SelectionStrategy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| DEFAULT_API_PORT.to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            preload_files: parse_preload_files(&std::env::var("PRELOAD_FILES").unwrap_or_default()),
            default_normalization: match std::env::var("DEFAULT_NORMALIZATION") {
                Ok(s) => s.parse().map_err(AppError::Config)?,
                Err(_) => NormalizationMethod::default(),
            },
            default_strategy: match std::env::var("DEFAULT_SELECTION_STRATEGY") {
                Ok(s) => s.parse().map_err(AppError::Config)?,
                Err(_) => SelectionStrategy::default(),
            },
        })
    }
}

/// `"a.csv=wall art, b.csv"` → `[a.csv (wall art), b.csv (derived)]`.
pub fn parse_preload_files(raw: &str) -> Vec<PreloadFile> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((path, keyword)) => PreloadFile {
                path: path.trim().to_string(),
                keyword: Some(keyword.trim().to_string()).filter(|k| !k.is_empty()),
            },
            None => PreloadFile {
                path: entry.to_string(),
                keyword: None,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preload_entries_split_path_and_keyword() {
        let files = parse_preload_files(" a.csv=wall art ,b.csv,, c.csv= ");
        assert_eq!(
            files,
            vec![
                PreloadFile { path: "a.csv".into(), keyword: Some("wall art".into()) },
                PreloadFile { path: "b.csv".into(), keyword: None },
                PreloadFile { path: "c.csv".into(), keyword: None },
            ]
        );
    }

    #[test]
    fn empty_preload_is_empty() {
        assert!(parse_preload_files("").is_empty());
    }
}
