use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Raw input rows
// ---------------------------------------------------------------------------

/// One cell of a parsed CSV row. CSV text yields `Text`; JSON uploads may carry numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

/// Column name → cell, as produced by CSV parsing with an arbitrary header set.
pub type RawRow = HashMap<String, RawValue>;

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Canonical listing. Built once per accepted row and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub keyword: String,
    pub shop_name: String,
    pub listing_title: String,
    pub listing_age_days: f64,
    pub total_views: f64,
    pub daily_views: f64,
    pub daily_views_percent: f64,
    pub price: f64,
    pub est_sales: f64,
    pub est_revenue: f64,
    pub hearts: f64,
    /// `total_views / est_sales`; `None` until the listing has a sale.
    pub views_per_sale: Option<f64>,
    pub sales_rate_percent: f64,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Revenue,
    Sales,
    DailyViews,
    Efficiency,
    Hearts,
    Age,
    Price,
    VisibilityRatio,
    PriceOptimization,
}

impl Metric {
    pub const ALL: [Metric; 9] = [
        Metric::Revenue,
        Metric::Sales,
        Metric::DailyViews,
        Metric::Efficiency,
        Metric::Hearts,
        Metric::Age,
        Metric::Price,
        Metric::VisibilityRatio,
        Metric::PriceOptimization,
    ];

    /// Metrics that carry a user weight in the composite score.
    pub const WEIGHTED: [Metric; 6] = [
        Metric::Revenue,
        Metric::Sales,
        Metric::DailyViews,
        Metric::Efficiency,
        Metric::Hearts,
        Metric::Age,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Revenue => "revenue",
            Metric::Sales => "sales",
            Metric::DailyViews => "dailyViews",
            Metric::Efficiency => "efficiency",
            Metric::Hearts => "hearts",
            Metric::Age => "age",
            Metric::Price => "price",
            Metric::VisibilityRatio => "visibilityRatio",
            Metric::PriceOptimization => "priceOptimization",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Performance tiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TierTag {
    /// Revenue percentile in the configured top percent.
    HighRevenue,
    /// Fewer views per sale than the configured threshold.
    ConversionChampion,
    /// Daily views share at or above the configured threshold.
    GrowthPerformer,
    /// Views-per-day-of-age percentile in the configured top percent.
    VisibilityChampion,
    /// Revenue/price percentile in the fixed top 10%.
    PriceOptimizer,
    /// Young listing that already sells.
    RisingStar,
}

impl TierTag {
    pub const ALL: [TierTag; 6] = [
        TierTag::HighRevenue,
        TierTag::ConversionChampion,
        TierTag::GrowthPerformer,
        TierTag::VisibilityChampion,
        TierTag::PriceOptimizer,
        TierTag::RisingStar,
    ];
}

impl std::fmt::Display for TierTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TierTag::HighRevenue => "highRevenue",
            TierTag::ConversionChampion => "conversionChampion",
            TierTag::GrowthPerformer => "growthPerformer",
            TierTag::VisibilityChampion => "visibilityChampion",
            TierTag::PriceOptimizer => "priceOptimizer",
            TierTag::RisingStar => "risingStar",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Scored listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredListing {
    #[serde(flatten)]
    pub listing: Listing,
    /// Per-metric normalized value in [0, 1].
    pub norm_values: BTreeMap<Metric, f64>,
    pub composite_score: f64,
    pub opportunity_score: f64,
    pub performance_tiers: BTreeSet<TierTag>,
    pub rank_index: f64,
}

impl ScoredListing {
    pub fn id(&self) -> &str {
        &self.listing.id
    }

    pub fn keyword(&self) -> &str {
        &self.listing.keyword
    }

    #[cfg(test)]
    pub fn norm(&self, metric: Metric) -> f64 {
        self.norm_values.get(&metric).copied().unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Settings enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationMethod {
    #[default]
    Percentile,
    MinMax,
    ZScore,
}

impl NormalizationMethod {
    pub const ALL: [NormalizationMethod; 3] = [
        NormalizationMethod::Percentile,
        NormalizationMethod::MinMax,
        NormalizationMethod::ZScore,
    ];
}

impl std::fmt::Display for NormalizationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NormalizationMethod::Percentile => "percentile",
            NormalizationMethod::MinMax => "minmax",
            NormalizationMethod::ZScore => "zscore",
        };
        write!(f, "{s}")
    }
}

impl FromStr for NormalizationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "percentile" => Ok(NormalizationMethod::Percentile),
            "minmax" => Ok(NormalizationMethod::MinMax),
            "zscore" => Ok(NormalizationMethod::ZScore),
            other => Err(format!("unknown normalization method '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionStrategy {
    /// Keyword-seeded A list with a per-keyword cap.
    #[default]
    Balanced,
    /// Top listings per keyword, pooled and re-ranked.
    Micro,
    /// Global rank order, keyword boundaries ignored.
    Macro,
}

impl SelectionStrategy {
    pub const ALL: [SelectionStrategy; 3] = [
        SelectionStrategy::Balanced,
        SelectionStrategy::Micro,
        SelectionStrategy::Macro,
    ];
}

impl std::fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SelectionStrategy::Balanced => "balanced",
            SelectionStrategy::Micro => "micro",
            SelectionStrategy::Macro => "macro",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SelectionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "balanced" => Ok(SelectionStrategy::Balanced),
            "micro" => Ok(SelectionStrategy::Micro),
            "macro" => Ok(SelectionStrategy::Macro),
            other => Err(format!("unknown selection strategy '{other}'")),
        }
    }
}
