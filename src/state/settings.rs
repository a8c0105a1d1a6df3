use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::types::{Metric, NormalizationMethod, SelectionStrategy};

/// Composite-score weights. Kept summing to 1 whenever any weight is nonzero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weights {
    pub revenue: f64,
    pub sales: f64,
    pub daily_views: f64,
    pub efficiency: f64,
    pub hearts: f64,
    pub age: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            revenue: 0.30,
            sales: 0.25,
            daily_views: 0.15,
            efficiency: 0.15,
            hearts: 0.10,
            age: 0.05,
        }
    }
}

impl Weights {
    /// Weight of a composite metric; unweighted metrics return 0.
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Revenue => self.revenue,
            Metric::Sales => self.sales,
            Metric::DailyViews => self.daily_views,
            Metric::Efficiency => self.efficiency,
            Metric::Hearts => self.hearts,
            Metric::Age => self.age,
            Metric::Price | Metric::VisibilityRatio | Metric::PriceOptimization => 0.0,
        }
    }

    pub fn sum(&self) -> f64 {
        Metric::WEIGHTED.iter().map(|m| self.get(*m)).sum()
    }

    /// Scale so the weights sum to 1. All-zero weights are left untouched.
    pub fn renormalize(&mut self) {
        let sum = self.sum();
        if sum > 0.0 {
            self.revenue /= sum;
            self.sales /= sum;
            self.daily_views /= sum;
            self.efficiency /= sum;
            self.hearts /= sum;
            self.age /= sum;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierThresholds {
    /// Top percent by revenue.
    pub high_revenue: f64,
    /// Views per sale strictly below this value.
    pub conversion: f64,
    /// Daily views share (percent) at or above this value.
    pub growth: f64,
    /// Top percent by views per day of age.
    pub visibility: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            high_revenue: 10.0,
            conversion: 50.0,
            growth: 5.0,
            visibility: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub weights: Weights,
    pub tier_thresholds: TierThresholds,
    pub normalization: NormalizationMethod,
    pub selection_strategy: SelectionStrategy,
}

// ---------------------------------------------------------------------------
// Partial updates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WeightsUpdate {
    pub revenue: Option<f64>,
    pub sales: Option<f64>,
    pub daily_views: Option<f64>,
    pub efficiency: Option<f64>,
    pub hearts: Option<f64>,
    pub age: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TierThresholdsUpdate {
    pub high_revenue: Option<f64>,
    pub conversion: Option<f64>,
    pub growth: Option<f64>,
    pub visibility: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SettingsUpdate {
    pub weights: Option<WeightsUpdate>,
    pub tier_thresholds: Option<TierThresholdsUpdate>,
    pub normalization: Option<NormalizationMethod>,
    pub selection_strategy: Option<SelectionStrategy>,
}

impl Settings {
    pub fn new(normalization: NormalizationMethod, selection_strategy: SelectionStrategy) -> Self {
        Self {
            normalization,
            selection_strategy,
            ..Default::default()
        }
    }

    /// Merge a partial update. Validation happens before anything changes, so a
    /// rejected update leaves the settings as they were.
    pub fn apply(&mut self, update: SettingsUpdate) -> Result<()> {
        let mut next = *self;

        if let Some(w) = update.weights {
            merge(&mut next.weights.revenue, w.revenue, "weights.revenue", non_negative)?;
            merge(&mut next.weights.sales, w.sales, "weights.sales", non_negative)?;
            merge(&mut next.weights.daily_views, w.daily_views, "weights.dailyViews", non_negative)?;
            merge(&mut next.weights.efficiency, w.efficiency, "weights.efficiency", non_negative)?;
            merge(&mut next.weights.hearts, w.hearts, "weights.hearts", non_negative)?;
            merge(&mut next.weights.age, w.age, "weights.age", non_negative)?;
        }
        next.weights.renormalize();

        if let Some(t) = update.tier_thresholds {
            let th = &mut next.tier_thresholds;
            merge(&mut th.high_revenue, t.high_revenue, "tierThresholds.highRevenue", percent)?;
            merge(&mut th.conversion, t.conversion, "tierThresholds.conversion", non_negative)?;
            merge(&mut th.growth, t.growth, "tierThresholds.growth", non_negative)?;
            merge(&mut th.visibility, t.visibility, "tierThresholds.visibility", percent)?;
        }

        if let Some(n) = update.normalization {
            next.normalization = n;
        }
        if let Some(s) = update.selection_strategy {
            next.selection_strategy = s;
        }

        *self = next;
        Ok(())
    }
}

fn merge(slot: &mut f64, value: Option<f64>, name: &str, valid: fn(f64) -> bool) -> Result<()> {
    let Some(v) = value else { return Ok(()) };
    if !valid(v) {
        return Err(AppError::InvalidSettings(format!("{name} out of range: {v}")));
    }
    *slot = v;
    Ok(())
}

fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

fn percent(v: f64) -> bool {
    v.is_finite() && (0.0..=100.0).contains(&v)
}
