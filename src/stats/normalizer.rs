use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::stats::metrics::raw_value;
use crate::types::{Listing, Metric, NormalizationMethod};

/// Metrics whose percentile ranks feed tier classification. Their ranks are
/// computed under every normalization method.
pub const TIER_PERCENTILE_METRICS: [Metric; 3] =
    [Metric::Revenue, Metric::VisibilityRatio, Metric::PriceOptimization];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    /// Listings contributing a finite value.
    pub count: usize,
}

/// Dataset-wide means used by the opportunity model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Averages {
    pub revenue: f64,
    pub sales: f64,
    pub daily_views: f64,
    pub price: f64,
    /// Mean over listings with at least one sale.
    pub views_per_sale: f64,
    /// Mean sales rate over listings with at least one view.
    pub sales_pct: f64,
}

/// Statistics for one scoring pass. Rebuilt from scratch every time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetStatistics {
    pub metrics: BTreeMap<Metric, SummaryStats>,
    /// Metric → listing id → percentile rank in [0, 1]. Reporting only: when
    /// two listings share an id the later one's rank is kept here, so tier
    /// classification reads [`NormalizedListing::tier_percentiles`] instead.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub percentiles: BTreeMap<Metric, HashMap<String, f64>>,
    pub averages: Averages,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedListing {
    pub listing: Listing,
    /// Per-metric value in [0, 1].
    pub norm_values: BTreeMap<Metric, f64>,
    /// This listing's own percentile rank for each tier metric it has a value for.
    pub tier_percentiles: BTreeMap<Metric, f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizationOutput {
    pub listings: Vec<NormalizedListing>,
    pub stats: DatasetStatistics,
}

/// Compute dataset statistics and per-listing normalized values.
/// An empty input yields empty output and empty statistics.
pub fn normalize(listings: &[Listing], method: NormalizationMethod) -> NormalizationOutput {
    if listings.is_empty() {
        return NormalizationOutput::default();
    }

    let mut stats = DatasetStatistics {
        averages: averages(listings),
        ..Default::default()
    };
    let mut norm_values: Vec<BTreeMap<Metric, f64>> = vec![BTreeMap::new(); listings.len()];
    let mut tier_percentiles: Vec<BTreeMap<Metric, f64>> = vec![BTreeMap::new(); listings.len()];

    for metric in Metric::ALL {
        let raw: Vec<Option<f64>> = listings.iter().map(|l| raw_value(l, metric)).collect();
        let mut sorted: Vec<f64> = raw.iter().flatten().copied().collect();
        sorted.sort_by(f64::total_cmp);
        let summary = summarize_sorted(&sorted);

        let tier_metric = TIER_PERCENTILE_METRICS.contains(&metric);
        if method == NormalizationMethod::Percentile || tier_metric {
            let ranks: Vec<Option<f64>> = raw.iter().map(|v| v.map(|v| percentile_rank(&sorted, v))).collect();
            if tier_metric {
                for (own, rank) in tier_percentiles.iter_mut().zip(&ranks) {
                    if let Some(rank) = rank {
                        own.insert(metric, *rank);
                    }
                }
            }
            let by_id = listings
                .iter()
                .zip(&ranks)
                .filter_map(|(l, rank)| rank.map(|r| (l.id.clone(), r)))
                .collect();
            stats.percentiles.insert(metric, by_id);
        }

        for (values, v) in norm_values.iter_mut().zip(&raw) {
            let norm = match v {
                Some(v) => normalize_value(*v, &sorted, &summary, method),
                None => 0.0,
            };
            values.insert(metric, finite_or_zero(norm));
        }

        stats.metrics.insert(metric, summary);
    }

    debug!(
        listings = listings.len(),
        %method,
        avg_revenue = stats.averages.revenue,
        avg_views_per_sale = stats.averages.views_per_sale,
        "normalized dataset"
    );

    NormalizationOutput {
        listings: listings
            .iter()
            .cloned()
            .zip(norm_values.into_iter().zip(tier_percentiles))
            .map(|(listing, (norm_values, tier_percentiles))| NormalizedListing {
                listing,
                norm_values,
                tier_percentiles,
            })
            .collect(),
        stats,
    }
}

fn normalize_value(v: f64, sorted: &[f64], s: &SummaryStats, method: NormalizationMethod) -> f64 {
    match method {
        NormalizationMethod::Percentile => percentile_rank(sorted, v),
        NormalizationMethod::MinMax => {
            if s.max == s.min {
                0.0
            } else {
                ((v - s.min) / (s.max - s.min)).clamp(0.0, 1.0)
            }
        }
        NormalizationMethod::ZScore => {
            let z = if s.std_dev == 0.0 { 0.0 } else { (v - s.mean) / s.std_dev };
            sigmoid(z)
        }
    }
}

/// Position of the first occurrence of `v` in `sorted`, over `n - 1`.
/// Tied values share the lowest index. A single-value dataset ranks 0.
pub fn percentile_rank(sorted: &[f64], v: f64) -> f64 {
    if sorted.len() <= 1 {
        return 0.0;
    }
    let idx = sorted.partition_point(|x| *x < v);
    idx as f64 / (sorted.len() - 1) as f64
}

fn summarize_sorted(sorted: &[f64]) -> SummaryStats {
    let n = sorted.len();
    if n == 0 {
        return SummaryStats::default();
    }
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    SummaryStats {
        min: sorted[0],
        max: sorted[n - 1],
        mean,
        median,
        std_dev: variance.sqrt(),
        count: n,
    }
}

fn averages(listings: &[Listing]) -> Averages {
    let n = listings.len() as f64;
    let mean_of = |f: fn(&Listing) -> f64| listings.iter().map(f).sum::<f64>() / n;

    let vps: Vec<f64> = listings.iter().filter_map(|l| l.views_per_sale).collect();
    let sales_pct: Vec<f64> = listings
        .iter()
        .filter(|l| l.total_views > 0.0)
        .map(|l| l.est_sales / l.total_views * 100.0)
        .collect();

    Averages {
        revenue: mean_of(|l| l.est_revenue),
        sales: mean_of(|l| l.est_sales),
        daily_views: mean_of(|l| l.daily_views),
        price: mean_of(|l| l.price),
        views_per_sale: mean_or_zero(&vps),
        sales_pct: mean_or_zero(&sales_pct),
    }
}

fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

pub fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
