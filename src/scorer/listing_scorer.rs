use tracing::debug;

use crate::config::{rank_blend, OPPORTUNITY_SIGMOID_CENTER};
use crate::scorer::tiers;
use crate::state::settings::{Settings, Weights};
use crate::stats::normalizer::finite_or_zero;
use crate::stats::{Averages, DatasetStatistics, NormalizedListing};
use crate::types::{Listing, Metric, ScoredListing};

/// Score every normalized listing and sort by rank index, highest first.
/// Ties keep input order.
pub fn score_listings(
    listings: Vec<NormalizedListing>,
    stats: &DatasetStatistics,
    settings: &Settings,
) -> Vec<ScoredListing> {
    let mut scored: Vec<ScoredListing> = listings
        .into_iter()
        .map(|nl| score_listing(nl, stats, settings))
        .collect();
    scored.sort_by(|a, b| b.rank_index.total_cmp(&a.rank_index));

    if let (Some(first), Some(last)) = (scored.first(), scored.last()) {
        debug!(
            listings = scored.len(),
            top_rank = first.rank_index,
            bottom_rank = last.rank_index,
            "scored listings"
        );
    }
    scored
}

pub fn score_listing(nl: NormalizedListing, stats: &DatasetStatistics, settings: &Settings) -> ScoredListing {
    let performance_tiers = tiers::classify(&nl, &settings.tier_thresholds);
    let NormalizedListing { listing, norm_values, .. } = nl;
    let norm = |m: Metric| norm_values.get(&m).copied().unwrap_or(0.0);

    let composite_score = composite_score(&settings.weights, norm);
    let opportunity_score = opportunity_score(&listing, &stats.averages);
    let rank_index = rank_index(composite_score, opportunity_score, performance_tiers.len());

    ScoredListing {
        listing,
        norm_values,
        composite_score,
        opportunity_score,
        performance_tiers,
        rank_index,
    }
}

/// Weighted blend of the six composite metrics, scaled to 0–100.
/// Assumes the weights already sum to 1.
pub fn composite_score(weights: &Weights, norm: impl Fn(Metric) -> f64) -> f64 {
    let blended: f64 = Metric::WEIGHTED.iter().map(|m| weights.get(*m) * norm(*m)).sum();
    finite_or_zero(blended * 100.0).clamp(0.0, 100.0)
}

/// Multiplicative market-opportunity model squashed into 0–100.
///
/// Factors: revenue relative to the dataset, sales rate relative to the
/// dataset, a price premium that only counts when the listing also out-earns
/// the average, and conversion efficiency relative to the dataset.
pub fn opportunity_score(listing: &Listing, avg: &Averages) -> f64 {
    let relative_revenue = ratio(listing.est_revenue, avg.revenue);

    let sales_pct = if listing.total_views > 0.0 {
        listing.est_sales / listing.total_views * 100.0
    } else {
        0.0
    };
    let relative_sales_pct = ratio(sales_pct, avg.sales_pct);

    let price_ratio = ratio(listing.price, avg.price);
    let price_premium = if price_ratio > 1.0 && relative_revenue > 1.0 {
        price_ratio
    } else {
        1.0
    };

    let efficiency = match listing.views_per_sale {
        Some(vps) => finite_or_zero(avg.views_per_sale / vps),
        None => 0.0,
    };

    let raw = relative_revenue * relative_sales_pct * price_premium * efficiency;
    let score = 100.0 / (1.0 + (-raw + OPPORTUNITY_SIGMOID_CENTER).exp());
    finite_or_zero(score).clamp(0.0, 100.0)
}

pub fn rank_index(composite: f64, opportunity: f64, tier_count: usize) -> f64 {
    composite * rank_blend::COMPOSITE_WEIGHT
        + opportunity * rank_blend::OPPORTUNITY_WEIGHT
        + tier_count as f64 * rank_blend::TIER_POINTS * rank_blend::TIER_WEIGHT
}

/// `value / average`, or 0 when the average is 0.
fn ratio(value: f64, average: f64) -> f64 {
    if average == 0.0 {
        0.0
    } else {
        finite_or_zero(value / average)
    }
}
