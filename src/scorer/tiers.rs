use std::collections::BTreeSet;

use crate::config::{PRICE_OPTIMIZER_TOP_PERCENT, RISING_STAR_MAX_AGE_DAYS, RISING_STAR_MIN_SALES};
use crate::state::settings::TierThresholds;
use crate::stats::NormalizedListing;
use crate::types::{Metric, TierTag};

/// Classify a listing into zero or more performance tiers.
///
/// Percentile-based tiers read the listing's own ranks; a listing without a
/// rank for that metric is not a member.
pub fn classify(nl: &NormalizedListing, th: &TierThresholds) -> BTreeSet<TierTag> {
    let listing = &nl.listing;
    let mut tiers = BTreeSet::new();
    let pct = |metric: Metric| nl.tier_percentiles.get(&metric).copied();

    if in_top_percent(pct(Metric::Revenue), th.high_revenue) {
        tiers.insert(TierTag::HighRevenue);
    }
    if listing.views_per_sale.is_some_and(|vps| vps < th.conversion) {
        tiers.insert(TierTag::ConversionChampion);
    }
    if listing.daily_views_percent >= th.growth {
        tiers.insert(TierTag::GrowthPerformer);
    }
    if in_top_percent(pct(Metric::VisibilityRatio), th.visibility) {
        tiers.insert(TierTag::VisibilityChampion);
    }
    if in_top_percent(pct(Metric::PriceOptimization), PRICE_OPTIMIZER_TOP_PERCENT) {
        tiers.insert(TierTag::PriceOptimizer);
    }
    if listing.listing_age_days <= RISING_STAR_MAX_AGE_DAYS && listing.est_sales >= RISING_STAR_MIN_SALES {
        tiers.insert(TierTag::RisingStar);
    }

    tiers
}

/// True when a [0, 1] percentile rank falls inside the top `top_percent` percent.
pub fn in_top_percent(percentile: Option<f64>, top_percent: f64) -> bool {
    match percentile {
        Some(p) if top_percent > 0.0 => p >= 1.0 - top_percent / 100.0,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::normalizer::build_listing;
    use crate::ingest::schema::{ListingIdentity, RawMetrics};
    use crate::stats::normalize;
    use crate::types::{Listing, NormalizationMethod};

    fn listing(title: &str, m: RawMetrics) -> Listing {
        let identity = ListingIdentity {
            shop_name: "Shop".into(),
            listing_title: title.into(),
        };
        build_listing(identity, m, "k")
    }

    fn plain(title: &str, revenue: f64) -> Listing {
        listing(
            title,
            RawMetrics {
                est_revenue: revenue,
                listing_age_days: 400.0,
                ..Default::default()
            },
        )
    }

    /// A listing outside any dataset: no percentile ranks at all.
    fn alone(l: Listing) -> NormalizedListing {
        NormalizedListing {
            listing: l,
            norm_values: Default::default(),
            tier_percentiles: Default::default(),
        }
    }

    fn classify_all(listings: &[Listing], th: &TierThresholds) -> Vec<BTreeSet<TierTag>> {
        normalize(listings, NormalizationMethod::MinMax)
            .listings
            .iter()
            .map(|nl| classify(nl, th))
            .collect()
    }

    fn members(tiers: &[BTreeSet<TierTag>], tag: TierTag) -> Vec<usize> {
        tiers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.contains(&tag))
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn high_revenue_uses_percentile_cutoff() {
        let listings: Vec<Listing> = (0..20).map(|i| plain(&format!("l{i}"), i as f64 * 10.0)).collect();
        let tiers = classify_all(&listings, &TierThresholds::default());
        // 18/19 ≈ 0.947 is inside the top 10%, 17/19 ≈ 0.895 is not.
        assert_eq!(members(&tiers, TierTag::HighRevenue), [18, 19]);
    }

    #[test]
    fn high_revenue_follows_each_listing_when_ids_collide() {
        let mut listings = vec![plain("dup", 10_000.0)];
        listings.extend((0..18).map(|i| plain(&format!("l{i}"), i as f64 * 10.0)));
        listings.push(plain("dup", 0.0));
        assert_eq!(listings[0].id, listings[19].id);

        let tiers = classify_all(&listings, &TierThresholds::default());
        assert!(tiers[0].contains(&TierTag::HighRevenue));
        assert!(!tiers[19].contains(&TierTag::HighRevenue));
    }

    /// 19 listings aged 100 days with `i * 100` views (ratio `i`), then one
    /// brand-new listing with a huge view count but no age.
    fn visibility_set() -> Vec<Listing> {
        let mut listings: Vec<Listing> = (0..19)
            .map(|i| {
                listing(
                    &format!("v{i}"),
                    RawMetrics { total_views: i as f64 * 100.0, listing_age_days: 100.0, ..Default::default() },
                )
            })
            .collect();
        listings.push(listing("new", RawMetrics { total_views: 1_000_000.0, ..Default::default() }));
        listings
    }

    #[test]
    fn visibility_champions_are_the_top_views_per_day() {
        let tiers = classify_all(&visibility_set(), &TierThresholds::default());
        assert_eq!(members(&tiers, TierTag::VisibilityChampion), [17, 18]);
    }

    #[test]
    fn zero_age_is_never_a_visibility_champion() {
        let th = TierThresholds { visibility: 50.0, ..Default::default() };
        let tiers = classify_all(&visibility_set(), &th);
        assert!(!tiers[19].contains(&TierTag::VisibilityChampion));
        assert!(tiers[18].contains(&TierTag::VisibilityChampion));
    }

    #[test]
    fn zero_visibility_threshold_admits_nobody() {
        let th = TierThresholds { visibility: 0.0, ..Default::default() };
        let tiers = classify_all(&visibility_set(), &th);
        assert!(members(&tiers, TierTag::VisibilityChampion).is_empty());
    }

    #[test]
    fn price_optimizers_are_the_fixed_top_ten_percent() {
        // Ratio `i` for 19 listings at $10, then a free listing whose huge
        // revenue cannot be divided by its price.
        let mut listings: Vec<Listing> = (0..19)
            .map(|i| {
                listing(
                    &format!("p{i}"),
                    RawMetrics { est_revenue: i as f64 * 10.0, price: 10.0, ..Default::default() },
                )
            })
            .collect();
        listings.push(listing("free", RawMetrics { est_revenue: 1_000_000.0, ..Default::default() }));

        let tiers = classify_all(&listings, &TierThresholds::default());
        assert_eq!(members(&tiers, TierTag::PriceOptimizer), [17, 18]);

        // Not configurable: tier thresholds leave it untouched.
        let wide = TierThresholds { high_revenue: 100.0, visibility: 100.0, ..Default::default() };
        let tiers = classify_all(&listings, &wide);
        assert_eq!(members(&tiers, TierTag::PriceOptimizer), [17, 18]);
    }

    #[test]
    fn conversion_is_strictly_below_threshold() {
        let th = TierThresholds::default();
        let at = listing("at", RawMetrics { total_views: 500.0, est_sales: 10.0, ..Default::default() });
        let below = listing("below", RawMetrics { total_views: 490.0, est_sales: 10.0, ..Default::default() });
        let unsold = listing("unsold", RawMetrics { total_views: 10.0, ..Default::default() });
        assert!(!classify(&alone(at), &th).contains(&TierTag::ConversionChampion));
        assert!(classify(&alone(below), &th).contains(&TierTag::ConversionChampion));
        assert!(!classify(&alone(unsold), &th).contains(&TierTag::ConversionChampion));
    }

    #[test]
    fn growth_is_inclusive() {
        let th = TierThresholds::default();
        let l = listing("g", RawMetrics { total_views: 100.0, daily_views: 5.0, ..Default::default() });
        assert!(classify(&alone(l), &th).contains(&TierTag::GrowthPerformer));
    }

    #[test]
    fn rising_star_fixed_thresholds() {
        let th = TierThresholds::default();
        let young = listing("y", RawMetrics { listing_age_days: 60.0, est_sales: 5.0, ..Default::default() });
        let old = listing("o", RawMetrics { listing_age_days: 61.0, est_sales: 50.0, ..Default::default() });
        let slow = listing("s", RawMetrics { listing_age_days: 10.0, est_sales: 4.0, ..Default::default() });
        assert!(classify(&alone(young), &th).contains(&TierTag::RisingStar));
        assert!(!classify(&alone(old), &th).contains(&TierTag::RisingStar));
        assert!(!classify(&alone(slow), &th).contains(&TierTag::RisingStar));
    }

    #[test]
    fn missing_percentiles_mean_no_membership() {
        let th = TierThresholds::default();
        let tiers = classify(&alone(plain("x", 1000.0)), &th);
        assert!(tiers.is_empty());
    }

    #[test]
    fn zero_percent_threshold_admits_nobody() {
        assert!(!in_top_percent(Some(1.0), 0.0));
        assert!(in_top_percent(Some(0.0), 100.0));
        assert!(!in_top_percent(None, 50.0));
    }
}
