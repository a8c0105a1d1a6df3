use crate::config::AGE_BELL_PEAK_LN;
use crate::types::{Listing, Metric};

/// Raw value of `metric` for one listing.
///
/// `None` means the metric is undefined for this listing (efficiency before the
/// first sale); such listings are left out of the dataset statistics and get a
/// normalized value of 0.
pub fn raw_value(listing: &Listing, metric: Metric) -> Option<f64> {
    let v = match metric {
        Metric::Revenue => listing.est_revenue,
        Metric::Sales => listing.est_sales,
        Metric::DailyViews => listing.daily_views,
        Metric::Efficiency => return efficiency(listing),
        Metric::Hearts => listing.hearts,
        Metric::Age => age_bell(listing.listing_age_days),
        Metric::Price => listing.price,
        Metric::VisibilityRatio => visibility_ratio(listing),
        Metric::PriceOptimization => price_optimization(listing),
    };
    Some(v).filter(|v| v.is_finite())
}

/// `1 / views_per_sale`. Undefined without sales, and for sales with no views.
pub fn efficiency(listing: &Listing) -> Option<f64> {
    listing
        .views_per_sale
        .map(|vps| 1.0 / vps)
        .filter(|e| e.is_finite())
}

/// Log-normal bell over listing age: peaks near 55 days, decays for brand-new
/// and long-stale listings alike.
pub fn age_bell(age_days: f64) -> f64 {
    if age_days <= 0.0 || !age_days.is_finite() {
        return 0.0;
    }
    let d = age_days.ln() - AGE_BELL_PEAK_LN;
    (-(d * d) / 2.0).exp()
}

/// Lifetime views per day of age.
pub fn visibility_ratio(listing: &Listing) -> f64 {
    if listing.listing_age_days > 0.0 {
        listing.total_views / listing.listing_age_days
    } else {
        0.0
    }
}

/// Revenue earned per unit of price, i.e. units sold at the listed price.
pub fn price_optimization(listing: &Listing) -> f64 {
    if listing.price > 0.0 {
        listing.est_revenue / listing.price
    } else {
        0.0
    }
}
