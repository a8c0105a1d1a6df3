use serde::Serialize;
use tracing::{debug, info};

use crate::ingest::schema::{self, ListingIdentity, RawMetrics, RowFormat};
use crate::types::{Listing, RawRow};

/// Why a raw row did not become a listing. Rejection is a data-quality
/// filter, not a fault: rejected rows are counted and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// ERank export row without a usable `Shop / Listing` cell.
    MissingShopListing,
    /// `Shop / Listing` present but nothing after the shop name.
    EmptyTitle,
    /// Generic export row where no title column resolved.
    MissingTitle,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Rejection::MissingShopListing => "missing_shop_listing",
            Rejection::EmptyTitle => "empty_title",
            Rejection::MissingTitle => "missing_title",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeStats {
    pub format: Option<RowFormat>,
    pub total_rows: usize,
    pub accepted: usize,
    pub rejected_missing_shop_listing: usize,
    pub rejected_empty_title: usize,
    pub rejected_missing_title: usize,
}

impl NormalizeStats {
    pub fn rejected(&self) -> usize {
        self.rejected_missing_shop_listing + self.rejected_empty_title + self.rejected_missing_title
    }

    fn record(&mut self, rejection: Rejection) {
        match rejection {
            Rejection::MissingShopListing => self.rejected_missing_shop_listing += 1,
            Rejection::EmptyTitle => self.rejected_empty_title += 1,
            Rejection::MissingTitle => self.rejected_missing_title += 1,
        }
    }
}

/// Normalize every row of one export. Output order follows input order.
pub fn normalize_rows(rows: &[RawRow], keyword: &str) -> (Vec<Listing>, NormalizeStats) {
    let format = schema::detect_format(rows);
    let mut stats = NormalizeStats {
        format: Some(format),
        total_rows: rows.len(),
        ..Default::default()
    };

    let mut listings = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        match normalize_row(row, format, keyword) {
            Ok(listing) => listings.push(listing),
            Err(rejection) => {
                debug!(row = idx, %rejection, "row rejected");
                stats.record(rejection);
            }
        }
    }
    stats.accepted = listings.len();

    info!(
        keyword,
        %format,
        rows = stats.total_rows,
        accepted = stats.accepted,
        "[NORMALIZE] rejected: missing_shop_listing={} empty_title={} missing_title={}",
        stats.rejected_missing_shop_listing,
        stats.rejected_empty_title,
        stats.rejected_missing_title,
    );
    (listings, stats)
}

pub fn normalize_row(row: &RawRow, format: RowFormat, keyword: &str) -> Result<Listing, Rejection> {
    let identity = schema::identity(row, format)?;
    let metrics = schema::metrics(row);
    Ok(build_listing(identity, metrics, keyword))
}

/// Fill in derived fields and the id.
pub fn build_listing(identity: ListingIdentity, m: RawMetrics, keyword: &str) -> Listing {
    let est_revenue = if m.est_revenue == 0.0 && m.price > 0.0 && m.est_sales > 0.0 {
        m.price * m.est_sales
    } else {
        m.est_revenue
    };

    let views_per_sale = (m.est_sales > 0.0).then(|| m.total_views / m.est_sales);

    let sales_rate_percent = if m.total_views > 0.0 {
        m.est_sales / m.total_views * 100.0
    } else {
        0.0
    };

    let daily_views_percent = m.daily_views_percent.unwrap_or(if m.total_views > 0.0 {
        m.daily_views / m.total_views * 100.0
    } else {
        0.0
    });

    Listing {
        id: listing_id(keyword, &identity.shop_name, &identity.listing_title),
        keyword: keyword.to_string(),
        shop_name: identity.shop_name,
        listing_title: identity.listing_title,
        listing_age_days: m.listing_age_days,
        total_views: m.total_views,
        daily_views: m.daily_views,
        daily_views_percent,
        price: m.price,
        est_sales: m.est_sales,
        est_revenue,
        hearts: m.hearts,
        views_per_sale,
        sales_rate_percent,
    }
}

/// `keyword/shop-title`: the keyword verbatim, then a slug of shop and title.
/// The slug never contains `/`, so listings under different keywords never
/// share an id. Two listings with identical shop and title under one keyword do.
pub fn listing_id(keyword: &str, shop_name: &str, listing_title: &str) -> String {
    let slug: String = format!("{shop_name}-{listing_title}")
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    format!("{keyword}/{slug}")
}
