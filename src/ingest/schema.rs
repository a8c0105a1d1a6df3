//! Column adapters for the two supported export layouts.
//!
//! Everything that knows about header spellings lives here; the normalizer
//! and the scoring engine only ever see [`ListingIdentity`] and [`RawMetrics`].

use serde::Serialize;

use crate::ingest::normalizer::Rejection;
use crate::types::{RawRow, RawValue};

pub const SHOP_LISTING: &str = "Shop / Listing";
pub const UNKNOWN_SHOP: &str = "Unknown Shop";

pub mod columns {
    pub const LISTING_AGE: &str = "Listing Age (Days)";
    pub const TOTAL_VIEWS: &str = "Total Views";
    pub const DAILY_VIEWS: &str = "Daily Views";
    pub const DAILY_VIEWS_PERCENT: [&str; 2] = ["Daily Views %", "Daily Views (%)"];
    pub const PRICE: &str = "Price";
    pub const EST_SALES: &str = "Est. Sales";
    pub const EST_REVENUE: &str = "Est. Revenue";
    pub const HEARTS: &str = "Hearts";
}

/// Generic-format title columns, in lookup order.
const TITLE_COLUMNS: [&str; 4] = ["Listing Title", "Title", "Product Title", "Item Title"];

/// Generic-format shop columns, in lookup order.
const SHOP_COLUMNS: [&str; 4] = ["Shop Name", "Shop", "Store Name", "Vendor"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowFormat {
    /// ERank export: shop and title packed into one `Shop / Listing` column.
    Erank,
    /// Any other layout with separate title/shop columns.
    Generic,
}

impl std::fmt::Display for RowFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowFormat::Erank => write!(f, "erank"),
            RowFormat::Generic => write!(f, "generic"),
        }
    }
}

/// ERank when any row carries a column equal to or containing `Shop / Listing`.
pub fn detect_format(rows: &[RawRow]) -> RowFormat {
    let erank = rows
        .iter()
        .any(|row| row.keys().any(|k| k.contains(SHOP_LISTING)));
    if erank {
        RowFormat::Erank
    } else {
        RowFormat::Generic
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingIdentity {
    pub shop_name: String,
    pub listing_title: String,
}

/// Numeric columns after coercion. Every field is finite and `>= 0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMetrics {
    pub listing_age_days: f64,
    pub total_views: f64,
    pub daily_views: f64,
    /// Present only when the export carries its own daily-views share.
    pub daily_views_percent: Option<f64>,
    pub price: f64,
    pub est_sales: f64,
    pub est_revenue: f64,
    pub hearts: f64,
}

pub fn identity(row: &RawRow, format: RowFormat) -> Result<ListingIdentity, Rejection> {
    match format {
        RowFormat::Erank => erank_identity(row),
        RowFormat::Generic => generic_identity(row),
    }
}

fn erank_identity(row: &RawRow) -> Result<ListingIdentity, Rejection> {
    let combined = shop_listing_cell(row)
        .map(text_of)
        .filter(|s| !s.trim().is_empty())
        .ok_or(Rejection::MissingShopListing)?;

    let (shop_name, listing_title) = match combined.split_once(':') {
        Some((shop, rest)) => {
            let title = rest.lines().next().unwrap_or("");
            (strip_quotes(shop), strip_quotes(title))
        }
        None => (UNKNOWN_SHOP.to_string(), strip_quotes(&combined)),
    };

    if listing_title.is_empty() {
        return Err(Rejection::EmptyTitle);
    }
    let shop_name = if shop_name.is_empty() {
        UNKNOWN_SHOP.to_string()
    } else {
        shop_name
    };
    Ok(ListingIdentity { shop_name, listing_title })
}

/// The exact `Shop / Listing` column, else the alphabetically first header
/// containing it, so the choice never depends on map order.
fn shop_listing_cell(row: &RawRow) -> Option<&RawValue> {
    row.get(SHOP_LISTING).or_else(|| {
        row.iter()
            .filter(|(k, _)| k.contains(SHOP_LISTING))
            .min_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, v)| v)
    })
}

fn generic_identity(row: &RawRow) -> Result<ListingIdentity, Rejection> {
    let listing_title = first_text(row, &TITLE_COLUMNS).ok_or(Rejection::MissingTitle)?;
    let shop_name = first_text(row, &SHOP_COLUMNS).unwrap_or_else(|| UNKNOWN_SHOP.to_string());
    Ok(ListingIdentity { shop_name, listing_title })
}

pub fn metrics(row: &RawRow) -> RawMetrics {
    RawMetrics {
        listing_age_days: count(row, columns::LISTING_AGE),
        total_views: count(row, columns::TOTAL_VIEWS),
        daily_views: count(row, columns::DAILY_VIEWS),
        daily_views_percent: columns::DAILY_VIEWS_PERCENT
            .iter()
            .find_map(|c| row.get(*c))
            .and_then(parse_number),
        price: currency(row, columns::PRICE),
        est_sales: count(row, columns::EST_SALES),
        est_revenue: currency(row, columns::EST_REVENUE),
        hearts: count(row, columns::HEARTS),
    }
}

fn count(row: &RawRow, column: &str) -> f64 {
    row.get(column)
        .and_then(parse_number)
        .map(non_negative)
        .unwrap_or(0.0)
}

fn currency(row: &RawRow, column: &str) -> f64 {
    row.get(column)
        .and_then(parse_currency)
        .map(non_negative)
        .unwrap_or(0.0)
}

/// Plain numeric cell. Thousands separators and a trailing `%` are tolerated.
pub fn parse_number(v: &RawValue) -> Option<f64> {
    match v {
        RawValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
        RawValue::Text(s) => s
            .trim()
            .trim_end_matches('%')
            .replace(',', "")
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite()),
    }
}

/// `$`-style currency: every character other than digits, `.` and `-` is dropped.
pub fn parse_currency(v: &RawValue) -> Option<f64> {
    match v {
        RawValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
        RawValue::Text(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
        }
    }
}

fn non_negative(v: f64) -> f64 {
    v.max(0.0)
}

fn first_text(row: &RawRow, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|c| row.get(*c))
        .map(|v| strip_quotes(&text_of(v)))
        .find(|s| !s.is_empty())
}

fn text_of(v: &RawValue) -> String {
    match v {
        RawValue::Text(s) => s.clone(),
        RawValue::Number(n) => n.to_string(),
    }
}

fn strip_quotes(s: &str) -> String {
    s.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs.iter().map(|(k, v)| (k.to_string(), RawValue::from(*v))).collect()
    }

    #[test]
    fn detects_erank_by_contained_header() {
        let erank = vec![row(&[(" Shop / Listing (name)", "A: B")])];
        let generic = vec![row(&[("Title", "B")])];
        assert_eq!(detect_format(&erank), RowFormat::Erank);
        assert_eq!(detect_format(&generic), RowFormat::Generic);
        assert_eq!(detect_format(&[]), RowFormat::Generic);
    }

    #[test]
    fn erank_splits_on_first_colon_and_keeps_first_line() {
        let r = row(&[(SHOP_LISTING, "\"CraftCo\": Mug: Blue Edition\nsecond line")]);
        let id = identity(&r, RowFormat::Erank).unwrap();
        assert_eq!(id.shop_name, "CraftCo");
        assert_eq!(id.listing_title, "Mug: Blue Edition");
    }

    #[test]
    fn erank_prefers_the_exact_shop_listing_column() {
        let r = row(&[
            ("Shop / Listing URL", "https://example.com/listing/1"),
            (SHOP_LISTING, "CraftCo: Mug"),
            ("Shop / Listing (alt)", "Other: Plate"),
        ]);
        let id = identity(&r, RowFormat::Erank).unwrap();
        assert_eq!(id.shop_name, "CraftCo");
        assert_eq!(id.listing_title, "Mug");

        let r = row(&[("Shop / Listing URL", "Zed: Bowl"), ("Shop / Listing (alt)", "Other: Plate")]);
        assert_eq!(identity(&r, RowFormat::Erank).unwrap().listing_title, "Plate");
    }

    #[test]
    fn erank_without_colon_uses_unknown_shop() {
        let r = row(&[(SHOP_LISTING, "Just a title")]);
        let id = identity(&r, RowFormat::Erank).unwrap();
        assert_eq!(id.shop_name, UNKNOWN_SHOP);
        assert_eq!(id.listing_title, "Just a title");
    }

    #[test]
    fn erank_rejections() {
        assert_eq!(
            identity(&row(&[("Price", "$1")]), RowFormat::Erank),
            Err(Rejection::MissingShopListing)
        );
        assert_eq!(
            identity(&row(&[(SHOP_LISTING, "Shop: \"\"")]), RowFormat::Erank),
            Err(Rejection::EmptyTitle)
        );
    }

    #[test]
    fn generic_fallback_chain() {
        let r = row(&[("Item Title", "Plate"), ("Vendor", "Potter")]);
        let id = identity(&r, RowFormat::Generic).unwrap();
        assert_eq!(id.listing_title, "Plate");
        assert_eq!(id.shop_name, "Potter");

        let r = row(&[("Product Title", "Bowl")]);
        assert_eq!(identity(&r, RowFormat::Generic).unwrap().shop_name, UNKNOWN_SHOP);

        let r = row(&[("Shop", "Potter")]);
        assert_eq!(identity(&r, RowFormat::Generic), Err(Rejection::MissingTitle));
    }

    #[test]
    fn explicit_unknown_title_is_accepted() {
        let r = row(&[("Title", "Unknown Title")]);
        assert_eq!(identity(&r, RowFormat::Generic).unwrap().listing_title, "Unknown Title");
    }

    #[test]
    fn numeric_coercion() {
        let r = row(&[
            ("Price", "$1,019.99"),
            ("Est. Revenue", "n/a"),
            ("Total Views", "12,345"),
            ("Hearts", "-3"),
            ("Est. Sales", "abc"),
            ("Daily Views %", "2.5%"),
        ]);
        let m = metrics(&r);
        assert!((m.price - 1019.99).abs() < 1e-9);
        assert_eq!(m.est_revenue, 0.0);
        assert_eq!(m.total_views, 12345.0);
        assert_eq!(m.hearts, 0.0);
        assert_eq!(m.est_sales, 0.0);
        assert_eq!(m.daily_views_percent, Some(2.5));
        assert_eq!(m.listing_age_days, 0.0);
    }

    #[test]
    fn number_cells_pass_through() {
        let mut r = RawRow::new();
        r.insert("Est. Sales".into(), RawValue::Number(10.0));
        r.insert("Price".into(), RawValue::Number(f64::NAN));
        let m = metrics(&r);
        assert_eq!(m.est_sales, 10.0);
        assert_eq!(m.price, 0.0);
    }
}
