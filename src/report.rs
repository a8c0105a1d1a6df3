use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::state::AnalysisResult;
use crate::stats::Averages;
use crate::types::{ScoredListing, TierTag};

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSelector {
    A,
    B,
    C,
    All,
}

impl FromStr for ListSelector {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "a" => Ok(ListSelector::A),
            "b" => Ok(ListSelector::B),
            "c" => Ok(ListSelector::C),
            "all" => Ok(ListSelector::All),
            _ => Err(AppError::UnknownList(s.to_string())),
        }
    }
}

impl ListSelector {
    pub fn file_name(self) -> &'static str {
        match self {
            ListSelector::A => "a-list.csv",
            ListSelector::B => "b-list.csv",
            ListSelector::C => "c-list.csv",
            ListSelector::All => "all-listings.csv",
        }
    }
}

#[derive(Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "List")]
    list: &'static str,
    #[serde(rename = "Rank")]
    rank: usize,
    #[serde(rename = "Keyword")]
    keyword: &'a str,
    #[serde(rename = "Shop")]
    shop: &'a str,
    #[serde(rename = "Title")]
    title: &'a str,
    #[serde(rename = "Rank Index")]
    rank_index: f64,
    #[serde(rename = "Composite Score")]
    composite_score: f64,
    #[serde(rename = "Opportunity Score")]
    opportunity_score: f64,
    #[serde(rename = "Tiers")]
    tiers: String,
    #[serde(rename = "Est. Revenue")]
    est_revenue: f64,
    #[serde(rename = "Est. Sales")]
    est_sales: f64,
    #[serde(rename = "Total Views")]
    total_views: f64,
    #[serde(rename = "Daily Views")]
    daily_views: f64,
    #[serde(rename = "Price")]
    price: f64,
    #[serde(rename = "Hearts")]
    hearts: f64,
    #[serde(rename = "Listing Age (Days)")]
    listing_age_days: f64,
    /// Blank until the listing has a sale.
    #[serde(rename = "Views per Sale")]
    views_per_sale: Option<f64>,
    #[serde(rename = "Sales Rate %")]
    sales_rate_percent: f64,
}

impl<'a> ExportRow<'a> {
    fn new(list: &'static str, rank: usize, s: &'a ScoredListing) -> Self {
        let l = &s.listing;
        Self {
            list,
            rank,
            keyword: &l.keyword,
            shop: &l.shop_name,
            title: &l.listing_title,
            rank_index: round2(s.rank_index),
            composite_score: round2(s.composite_score),
            opportunity_score: round2(s.opportunity_score),
            tiers: s
                .performance_tiers
                .iter()
                .map(TierTag::to_string)
                .collect::<Vec<_>>()
                .join(";"),
            est_revenue: round2(l.est_revenue),
            est_sales: l.est_sales,
            total_views: l.total_views,
            daily_views: l.daily_views,
            price: round2(l.price),
            hearts: l.hearts,
            listing_age_days: l.listing_age_days,
            views_per_sale: l.views_per_sale.map(round2),
            sales_rate_percent: round2(l.sales_rate_percent),
        }
    }
}

/// Render one shortlist, or every scored listing, as CSV. Under `All` the
/// `List` column names the shortlist a listing landed in (blank for none).
pub fn export_csv(result: &AnalysisResult, selector: ListSelector) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    match selector {
        ListSelector::A => write_list(&mut wtr, "A", &result.a_list)?,
        ListSelector::B => write_list(&mut wtr, "B", &result.b_list)?,
        ListSelector::C => write_list(&mut wtr, "C", &result.c_list)?,
        ListSelector::All => {
            let lists = [("A", &result.a_list), ("B", &result.b_list), ("C", &result.c_list)];
            let membership: HashMap<&str, &'static str> = lists
                .into_iter()
                .flat_map(|(label, list)| list.iter().map(move |l| (l.id(), label)))
                .collect();
            for (i, s) in result.all_scored.iter().enumerate() {
                let label = membership.get(s.id()).copied().unwrap_or("");
                wtr.serialize(ExportRow::new(label, i + 1, s))?;
            }
        }
    }

    let bytes = wtr.into_inner().map_err(|e| AppError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| AppError::Export(e.to_string()))
}

fn write_list<W: std::io::Write>(wtr: &mut csv::Writer<W>, label: &'static str, list: &[ScoredListing]) -> Result<()> {
    for (i, s) in list.iter().enumerate() {
        wtr.serialize(ExportRow::new(label, i + 1, s))?;
    }
    Ok(())
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Insights
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordInsight {
    pub keyword: String,
    pub listings: usize,
    pub in_a_list: usize,
    pub avg_rank_index: f64,
    pub avg_revenue: f64,
    pub top_listing: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub total_listings: usize,
    pub tier_counts: BTreeMap<TierTag, usize>,
    pub keywords: Vec<KeywordInsight>,
    pub averages: Averages,
}

/// Summary of one analysis pass for reporting. Purely derived; nothing here
/// feeds back into scoring or partitioning.
pub fn insights(result: &AnalysisResult) -> Insights {
    let mut tier_counts: BTreeMap<TierTag, usize> = TierTag::ALL.iter().map(|t| (*t, 0)).collect();
    for s in &result.all_scored {
        for tier in &s.performance_tiers {
            *tier_counts.entry(*tier).or_insert(0) += 1;
        }
    }

    let keywords = result
        .selection_stats
        .keyword_distribution
        .iter()
        .map(|(keyword, in_a_list)| {
            // all_scored is rank ordered, so the first match is the keyword's best.
            let members: Vec<&ScoredListing> =
                result.all_scored.iter().filter(|s| s.keyword() == keyword.as_str()).collect();
            let n = members.len();
            let mean = |f: fn(&ScoredListing) -> f64| {
                if n == 0 {
                    0.0
                } else {
                    members.iter().map(|s| f(s)).sum::<f64>() / n as f64
                }
            };
            KeywordInsight {
                keyword: keyword.clone(),
                listings: n,
                in_a_list: *in_a_list,
                avg_rank_index: mean(|s| s.rank_index),
                avg_revenue: mean(|s| s.listing.est_revenue),
                top_listing: members.first().map(|s| s.listing.listing_title.clone()),
            }
        })
        .collect();

    Insights {
        total_listings: result.all_scored.len(),
        tier_counts,
        keywords,
        averages: result.stats.averages,
    }
}
