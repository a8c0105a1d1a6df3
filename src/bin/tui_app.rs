use std::collections::BTreeMap;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror routes.rs shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct HealthResponse {
    pub status: String,
    pub files: usize,
    pub listings: usize,
    pub analyses: u64,
    pub last_analysis_at_ms: Option<u64>,
    pub last_analysis_listings: u64,
}

/// The subset of a scored listing the dashboard shows.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct ListingRow {
    pub id: String,
    pub keyword: String,
    pub shop_name: String,
    pub listing_title: String,
    pub est_revenue: f64,
    pub est_sales: f64,
    pub views_per_sale: Option<f64>,
    pub composite_score: f64,
    pub opportunity_score: f64,
    pub performance_tiers: Vec<String>,
    pub rank_index: f64,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct SelectionStatsResponse {
    pub strategy: String,
    pub candidates: usize,
    pub selected: usize,
    pub keyword_distribution: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub normalization: String,
    pub selection_strategy: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListsResponse {
    pub a_list: Vec<ListingRow>,
    pub b_list: Vec<ListingRow>,
    pub c_list: Vec<ListingRow>,
    pub selection_stats: SelectionStatsResponse,
    pub settings: SettingsResponse,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct LatencyResponse {
    pub samples: u64,
    pub p50_us: Option<u64>,
    pub p95_us: Option<u64>,
    pub p99_us: Option<u64>,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListPane {
    #[default]
    A,
    B,
    C,
}

impl ListPane {
    pub const ALL: [ListPane; 3] = [ListPane::A, ListPane::B, ListPane::C];

    pub fn next(self) -> Self {
        match self {
            ListPane::A => ListPane::B,
            ListPane::B => ListPane::C,
            ListPane::C => ListPane::A,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ListPane::A => "A LIST",
            ListPane::B => "B LIST",
            ListPane::C => "C LIST",
        }
    }

    pub fn index(self) -> usize {
        match self {
            ListPane::A => 0,
            ListPane::B => 1,
            ListPane::C => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub health: HealthResponse,
    pub lists: ListsResponse,
    pub latency: LatencyResponse,
    pub focused: ListPane,
    /// Result of the last settings change, shown in the footer.
    pub notice: Option<String>,
    pub last_refresh: std::time::Instant,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            health: HealthResponse::default(),
            lists: ListsResponse::default(),
            latency: LatencyResponse::default(),
            focused: ListPane::default(),
            notice: None,
            last_refresh: std::time::Instant::now(),
            base_url,
        }
    }

    pub fn focused_rows(&self) -> &[ListingRow] {
        match self.focused {
            ListPane::A => &self.lists.a_list,
            ListPane::B => &self.lists.b_list,
            ListPane::C => &self.lists.c_list,
        }
    }

    pub fn list_len(&self, pane: ListPane) -> usize {
        match pane {
            ListPane::A => self.lists.a_list.len(),
            ListPane::B => self.lists.b_list.len(),
            ListPane::C => self.lists.c_list.len(),
        }
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let lists_url = format!("{}/lists", self.base_url);
        let health_url = format!("{}/health", self.base_url);
        let latency_url = format!("{}/stats/latency", self.base_url);

        let (lists_res, health_res, latency_res) = tokio::join!(
            client.get(&lists_url).send(),
            client.get(&health_url).send(),
            client.get(&latency_url).send(),
        );

        let lists_res = match lists_res {
            Ok(r) => r,
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };

        match lists_res.json::<ListsResponse>().await {
            Ok(lists) => {
                self.lists = lists;
                self.status = ConnectionStatus::Connected;
                self.last_refresh = std::time::Instant::now();

                if let Ok(h) = health_res {
                    if let Ok(health) = h.json::<HealthResponse>().await {
                        self.health = health;
                    }
                }
                if let Ok(l) = latency_res {
                    if let Ok(latency) = l.json::<LatencyResponse>().await {
                        self.latency = latency;
                    }
                }
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
            }
        }
    }

    /// Switch the server to the next selection strategy, then refresh.
    pub async fn cycle_strategy(&mut self, client: &reqwest::Client) {
        let next = next_strategy(&self.lists.settings.selection_strategy);
        let body = serde_json::json!({ "selectionStrategy": next });
        self.patch_settings(client, body, format!("strategy → {next}")).await;
    }

    /// Switch the server to the next normalization method, then refresh.
    pub async fn cycle_normalization(&mut self, client: &reqwest::Client) {
        let next = next_normalization(&self.lists.settings.normalization);
        let body = serde_json::json!({ "normalization": next });
        self.patch_settings(client, body, format!("normalization → {next}")).await;
    }

    async fn patch_settings(&mut self, client: &reqwest::Client, body: serde_json::Value, label: String) {
        let url = format!("{}/settings", self.base_url);
        match client.patch(&url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {
                self.notice = Some(label);
                self.refresh(client).await;
            }
            Ok(resp) => {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                self.notice = Some(format!("settings rejected ({status}): {text}"));
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Settings cycling
// ---------------------------------------------------------------------------

pub fn next_strategy(current: &str) -> &'static str {
    match current {
        "balanced" => "micro",
        "micro" => "macro",
        _ => "balanced",
    }
}

pub fn next_normalization(current: &str) -> &'static str {
    match current {
        "percentile" => "minmax",
        "minmax" => "zscore",
        _ => "percentile",
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Compact tier badges: `highRevenue` → `HR`, `risingStar` → `RS`.
pub fn format_tiers(tiers: &[String]) -> String {
    tiers
        .iter()
        .map(|t| match t.as_str() {
            "highRevenue" => "HR",
            "conversionChampion" => "CC",
            "growthPerformer" => "GP",
            "visibilityChampion" => "VC",
            "priceOptimizer" => "PO",
            "risingStar" => "RS",
            _ => "?",
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_money(v: f64) -> String {
    if v >= 10_000.0 {
        format!("${:.1}k", v / 1000.0)
    } else {
        format!("${v:.0}")
    }
}

pub fn format_vps(vps: Option<f64>) -> String {
    match vps {
        Some(v) => format!("{v:.0}"),
        None => "—".to_string(),
    }
}

pub fn format_latency_us(us: Option<u64>) -> String {
    match us {
        Some(u) if u >= 1000 => format!("{:.1}ms", u as f64 / 1000.0),
        Some(u) => format!("{u}µs"),
        None => "—".to_string(),
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
