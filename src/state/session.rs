use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tracing::info;

use crate::error::{AppError, Result};
use crate::ingest::{keyword_from_file_name, normalize_rows, parse_csv_text, read_csv_file, NormalizeStats};
use crate::partition::{partition, SelectionStats};
use crate::scorer::score_listings;
use crate::state::settings::{Settings, SettingsUpdate};
use crate::stats::{normalize, DatasetStatistics};
use crate::types::{Listing, RawRow, ScoredListing};

/// `(file_name, keyword)`: the same export may be loaded under two keywords.
type FileKey = (String, String);

#[derive(Debug, Clone)]
struct LoadedFile {
    /// Insertion order across the session.
    seq: u64,
    file_name: String,
    keyword: String,
    listings: Vec<Listing>,
    stats: NormalizeStats,
}

impl LoadedFile {
    fn summary(&self) -> FileSummary {
        FileSummary {
            file_name: self.file_name.clone(),
            keyword: self.keyword.clone(),
            listings: self.listings.len(),
            normalize: self.stats.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub file_name: String,
    pub keyword: String,
    pub listings: usize,
    pub normalize: NormalizeStats,
}

/// Output of one full pass: normalize, score, partition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub a_list: Vec<ScoredListing>,
    pub b_list: Vec<ScoredListing>,
    pub c_list: Vec<ScoredListing>,
    pub all_scored: Vec<ScoredListing>,
    pub stats: DatasetStatistics,
    pub selection_stats: SelectionStats,
    pub settings: Settings,
}

/// One independent analysis: the loaded exports and the settings every pass
/// reads. Shared behind an `Arc`; each method is a single consistent step.
pub struct AnalysisSession {
    files: DashMap<FileKey, LoadedFile>,
    next_seq: AtomicU64,
    settings: Mutex<Settings>,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl AnalysisSession {
    pub fn new(settings: Settings) -> Self {
        Self {
            files: DashMap::new(),
            next_seq: AtomicU64::new(0),
            settings: Mutex::new(settings),
        }
    }

    /// Normalize already-parsed rows and add them under `(file_name, keyword)`.
    /// A pair that is already loaded is rejected and the session is unchanged.
    pub fn add_rows(&self, file_name: &str, keyword: Option<&str>, rows: &[RawRow]) -> Result<FileSummary> {
        let keyword = resolve_keyword(file_name, keyword);
        let key = (file_name.to_string(), keyword.clone());
        self.ensure_absent(&key)?;

        let (listings, stats) = normalize_rows(rows, &keyword);

        match self.files.entry(key) {
            Entry::Occupied(_) => Err(duplicate(file_name, &keyword)),
            Entry::Vacant(slot) => {
                let file = LoadedFile {
                    seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                    file_name: file_name.to_string(),
                    keyword,
                    listings,
                    stats,
                };
                let summary = file.summary();
                slot.insert(file);
                info!(
                    file = %summary.file_name,
                    keyword = %summary.keyword,
                    listings = summary.listings,
                    rejected = summary.normalize.rejected(),
                    "[FILES] added"
                );
                Ok(summary)
            }
        }
    }

    /// Parse CSV text and add it. A parse failure leaves the session unchanged.
    pub fn add_csv_text(&self, file_name: &str, keyword: Option<&str>, text: &str) -> Result<FileSummary> {
        self.ensure_absent(&(file_name.to_string(), resolve_keyword(file_name, keyword)))?;
        let rows = parse_csv_text(text)?;
        self.add_rows(file_name, keyword, &rows)
    }

    /// Read a CSV export from disk and add it under its file name.
    pub async fn add_file_from_path(&self, path: &Path, keyword: Option<&str>) -> Result<FileSummary> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::InvalidUpload(format!("not a file path: {}", path.display())))?;
        self.ensure_absent(&(file_name.clone(), resolve_keyword(&file_name, keyword)))?;
        let rows = read_csv_file(path).await?;
        self.add_rows(&file_name, keyword, &rows)
    }

    pub fn remove_file(&self, file_name: &str, keyword: &str) -> Result<FileSummary> {
        let key = (file_name.to_string(), keyword.to_string());
        match self.files.remove(&key) {
            Some((_, file)) => {
                info!(file = %file.file_name, keyword = %file.keyword, "[FILES] removed");
                Ok(file.summary())
            }
            None => Err(AppError::FileNotFound {
                file_name: file_name.to_string(),
                keyword: keyword.to_string(),
            }),
        }
    }

    /// Drop every loaded file. Settings are kept. Returns how many files went.
    pub fn clear_all(&self) -> usize {
        let n = self.files.len();
        self.files.clear();
        info!(files = n, "[FILES] cleared");
        n
    }

    pub fn settings(&self) -> Settings {
        *self.lock_settings()
    }

    /// Merge a partial update and return the resulting settings.
    pub fn update_settings(&self, update: SettingsUpdate) -> Result<Settings> {
        let mut settings = self.lock_settings();
        settings.apply(update)?;
        info!(
            normalization = %settings.normalization,
            strategy = %settings.selection_strategy,
            "[SETTINGS] updated"
        );
        Ok(*settings)
    }

    /// Loaded files in the order they were added.
    pub fn files(&self) -> Vec<FileSummary> {
        self.files_in_order().iter().map(LoadedFile::summary).collect()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn listing_count(&self) -> usize {
        self.files.iter().map(|f| f.listings.len()).sum()
    }

    /// Every listing across all files, grouped by file in insertion order.
    pub fn all_listings(&self) -> Vec<Listing> {
        self.files_in_order().into_iter().flat_map(|f| f.listings).collect()
    }

    /// Distinct keywords in the order they were first added.
    pub fn keywords(&self) -> Vec<String> {
        let mut keywords: Vec<String> = Vec::new();
        for f in self.files_in_order() {
            if !keywords.contains(&f.keyword) {
                keywords.push(f.keyword);
            }
        }
        keywords
    }

    /// Run a full pass over the current files with the current settings.
    /// Statistics are rebuilt from scratch every time.
    pub fn analyze(&self) -> AnalysisResult {
        let settings = self.settings();
        let listings = self.all_listings();
        let keywords = self.keywords();

        let normalized = normalize(&listings, settings.normalization);
        let all_scored = score_listings(normalized.listings, &normalized.stats, &settings);
        let lists = partition(&all_scored, &keywords, settings.selection_strategy);

        info!(
            listings = all_scored.len(),
            keywords = keywords.len(),
            normalization = %settings.normalization,
            strategy = %settings.selection_strategy,
            "[ANALYZE] pass complete"
        );

        AnalysisResult {
            a_list: lists.a_list,
            b_list: lists.b_list,
            c_list: lists.c_list,
            all_scored,
            stats: normalized.stats,
            selection_stats: lists.selection_stats,
            settings,
        }
    }

    fn files_in_order(&self) -> Vec<LoadedFile> {
        let mut files: Vec<LoadedFile> = self.files.iter().map(|f| f.value().clone()).collect();
        files.sort_by_key(|f| f.seq);
        files
    }

    fn ensure_absent(&self, key: &FileKey) -> Result<()> {
        if self.files.contains_key(key) {
            return Err(duplicate(&key.0, &key.1));
        }
        Ok(())
    }

    fn lock_settings(&self) -> MutexGuard<'_, Settings> {
        self.settings.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn resolve_keyword(file_name: &str, keyword: Option<&str>) -> String {
    match keyword.map(str::trim) {
        Some(k) if !k.is_empty() => k.to_string(),
        _ => keyword_from_file_name(file_name),
    }
}

fn duplicate(file_name: &str, keyword: &str) -> AppError {
    AppError::DuplicateFile {
        file_name: file_name.to_string(),
        keyword: keyword.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BALANCED_KEYWORD_CAP;
    use crate::types::SelectionStrategy;

    const HEADER: &str = "Shop / Listing,Listing Age (Days),Total Views,Daily Views,Price,Est. Sales,Est. Revenue,Hearts\n";

    fn export(shop: &str, n: usize) -> String {
        let mut text = HEADER.to_string();
        for i in 0..n {
            let sales = (i % 9) + 1;
            text.push_str(&format!(
                "{shop}: Item {i},{age},{views},{daily},$12.50,{sales},\"${revenue}\",{hearts}\n",
                age = 20 + i * 7,
                views = 400 + i * 31,
                daily = i % 6,
                revenue = sales as f64 * 12.5,
                hearts = i * 2,
            ));
        }
        text
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let session = AnalysisSession::default();
        session.add_csv_text("mugs.csv", Some("mugs"), &export("CraftCo", 3)).unwrap();
        let err = session.add_csv_text("mugs.csv", Some("mugs"), &export("CraftCo", 3)).unwrap_err();
        assert!(matches!(err, AppError::DuplicateFile { .. }));
        assert!(err.to_string().starts_with("File already added"));
        assert_eq!(session.listing_count(), 3);

        // Same file under another keyword is a different pair.
        session.add_csv_text("mugs.csv", Some("coffee mugs"), &export("CraftCo", 3)).unwrap();
        assert_eq!(session.file_count(), 2);
    }

    #[test]
    fn keyword_defaults_to_file_name() {
        let session = AnalysisSession::default();
        let summary = session.add_csv_text("wall-art_prints.csv", None, &export("Shop", 2)).unwrap();
        assert_eq!(summary.keyword, "wall art prints");
        let blank = session.add_csv_text("mugs.csv", Some("  "), &export("Shop", 1)).unwrap();
        assert_eq!(blank.keyword, "mugs");
    }

    #[test]
    fn remove_and_clear() {
        let session = AnalysisSession::default();
        session.add_csv_text("a.csv", Some("a"), &export("A", 4)).unwrap();
        session.add_csv_text("b.csv", Some("b"), &export("B", 2)).unwrap();

        let removed = session.remove_file("a.csv", "a").unwrap();
        assert_eq!(removed.listings, 4);
        assert!(matches!(session.remove_file("a.csv", "a"), Err(AppError::FileNotFound { .. })));
        assert_eq!(session.keywords(), vec!["b".to_string()]);

        assert_eq!(session.clear_all(), 1);
        assert!(session.all_listings().is_empty());
    }

    #[test]
    fn files_and_keywords_keep_insertion_order() {
        let session = AnalysisSession::default();
        for (name, kw) in [("z.csv", "zebra"), ("a.csv", "apple"), ("m.csv", "zebra")] {
            session.add_csv_text(name, Some(kw), &export("S", 1)).unwrap();
        }
        let names: Vec<String> = session.files().into_iter().map(|f| f.file_name).collect();
        assert_eq!(names, ["z.csv", "a.csv", "m.csv"]);
        assert_eq!(session.keywords(), ["zebra", "apple"]);
    }

    #[test]
    fn analyze_empty_session() {
        let result = AnalysisSession::default().analyze();
        assert!(result.all_scored.is_empty());
        assert!(result.a_list.is_empty());
        assert!(result.stats.metrics.is_empty());
    }

    #[test]
    fn analyze_respects_settings() {
        let session = AnalysisSession::default();
        session.add_csv_text("a.csv", Some("alpha"), &export("A", 30)).unwrap();
        session.add_csv_text("b.csv", Some("beta"), &export("B", 30)).unwrap();

        let balanced = session.analyze();
        assert_eq!(balanced.all_scored.len(), 60);
        assert!(balanced
            .selection_stats
            .keyword_distribution
            .values()
            .all(|n| *n <= BALANCED_KEYWORD_CAP));
        assert!(balanced.all_scored.windows(2).all(|w| w[0].rank_index >= w[1].rank_index));

        let update: SettingsUpdate = serde_json::from_str(r#"{"selectionStrategy": "macro"}"#).unwrap();
        let settings = session.update_settings(update).unwrap();
        assert_eq!(settings.selection_strategy, SelectionStrategy::Macro);

        let macro_ = session.analyze();
        assert_eq!(macro_.selection_stats.strategy, SelectionStrategy::Macro);
        assert_eq!(macro_.a_list.len(), 21);
    }

    #[test]
    fn analysis_serializes_with_boundary_names() {
        let session = AnalysisSession::default();
        session.add_csv_text("a.csv", Some("alpha"), &export("A", 2)).unwrap();
        let json = serde_json::to_value(session.analyze()).unwrap();
        for key in ["aList", "bList", "cList", "allScored", "stats", "selectionStats"] {
            assert!(json.get(key).is_some(), "{key}");
        }
        let first = &json["allScored"][0];
        assert!(first.get("rankIndex").is_some());
        assert!(first.get("shopName").is_some());
    }

    #[tokio::test]
    async fn add_file_from_disk() {
        let dir = std::env::temp_dir().join(format!("listing-ranker-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("ceramic-mugs.csv");
        tokio::fs::write(&path, export("CraftCo", 5)).await.unwrap();

        let session = AnalysisSession::default();
        let summary = session.add_file_from_path(&path, None).await.unwrap();
        assert_eq!(summary.file_name, "ceramic-mugs.csv");
        assert_eq!(summary.keyword, "ceramic mugs");
        assert_eq!(summary.listings, 5);

        let again = session.add_file_from_path(&path, None).await;
        assert!(matches!(again, Err(AppError::DuplicateFile { .. })));

        let missing = session.add_file_from_path(&dir.join("nope.csv"), None).await;
        assert!(matches!(missing, Err(AppError::Io(_))));
        assert_eq!(session.file_count(), 1);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
