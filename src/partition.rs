use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::info;

use crate::config::{BALANCED_KEYWORD_CAP, BALANCED_SEED_PER_KEYWORD, LIST_SIZE, MICRO_PER_KEYWORD};
use crate::types::{ScoredListing, SelectionStrategy};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionStats {
    pub strategy: SelectionStrategy,
    /// Scored listings the strategy drew from.
    pub candidates: usize,
    /// Total members across A, B and C.
    pub selected: usize,
    /// Per known keyword, members in the A list (zero included).
    pub keyword_distribution: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionResult {
    pub a_list: Vec<ScoredListing>,
    pub b_list: Vec<ScoredListing>,
    pub c_list: Vec<ScoredListing>,
    pub selection_stats: SelectionStats,
}

/// Split globally ranked listings into the A, B and C shortlists.
///
/// `scored` must already be sorted by rank index, highest first. `keywords`
/// lists the known keywords in the order their files were added; it drives
/// per-keyword iteration for the micro and balanced strategies. A listing id
/// lands in at most one list.
pub fn partition(scored: &[ScoredListing], keywords: &[String], strategy: SelectionStrategy) -> PartitionResult {
    let (lists, candidates) = match strategy {
        SelectionStrategy::Macro => (windows(scored.iter()), scored.len()),
        SelectionStrategy::Micro => {
            let pool = micro_pool(scored, keywords);
            (windows(pool.iter().copied()), pool.len())
        }
        SelectionStrategy::Balanced => (balanced(scored, keywords), scored.len()),
    };

    let [mut a_list, mut b_list, mut c_list] = lists.map(|l| l.into_iter().cloned().collect::<Vec<_>>());
    for list in [&mut a_list, &mut b_list, &mut c_list] {
        list.sort_by(|x, y| y.rank_index.total_cmp(&x.rank_index));
    }

    let mut keyword_distribution: BTreeMap<String, usize> = keywords.iter().map(|k| (k.clone(), 0)).collect();
    for l in &a_list {
        *keyword_distribution.entry(l.keyword().to_string()).or_insert(0) += 1;
    }

    let selected = a_list.len() + b_list.len() + c_list.len();
    info!(
        %strategy,
        candidates,
        a = a_list.len(),
        b = b_list.len(),
        c = c_list.len(),
        "[PARTITION] lists built"
    );

    PartitionResult {
        a_list,
        b_list,
        c_list,
        selection_stats: SelectionStats {
            strategy,
            candidates,
            selected,
            keyword_distribution,
        },
    }
}

type Lists<'a> = [Vec<&'a ScoredListing>; 3];

/// Consecutive windows of `LIST_SIZE` over the ranked candidates.
fn windows<'a>(ranked: impl Iterator<Item = &'a ScoredListing>) -> Lists<'a> {
    let mut picker = Picker::default();
    let ranked: Vec<&ScoredListing> = ranked.collect();
    let mut lists: Lists<'a> = Default::default();
    for list in &mut lists {
        picker.fill(list, ranked.iter().copied(), LIST_SIZE, None);
    }
    lists
}

/// Each keyword's best `MICRO_PER_KEYWORD` listings, pooled and re-ranked.
fn micro_pool<'a>(scored: &'a [ScoredListing], keywords: &[String]) -> Vec<&'a ScoredListing> {
    let mut pool: Vec<&ScoredListing> = keywords
        .iter()
        .flat_map(|k| scored.iter().filter(move |l| l.keyword() == k.as_str()).take(MICRO_PER_KEYWORD))
        .collect();
    pool.sort_by(|x, y| y.rank_index.total_cmp(&x.rank_index));
    pool
}

fn balanced<'a>(scored: &'a [ScoredListing], keywords: &[String]) -> Lists<'a> {
    let mut picker = Picker::default();
    let mut lists: Lists<'a> = Default::default();
    let [a, b, c] = &mut lists;

    // Every keyword gets a foothold in A before the global order takes over.
    for keyword in keywords {
        if a.len() >= LIST_SIZE {
            break;
        }
        let room = (LIST_SIZE - a.len()).min(BALANCED_SEED_PER_KEYWORD);
        picker.fill(a, scored.iter().filter(|l| l.keyword() == keyword.as_str()), room, None);
    }
    let room = LIST_SIZE - a.len();
    picker.fill(a, scored.iter(), room, Some(BALANCED_KEYWORD_CAP));

    picker.fill(b, scored.iter(), LIST_SIZE, None);
    picker.fill(c, scored.iter(), LIST_SIZE, None);
    lists
}

#[derive(Default)]
struct Picker<'a> {
    used: HashSet<&'a str>,
    /// Members per keyword in the list currently being filled.
    per_keyword: HashMap<&'a str, usize>,
}

impl<'a> Picker<'a> {
    /// Append up to `room` unused candidates to `list`, optionally capping
    /// any single keyword's total share of `list` at `cap`.
    fn fill(
        &mut self,
        list: &mut Vec<&'a ScoredListing>,
        candidates: impl Iterator<Item = &'a ScoredListing>,
        room: usize,
        cap: Option<usize>,
    ) {
        if list.is_empty() {
            self.per_keyword.clear();
        }
        let mut added = 0;
        for l in candidates {
            if added >= room {
                break;
            }
            if self.used.contains(l.id()) {
                continue;
            }
            let count = self.per_keyword.entry(l.keyword()).or_insert(0);
            if cap.is_some_and(|cap| *count >= cap) {
                continue;
            }
            *count += 1;
            self.used.insert(l.id());
            list.push(l);
            added += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::normalizer::build_listing;
    use crate::ingest::schema::{ListingIdentity, RawMetrics};

    fn scored(keyword: &str, title: &str, rank: f64) -> ScoredListing {
        let identity = ListingIdentity {
            shop_name: "Shop".into(),
            listing_title: title.into(),
        };
        ScoredListing {
            listing: build_listing(identity, RawMetrics::default(), keyword),
            norm_values: BTreeMap::new(),
            composite_score: 0.0,
            opportunity_score: 0.0,
            performance_tiers: Default::default(),
            rank_index: rank,
        }
    }

    /// `per_keyword[i]` listings for keyword `k{i}`, ranks interleaved so the
    /// first keyword dominates the top of the global order.
    fn universe(per_keyword: &[usize]) -> (Vec<ScoredListing>, Vec<String>) {
        let keywords: Vec<String> = (0..per_keyword.len()).map(|i| format!("k{i}")).collect();
        let mut all = Vec::new();
        for (ki, n) in per_keyword.iter().enumerate() {
            for j in 0..*n {
                let rank = 1000.0 - (j as f64) - ki as f64 * 100.0;
                all.push(scored(&keywords[ki], &format!("t{j}"), rank));
            }
        }
        all.sort_by(|x, y| y.rank_index.total_cmp(&x.rank_index));
        (all, keywords)
    }

    fn ids(list: &[ScoredListing]) -> HashSet<&str> {
        list.iter().map(|l| l.id()).collect()
    }

    fn assert_exclusive_and_bounded(r: &PartitionResult) {
        let (a, b, c) = (ids(&r.a_list), ids(&r.b_list), ids(&r.c_list));
        assert!(a.is_disjoint(&b) && b.is_disjoint(&c) && a.is_disjoint(&c));
        for list in [&r.a_list, &r.b_list, &r.c_list] {
            assert!(list.len() <= LIST_SIZE);
            assert!(list.windows(2).all(|w| w[0].rank_index >= w[1].rank_index));
        }
        assert_eq!(r.selection_stats.selected, r.a_list.len() + r.b_list.len() + r.c_list.len());
    }

    #[test]
    fn macro_takes_consecutive_windows() {
        let all: Vec<ScoredListing> = (0..100).map(|i| scored("k", &format!("l{i}"), 100.0 - i as f64)).collect();
        let r = partition(&all, &["k".to_string()], SelectionStrategy::Macro);
        assert_exclusive_and_bounded(&r);
        assert_eq!(r.a_list.first().map(|l| l.rank_index), Some(100.0));
        assert_eq!(r.a_list.last().map(|l| l.rank_index), Some(80.0));
        assert_eq!(r.b_list.first().map(|l| l.rank_index), Some(79.0));
        assert_eq!(r.c_list.last().map(|l| l.rank_index), Some(38.0));
        assert_eq!(r.selection_stats.selected, 63);
        assert_eq!(r.selection_stats.keyword_distribution["k"], 21);
    }

    #[test]
    fn every_strategy_is_exclusive_and_bounded() {
        let (all, keywords) = universe(&[40, 25, 3, 12, 1]);
        for strategy in SelectionStrategy::ALL {
            let r = partition(&all, &keywords, strategy);
            assert_exclusive_and_bounded(&r);
            assert_eq!(r.selection_stats.strategy, strategy);
        }
    }

    #[test]
    fn balanced_caps_each_keyword_in_a() {
        let (all, keywords) = universe(&[40, 40, 2]);
        let r = partition(&all, &keywords, SelectionStrategy::Balanced);
        assert_exclusive_and_bounded(&r);

        let dist = &r.selection_stats.keyword_distribution;
        assert!(dist.values().all(|n| *n <= BALANCED_KEYWORD_CAP));
        assert_eq!(dist["k2"], 2);
        // 5 + 5 + 2 leaves A short; B and C fill without a cap.
        assert_eq!(r.a_list.len(), 12);
        assert_eq!(r.b_list.len(), LIST_SIZE);
        assert_eq!(r.c_list.len(), LIST_SIZE);
    }

    #[test]
    fn balanced_seeds_every_keyword_in_order() {
        let (all, keywords) = universe(&[30, 30, 30, 30, 30, 30, 30, 30]);
        let r = partition(&all, &keywords, SelectionStrategy::Balanced);
        let dist = &r.selection_stats.keyword_distribution;
        // Seven keywords take three seats each; the eighth comes too late.
        for k in &keywords[..7] {
            assert_eq!(dist[k], 3, "{k}");
        }
        assert_eq!(dist["k7"], 0);
        assert_eq!(r.a_list.len(), LIST_SIZE);
    }

    #[test]
    fn macro_ignores_keyword_fairness() {
        let (all, keywords) = universe(&[40, 40]);
        let r = partition(&all, &keywords, SelectionStrategy::Macro);
        assert_eq!(r.selection_stats.keyword_distribution["k0"], 21);
        assert_eq!(r.selection_stats.keyword_distribution["k1"], 0);
    }

    #[test]
    fn micro_limits_each_keyword_to_its_top_ten() {
        let (all, keywords) = universe(&[40, 40, 5]);
        let r = partition(&all, &keywords, SelectionStrategy::Micro);
        assert_exclusive_and_bounded(&r);
        assert_eq!(r.selection_stats.candidates, 25);
        assert_eq!(r.selection_stats.selected, 25);

        let from_k0 = [&r.a_list, &r.b_list, &r.c_list]
            .iter()
            .flat_map(|l| l.iter())
            .filter(|l| l.keyword() == "k0")
            .count();
        assert_eq!(from_k0, MICRO_PER_KEYWORD);
        // Pool order is k0's ten, k1's ten, then k2's five; A takes the first 21.
        assert_eq!(r.selection_stats.keyword_distribution["k0"], 10);
        assert_eq!(r.selection_stats.keyword_distribution["k1"], 10);
        assert_eq!(r.selection_stats.keyword_distribution["k2"], 1);
    }

    #[test]
    fn colliding_ids_are_placed_once() {
        let all = vec![scored("k", "same", 3.0), scored("k", "same", 2.0), scored("k", "other", 1.0)];
        let r = partition(&all, &["k".to_string()], SelectionStrategy::Macro);
        assert_eq!(r.a_list.len(), 2);
        assert!(r.b_list.is_empty());
    }

    #[test]
    fn similar_keywords_are_not_treated_as_duplicates() {
        let all = vec![scored("wall art", "Mug", 2.0), scored("wall-art", "Mug", 1.0)];
        let keywords = ["wall art".to_string(), "wall-art".to_string()];
        let r = partition(&all, &keywords, SelectionStrategy::Macro);
        assert_eq!(r.a_list.len(), 2);
        assert_eq!(r.selection_stats.keyword_distribution["wall art"], 1);
        assert_eq!(r.selection_stats.keyword_distribution["wall-art"], 1);
    }

    #[test]
    fn empty_input_gives_empty_lists() {
        let r = partition(&[], &[], SelectionStrategy::Balanced);
        assert!(r.a_list.is_empty() && r.b_list.is_empty() && r.c_list.is_empty());
        assert!(r.selection_stats.keyword_distribution.is_empty());
    }
}
