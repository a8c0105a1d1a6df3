pub mod listing_scorer;
pub mod tiers;

pub use listing_scorer::score_listings;
