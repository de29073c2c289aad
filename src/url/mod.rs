//! URL handling module for Anjuke-Harvest
//!
//! This module builds catalog page addresses and recognises, resolves and
//! normalises listing detail links found on those pages.

mod catalog;
mod detail;

// Re-export main functions
pub use catalog::catalog_url;
pub use detail::{is_detail_path, normalize_detail_url, same_site};
