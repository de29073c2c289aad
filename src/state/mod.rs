//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CatalogPageRef`: identifies one page of the paginated catalog (region + page number)
//! - `CrawlState`: run-scoped counters and cursor, owned by the coordinator
//! - `NavigationPhase`: the phases a single navigation attempt moves through

mod crawl_state;
mod navigation;
mod page_ref;

// Re-export main types
pub use crawl_state::{CrawlState, FailureKind};
pub use navigation::NavigationPhase;
pub use page_ref::CatalogPageRef;
