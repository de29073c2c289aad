//! Link discovery on catalog pages

use crate::browser::LoadedPage;
use crate::state::CatalogPageRef;
use crate::url::{normalize_detail_url, same_site};
use crate::UrlError;
use scraper::Selector;
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

/// A loaded catalog page that cannot be read for links
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("catalog address for {page} cannot be built: {source}")]
    Address { page: String, source: UrlError },

    #[error("catalog page {page} returned an empty document")]
    EmptyDocument { page: String },

    #[error("catalog page {page} ended up off site at {final_url}")]
    OffSite { page: String, final_url: String },
}

/// Detail-page URLs of one catalog page, in document order, without repeats
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailLinkSet {
    links: Vec<Url>,
}

impl DetailLinkSet {
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// An empty set means the region has no more listings
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Url> {
        self.links.iter()
    }
}

impl IntoIterator for DetailLinkSet {
    type Item = Url;
    type IntoIter = std::vec::IntoIter<Url>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.into_iter()
    }
}

impl<'a> IntoIterator for &'a DetailLinkSet {
    type Item = &'a Url;
    type IntoIter = std::slice::Iter<'a, Url>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}

/// Collects up to `max_links` detail links from an already loaded catalog page
///
/// `base` is the catalog root the address of `page_ref` is built from; a
/// page that was redirected to another site fails instead of reading as
/// an exhausted region.
///
/// # Link Rules
///
/// - Only `<a href>` elements are read, in document order
/// - A link counts when its path ends in `/fangyuan/<digits>` on the
///   catalog's own site
/// - Query and fragment are dropped; the first occurrence of a listing wins
///
/// Finding nothing is not an error; it tells the caller the region is done.
pub fn discover_links(
    base: &Url,
    page_ref: &CatalogPageRef,
    page: &LoadedPage,
    max_links: usize,
) -> Result<DetailLinkSet, DiscoveryError> {
    let requested = page_ref
        .url(base)
        .map_err(|source| DiscoveryError::Address {
            page: page_ref.to_string(),
            source,
        })?;

    if !same_site(&requested, page.url()) {
        return Err(DiscoveryError::OffSite {
            page: page_ref.to_string(),
            final_url: page.url().to_string(),
        });
    }

    if page.html().trim().is_empty() {
        return Err(DiscoveryError::EmptyDocument {
            page: page_ref.to_string(),
        });
    }

    let mut links = Vec::new();
    let mut seen = HashSet::new();

    if let Ok(selector) = Selector::parse("a[href]") {
        let document = page.document();
        for element in document.select(&selector) {
            if links.len() >= max_links {
                break;
            }

            let Some(href) = element.value().attr("href") else {
                continue;
            };

            if let Some(url) = normalize_detail_url(href, page.url()) {
                if seen.insert(url.as_str().to_string()) {
                    links.push(url);
                }
            }
        }
    }

    tracing::debug!(page = %page_ref, found = links.len(), "Detail links discovered");
    Ok(DetailLinkSet { links })
}
