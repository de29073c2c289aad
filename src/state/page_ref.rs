use crate::url::catalog_url;
use crate::UrlResult;
use std::fmt;
use url::Url;

/// One page of the paginated catalog
///
/// Created by the coordinator while it walks regions and page numbers, and
/// consumed by link discovery. Page numbers start at 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogPageRef {
    region: Option<String>,
    page: u32,
}

impl CatalogPageRef {
    pub fn new(region: Option<String>, page: u32) -> Self {
        Self {
            region,
            page: page.max(1),
        }
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// Builds the catalog address of this page under `base`
    pub fn url(&self, base: &Url) -> UrlResult<Url> {
        catalog_url(base, self.region(), self.page)
    }
}

impl fmt::Display for CatalogPageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{} p{}", region, self.page),
            None => write!(f, "all p{}", self.page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_numbers_start_at_one() {
        assert_eq!(CatalogPageRef::new(None, 0).page(), 1);
        assert_eq!(CatalogPageRef::new(None, 4).page(), 4);
    }

    #[test]
    fn test_url() {
        let base = Url::parse("https://hf.zu.anjuke.com/fangyuan").unwrap();
        let page_ref = CatalogPageRef::new(Some("beijing".to_string()), 2);
        assert_eq!(
            page_ref.url(&base).unwrap().as_str(),
            "https://hf.zu.anjuke.com/fangyuan/beijing/p2/"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            CatalogPageRef::new(Some("shushan".to_string()), 3).to_string(),
            "shushan p3"
        );
        assert_eq!(CatalogPageRef::new(None, 1).to_string(), "all p1");
    }
}
