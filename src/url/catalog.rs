use crate::{UrlError, UrlResult};
use url::Url;

/// Builds the address of one catalog page
///
/// # URL Layout
///
/// | Region | Page | Address |
/// |--------|------|---------|
/// | `Some("shushan")` | 1 | `{base}/shushan/` |
/// | `Some("shushan")` | n | `{base}/shushan/p{n}/` |
/// | `None` | 1 | `{base}/` |
/// | `None` | n | `{base}/p{n}/` |
///
/// # Examples
///
/// ```
/// use anjuke_harvest::url::catalog_url;
/// use url::Url;
///
/// let base = Url::parse("https://hf.zu.anjuke.com/fangyuan").unwrap();
/// let url = catalog_url(&base, Some("shushan"), 3).unwrap();
/// assert_eq!(url.as_str(), "https://hf.zu.anjuke.com/fangyuan/shushan/p3/");
/// ```
pub fn catalog_url(base: &Url, region: Option<&str>, page: u32) -> UrlResult<Url> {
    let mut address = base.as_str().trim_end_matches('/').to_string();

    if let Some(region) = region {
        let region = region.trim();
        if region.is_empty() || region.contains('/') {
            return Err(UrlError::InvalidRegion(region.to_string()));
        }
        address.push('/');
        address.push_str(region);
    }

    if page > 1 {
        address.push_str(&format!("/p{}", page));
    }
    address.push('/');

    let url = Url::parse(&address).map_err(|e| UrlError::Parse(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    Ok(url)
}
