use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static DETAIL_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/fangyuan/\d+/?$").unwrap());

/// Returns true if a URL path points at a listing detail page
pub fn is_detail_path(path: &str) -> bool {
    DETAIL_PATH_RE.is_match(path)
}

/// Returns true if both URLs belong to the same site
///
/// Two hosts are on the same site when their last two labels match, so
/// `hf.zu.anjuke.com` and `www.anjuke.com` compare equal.
pub fn same_site(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(a), Some(b)) => site_key(a) == site_key(b),
        _ => false,
    }
}

fn site_key(host: &str) -> String {
    let host = host.to_lowercase();
    let labels: Vec<&str> = host.rsplit('.').take(2).collect();
    labels.into_iter().rev().collect::<Vec<_>>().join(".")
}

/// Resolves an href found on a catalog page into a canonical detail URL
///
/// Returns None if the link should be ignored:
/// - empty, fragment-only or `javascript:`/`mailto:`/`tel:` hrefs
/// - non-HTTP(S) URLs after resolution
/// - paths that are not listing detail pages
/// - links leaving the catalog's site
///
/// Query string, fragment and trailing slash are dropped so that the same
/// listing reached through different tracking links compares equal.
pub fn normalize_detail_url(href: &str, page_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:") || href.starts_with("mailto:") || href.starts_with("tel:")
    {
        return None;
    }

    let mut url = page_url.join(href).ok()?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    if !is_detail_path(url.path()) || !same_site(&url, page_url) {
        return None;
    }

    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);

    Some(url)
}
