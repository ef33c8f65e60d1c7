use crate::UrlError;
use url::Url;

/// Normalizes a URL according to the crawler's canonicalization rules.
///
/// # Normalization Steps
///
/// 1. Resolve relative against `base` if given.
/// 2. Require scheme `http` or `https`; reject otherwise.
/// 3. Lowercase scheme and host.
/// 4. Strip the default port (`:80` on http, `:443` on https).
/// 5. Empty path becomes `/`.
/// 6. Strip a trailing `/` from non-root paths.
/// 7. Drop the fragment.
/// 8. Split the query string on `&`, lexicographically sort the whole
///    `key=value` components (not just the keys), and rejoin.
/// 9. Reconstruct.
///
/// No scheme upgrade, no `www.` stripping, no tracking-parameter removal:
/// every query component survives, sorted only.
///
/// # Examples
///
/// ```
/// use webcrawl_core::url::normalize_url;
///
/// let url = normalize_url("https://Example.COM/a/?b=2&a=1#frag", None).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/a?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str, base: Option<&Url>) -> Result<Url, UrlError> {
    let mut url = match base {
        Some(base) => base
            .join(url_str)
            .map_err(|e| UrlError::Parse(e.to_string()))?,
        None => Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?,
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?;
    let lowercased_host = host.to_lowercase();
    url.set_host(Some(&lowercased_host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    strip_default_port(&mut url)?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let sorted_query = sort_query_components(url.query().unwrap_or(""));
        if sorted_query.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&sorted_query));
        }
    }

    Ok(url)
}

/// Removes the default port for the URL's scheme, if present.
fn strip_default_port(url: &mut Url) -> Result<(), UrlError> {
    let default_port = match url.scheme() {
        "http" => 80,
        "https" => 443,
        _ => return Ok(()),
    };

    if url.port() == Some(default_port) {
        url.set_port(None)
            .map_err(|_| UrlError::Malformed("failed to strip default port".to_string()))?;
    }

    Ok(())
}

/// Normalizes a URL path: empty path becomes `/`, trailing slash stripped
/// from non-root paths. Dot-segment resolution is left to `Url::join`/`Url::parse`,
/// which already collapse `.`/`..` per the WHATWG URL spec.
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    if path.len() > 1 && path.ends_with('/') {
        path[..path.len() - 1].to_string()
    } else {
        path.to_string()
    }
}

/// Splits a query string on `&` and lexicographically sorts the whole
/// `key=value` components, rejoining with `&`. Sorting whole components
/// (rather than just keys) matches the reference crawler's behavior.
fn sort_query_components(query: &str) -> String {
    let mut components: Vec<&str> = query.split('&').filter(|c| !c.is_empty()).collect();
    components.sort_unstable();
    components.join("&")
}
