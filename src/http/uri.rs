//! Href canonicalization.
//!
//! Every request and every cache entry is addressed by a [`CanonicalUri`]: an
//! absolute path plus a merged, sorted [`QueryString`]. The [`Canonicalizer`]
//! turns whatever href a caller or a response supplied into that form.

use std::fmt;

use crate::config::BaseUrl;
use crate::http::errors::InvalidHrefError;
use crate::http::query::QueryString;

/// An absolute path with its query parameters.
///
/// The `Display` form is `absolute_path` followed by `?query` when the query is
/// non-empty. Parsing that form back yields an equal value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalUri {
    absolute_path: String,
    query: QueryString,
}

impl CanonicalUri {
    /// Creates a canonical URI from parts.
    #[must_use]
    pub fn new(absolute_path: impl Into<String>, query: QueryString) -> Self {
        Self {
            absolute_path: absolute_path.into(),
            query,
        }
    }

    /// Splits an absolute URI string at the first `?`.
    #[must_use]
    pub fn parse(uri: &str) -> Self {
        let (path, raw_query) = uri.split_once('?').unwrap_or((uri, ""));
        Self {
            absolute_path: path.to_string(),
            query: QueryString::parse(raw_query),
        }
    }

    /// Returns the absolute path (scheme, host and path, no query).
    #[must_use]
    pub fn absolute_path(&self) -> &str {
        &self.absolute_path
    }

    /// Returns the query parameters.
    #[must_use]
    pub const fn query(&self) -> &QueryString {
        &self.query
    }

    /// Returns the query parameters for modification.
    pub fn query_mut(&mut self) -> &mut QueryString {
        &mut self.query
    }

    /// Returns `true` if the URI has query parameters.
    #[must_use]
    pub fn has_query(&self) -> bool {
        !self.query.is_empty()
    }

    /// Returns the `host[:port]` authority of the URI.
    #[must_use]
    pub fn authority(&self) -> &str {
        let after_scheme = self
            .absolute_path
            .find("://")
            .map_or(self.absolute_path.as_str(), |i| &self.absolute_path[i + 3..]);
        after_scheme
            .find('/')
            .map_or(after_scheme, |i| &after_scheme[..i])
    }

    /// Returns the path component after the authority, `/` when empty.
    #[must_use]
    pub fn path(&self) -> &str {
        let after_scheme = self
            .absolute_path
            .find("://")
            .map_or(self.absolute_path.as_str(), |i| &self.absolute_path[i + 3..]);
        after_scheme.find('/').map_or("/", |i| &after_scheme[i..])
    }
}

impl fmt::Display for CanonicalUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.absolute_path)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        Ok(())
    }
}

/// Resolves hrefs against a base URL and merges query parameters.
///
/// # Example
///
/// ```rust
/// use idm_sdk::BaseUrl;
/// use idm_sdk::http::{Canonicalizer, QueryString};
///
/// let canonicalizer = Canonicalizer::new(&BaseUrl::new("https://api.example.com/v1").unwrap());
/// let query: QueryString = [("limit", "10"), ("offset", "5")].into_iter().collect();
///
/// let uri = canonicalizer
///     .canonicalize("/accounts?limit=50", Some(&query))
///     .unwrap();
/// assert_eq!(uri.to_string(), "https://api.example.com/v1/accounts?limit=50&offset=5");
/// ```
#[derive(Clone, Debug)]
pub struct Canonicalizer {
    base_url: String,
}

impl Canonicalizer {
    /// Creates a canonicalizer resolving relative hrefs against `base_url`.
    #[must_use]
    pub fn new(base_url: &BaseUrl) -> Self {
        Self {
            base_url: base_url.as_ref().to_string(),
        }
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns `true` when `href` already carries an `http`/`https` scheme.
    #[must_use]
    pub fn is_absolute(href: &str) -> bool {
        let lower = href.get(..8).unwrap_or(href).to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }

    /// Prefixes a relative href with the base URL.
    #[must_use]
    pub fn qualify(&self, href: &str) -> String {
        if Self::is_absolute(href) {
            return href.to_string();
        }
        let mut qualified = String::with_capacity(self.base_url.len() + href.len() + 1);
        qualified.push_str(&self.base_url);
        if !href.starts_with('/') {
            qualified.push('/');
        }
        qualified.push_str(href);
        qualified
    }

    /// Produces the canonical URI for `href` and optional extra parameters.
    ///
    /// Parameters embedded in the href win over `params` on key collision.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHrefError`] if `href` is empty.
    pub fn canonicalize(
        &self,
        href: &str,
        params: Option<&QueryString>,
    ) -> Result<CanonicalUri, InvalidHrefError> {
        let href = href.trim();
        if href.is_empty() {
            return Err(InvalidHrefError {
                href: href.to_string(),
                reason: "href cannot be empty",
            });
        }

        let qualified = self.qualify(href);
        let embedded = CanonicalUri::parse(&qualified);

        let mut query = params.cloned().unwrap_or_default();
        query.merge_overriding(embedded.query());

        Ok(CanonicalUri::new(embedded.absolute_path, query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonicalizer() -> Canonicalizer {
        Canonicalizer::new(&BaseUrl::new("https://api.example.com/v1").unwrap())
    }

    #[test]
    fn test_relative_href_is_qualified() {
        let uri = canonicalizer().canonicalize("/accounts/1", None).unwrap();
        assert_eq!(uri.absolute_path(), "https://api.example.com/v1/accounts/1");

        let uri = canonicalizer().canonicalize("accounts/1", None).unwrap();
        assert_eq!(uri.absolute_path(), "https://api.example.com/v1/accounts/1");
    }

    #[test]
    fn test_absolute_href_is_kept_regardless_of_scheme_case() {
        let uri = canonicalizer()
            .canonicalize("HTTPS://other.example.com/x", None)
            .unwrap();
        assert_eq!(uri.absolute_path(), "HTTPS://other.example.com/x");
    }

    #[test]
    fn test_embedded_query_wins_over_supplied_params() {
        let params: QueryString = [("limit", "10"), ("offset", "5")].into_iter().collect();
        let uri = canonicalizer()
            .canonicalize("/accounts?limit=50", Some(&params))
            .unwrap();

        assert_eq!(uri.query().get("limit"), Some("50"));
        assert_eq!(uri.query().get("offset"), Some("5"));
    }

    #[test]
    fn test_canonicalization_is_idempotent() {
        let params: QueryString = [("expand", "customData"), ("limit", "25")]
            .into_iter()
            .collect();
        let first = canonicalizer()
            .canonicalize("/accounts?username=j%20smith", Some(&params))
            .unwrap();
        let second = canonicalizer()
            .canonicalize(&first.to_string(), None)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn test_empty_href_is_rejected() {
        assert!(canonicalizer().canonicalize("  ", None).is_err());
    }

    #[test]
    fn test_authority_and_path() {
        let uri = CanonicalUri::parse("https://api.example.com:8443/v1/accounts?x=1");
        assert_eq!(uri.authority(), "api.example.com:8443");
        assert_eq!(uri.path(), "/v1/accounts");

        let bare = CanonicalUri::parse("https://api.example.com");
        assert_eq!(bare.path(), "/");
    }
}
