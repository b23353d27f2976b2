// URL canonicalisation and path-based page categorisation

use crate::error::Result;
use serde::{Deserialize, Serialize};
use url::Url;

/// Page type inferred from a URL path.
///
/// Variant order is the order categories are listed in crawl artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlCategory {
    Home,
    Product,
    Category,
    Cart,
    Checkout,
    Search,
    Legal,
    Account,
    Other,
}

impl UrlCategory {
    pub const ALL: [UrlCategory; 9] = [
        UrlCategory::Home,
        UrlCategory::Product,
        UrlCategory::Category,
        UrlCategory::Cart,
        UrlCategory::Checkout,
        UrlCategory::Search,
        UrlCategory::Legal,
        UrlCategory::Account,
        UrlCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UrlCategory::Home => "home",
            UrlCategory::Product => "product",
            UrlCategory::Category => "category",
            UrlCategory::Cart => "cart",
            UrlCategory::Checkout => "checkout",
            UrlCategory::Search => "search",
            UrlCategory::Legal => "legal",
            UrlCategory::Account => "account",
            UrlCategory::Other => "other",
        }
    }
}

impl std::fmt::Display for UrlCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const LEGAL_MARKERS: [&str; 6] = [
    "/privacy",
    "/privacidad",
    "/terms",
    "/terminos",
    "/legal",
    "/aviso",
];

/// Canonicalise a URL for deduplication.
///
/// Drops the fragment, keeps the query, and trims trailing slashes from the
/// path without ever emptying it (the root path stays `/`).
pub fn normalize(url: &Url) -> Url {
    let mut normalized = url.clone();
    normalized.set_fragment(None);

    if normalized.query() == Some("") {
        normalized.set_query(None);
    }

    let path = normalized.path().to_string();
    let trimmed = path.trim_end_matches('/');
    if trimmed.len() != path.len() {
        if trimmed.is_empty() {
            normalized.set_path("/");
        } else {
            normalized.set_path(trimmed);
        }
    }

    normalized
}

/// Parse and normalise a URL string
pub fn normalize_str(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw)?;
    Ok(normalize(&parsed).to_string())
}

/// Categorise a URL by its path. The first matching rule wins.
pub fn categorize(url: &Url) -> UrlCategory {
    let path = url.path().to_lowercase();
    let has = |marker: &str| path.contains(marker);

    if has("/product") || has("/producto") {
        UrlCategory::Product
    } else if has("/cart") || has("/carrito") {
        UrlCategory::Cart
    } else if has("/checkout") || has("/pago") {
        UrlCategory::Checkout
    } else if has("/search") || has("/buscar") {
        UrlCategory::Search
    } else if LEGAL_MARKERS.iter().any(|m| has(m)) {
        UrlCategory::Legal
    } else if has("/account") || has("/cuenta") || has("/login") {
        UrlCategory::Account
    } else if path.is_empty() || path == "/" {
        UrlCategory::Home
    } else if has("/collection") || has("/category") || has("/categoria") {
        UrlCategory::Category
    } else {
        UrlCategory::Other
    }
}

/// Categorise a URL string; unparseable input is `Other`.
pub fn categorize_str(raw: &str) -> UrlCategory {
    Url::parse(raw)
        .map(|u| categorize(&u))
        .unwrap_or(UrlCategory::Other)
}

/// Resolve an href against the page it was found on.
///
/// Returns `None` for empty hrefs, pseudo-schemes and bare fragments.
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let resolved = base.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}

/// Same host and explicit port, regardless of scheme.
pub fn is_same_site(url: &Url, base: &Url) -> bool {
    url.host_str() == base.host_str() && url.port() == base.port()
}
