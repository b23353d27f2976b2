// Representative URL sampling from crawl categories

use serde::{Deserialize, Serialize};
use sitelens_scanner::UrlCategory;
use std::collections::BTreeMap;
use tracing::debug;

pub const DEFAULT_TARGET: usize = 15;

/// Categories in selection order, with how many URLs each may contribute
pub const SELECTION_QUOTAS: [(UrlCategory, usize); 9] = [
    (UrlCategory::Home, 1),
    (UrlCategory::Category, 4),
    (UrlCategory::Product, 4),
    (UrlCategory::Legal, 2),
    (UrlCategory::Cart, 2),
    (UrlCategory::Checkout, 2),
    (UrlCategory::Search, 1),
    (UrlCategory::Account, 2),
    (UrlCategory::Other, 2),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedUrl {
    pub url: String,
    pub category: UrlCategory,
}

/// Pick up to `target` URLs, walking categories in priority order.
///
/// Greedy: once the target is reached, lower-priority categories are left
/// out entirely.
pub fn select(categories: &BTreeMap<UrlCategory, Vec<String>>, target: usize) -> Vec<SelectedUrl> {
    let mut selected = Vec::new();

    for (category, quota) in SELECTION_QUOTAS {
        if selected.len() >= target {
            break;
        }
        let Some(urls) = categories.get(&category) else {
            continue;
        };

        for url in urls.iter().take(quota) {
            if selected.len() >= target {
                break;
            }
            selected.push(SelectedUrl {
                url: url.clone(),
                category,
            });
        }
    }

    debug!("Selected {} of target {} URLs", selected.len(), target);
    selected
}

/// Count selected URLs per category
pub fn count_by_category(selected: &[SelectedUrl]) -> BTreeMap<UrlCategory, usize> {
    let mut counts = BTreeMap::new();
    for item in selected {
        *counts.entry(item.category).or_insert(0) += 1;
    }
    counts
}
