use super::locate::{find_all, find_all_tag, text_of};
use crate::config::PaginationSpec;
use scraper::{Html, Selector};
use tracing::{debug, warn};

fn page_number(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok().filter(|n| *n > 0)
}

/// Total page count of a listing site, read from its first page.
///
/// Tries the page-number attribute, then the "last page" node, then a scan of
/// numeric pagination links; `default_pages` when none yields a page number.
pub fn resolve_page_count(document: &Html, spec: &PaginationSpec, default_pages: u32) -> u32 {
    let root = document.root_element();

    if let Some(attr) = &spec.page_attribute {
        let max = find_all_tag(root, &attr.tag)
            .into_iter()
            .filter_map(|el| el.value().attr(&attr.attribute).and_then(page_number))
            .max();
        if let Some(pages) = max {
            debug!("Page count {} from {} attributes", pages, attr.attribute);
            return pages;
        }
    }

    if let Some(css) = &spec.last_page_selector {
        match Selector::parse(css) {
            Ok(selector) => {
                if let Some(pages) = document.select(&selector).next().and_then(|el| page_number(&text_of(el))) {
                    debug!("Page count {} from last page node", pages);
                    return pages;
                }
            }
            Err(e) => warn!("Invalid last page selector '{}': {:?}", css, e),
        }
    }

    if let Some(node) = &spec.node {
        let max = find_all(root, node)
            .into_iter()
            .filter_map(|el| page_number(&text_of(el)))
            .max();
        if let Some(pages) = max {
            debug!("Page count {} from pagination links", pages);
            return pages;
        }
    }

    debug!("No pagination markers found, using {} pages", default_pages);
    default_pages
}
