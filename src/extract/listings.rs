use super::locate::{children, descendants, find_all, find_first};
use crate::config::{ListingItemSpec, NodeSpec, Selectors};
use scraper::{ElementRef, Html};
use tracing::debug;

/// Configured container, else the first `div` whose class attribute contains
/// one of the fallback patterns.
pub fn find_container<'a>(document: &'a Html, selectors: &Selectors) -> Option<ElementRef<'a>> {
    let root = document.root_element();
    if let Some(container) = find_first(root, &selectors.listings_container) {
        return Some(container);
    }

    debug!("Primary container not found, trying class pattern fallback");
    descendants(root).find(|el| {
        el.value().name() == "div"
            && el.value().attr("class").is_some_and(|class| {
                selectors
                    .container_fallback_patterns
                    .iter()
                    .any(|pattern| class.contains(pattern.as_str()))
            })
    })
}

/// Listing elements inside `container`, in document order.
///
/// Strategies, first applicable wins:
/// 1. the item node carries an attribute marker: every marked descendant,
///    regardless of class
/// 2. the item node names a tag without a class: immediate children only
/// 3. flexible class patterns: the first pattern with a non-empty match set
/// 4. exact tag and class
pub fn find_listings<'a>(container: ElementRef<'a>, item: &ListingItemSpec) -> Vec<ElementRef<'a>> {
    let node = &item.node;

    if let Some(marker) = &node.marker {
        let marked = NodeSpec {
            tag: node.tag.clone(),
            class: String::new(),
            marker: Some(marker.clone()),
        };
        return find_all(container, &marked);
    }

    if !node.tag.is_empty() && node.class.is_empty() {
        return children(container, node);
    }

    for pattern in &item.flexible_class_patterns {
        let listings: Vec<_> = descendants(container)
            .filter(|el| node.tag.is_empty() || el.value().name().eq_ignore_ascii_case(&node.tag))
            .filter(|el| {
                el.value()
                    .attr("class")
                    .is_some_and(|class| class.contains(pattern.as_str()))
            })
            .collect();
        if !listings.is_empty() {
            debug!("Flexible class pattern '{}' matched {} listings", pattern, listings.len());
            return listings;
        }
    }

    find_all(container, node)
}
