use crate::config::{FallbackBlock, FieldSelector, NodeSpec, Read, SelectorCandidate};
use scraper::ElementRef;

/// Element descendants of `scope` in document order, excluding `scope` itself.
pub fn descendants<'a>(scope: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    scope.descendants().skip(1).filter_map(ElementRef::wrap)
}

/// Whether `el` satisfies the tag, class and marker constraints of `spec`.
pub fn matches(el: ElementRef<'_>, spec: &NodeSpec) -> bool {
    let element = el.value();

    if !spec.tag.is_empty() && !element.name().eq_ignore_ascii_case(&spec.tag) {
        return false;
    }

    let all_classes = spec
        .class
        .split_whitespace()
        .all(|wanted| element.classes().any(|c| c == wanted));
    if !all_classes {
        return false;
    }

    match &spec.marker {
        Some(marker) => match (element.attr(&marker.name), &marker.value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        },
        None => true,
    }
}

pub fn find_first<'a>(scope: ElementRef<'a>, spec: &NodeSpec) -> Option<ElementRef<'a>> {
    descendants(scope).find(|el| matches(*el, spec))
}

pub fn find_all<'a>(scope: ElementRef<'a>, spec: &NodeSpec) -> Vec<ElementRef<'a>> {
    descendants(scope).filter(|el| matches(*el, spec)).collect()
}

pub fn find_all_tag<'a>(scope: ElementRef<'a>, tag: &str) -> Vec<ElementRef<'a>> {
    find_all(scope, &NodeSpec::tag(tag))
}

/// Immediate element children of `scope` matching `spec`.
pub fn children<'a>(scope: ElementRef<'a>, spec: &NodeSpec) -> Vec<ElementRef<'a>> {
    scope
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches(*el, spec))
        .collect()
}

/// Visible text of `el`: trimmed text nodes joined by single spaces.
pub fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trimmed attribute value, empty when absent.
pub fn attr_of(el: ElementRef<'_>, attribute: &str) -> String {
    el.value().attr(attribute).unwrap_or("").trim().to_string()
}

fn read(el: ElementRef<'_>, what: &Read) -> String {
    match what {
        Read::Text => text_of(el),
        Read::Attribute(name) => attr_of(el, name),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Value of a single candidate, `None` on any miss.
pub fn resolve(scope: ElementRef<'_>, candidate: &SelectorCandidate) -> Option<String> {
    match candidate {
        SelectorCandidate::Text { node } => non_empty(text_of(find_first(scope, node)?)),
        SelectorCandidate::Attribute { node, attribute } => {
            non_empty(attr_of(find_first(scope, node)?, attribute))
        }
        SelectorCandidate::Nested {
            node,
            nested,
            index,
            read: what,
        } => {
            let outer = find_first(scope, node)?;
            let inner = match index {
                Some(i) => find_all_tag(outer, nested).into_iter().nth(*i)?,
                None => find_first(outer, &NodeSpec::tag(nested))?,
            };
            non_empty(read(inner, what))
        }
        SelectorCandidate::DeepNested {
            node,
            nested,
            index,
            final_tag,
        } => {
            let outer = find_first(scope, node)?;
            let middle = find_all(outer, nested).into_iter().nth(*index)?;
            let last = find_first(middle, &NodeSpec::tag(final_tag))?;
            non_empty(text_of(last))
        }
        SelectorCandidate::TextContaining { tag, needle } => find_all_tag(scope, tag)
            .into_iter()
            .map(text_of)
            .find(|text| text.contains(needle.as_str()) && text.chars().any(|c| c.is_ascii_digit())),
        SelectorCandidate::AttributeContaining {
            tag,
            attribute,
            pattern,
        } => find_all_tag(scope, tag)
            .into_iter()
            .map(|el| attr_of(el, attribute))
            .find(|value| value.contains(pattern.as_str())),
        SelectorCandidate::Invalid { .. } => None,
    }
}

/// First non-empty value across `candidates`, tried strictly in order.
pub fn locate_candidates(scope: ElementRef<'_>, candidates: &[SelectorCandidate]) -> String {
    candidates
        .iter()
        .find_map(|candidate| resolve(scope, candidate))
        .unwrap_or_default()
}

/// Text of the fallback node, or of its first nested descendant when one is named.
pub fn locate_fallback(scope: ElementRef<'_>, fallback: &FallbackBlock) -> String {
    let Some(el) = find_first(scope, &fallback.node) else {
        return String::new();
    };
    match &fallback.nested {
        Some(tag) => find_first(el, &NodeSpec::tag(tag))
            .map(text_of)
            .unwrap_or_default(),
        None => text_of(el),
    }
}

/// Field Locator: ordered candidates, then the fallback block.
pub fn locate(scope: ElementRef<'_>, selector: &FieldSelector) -> String {
    let value = locate_candidates(scope, &selector.candidates);
    if !value.is_empty() {
        return value;
    }
    selector
        .fallback
        .as_ref()
        .map(|fallback| locate_fallback(scope, fallback))
        .unwrap_or_default()
}

/// Same fallback policy as [`locate`] but reading `attribute` from each node.
pub fn locate_attribute(scope: ElementRef<'_>, nodes: &[NodeSpec], attribute: &str) -> String {
    nodes
        .iter()
        .filter_map(|node| find_first(scope, node))
        .map(|el| attr_of(el, attribute))
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}
