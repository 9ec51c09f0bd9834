use super::locate::{
    attr_of, find_all, find_all_tag, find_first, locate, locate_attribute, locate_candidates,
    text_of,
};
use super::normalize::{normalize_floor, normalize_integer};
use crate::config::{
    DetailField, DetailsStrategy, ImageSelector, ImageTransform, NodeSpec, SearchTextRule,
    SiteConfig, TextRule,
};
use crate::models::{property_id, Property};
use regex::Regex;
use scraper::ElementRef;
use tracing::{debug, warn};

/// Area, rooms and level read by a details strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Details {
    pub area: i64,
    pub rooms: Option<i64>,
    pub level: Option<i64>,
}

enum CleanupRule {
    Regex(Regex, String),
    Strip(Vec<char>),
}

impl CleanupRule {
    fn apply(&self, text: &str) -> String {
        match self {
            CleanupRule::Regex(re, replacement) => re.replace_all(text, replacement.as_str()).into_owned(),
            CleanupRule::Strip(chars) => text.trim_matches(|c: char| chars.contains(&c)).to_string(),
        }
    }
}

fn compile_rules(rules: &[TextRule]) -> Vec<CleanupRule> {
    rules
        .iter()
        .filter_map(|rule| match rule {
            TextRule::Regex { pattern, replacement } => match Regex::new(pattern) {
                Ok(re) => Some(CleanupRule::Regex(re, replacement.clone())),
                Err(e) => {
                    warn!("Ignoring invalid cleanup pattern '{}': {}", pattern, e);
                    None
                }
            },
            TextRule::Strip { chars } => Some(CleanupRule::Strip(chars.chars().collect())),
            TextRule::Invalid { .. } => None,
        })
        .collect()
}

/// Property Extractor bound to one site configuration
pub struct PropertyExtractor<'c> {
    config: &'c SiteConfig,
    address_rules: Vec<CleanupRule>,
}

impl<'c> PropertyExtractor<'c> {
    pub fn new(config: &'c SiteConfig) -> Self {
        Self {
            config,
            address_rules: compile_rules(&config.processing_rules.address_cleanup),
        }
    }

    /// Extract a record from `listing`, or `None` when its link or title is missing.
    /// Every other field falls back to its default.
    pub fn extract(&self, listing: ElementRef<'_>, city: &str) -> Option<Property> {
        let selectors = &self.config.selectors;

        let href = match &selectors.link {
            Some(selector) => locate(listing, selector),
            None => locate_attribute(listing, &[NodeSpec::tag("a")], "href"),
        };
        if href.is_empty() {
            debug!("Skipping listing without link");
            return None;
        }
        let link = absolute_link(&href, &self.config.base_domain);

        let title = locate(listing, &selectors.title);
        if title.is_empty() {
            debug!("Skipping listing without title: {}", link);
            return None;
        }

        let image = selectors
            .image
            .as_ref()
            .map(|image| extract_image(listing, image, &self.config.base_domain))
            .unwrap_or_default();

        let address = self.address(listing, &title, city);
        let price = normalize_integer(&locate(listing, &selectors.price));

        let details = selectors
            .details
            .as_ref()
            .map(|strategy| extract_details(listing, strategy))
            .unwrap_or_default();

        Some(Property {
            id: property_id(&link),
            title,
            link,
            price,
            area: details.area,
            rooms: details.rooms,
            level: details.level,
            address,
            city: title_case(city),
            image,
            site: self.config.site_name.clone(),
        })
    }

    fn address(&self, listing: ElementRef<'_>, title: &str, city: &str) -> String {
        let mut address = locate(listing, &self.config.selectors.address);
        if address.is_empty() {
            address = address_from_title(title, city);
        }
        for rule in &self.address_rules {
            address = rule.apply(&address);
        }
        let address = address.trim();
        if address.is_empty() {
            title_case(city)
        } else {
            address.to_string()
        }
    }
}

/// Absolute form of a listing href. Absolute and scheme-relative links are kept.
pub fn absolute_link(href: &str, base_domain: &str) -> String {
    let href = href.trim();
    if href.starts_with("http") || href.starts_with("//") {
        return href.to_string();
    }
    let base = base_domain.trim_end_matches('/');
    match href.strip_prefix('/') {
        Some(path) => format!("{}/{}", base, path),
        None => format!("{}/{}", base, href),
    }
}

/// Address guessed from titles shaped like "Mieszkanie, Katowice, Bogucice, 43 m²".
pub fn address_from_title(title: &str, city: &str) -> String {
    let parts: Vec<&str> = title.split(',').map(str::trim).collect();
    match parts.len() {
        n if n >= 3 => format!("{}, {}", parts[1], parts[2]),
        2 => parts[1].to_string(),
        _ => title_case(city),
    }
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

fn extract_image(listing: ElementRef<'_>, selector: &ImageSelector, base_domain: &str) -> String {
    let mut image = selector
        .srcset
        .as_ref()
        .and_then(|node| find_first(listing, node))
        .and_then(|el| widest_srcset_entry(&attr_of(el, "srcset")))
        .unwrap_or_default();

    if image.is_empty() {
        image = locate_candidates(listing, &selector.candidates);
    }

    if image.is_empty() || selector.placeholders.iter().any(|p| image.contains(p.as_str())) {
        return String::new();
    }

    if image.starts_with('/') && !image.starts_with("//") {
        image = absolute_link(&image, base_domain);
    }

    match &selector.transform {
        Some(transform) => transform_image(&image, transform),
        None => image,
    }
}

/// URL of the `srcset` entry with the largest `w` descriptor; the first wins ties.
pub fn widest_srcset_entry(srcset: &str) -> Option<String> {
    let mut best: Option<(u32, &str)> = None;
    for entry in srcset.split(',') {
        let Some((url, descriptor)) = entry.trim().rsplit_once(' ') else {
            continue;
        };
        let Some(Ok(width)) = descriptor.strip_suffix('w').map(str::parse::<u32>) else {
            continue;
        };
        if best.map_or(true, |(best_width, _)| width > best_width) {
            best = Some((width, url.trim()));
        }
    }
    best.map(|(_, url)| url.to_string())
}

pub fn transform_image(url: &str, transform: &ImageTransform) -> String {
    match transform {
        ImageTransform::ReplaceToken { from, to } => url.replace(from.as_str(), to),
        ImageTransform::ResolutionSuffix { marker } => {
            let mut segments: Vec<String> = url.split('/').map(str::to_string).collect();
            if segments.len() < 2 {
                return url.to_string();
            }
            let idx = segments.len() - 2;
            let segment = &mut segments[idx];
            if segment.pop().is_some() {
                segment.push_str(marker);
            }
            segments.join("/")
        }
        ImageTransform::Invalid { .. } => url.to_string(),
    }
}

/// `Some` only when the text carries at least one digit.
fn stated_integer(text: &str) -> Option<i64> {
    if text.chars().any(|c| c.is_ascii_digit()) {
        Some(normalize_integer(text))
    } else {
        None
    }
}

pub fn extract_details(listing: ElementRef<'_>, strategy: &DetailsStrategy) -> Details {
    let mut details = Details::default();

    match strategy {
        DetailsStrategy::SimplePair { node } => {
            let nodes = find_all(listing, node);
            if let [rooms, area, ..] = nodes.as_slice() {
                details.rooms = stated_integer(&text_of(*rooms));
                details.area = normalize_integer(&text_of(*area));
            }
        }
        DetailsStrategy::LabeledPair { labels, values, keywords } => {
            let labels = find_all(listing, labels);
            let values = find_all(listing, values);
            let has = |label: &str, words: &[String]| words.iter().any(|w| label.contains(&w.to_lowercase()));

            // a label repeated later in the listing overrides the earlier value
            for (label, value) in labels.iter().zip(values.iter()) {
                let label = text_of(*label).to_lowercase();
                let value = text_of(*value);
                if has(&label, &keywords.area) {
                    details.area = normalize_integer(&value);
                } else if has(&label, &keywords.rooms) {
                    details.rooms = stated_integer(&value);
                } else if has(&label, &keywords.level) {
                    details.level = normalize_floor(&value);
                }
            }
        }
        DetailsStrategy::Indexed { node, rooms, area, level } => {
            let nodes = find_all(listing, node);
            let text_at = |idx: &Option<usize>| idx.and_then(|i| nodes.get(i)).map(|el| text_of(*el));
            details.rooms = text_at(rooms).and_then(|t| stated_integer(&t));
            details.area = text_at(area).map(|t| normalize_integer(&t)).unwrap_or(0);
            details.level = text_at(level).and_then(|t| normalize_floor(&t));
        }
        DetailsStrategy::SearchText { area, rules } => {
            if let Some(selector) = area {
                details.area = normalize_integer(&locate(listing, selector));
            }
            for rule in rules {
                let Some(value) = search_text(listing, rule) else {
                    continue;
                };
                match rule.field {
                    DetailField::Area => details.area = normalize_integer(&value),
                    DetailField::Rooms => details.rooms = stated_integer(&value),
                    DetailField::Level => details.level = normalize_floor(&value),
                }
            }
        }
        DetailsStrategy::MarkerSplit { node, rooms_marker } => {
            let nodes = find_all(listing, node);
            details.rooms = nodes
                .iter()
                .find(|el| el.value().attr(rooms_marker).is_some())
                .and_then(|el| stated_integer(&text_of(*el)));
            details.area = nodes
                .iter()
                .filter(|el| el.value().attr(rooms_marker).is_none())
                .map(|el| text_of(*el))
                .find(|text| text.chars().any(|c| c.is_ascii_digit()))
                .map(|text| normalize_integer(&text))
                .unwrap_or(0);
        }
        DetailsStrategy::Invalid { .. } => {}
    }

    details
}

/// Value of the first container holding the rule's marker that yields one.
fn search_text(listing: ElementRef<'_>, rule: &SearchTextRule) -> Option<String> {
    find_all_tag(listing, &rule.container)
        .into_iter()
        .filter(|p| p.text().collect::<String>().contains(rule.marker.as_str()))
        .find_map(|p| paragraph_value(p, rule))
}

/// Emphasized nodes concatenated, else the first word after the marker.
fn paragraph_value(paragraph: ElementRef<'_>, rule: &SearchTextRule) -> Option<String> {
    let emphasized: String = find_all_tag(paragraph, &rule.extract_from)
        .into_iter()
        .map(text_of)
        .collect();
    if !emphasized.is_empty() {
        return Some(emphasized);
    }

    let text = text_of(paragraph);
    let (_, tail) = text.split_once(rule.marker.as_str())?;
    tail.trim_start_matches(|c: char| c == ':' || c.is_whitespace())
        .split_whitespace()
        .next()
        .map(str::to_string)
}
