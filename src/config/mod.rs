mod lenient;
pub mod location;

use anyhow::{Context, Result};
use lenient::Lenient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub use location::{city_slug, LocationMap};

/// Matches elements by tag name, class and an optional attribute marker
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeSpec {
    /// Element name; empty matches any element
    #[serde(default)]
    pub tag: String,
    /// Class name; whitespace-separated lists require every class
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<AttrMarker>,
}

impl NodeSpec {
    pub fn tag(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    pub fn with_class(tag: &str, class: &str) -> Self {
        Self {
            tag: tag.to_string(),
            class: class.to_string(),
            marker: None,
        }
    }

    pub fn with_marker(tag: &str, name: &str, value: Option<&str>) -> Self {
        Self {
            tag: tag.to_string(),
            class: String::new(),
            marker: Some(AttrMarker {
                name: name.to_string(),
                value: value.map(str::to_string),
            }),
        }
    }
}

/// Attribute that must be present, optionally with an exact value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttrMarker {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// What to read from the element a nested candidate resolves to
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Read {
    #[default]
    Text,
    Attribute(String),
}

/// One rule in an ordered fallback chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectorCandidate {
    /// Text of the first matching node
    Text { node: NodeSpec },
    /// Attribute value of the first matching node
    Attribute { node: NodeSpec, attribute: String },
    /// Text or attribute of a descendant of the first matching node.
    /// Without an index the first descendant with the nested tag is read.
    Nested {
        node: NodeSpec,
        nested: String,
        #[serde(default)]
        index: Option<usize>,
        #[serde(default)]
        read: Read,
    },
    /// Two-level lookup: `node` → `nested[index]` → first `final_tag`
    DeepNested {
        node: NodeSpec,
        nested: NodeSpec,
        index: usize,
        final_tag: String,
    },
    /// First node of `tag` whose text contains `needle` and at least one digit
    TextContaining { tag: String, needle: String },
    /// First node of `tag` whose `attribute` contains `pattern`; yields the attribute
    AttributeContaining {
        tag: String,
        attribute: String,
        pattern: String,
    },
    /// Malformed entry kept verbatim; never matches
    #[serde(skip_deserializing)]
    Invalid { raw: Value },
}

impl Lenient for SelectorCandidate {
    const WHAT: &'static str = "selector candidate";

    fn invalid(raw: Value) -> Self {
        Self::Invalid { raw }
    }
}

/// Secondary lookup consulted when every primary candidate misses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FallbackBlock {
    pub node: NodeSpec,
    #[serde(default)]
    pub nested: Option<String>,
}

/// Ordered candidates for one logical field
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldSelector {
    #[serde(default, deserialize_with = "lenient::list")]
    pub candidates: Vec<SelectorCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackBlock>,
}

impl FieldSelector {
    pub fn new(candidates: Vec<SelectorCandidate>) -> Self {
        Self {
            candidates,
            fallback: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty() && self.fallback.is_none()
    }
}

/// Describes the repeated listing elements inside the container
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingItemSpec {
    pub node: NodeSpec,
    /// Class substrings tried in order when exact class matching is too brittle
    #[serde(default)]
    pub flexible_class_patterns: Vec<String>,
}

/// Rewrites an image URL to request a larger asset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageTransform {
    /// Replace the last character of the penultimate path segment
    ResolutionSuffix {
        #[serde(default = "default_large_marker")]
        marker: String,
    },
    ReplaceToken { from: String, to: String },
    /// Malformed entry; leaves the URL unchanged
    #[serde(skip_deserializing)]
    Invalid { raw: Value },
}

impl Lenient for ImageTransform {
    const WHAT: &'static str = "image transform";

    fn invalid(raw: Value) -> Self {
        Self::Invalid { raw }
    }
}

fn default_large_marker() -> String {
    "l".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageSelector {
    #[serde(default, deserialize_with = "lenient::list")]
    pub candidates: Vec<SelectorCandidate>,
    /// Responsive image node; the widest `srcset` entry wins over `candidates`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srcset: Option<NodeSpec>,
    #[serde(
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub transform: Option<ImageTransform>,
    /// Substrings marking a missing-thumbnail image
    #[serde(default)]
    pub placeholders: Vec<String>,
}

/// Detail field a search-text rule feeds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DetailField {
    Area,
    Rooms,
    Level,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchTextRule {
    pub field: DetailField,
    /// Phrase the paragraph must contain, e.g. "Liczba pokoi"
    pub marker: String,
    #[serde(default = "default_paragraph_tag")]
    pub container: String,
    /// Emphasized nodes holding the value inside the paragraph
    #[serde(default = "default_emphasis_tag")]
    pub extract_from: String,
}

fn default_paragraph_tag() -> String {
    "p".to_string()
}

fn default_emphasis_tag() -> String {
    "strong".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelKeywords {
    #[serde(default = "default_area_keywords")]
    pub area: Vec<String>,
    #[serde(default = "default_rooms_keywords")]
    pub rooms: Vec<String>,
    #[serde(default = "default_level_keywords")]
    pub level: Vec<String>,
}

impl Default for LabelKeywords {
    fn default() -> Self {
        Self {
            area: default_area_keywords(),
            rooms: default_rooms_keywords(),
            level: default_level_keywords(),
        }
    }
}

fn default_area_keywords() -> Vec<String> {
    vec!["powierzchnia".to_string()]
}

fn default_rooms_keywords() -> Vec<String> {
    vec!["pokoi".to_string()]
}

fn default_level_keywords() -> Vec<String> {
    vec!["piętro".to_string()]
}

/// How area, rooms and level are read from a listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum DetailsStrategy {
    /// First two matching nodes are rooms then area
    SimplePair { node: NodeSpec },
    /// Parallel label/value node sequences paired by position
    LabeledPair {
        labels: NodeSpec,
        values: NodeSpec,
        #[serde(default)]
        keywords: LabelKeywords,
    },
    /// Fixed positions among repeated nodes
    Indexed {
        node: NodeSpec,
        #[serde(default)]
        rooms: Option<usize>,
        #[serde(default)]
        area: Option<usize>,
        #[serde(default)]
        level: Option<usize>,
    },
    /// Marker phrases inside paragraphs, optionally with a located area field
    SearchText {
        #[serde(default)]
        area: Option<FieldSelector>,
        #[serde(default)]
        rules: Vec<SearchTextRule>,
    },
    /// Rooms from the node carrying `rooms_marker`, area from the first unmarked
    /// node containing a digit
    MarkerSplit { node: NodeSpec, rooms_marker: String },
    /// Malformed entry; every detail keeps its default
    #[serde(skip_deserializing)]
    Invalid { raw: Value },
}

impl Lenient for DetailsStrategy {
    const WHAT: &'static str = "details strategy";

    fn invalid(raw: Value) -> Self {
        Self::Invalid { raw }
    }
}

/// Text cleanup applied after a field is resolved
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextRule {
    Regex { pattern: String, replacement: String },
    Strip { chars: String },
    /// Malformed entry; skipped
    #[serde(skip_deserializing)]
    Invalid { raw: Value },
}

impl Lenient for TextRule {
    const WHAT: &'static str = "text rule";

    fn invalid(raw: Value) -> Self {
        Self::Invalid { raw }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessingRules {
    #[serde(default, deserialize_with = "lenient::list")]
    pub address_cleanup: Vec<TextRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageAttributeSpec {
    pub tag: String,
    pub attribute: String,
}

/// Pagination markers, tried in field order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationSpec {
    #[serde(default)]
    pub page_attribute: Option<PageAttributeSpec>,
    /// CSS selector for a single "last page" node
    #[serde(default)]
    pub last_page_selector: Option<String>,
    #[serde(default)]
    pub node: Option<NodeSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Selectors {
    pub listings_container: NodeSpec,
    #[serde(default = "default_container_fallback")]
    pub container_fallback_patterns: Vec<String>,
    pub listing_item: ListingItemSpec,
    /// Anchor lookup; defaults to the first `a[href]` in the listing
    #[serde(default)]
    pub link: Option<FieldSelector>,
    pub title: FieldSelector,
    #[serde(default)]
    pub address: FieldSelector,
    #[serde(default)]
    pub price: FieldSelector,
    #[serde(default)]
    pub image: Option<ImageSelector>,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub details: Option<DetailsStrategy>,
    #[serde(default)]
    pub pagination: Option<PaginationSpec>,
}

fn default_container_fallback() -> Vec<String> {
    vec![
        "column".to_string(),
        "container".to_string(),
        "content".to_string(),
    ]
}

/// How the queried city becomes a URL path segment
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocationSource {
    #[default]
    Slug,
    CsvMapping { file: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteConfig {
    /// Identifier echoed into every record
    pub site_name: String,
    /// Display name used in job status messages
    #[serde(default)]
    pub name: String,
    pub base_domain: String,
    /// First listing page, used for page-count probing
    #[serde(default)]
    pub base_url: String,
    /// Listing page template with `{city}` / `{city_path}` and `{page}`
    #[serde(default)]
    pub page_url: String,
    #[serde(default)]
    pub location: LocationSource,
    #[serde(default = "default_true")]
    pub has_pagination: bool,
    #[serde(default = "default_pages")]
    pub default_pages: u32,
    /// Treat a redirect back to the first page as an empty page
    #[serde(default)]
    pub detect_page_redirects: bool,
    pub selectors: Selectors,
    #[serde(default)]
    pub processing_rules: ProcessingRules,
}

fn default_true() -> bool {
    true
}

fn default_pages() -> u32 {
    1
}

impl SiteConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse site configuration")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read site configuration {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse site configuration {}", path.display()))
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.site_name
        } else {
            &self.name
        }
    }

    /// Fill a URL template with the city path and page number.
    pub fn render_url(template: &str, city_path: &str, page: u32) -> String {
        template
            .replace("{city_path}", city_path)
            .replace("{city}", city_path)
            .replace("{page}", &page.to_string())
    }
}

/// Site configurations keyed by `site_name`
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    sites: BTreeMap<String, SiteConfig>,
}

impl SiteRegistry {
    /// Load every `*.json` file in `dir`. Unparsable files are skipped.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read site directory {}", dir.display()))?;

        let mut registry = Self::default();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match SiteConfig::from_file(&path) {
                Ok(config) => registry.insert(config),
                Err(e) => warn!("Skipping {}: {:#}", path.display(), e),
            }
        }

        info!("Loaded {} site configurations from {}", registry.len(), dir.display());
        Ok(registry)
    }

    pub fn insert(&mut self, config: SiteConfig) {
        self.sites.insert(config.site_name.clone(), config);
    }

    pub fn get(&self, site_name: &str) -> Option<&SiteConfig> {
        self.sites.get(site_name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.sites.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}
