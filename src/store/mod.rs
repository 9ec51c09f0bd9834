use crate::models::Property;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Maximum number of records a query returns.
pub const QUERY_LIMIT: usize = 1000;

/// A stored property with its bookkeeping timestamps
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredProperty {
    #[serde(flatten)]
    pub property: Property,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    PriceAsc,
    PriceDesc,
    Newest,
    Oldest,
}

impl std::str::FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "price_asc" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            other => anyhow::bail!("Unknown sort order: {}", other),
        }
    }
}

/// Query filters; every unset bound is ignored
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyFilter {
    /// Allowed sites; an empty list matches nothing
    pub sites: Option<Vec<String>>,
    pub price_min: Option<i64>,
    pub price_max: Option<i64>,
    pub area_min: Option<i64>,
    pub area_max: Option<i64>,
    pub rooms_min: Option<i64>,
    pub rooms_max: Option<i64>,
    pub level_min: Option<i64>,
    pub level_max: Option<i64>,
    /// Case-insensitive address substring
    pub address: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
}

fn within(value: i64, min: Option<i64>, max: Option<i64>) -> bool {
    min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max)
}

/// A missing value never satisfies a bound.
fn within_optional(value: Option<i64>, min: Option<i64>, max: Option<i64>) -> bool {
    match value {
        Some(value) => within(value, min, max),
        None => min.is_none() && max.is_none(),
    }
}

impl PropertyFilter {
    pub fn matches(&self, property: &Property) -> bool {
        if let Some(sites) = &self.sites {
            if !sites.iter().any(|s| s == &property.site) {
                return false;
            }
        }

        if let Some(needle) = self.address.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if !property.address.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }

        within(property.price, self.price_min, self.price_max)
            && within(property.area, self.area_min, self.area_max)
            && within_optional(property.rooms, self.rooms_min, self.rooms_max)
            && within_optional(property.level, self.level_min, self.level_max)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreStats {
    pub total: usize,
    pub avg_price: i64,
    pub min_price: i64,
    pub max_price: i64,
    pub by_site: BTreeMap<String, usize>,
}

/// Properties keyed by their absolute link
#[derive(Debug, Clone, Default)]
pub struct PropertyStore {
    records: BTreeMap<String, StoredProperty>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `property`, or refresh the record already stored under its link.
    pub fn upsert(&mut self, property: Property) -> UpsertOutcome {
        let now = Utc::now();
        match self.records.get_mut(&property.link) {
            Some(existing) => {
                debug!("Updating {}", property.link);
                existing.property = property;
                existing.updated_at = now;
                UpsertOutcome::Updated
            }
            None => {
                self.records.insert(
                    property.link.clone(),
                    StoredProperty {
                        property,
                        created_at: now,
                        updated_at: now,
                    },
                );
                UpsertOutcome::Inserted
            }
        }
    }

    /// Upsert every record; returns how many were saved.
    pub fn upsert_batch(&mut self, properties: impl IntoIterator<Item = Property>) -> usize {
        let mut saved = 0;
        let mut inserted = 0;
        for property in properties {
            if self.upsert(property) == UpsertOutcome::Inserted {
                inserted += 1;
            }
            saved += 1;
        }
        info!("Saved {} properties ({} new)", saved, inserted);
        saved
    }

    pub fn get(&self, link: &str) -> Option<&StoredProperty> {
        self.records.get(link)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn query(&self, filter: &PropertyFilter) -> Vec<&StoredProperty> {
        let mut results: Vec<&StoredProperty> = self
            .records
            .values()
            .filter(|stored| filter.matches(&stored.property))
            .collect();

        match filter.sort {
            SortOrder::PriceAsc => results.sort_by_key(|s| s.property.price),
            SortOrder::PriceDesc => results.sort_by(|a, b| b.property.price.cmp(&a.property.price)),
            SortOrder::Newest => results.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::Oldest => results.sort_by_key(|s| s.created_at),
        }

        results.truncate(QUERY_LIMIT);
        results
    }

    /// Price statistics, optionally restricted to addresses mentioning `city`.
    pub fn stats(&self, city: Option<&str>) -> StoreStats {
        let city = city.map(str::to_lowercase);
        let properties: Vec<&Property> = self
            .records
            .values()
            .map(|s| &s.property)
            .filter(|p| {
                city.as_deref()
                    .map_or(true, |city| p.address.to_lowercase().contains(city))
            })
            .collect();

        let mut stats = StoreStats {
            total: properties.len(),
            ..StoreStats::default()
        };
        for property in &properties {
            *stats.by_site.entry(property.site.clone()).or_insert(0) += 1;
        }

        let prices: Vec<i64> = properties.iter().map(|p| p.price).filter(|p| *p > 0).collect();
        if !prices.is_empty() {
            stats.avg_price = prices.iter().sum::<i64>() / prices.len() as i64;
            stats.min_price = prices.iter().copied().min().unwrap_or(0);
            stats.max_price = prices.iter().copied().max().unwrap_or(0);
        }
        stats
    }

    /// Drop records first stored more than `days` days ago; returns how many.
    pub fn remove_older_than(&mut self, days: i64) -> usize {
        let cutoff = Utc::now() - Duration::days(days);
        let before = self.records.len();
        self.records.retain(|_, stored| stored.created_at >= cutoff);
        before - self.records.len()
    }

    /// Load a store saved with [`PropertyStore::save`]; a missing file is an empty store.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(Self::new());
        }
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read store {}", path.display()))?;
        let stored: Vec<StoredProperty> = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse store {}", path.display()))?;

        let records = stored
            .into_iter()
            .map(|s| (s.property.link.clone(), s))
            .collect();
        Ok(Self { records })
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let stored: Vec<&StoredProperty> = self.records.values().collect();
        let json = serde_json::to_string_pretty(&stored)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write store {}", path.display()))?;
        info!("💾 Saved {} properties to {}", stored.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::property_id;
    use tempfile::TempDir;

    fn property(link: &str, site: &str, price: i64, rooms: Option<i64>, level: Option<i64>) -> Property {
        Property {
            id: property_id(link),
            title: format!("Mieszkanie {}", link),
            link: link.to_string(),
            price,
            area: 50,
            rooms,
            level,
            address: "Katowice, Ligota".to_string(),
            city: "Katowice".to_string(),
            image: String::new(),
            site: site.to_string(),
        }
    }

    fn seeded() -> PropertyStore {
        let mut store = PropertyStore::new();
        store.upsert_batch(vec![
            property("https://a.pl/1", "otodom", 500_000, Some(3), Some(0)),
            property("https://a.pl/2", "olx", 300_000, None, None),
            property("https://a.pl/3", "olx", 700_000, Some(2), Some(4)),
        ]);
        store
    }

    #[test]
    fn test_upsert_by_link() {
        let mut store = PropertyStore::new();
        let first = property("https://a.pl/1", "otodom", 500_000, Some(3), None);
        assert_eq!(store.upsert(first.clone()), UpsertOutcome::Inserted);

        let mut changed = first;
        changed.price = 480_000;
        assert_eq!(store.upsert(changed), UpsertOutcome::Updated);
        assert_eq!(store.len(), 1);

        let stored = store.get("https://a.pl/1").unwrap();
        assert_eq!(stored.property.price, 480_000);
        assert!(stored.updated_at >= stored.created_at);
    }

    #[test]
    fn test_query_price_sorting() {
        let store = seeded();
        let prices: Vec<i64> = store
            .query(&PropertyFilter::default())
            .iter()
            .map(|s| s.property.price)
            .collect();
        assert_eq!(prices, vec![300_000, 500_000, 700_000]);

        let filter = PropertyFilter {
            sort: SortOrder::PriceDesc,
            ..PropertyFilter::default()
        };
        assert_eq!(store.query(&filter)[0].property.price, 700_000);
    }

    #[test]
    fn test_query_sites() {
        let store = seeded();
        let olx = PropertyFilter {
            sites: Some(vec!["olx".to_string()]),
            ..PropertyFilter::default()
        };
        assert_eq!(store.query(&olx).len(), 2);

        let none = PropertyFilter {
            sites: Some(Vec::new()),
            ..PropertyFilter::default()
        };
        assert!(store.query(&none).is_empty());
    }

    #[test]
    fn test_unknown_rooms_and_level_never_match_bounds() {
        let store = seeded();
        let rooms = PropertyFilter {
            rooms_min: Some(2),
            ..PropertyFilter::default()
        };
        assert_eq!(store.query(&rooms).len(), 2);

        let ground = PropertyFilter {
            level_max: Some(0),
            ..PropertyFilter::default()
        };
        let found = store.query(&ground);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].property.link, "https://a.pl/1");
    }

    #[test]
    fn test_query_address_case_insensitive() {
        let store = seeded();
        let filter = PropertyFilter {
            address: Some("LIGOTA".to_string()),
            ..PropertyFilter::default()
        };
        assert_eq!(store.query(&filter).len(), 3);
    }

    #[test]
    fn test_stats() {
        let mut store = seeded();
        store.upsert(property("https://a.pl/4", "gethome", 0, None, None));
        let stats = store.stats(Some("katowice"));
        assert_eq!(stats.total, 4);
        assert_eq!(stats.avg_price, 500_000);
        assert_eq!(stats.min_price, 300_000);
        assert_eq!(stats.max_price, 700_000);
        assert_eq!(stats.by_site.get("olx"), Some(&2));

        assert_eq!(store.stats(Some("gdańsk")).total, 0);
    }

    #[test]
    fn test_remove_older_than_keeps_fresh() {
        let mut store = seeded();
        assert_eq!(store.remove_older_than(30), 0);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_sort_order_from_str() {
        assert_eq!("newest".parse::<SortOrder>().unwrap(), SortOrder::Newest);
        assert!("cheapest".parse::<SortOrder>().is_err());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        assert!(PropertyStore::load(&path).await.unwrap().is_empty());

        let store = seeded();
        store.save(&path).await.unwrap();

        let loaded = PropertyStore::load(&path).await.unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.get("https://a.pl/2").unwrap().property.rooms, None);
        assert_eq!(
            loaded.get("https://a.pl/1").unwrap().created_at,
            store.get("https://a.pl/1").unwrap().created_at
        );
    }
}
