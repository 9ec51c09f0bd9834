use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// URL-safe form of a city name: Polish diacritics folded to ASCII,
/// lowercased, whitespace runs collapsed to `-`.
pub fn city_slug(city: &str) -> String {
    let folded: String = city.trim().chars().map(fold_polish).collect();
    folded
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

fn fold_polish(c: char) -> char {
    match c {
        'ą' => 'a',
        'ć' => 'c',
        'ę' => 'e',
        'ł' => 'l',
        'ń' => 'n',
        'ó' => 'o',
        'ś' => 's',
        'ź' | 'ż' => 'z',
        'Ą' => 'A',
        'Ć' => 'C',
        'Ę' => 'E',
        'Ł' => 'L',
        'Ń' => 'N',
        'Ó' => 'O',
        'Ś' => 'S',
        'Ź' | 'Ż' => 'Z',
        other => other,
    }
}

/// City → site-specific URL path, loaded from a `miasto,link` CSV file
#[derive(Debug, Clone, Default)]
pub struct LocationMap {
    paths: HashMap<String, String>,
}

impl LocationMap {
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read location mapping {}", path.display()))?;
        let map = Self::parse(&text)
            .with_context(|| format!("Invalid location mapping {}", path.display()))?;
        info!("Loaded {} location mappings", map.len());
        Ok(map)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .context("Failed to read location mapping header")?
            .clone();
        if headers.is_empty() {
            anyhow::bail!("Location mapping is empty");
        }

        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .with_context(|| format!("Location mapping has no `{}` column", name))
        };
        let city_col = column("miasto")?;
        let link_col = column("link")?;

        let mut paths = HashMap::new();
        for record in reader.records() {
            let record = record.context("Malformed location mapping row")?;
            let (Some(city), Some(link)) = (record.get(city_col), record.get(link_col)) else {
                debug!("Skipping short location row: {:?}", record);
                continue;
            };
            let city = city_slug(city);
            if city.is_empty() || link.is_empty() {
                continue;
            }
            paths.insert(city, link.to_string());
        }

        Ok(Self { paths })
    }

    pub fn lookup(&self, city: &str) -> Option<&str> {
        self.paths.get(&city_slug(city)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
