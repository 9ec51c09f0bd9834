use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of hex characters kept from the link digest.
pub const ID_LEN: usize = 12;

/// Normalized property record produced for one listing element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Property {
    pub id: String,
    pub title: String,
    /// Absolute listing URL; the natural key for upserts
    pub link: String,
    pub price: i64,
    pub area: i64,
    /// `None` when the listing does not state a room count
    pub rooms: Option<i64>,
    /// `None` when the floor is not stated, `Some(0)` for ground floor
    pub level: Option<i64>,
    pub address: String,
    pub city: String,
    pub image: String,
    pub site: String,
}

/// Stable identifier derived from the absolute listing link.
pub fn property_id(link: &str) -> String {
    let digest = Sha256::digest(link.as_bytes());
    let mut id = format!("{:x}", digest);
    id.truncate(ID_LEN);
    id
}
