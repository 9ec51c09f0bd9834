use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// A configuration entry that degrades to an inert placeholder when it is
/// malformed, so one bad rule never rejects the whole site.
pub trait Lenient: DeserializeOwned {
    /// Entry kind named in the warning
    const WHAT: &'static str;

    fn invalid(raw: Value) -> Self;
}

fn parse<T: Lenient>(raw: Value) -> T {
    match T::deserialize(&raw) {
        Ok(entry) => entry,
        Err(e) => {
            warn!("Ignoring malformed {} {}: {}", T::WHAT, raw, e);
            T::invalid(raw)
        }
    }
}

/// `deserialize_with` for lists of lenient entries.
pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Lenient,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(parse).collect())
}

/// `deserialize_with` for an optional lenient entry; `null` is `None`.
pub fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Lenient,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.map(parse))
}
