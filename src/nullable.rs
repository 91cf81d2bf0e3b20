use serde::{Deserialize, Deserializer};

/// Field deserializer for partial updates: a missing key stays `None` (via
/// `#[serde(default)]`) while an explicit `null` becomes `Some(None)`.
pub fn deserialize<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}
