//! Serde helpers for backend rows.

use serde::{Deserialize, Deserializer};

/// Read an explicit `null` as the field's default.
///
/// Nullable backend columns arrive as `null` rather than absent, which
/// `#[serde(default)]` alone does not cover.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
