//! Serde adapter for 64-bit seeds and hashes: serialized as strings so JSON
//! consumers never lose precision, deserialized from either form.

use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Raw(u64),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Text(text) => text.parse::<u64>().map_err(D::Error::custom),
        Repr::Raw(value) => Ok(value),
    }
}
