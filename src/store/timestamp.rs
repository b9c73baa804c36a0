//! Serde adapter for record timestamps.
//!
//! Written as RFC 3339. Older data files carry naive ISO-8601 local times
//! (`2024-03-01T10:15:30.123456`); those are read back as UTC.

use serde::{de::Error as _, ser::Error as _, Deserialize, Deserializer, Serializer};
use time::{
    format_description::well_known::{Iso8601, Rfc3339},
    OffsetDateTime, PrimitiveDateTime,
};

pub fn serialize<S: Serializer>(ts: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    let text = ts.format(&Rfc3339).map_err(S::Error::custom)?;
    serializer.serialize_str(&text)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| D::Error::custom(format!("unrecognised timestamp `{raw}`")))
}

/// Like [`deserialize`], but anything unreadable becomes the epoch.
pub fn deserialize_or_epoch<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<OffsetDateTime, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw.as_str().and_then(parse).unwrap_or_else(epoch))
}

pub fn parse(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339).ok().or_else(|| {
        PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT)
            .ok()
            .map(PrimitiveDateTime::assume_utc)
    })
}

pub fn epoch() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}
