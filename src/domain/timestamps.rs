//! Timestamp parsing for CMS date fields.
//!
//! The CMS emits full RFC 3339 values for system fields but editors can save
//! date fields without seconds (`2024-03-01T09:00+09:00`) or as a bare date.
//! Everything is accepted here and normalised to `OffsetDateTime`.

use serde::{Deserialize, Deserializer, Serializer};
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, UtcOffset,
    format_description::well_known::Rfc3339,
    macros::format_description,
};

/// Parse a CMS timestamp, returning `None` for values no known layout matches.
pub fn parse_cms_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    let minutes_with_offset = format_description!(
        "[year]-[month]-[day]T[hour]:[minute][offset_hour sign:mandatory]:[offset_minute]"
    );
    if let Ok(value) = OffsetDateTime::parse(raw, minutes_with_offset) {
        return Some(value);
    }

    let minutes_utc = format_description!("[year]-[month]-[day]T[hour]:[minute]Z");
    if let Ok(value) = PrimitiveDateTime::parse(raw, minutes_utc) {
        return Some(value.assume_utc());
    }

    let minutes_naive = format_description!("[year]-[month]-[day]T[hour]:[minute]");
    if let Ok(value) = PrimitiveDateTime::parse(raw, minutes_naive) {
        return Some(value.assume_utc());
    }

    let date_only = format_description!("[year]-[month]-[day]");
    Date::parse(raw, date_only)
        .ok()
        .map(|date| date.midnight().assume_utc())
}

/// Render a timestamp in the UTC millisecond form used inside range filters,
/// e.g. `2024-03-01T00:00:00.000Z`.
pub fn to_filter_literal(value: OffsetDateTime) -> String {
    let layout =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");
    value
        .to_offset(UtcOffset::UTC)
        .format(layout)
        .unwrap_or_else(|_| value.unix_timestamp().to_string())
}

/// Serde adapter for optional, leniently parsed CMS timestamps.
pub mod lenient {
    use super::*;

    pub fn serialize<S>(value: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value.and_then(|value| value.format(&Rfc3339).ok()) {
            Some(formatted) => serializer.serialize_some(&formatted),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_cms_timestamp))
    }
}
