//! Timestamps as they appear in history entries.
//!
//! New entries are written as RFC 3339. Older `history.json` files carry naive
//! ISO 8601 local times (`2024-03-01T14:05:09.123456`) without an offset; those are
//! read as UTC rather than rejected, which shifts them by the writer's offset at most.

use serde::{Deserialize, Deserializer, Serializer};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

pub fn parse(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
    let naive_iso =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]");
    OffsetDateTime::parse(raw, &Rfc3339).or_else(|error| {
        PrimitiveDateTime::parse(raw, naive_iso)
            .map(PrimitiveDateTime::assume_utc)
            .map_err(|_| error)
    })
}

pub fn format(value: OffsetDateTime) -> Result<String, time::error::Format> {
    value.format(&Rfc3339)
}

/// `#[serde(with = ...)]` adapter for optional history timestamps.
pub(crate) mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<OffsetDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => {
                let rendered = super::format(*value).map_err(serde::ser::Error::custom)?;
                serializer.serialize_some(&rendered)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| {
                parse(&raw).map_err(|error| {
                    serde::de::Error::custom(format!("invalid timestamp '{raw}': {error}"))
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::parse;

    #[test]
    fn rfc3339_keeps_its_offset() {
        assert_eq!(
            parse("2024-03-01T14:05:09+02:00").unwrap(),
            datetime!(2024-03-01 14:05:09 +02:00)
        );
    }

    #[test]
    fn naive_iso_is_read_as_utc() {
        assert_eq!(
            parse("2024-03-01T14:05:09.123456").unwrap(),
            datetime!(2024-03-01 14:05:09.123456 UTC)
        );
        assert_eq!(
            parse("2024-03-01T14:05:09").unwrap(),
            datetime!(2024-03-01 14:05:09 UTC)
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse("yesterday").is_err());
        assert!(parse("2024-03-01").is_err());
    }
}
