//! serde helpers for date/time members.
//!
//! SData servers send timestamps with or without an offset. `naive` and
//! `offset` accept either form so `NaiveDateTime` and
//! `DateTime<FixedOffset>` members read the same wire values. `time_span`
//! handles durations in `[-][d.]hh:mm:ss[.fffffff]` form.
//!
//! ```
//! use chrono::NaiveDateTime;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Order {
//!     #[serde(with = "sdata_content::datetime::naive")]
//!     placed: NaiveDateTime,
//! }
//!
//! let order: Order = serde_json::from_str(r#"{"placed": "2024-03-01T10:30:00+02:00"}"#).unwrap();
//! assert_eq!(order.placed.to_string(), "2024-03-01 10:30:00");
//! ```

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse a timestamp that may or may not carry an offset.
///
/// Naive input is taken as UTC.
pub fn parse_offset(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed);
    }
    parse_naive_only(text).map(|naive| naive.and_utc().fixed_offset())
}

/// Parse a timestamp, dropping any offset and keeping the clock time.
pub fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_local());
    }
    parse_naive_only(text)
}

fn parse_naive_only(text: &str) -> Option<NaiveDateTime> {
    let text = text.strip_suffix('Z').unwrap_or(text);
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

pub mod naive {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format("%Y-%m-%dT%H:%M:%S%.f"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_naive(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp {text:?}")))
    }

    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<NaiveDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(text) if text.trim().is_empty() => Ok(None),
                Some(text) => super::super::parse_naive(&text)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid timestamp {text:?}"))),
            }
        }
    }
}

pub mod offset {
    use chrono::{DateTime, FixedOffset, SecondsFormat};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<FixedOffset>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, false))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<FixedOffset>, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_offset(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp {text:?}")))
    }

    pub mod option {
        use chrono::{DateTime, FixedOffset};
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<FixedOffset>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<FixedOffset>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(text) if text.trim().is_empty() => Ok(None),
                Some(text) => super::super::parse_offset(&text)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid timestamp {text:?}"))),
            }
        }
    }
}

pub mod time_span {
    //! `std::time::Duration` as `[-][d.]hh:mm:ss[.fffffff]`.
    //!
    //! Durations are unsigned, so a leading `-` is rejected on read.

    use std::time::Duration;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn format(value: &Duration) -> String {
        let total = value.as_secs();
        let (days, rest) = (total / 86_400, total % 86_400);
        let (hours, minutes, seconds) = (rest / 3600, rest % 3600 / 60, rest % 60);
        let ticks = value.subsec_nanos() / 100;

        let mut out = String::new();
        if days > 0 {
            out.push_str(&format!("{days}."));
        }
        out.push_str(&format!("{hours:02}:{minutes:02}:{seconds:02}"));
        if ticks > 0 {
            out.push_str(&format!(".{ticks:07}"));
        }
        out
    }

    pub fn parse(text: &str) -> Option<Duration> {
        let text = text.trim();
        if text.starts_with('-') {
            return None;
        }

        let (days, clock) = match text.split_once(':') {
            Some((head, _)) => match head.split_once('.') {
                Some((days, _)) => {
                    let days: u64 = days.parse().ok()?;
                    (days, &text[text.find('.')? + 1..])
                }
                None => (0, text),
            },
            // A bare integer is a number of days.
            None => {
                let days = text.parse::<u64>().ok()?;
                return days.checked_mul(86_400).map(Duration::from_secs);
            }
        };

        let mut parts = clock.splitn(3, ':');
        let hours: u64 = parts.next()?.parse().ok()?;
        let minutes: u64 = parts.next()?.parse().ok()?;
        let (seconds, fraction) = match parts.next() {
            Some(rest) => match rest.split_once('.') {
                Some((s, f)) => (s.parse::<u64>().ok()?, Some(f)),
                None => (rest.parse::<u64>().ok()?, None),
            },
            None => (0, None),
        };
        if hours > 23 || minutes > 59 || seconds > 59 {
            return None;
        }

        let nanos = match fraction {
            Some(f) if f.is_empty() || f.len() > 7 || !f.bytes().all(|b| b.is_ascii_digit()) => {
                return None
            }
            Some(f) => {
                let ticks: u32 = format!("{f:0<7}").parse().ok()?;
                ticks * 100
            }
            None => 0,
        };

        let secs = days * 86_400 + hours * 3600 + minutes * 60 + seconds;
        Some(Duration::new(secs, nanos))
    }

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).ok_or_else(|| de::Error::custom(format!("invalid time span {text:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::ContentMapper;
    use crate::value::{Resource, Value};
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Stamped {
        #[serde(with = "naive")]
        local: NaiveDateTime,
        #[serde(with = "offset")]
        zoned: DateTime<FixedOffset>,
        #[serde(with = "time_span")]
        took: Duration,
    }

    #[test]
    fn test_offset_and_naive_interconvert() {
        let naive = parse_naive("2024-03-01T10:30:00+02:00").unwrap();
        assert_eq!(naive.to_string(), "2024-03-01 10:30:00");

        let zoned = parse_offset("2024-03-01T10:30:00").unwrap();
        assert_eq!(zoned.offset().local_minus_utc(), 0);
        assert_eq!(zoned.naive_local(), naive);

        assert!(parse_naive("2024-03-01").is_some());
        assert!(parse_offset("yesterday").is_none());
    }

    #[test]
    fn test_members_map_through_values() {
        let mapper = ContentMapper::default();
        let value = Value::from(
            Resource::new()
                .field("local", "2024-03-01T10:30:00Z")
                .field("zoned", "2024-03-01T10:30:00")
                .field("took", "1.02:03:04.5"),
        );

        let stamped: Stamped = mapper.deserialize(value).unwrap();
        assert_eq!(stamped.took, Duration::new(93_784, 500_000_000));
        assert_eq!(stamped.local.to_string(), "2024-03-01 10:30:00");

        let again = mapper.serialize(&stamped).unwrap();
        let back: Stamped = mapper.deserialize(again).unwrap();
        assert_eq!(back, stamped);
    }

    #[test]
    fn test_time_span_forms() {
        assert_eq!(time_span::parse("00:00:30"), Some(Duration::from_secs(30)));
        assert_eq!(time_span::parse("2"), Some(Duration::from_secs(172_800)));
        assert_eq!(time_span::parse("01:30"), Some(Duration::from_secs(5400)));
        assert_eq!(time_span::parse("00:00:00.0000001"), Some(Duration::from_nanos(100)));
        assert_eq!(time_span::parse("-00:00:01"), None);
        assert_eq!(time_span::parse("25:00:00"), None);
        assert_eq!(time_span::format(&Duration::new(93_784, 500_000_000)), "1.02:03:04.5000000");
        assert_eq!(time_span::format(&Duration::from_secs(59)), "00:00:59");
    }
}
