//! Time-of-day handling for session slots.
//!
//! Callers hand us times either as typed values or as `HH:MM` / `HH:MM:SS`
//! strings (query parameters, JSON bodies, database rows). Everything is
//! normalized to [`NaiveTime`] before any comparison happens, so the overlap
//! test never sees a string.

use chrono::NaiveTime;

use crate::error::{Result, ScheduleError};

const WIRE_FORMAT: &str = "%H:%M:%S";
const ACCEPTED_FORMATS: [&str; 3] = ["%H:%M:%S", "%H:%M", "%H:%M:%S%.f"];

/// Parse a time of day written as `HH:MM` or `HH:MM:SS`.
pub fn parse_time(raw: &str) -> Result<NaiveTime> {
    let raw = raw.trim();
    ACCEPTED_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| ScheduleError::validation(format!("invalid time of day: {raw:?}")))
}

/// Half-open `[start, end)` range within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if end <= start {
            return Err(ScheduleError::validation(format!(
                "end time {} must be after start time {}",
                end.format(WIRE_FORMAT),
                start.format(WIRE_FORMAT)
            )));
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_time(start)?, parse_time(end)?)
    }

    /// Adjacent ranges (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Serde adapter for `NaiveTime` fields on the wire.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&t.format(super::WIRE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_time(&raw).map_err(de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(t: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
            match t {
                Some(t) => super::serialize(t, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
            Option::<String>::deserialize(d)?
                .map(|raw| crate::clock::parse_time(&raw).map_err(de::Error::custom))
                .transpose()
        }
    }
}
