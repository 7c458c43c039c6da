//! Run identity derived from the wall clock.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Format of a run identifier, e.g. `20240501T103000`.
pub const RUN_TS_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Format of the gold partition date key, e.g. `2024-05-01`.
pub const DS_FORMAT: &str = "%Y-%m-%d";

/// Identity of one pipeline run (second granularity, UTC).
///
/// Every partition a run writes is keyed by this value, except gold,
/// which is keyed by [`RunId::ds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId {
    started: NaiveDateTime,
}

impl RunId {
    /// Identifier for a run starting at `instant` (sub-second part dropped).
    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        let naive = instant.naive_utc();
        let started = naive.with_nanosecond(0).unwrap_or(naive);
        Self { started }
    }

    /// Identifier for a run starting now.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Run start time.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started.and_utc()
    }

    /// UTC date of the run start.
    pub fn date(&self) -> NaiveDate {
        self.started.date()
    }

    /// Gold partition key for this run.
    pub fn ds(&self) -> String {
        self.date().format(DS_FORMAT).to_string()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.started.format(RUN_TS_FORMAT))
    }
}

impl FromStr for RunId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDateTime::parse_from_str(s.trim(), RUN_TS_FORMAT)
            .map(|started| Self { started })
            .map_err(|e| format!("Invalid run_ts '{}': {}", s, e))
    }
}

impl Serialize for RunId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RunId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_and_date() {
        let instant = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 5).unwrap();
        let run = RunId::from_datetime(instant + chrono::Duration::milliseconds(750));

        assert_eq!(run.to_string(), "20240501T103005");
        assert_eq!(run.ds(), "2024-05-01");
        assert_eq!(run.started_at(), instant);
    }

    #[test]
    fn test_parse_round_trip() {
        let run: RunId = "20241231T235959".parse().unwrap();
        assert_eq!(run.to_string(), "20241231T235959");
        assert!("2024-12-31".parse::<RunId>().is_err());
    }

    #[test]
    fn test_same_second_collides() {
        let a = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 5).unwrap();
        let b = a + chrono::Duration::milliseconds(400);
        assert_eq!(RunId::from_datetime(a), RunId::from_datetime(b));
    }
}
