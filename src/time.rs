//! Clock abstraction and lenient timestamp serialization.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// Clock abstracts access to the current timestamp so services remain deterministic in tests.
pub trait Clock: Send + Sync {
    /// Returns the current UTC timestamp.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the current UTC date. Defaults to `now().date_naive()`.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Real-time clock backed by the system UTC time source.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    current: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(at),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        if let Ok(mut guard) = self.current.lock() {
            *guard = at;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.current.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.current.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Parses RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS` timestamps and bare `YYYY-MM-DD`
/// dates. Naive values are wall-clock times in the system local zone.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    parse_timestamp_in(raw, &Local)
}

/// Same as [`parse_timestamp`], reading naive values in `zone`.
pub fn parse_timestamp_in<Tz: TimeZone>(raw: &str, zone: &Tz) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(wall_clock_to_utc(zone, naive));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .map(|date| wall_clock_to_utc(zone, date.and_time(NaiveTime::MIN)))
}

/// Resolves a wall-clock time in `zone`. A time skipped by a DST jump is read as if the zone
/// had UTC offset zero.
pub fn wall_clock_to_utc<Tz: TimeZone>(zone: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match zone.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => naive.and_utc(),
    }
}

/// Serde adapter for required timestamps, see [`parse_timestamp`].
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp `{raw}`")))
    }
}

/// Serde adapter for optional timestamps. Empty strings read as `None`.
pub mod timestamp_option {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => {
                serializer.serialize_some(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => super::parse_timestamp(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp `{raw}`"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn parses_rfc3339_and_bare_dates() {
        let full = parse_timestamp("2025-03-04T10:15:00.000Z").unwrap();
        assert_eq!(full, Utc.with_ymd_and_hms(2025, 3, 4, 10, 15, 0).unwrap());

        let offset = parse_timestamp("2025-03-04T10:15:00+02:00").unwrap();
        assert_eq!(offset, Utc.with_ymd_and_hms(2025, 3, 4, 8, 15, 0).unwrap());

        let bare = parse_timestamp_in("2025-03-04", &Utc).unwrap();
        assert_eq!(bare, Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap());

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn naive_values_are_local_wall_clock() {
        let new_york = FixedOffset::west_opt(4 * 3600).unwrap();
        let bare = parse_timestamp_in("2025-06-01", &new_york).unwrap();
        assert_eq!(bare, Utc.with_ymd_and_hms(2025, 6, 1, 4, 0, 0).unwrap());
        assert_eq!(
            bare.with_timezone(&new_york).date_naive(),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        );

        let naive = parse_timestamp_in("2025-06-01T23:30:00", &new_york).unwrap();
        assert_eq!(naive, Utc.with_ymd_and_hms(2025, 6, 2, 3, 30, 0).unwrap());

        let expected = Local
            .from_local_datetime(&NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_time(NaiveTime::MIN))
            .earliest()
            .map(|local| local.with_timezone(&Utc));
        assert_eq!(parse_timestamp("2025-06-01"), expected);
    }

    #[test]
    fn fixed_clock_advances() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        clock.advance(Duration::days(2));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());
    }
}
