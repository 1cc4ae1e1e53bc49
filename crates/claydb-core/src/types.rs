use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

///
/// Timestamp
/// (in microseconds since the Unix epoch)
///
/// Microsecond granularity because `updatedAt` doubles as the optimistic
/// concurrency token; see `clock::Clock` for the strict-increase guarantee.
///

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    PartialEq,
    Hash,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const EPOCH: Self = Self(u64::MIN);
    pub const MAX: Self = Self(u64::MAX);

    #[must_use]
    pub const fn from_micros(us: u64) -> Self {
        Self(us)
    }

    #[must_use]
    pub const fn from_seconds(secs: u64) -> Self {
        Self(secs * 1_000_000)
    }

    #[must_use]
    pub const fn as_micros(self) -> u64 {
        self.0
    }

    /// Parse the accepted timestamp spellings: RFC-3339, a naive
    /// `YYYY-MM-DDTHH:MM:SS` datetime, or a date-only `YYYY-MM-DD`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Self::from_datetime(dt.with_timezone(&Utc));
        }

        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
            return Self::from_datetime(Utc.from_utc_datetime(&naive));
        }

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            let naive = date
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| format!("invalid date: {s}"))?;
            return Self::from_datetime(Utc.from_utc_datetime(&naive));
        }

        Err(format!("unrecognized timestamp: {s}"))
    }

    fn from_datetime(dt: DateTime<Utc>) -> Result<Self, String> {
        let us = dt.timestamp_micros();
        if us < 0 {
            return Err(format!("timestamp before epoch: {dt}"));
        }

        #[allow(clippy::cast_sign_loss)]
        Ok(Self(us as u64))
    }

    /// RFC-3339 rendering with full microseconds, the wire spelling of the
    /// concurrency token.
    #[must_use]
    pub fn to_rfc3339(self) -> String {
        #[allow(clippy::cast_possible_wrap)]
        let us = self.0 as i64;
        Utc.timestamp_micros(us)
            .single()
            .map_or_else(String::new, |dt| {
                dt.to_rfc3339_opts(SecondsFormat::Micros, true)
            })
    }

    /// Current wall-clock time. Token issuance goes through
    /// `clock::Clock`, which layers the strict-increase guarantee on top.
    #[must_use]
    pub fn wall_now() -> Self {
        #[allow(clippy::cast_sign_loss)]
        Self(Utc::now().timestamp_micros().max(0) as u64)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_date_only() {
        let ts = Timestamp::parse("2025-01-01").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-01-01T00:00:00.000000Z");
    }

    #[test]
    fn parses_rfc3339() {
        let ts = Timestamp::parse("2024-03-09T19:45:30Z").unwrap();
        assert_eq!(ts.as_micros(), 1_710_013_530_000_000);
    }

    #[test]
    fn parses_naive_datetime() {
        let ts = Timestamp::parse("2025-01-02T03:04:05").unwrap();
        assert!(ts > Timestamp::parse("2025-01-02").unwrap());
    }

    #[test]
    fn rejects_pre_epoch_and_garbage() {
        assert!(Timestamp::parse("1969-12-31T23:59:59Z").is_err());
        assert!(Timestamp::parse("not-a-timestamp").is_err());
    }

    #[test]
    fn rfc3339_round_trip_is_exact() {
        let ts = Timestamp::from_micros(1_735_689_600_123_456);
        let back = Timestamp::parse(&ts.to_rfc3339()).unwrap();
        assert_eq!(ts, back);
    }

    #[test]
    fn date_boundary_is_strict_midnight() {
        let midnight = Timestamp::parse("2025-01-01").unwrap();
        let later = Timestamp::parse("2025-01-01T00:00:01Z").unwrap();
        assert!(later > midnight);
    }
}
