use chrono::{DateTime, Datelike, FixedOffset, Utc};
use once_cell::sync::Lazy;
use serde::Serializer;

/// All displayed/recorded timestamps use the fixed UTC+7 civil zone (WIB).
pub static WIB: Lazy<FixedOffset> =
    Lazy::new(|| FixedOffset::east_opt(7 * 3600).expect("valid UTC+7 offset"));

/// Weekday names indexed by `day_of_week` (Monday = 0, matching the roster).
pub const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub fn now_wib() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&*WIB)
}

/// Current weekday in WIB, 0–6 with Monday = 0.
pub fn today_weekday() -> i64 {
    now_wib().weekday().num_days_from_monday() as i64
}

pub fn to_wib(ts: DateTime<Utc>) -> DateTime<FixedOffset> {
    ts.with_timezone(&*WIB)
}

/// Serde helper: render a stored UTC instant as RFC 3339 in WIB.
pub fn serialize_wib<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&to_wib(*ts).to_rfc3339())
}

pub fn serialize_wib_opt<S>(ts: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match ts {
        Some(ts) => serialize_wib(ts, serializer),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn wib_is_seven_hours_ahead_of_utc() {
        let utc = Utc.with_ymd_and_hms(2026, 2, 5, 17, 30, 0).unwrap();
        let wib = to_wib(utc);
        assert_eq!(wib.to_rfc3339(), "2026-02-06T00:30:00+07:00");
    }

    #[test]
    fn day_names_start_on_monday() {
        assert_eq!(DAY_NAMES[0], "Monday");
        assert_eq!(DAY_NAMES[6], "Sunday");
    }
}
