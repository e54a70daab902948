use jiff::{SignedDuration, civil::DateTime};

#[macro_export]
macro_rules! timer_debug {
    ($msg:literal, $block:expr) => {{
        let now = jiff::Timestamp::now();
        let result = $block;
        let elapsed = jiff::Timestamp::now().duration_since(now);

        tracing::debug!("{}: Took {:?}", $msg, elapsed);

        result
    }};
}

/// Layout used by persisted instances.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Seconds from `from` to `to`, negative when `to` is earlier.
#[inline]
pub fn seconds_between(from: DateTime, to: DateTime) -> f64 {
    to.duration_since(from).as_secs_f64()
}

/// Converts seconds into a duration rounded to the millisecond.
pub fn duration_from_seconds(seconds: f64) -> SignedDuration {
    SignedDuration::from_millis((seconds * 1000.0).round() as i64)
}

pub fn format_datetime(datetime: DateTime) -> String {
    datetime.strftime(DATETIME_FORMAT).to_string()
}

pub fn parse_datetime(input: &str) -> Result<DateTime, jiff::Error> {
    DateTime::strptime(DATETIME_FORMAT, input)
}

/// Serde adapter for `DATETIME_FORMAT`.
pub mod datetime_format {
    use jiff::civil::DateTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S>(datetime: &DateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_datetime(*datetime))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        super::parse_datetime(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_format() {
        let datetime = parse_datetime("2015-10-01 19:05:00").unwrap();

        assert_eq!(datetime, "2015-10-01T19:05:00".parse::<DateTime>().unwrap());
        assert_eq!(format_datetime(datetime), "2015-10-01 19:05:00");
    }

    #[test]
    fn test_seconds_between() {
        let a = parse_datetime("2015-10-01 08:00:00").unwrap();
        let b = parse_datetime("2015-10-01 08:10:00").unwrap();

        assert_eq!(seconds_between(a, b), 600.0);
        assert_eq!(seconds_between(b, a), -600.0);
        assert_eq!(duration_from_seconds(90.5), SignedDuration::from_millis(90_500));
    }
}
