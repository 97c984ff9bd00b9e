use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};

/// Timestamps are local wall-clock times, stored as `DD/MM/YYYY HH:MM:SS`.
pub type Timestamp = NaiveDateTime;

pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Current local time, truncated to whole seconds so it survives a
/// format/parse round trip unchanged.
pub fn now() -> Timestamp {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Today's local date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> chrono::ParseResult<Timestamp> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a `DD/MM/YYYY` due date.
pub fn parse_date(s: &str) -> chrono::ParseResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
}

/// Serde adapter for `DD/MM/YYYY HH:MM:SS` timestamps.
pub mod serde_timestamp {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Timestamp, format_timestamp, parse_timestamp};

    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_timestamp(&s).map_err(serde::de::Error::custom)
    }

    /// Same format, for optional fields.
    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        use super::super::{Timestamp, format_timestamp, parse_timestamp};

        pub fn serialize<S: Serializer>(
            ts: &Option<Timestamp>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => serializer.serialize_some(&format_timestamp(ts)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Timestamp>, D::Error> {
            let s = Option::<String>::deserialize(deserializer)?;
            s.map(|s| parse_timestamp(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_roundtrip() {
        let ts = parse_timestamp("05/03/2024 14:07:09").unwrap();
        assert_eq!(format_timestamp(&ts), "05/03/2024 14:07:09");
    }

    #[test]
    fn test_now_has_no_subsecond_part() {
        let ts = now();
        assert_eq!(parse_timestamp(&format_timestamp(&ts)).unwrap(), ts);
    }

    #[test]
    fn test_parse_date() {
        let date = parse_date("31/12/2024").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(format_date(&date), "31/12/2024");
        assert!(parse_date("2024-12-31").is_err());
        assert!(parse_date("31/13/2024").is_err());
    }
}
