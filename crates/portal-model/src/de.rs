//! Lenient decoders for inconsistently shaped backend fields

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serializer};

/// Accepts `null`, `""`, `"YYYY-MM-DD"` and datetime strings (date part kept)
pub mod lenient_date {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse_date(value)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid date: {value}"))),
        }
    }

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_none(),
        }
    }
}

/// Treats an explicit `null` like a missing field
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let date_part = value.get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Dated {
        #[serde(default, with = "lenient_date")]
        when: Option<NaiveDate>,
        #[serde(default, deserialize_with = "null_as_default")]
        items: Vec<u32>,
    }

    #[test]
    fn accepts_date_and_datetime_shapes() {
        let expected = NaiveDate::from_ymd_opt(2026, 6, 14);
        let plain: Dated = serde_json::from_str(r#"{"when":"2026-06-14"}"#).unwrap();
        let stamped: Dated = serde_json::from_str(r#"{"when":"2026-06-14T16:00:00Z"}"#).unwrap();
        assert_eq!(plain.when, expected);
        assert_eq!(stamped.when, expected);
    }

    #[test]
    fn blank_and_null_decode_to_none() {
        let blank: Dated = serde_json::from_str(r#"{"when":"","items":null}"#).unwrap();
        assert_eq!(blank.when, None);
        assert!(blank.items.is_empty());

        let missing: Dated = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.when, None);
    }

    #[test]
    fn garbage_date_is_rejected() {
        assert!(serde_json::from_str::<Dated>(r#"{"when":"next tuesday"}"#).is_err());
    }
}
