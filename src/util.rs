use serde::Serializer;
use sqlx::types::time;

/// Serializes a timestamp as milliseconds since the unix epoch.
pub fn serialize_datetime<S>(x: &time::OffsetDateTime, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_i64((x.unix_timestamp_nanos() / 1_000_000) as i64)
}

/// Trims a form value, mapping blank input to `None`.
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  Acme ")), Some("Acme".to_owned()));
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn test_datetime_millis() {
        #[derive(serde::Serialize)]
        struct Stamp {
            #[serde(serialize_with = "serialize_datetime")]
            at: time::OffsetDateTime,
        }

        let at = time::OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let json = serde_json::to_string(&Stamp { at }).unwrap();
        assert_eq!(json, r#"{"at":1700000000000}"#);
    }
}
