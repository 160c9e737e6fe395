//! Wire date-time normalization.
//!
//! WMS payloads carry instants as ISO-8601 text (with or without an offset) or,
//! for some senders, as epoch milliseconds. Normalization turns either form into
//! a `DateTime<Utc>`. Text without an offset is read as UTC.

use crate::error::ReconcileError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A date-time value exactly as it arrived on the wire.
///
/// Serializes back to its original representation, so payloads forwarded to
/// routing keep the sender's format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireDateTime {
    /// ISO-8601 text, e.g. `2021-10-08T22:00:00Z`
    Text(String),
    /// Milliseconds since the Unix epoch
    EpochMillis(i64),
}

impl WireDateTime {
    /// Whether the wire value carries no information (empty or blank text).
    ///
    /// Blank values are treated like absent ones.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::EpochMillis(_) => false,
        }
    }

    /// Normalize into an instant.
    ///
    /// # Errors
    ///
    /// Returns [`DateTimeError`] if the text is not a recognizable date-time or
    /// the epoch value is out of range.
    pub fn normalize(&self) -> Result<DateTime<Utc>, DateTimeError> {
        match self {
            Self::Text(text) => parse_date_time(text),
            Self::EpochMillis(millis) => Utc
                .timestamp_millis_opt(*millis)
                .single()
                .ok_or_else(|| DateTimeError(millis.to_string())),
        }
    }
}

impl fmt::Display for WireDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::EpochMillis(millis) => write!(f, "{millis}"),
        }
    }
}

/// A wire value that could not be read as a date-time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid date-time value: '{0}'")]
pub struct DateTimeError(String);

/// Parse ISO-8601 text into an instant.
///
/// Accepts RFC 3339 (`2021-10-08T22:00:00Z`, `2021-10-09T00:00:00+02:00`),
/// offset-less date-times (`2021-10-08T22:00:00`, `2021-10-08 22:00:00.123`)
/// and bare dates (`2021-10-08`, midnight UTC).
///
/// # Errors
///
/// Returns [`DateTimeError`] if none of the accepted shapes match.
pub fn parse_date_time(text: &str) -> Result<DateTime<Utc>, DateTimeError> {
    let text = text.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| DateTimeError(text.to_string()))
}

/// Normalize an optional wire value, treating absent and blank values alike.
///
/// # Errors
///
/// Returns [`DateTimeError`] if a non-blank value cannot be parsed.
pub fn normalize_optional(
    value: Option<&WireDateTime>,
) -> Result<Option<DateTime<Utc>>, DateTimeError> {
    value
        .filter(|wire| !wire.is_blank())
        .map(WireDateTime::normalize)
        .transpose()
}

/// Normalize an optional payload field, reporting failures as malformed
/// messages that name the field.
///
/// # Errors
///
/// Returns [`ReconcileError::MalformedMessage`] if a non-blank value cannot be
/// parsed.
pub fn normalize_field(
    field: &str,
    value: Option<&WireDateTime>,
) -> Result<Option<DateTime<Utc>>, ReconcileError> {
    normalize_optional(value).map_err(|e| ReconcileError::malformed(format!("{field}: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn utc(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn parses_rfc3339_with_zulu_and_offsets() {
        assert_eq!(
            parse_date_time("2021-10-08T22:00:00Z").unwrap(),
            utc("2021-10-08T22:00:00Z")
        );
        assert_eq!(
            parse_date_time("2021-10-09T00:00:00+02:00").unwrap(),
            utc("2021-10-08T22:00:00Z")
        );
        assert_eq!(
            parse_date_time("2021-10-08T21:00:00.000Z").unwrap(),
            utc("2021-10-08T21:00:00Z")
        );
    }

    #[test]
    fn offsetless_text_is_utc() {
        assert_eq!(
            parse_date_time("2021-10-08T22:00:00").unwrap(),
            utc("2021-10-08T22:00:00Z")
        );
        assert_eq!(
            parse_date_time("2021-10-08").unwrap(),
            utc("2021-10-08T00:00:00Z")
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_date_time("tomorrow-ish").is_err());
        assert!(parse_date_time("2021-13-45T99:00:00Z").is_err());
    }

    #[test]
    fn epoch_millis_normalize() {
        let wire = WireDateTime::EpochMillis(1_633_730_400_000);
        assert_eq!(wire.normalize().unwrap(), utc("2021-10-08T22:00:00Z"));
    }

    #[test]
    fn blank_and_absent_values_stay_absent() {
        assert_eq!(normalize_optional(None).unwrap(), None);
        let blank = WireDateTime::Text("  ".to_string());
        assert_eq!(normalize_optional(Some(&blank)).unwrap(), None);
    }

    #[test]
    fn wire_value_serializes_in_its_original_shape() {
        let text: WireDateTime = serde_json::from_str("\"2021-10-08T22:00:00Z\"").unwrap();
        assert_eq!(text, WireDateTime::Text("2021-10-08T22:00:00Z".to_string()));
        assert_eq!(serde_json::to_string(&text).unwrap(), "\"2021-10-08T22:00:00Z\"");

        let millis: WireDateTime = serde_json::from_str("1633730400000").unwrap();
        assert_eq!(serde_json::to_string(&millis).unwrap(), "1633730400000");
    }

    proptest! {
        #[test]
        fn rfc3339_output_parses_back_to_the_same_instant(secs in 0i64..4_102_444_800) {
            let instant = Utc.timestamp_opt(secs, 0).single().unwrap();
            let parsed = parse_date_time(&instant.to_rfc3339()).unwrap();
            prop_assert_eq!(parsed, instant);
        }
    }
}
