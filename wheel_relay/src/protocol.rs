//! Relay wire messages. Every message is one JSON document per line.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::value::RawValue;

pub const ACK_TEXT: &str = "Data received";

/// ISO-8601 UTC with millisecond precision, e.g. `2024-05-01T12:00:00.123Z`.
pub fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Sent back to the publisher of a message.
#[derive(Debug, Serialize)]
pub struct Ack<'a> {
    pub response: &'static str,
    pub timestamp: String,
    #[serde(rename = "originalData", skip_serializing_if = "Option::is_none")]
    pub original_data: Option<&'a RawValue>,
}

/// What every other client receives. `data` is the publisher's payload,
/// embedded verbatim.
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    pub timestamp: String,
    pub data: &'a RawValue,
}

pub fn encode_ack(
    now: DateTime<Utc>,
    original: Option<&RawValue>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Ack {
        response: ACK_TEXT,
        timestamp: iso_timestamp(now),
        original_data: original,
    })
}

pub fn encode_envelope(now: DateTime<Utc>, data: &RawValue) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Envelope {
        timestamp: iso_timestamp(now),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap()
    }

    #[test]
    fn timestamp_is_iso_with_millis() {
        assert_eq!(iso_timestamp(fixed()), "2024-05-01T12:30:05.000Z");
    }

    #[test]
    fn ack_omits_original_unless_given() {
        let ack = encode_ack(fixed(), None).unwrap();
        assert_eq!(
            ack,
            r#"{"response":"Data received","timestamp":"2024-05-01T12:30:05.000Z"}"#
        );

        let raw: Box<RawValue> = serde_json::from_str(r#"{"a":1}"#).unwrap();
        let echo = encode_ack(fixed(), Some(&raw)).unwrap();
        assert!(echo.ends_with(r#""originalData":{"a":1}}"#), "{echo}");
    }

    #[test]
    fn envelope_embeds_payload_verbatim() {
        let raw: Box<RawValue> = serde_json::from_str(r#"{"z":1,"a":[true,null]}"#).unwrap();
        let line = encode_envelope(fixed(), &raw).unwrap();
        assert_eq!(
            line,
            r#"{"timestamp":"2024-05-01T12:30:05.000Z","data":{"z":1,"a":[true,null]}}"#
        );
    }
}
