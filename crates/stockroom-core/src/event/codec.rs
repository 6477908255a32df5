//! Envelope codec for history payloads.
//!
//! Heterogeneous payloads share one storage column by wrapping each in a
//! self-describing envelope:
//!
//! ```text
//! {"type": "<kind tag>", "data": <payload | null>}
//! ```
//!
//! Decoding reads the tag first and dispatches on [`EventKind`] to the
//! payload struct for that kind. An unrecognized tag is a data error, not a
//! panic: callers that list history log it and skip the row.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::data::{CreatedData, EventData, TrackedData, TrackedToUserData, UpdatedData};
use super::types::EventKind;

/// Errors from encoding or decoding a payload envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The envelope's `type` tag is not one of the known kinds.
    #[error("unknown history event kind '{raw}'")]
    UnknownEventKind { raw: String },

    /// The bytes are not an envelope, or the payload does not fit its kind.
    #[error("malformed {} payload: {reason}", .kind.map_or("history", EventKind::as_str))]
    MalformedPayload {
        kind: Option<EventKind>,
        reason: String,
    },
}

impl CodecError {
    fn malformed(kind: Option<EventKind>, error: &serde_json::Error) -> Self {
        Self::MalformedPayload {
            kind,
            reason: error.to_string(),
        }
    }
}

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    data: Value,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Encode a payload into envelope bytes.
///
/// # Errors
///
/// Returns [`CodecError::MalformedPayload`] if the payload cannot be
/// serialized (not expected for well-formed data).
pub fn encode(data: &EventData) -> Result<Vec<u8>, CodecError> {
    let kind = data.kind();
    let payload = match data {
        EventData::Created(d) => serde_json::to_value(d),
        EventData::Updated(d) => serde_json::to_value(d),
        EventData::Tracked(d) => serde_json::to_value(d),
        EventData::TrackedToUser(d) => serde_json::to_value(d),
        EventData::Deleted | EventData::Restored => Ok(Value::Null),
    }
    .map_err(|e| CodecError::malformed(Some(kind), &e))?;

    serde_json::to_vec(&EnvelopeOut {
        kind: kind.as_str(),
        data: payload,
    })
    .map_err(|e| CodecError::malformed(Some(kind), &e))
}

/// Decode envelope bytes into a typed payload.
///
/// # Errors
///
/// - [`CodecError::MalformedPayload`] when the bytes are not an envelope or
///   the payload does not match its declared kind.
/// - [`CodecError::UnknownEventKind`] when the tag is unrecognized.
pub fn decode(bytes: &[u8]) -> Result<EventData, CodecError> {
    let envelope: EnvelopeIn =
        serde_json::from_slice(bytes).map_err(|e| CodecError::malformed(None, &e))?;

    let kind: EventKind = envelope
        .kind
        .parse()
        .map_err(|_| CodecError::UnknownEventKind { raw: envelope.kind })?;

    decode_payload(kind, envelope.data)
}

/// Decode a payload whose kind is already known.
fn decode_payload(kind: EventKind, payload: Value) -> Result<EventData, CodecError> {
    let result = match kind {
        EventKind::Created => serde_json::from_value::<CreatedData>(payload).map(EventData::Created),
        EventKind::Updated => serde_json::from_value::<UpdatedData>(payload).map(EventData::Updated),
        EventKind::Tracked => serde_json::from_value::<TrackedData>(payload).map(EventData::Tracked),
        EventKind::TrackedToUser => {
            serde_json::from_value::<TrackedToUserData>(payload).map(EventData::TrackedToUser)
        }
        EventKind::Deleted | EventKind::Restored => {
            return match payload {
                Value::Null | Value::Object(_) if kind == EventKind::Deleted => Ok(EventData::Deleted),
                Value::Null | Value::Object(_) => Ok(EventData::Restored),
                other => Err(CodecError::MalformedPayload {
                    kind: Some(kind),
                    reason: format!("expected null or an object, found {other}"),
                }),
            };
        }
    };

    result.map_err(|e| CodecError::malformed(Some(kind), &e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::{LocationId, UserId};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn encode_wraps_payload_in_envelope() {
        let location_id = LocationId::new();
        let bytes = encode(&EventData::Tracked(TrackedData { location_id })).expect("encode");
        let value: Value = serde_json::from_slice(&bytes).expect("valid json");
        assert_eq!(
            value,
            json!({"type": "tracked", "data": {"locationId": location_id.to_string()}})
        );
    }

    #[test]
    fn encode_deleted_has_null_data() {
        let bytes = encode(&EventData::Deleted).expect("encode");
        let value: Value = serde_json::from_slice(&bytes).expect("valid json");
        assert_eq!(value, json!({"type": "deleted", "data": null}));
    }

    #[test]
    fn decode_reads_every_kind() {
        let location_id = LocationId::new();
        let user_id = UserId::new();
        let mut fields = BTreeMap::new();
        fields.insert("reference".to_string(), "REF-2".to_string());

        let all = [
            EventData::Created(CreatedData {
                reference: "REF-1".into(),
                group_key: "XYZ".into(),
                description: Some("blue crate".into()),
                location_id,
            }),
            EventData::Updated(UpdatedData {
                updated_fields: fields,
            }),
            EventData::Tracked(TrackedData { location_id }),
            EventData::TrackedToUser(TrackedToUserData { user_id }),
            EventData::Deleted,
            EventData::Restored,
        ];
        assert_eq!(all.len(), EventKind::ALL.len());

        for data in all {
            let bytes = encode(&data).expect("encode");
            assert_eq!(decode(&bytes).expect("decode"), data);
        }
    }

    #[test]
    fn decode_accepts_historical_row() {
        // Rows from earlier deployments: description present, extra keys ignored.
        let location_id = LocationId::new();
        let raw = format!(
            r#"{{"type":"created","data":{{"reference":"R","group":"G","description":"d","locationId":"{location_id}","legacy":1}}}}"#
        );
        let data = decode(raw.as_bytes()).expect("decode");
        match data {
            EventData::Created(created) => {
                assert_eq!(created.location_id, location_id);
                assert_eq!(created.description.as_deref(), Some("d"));
            }
            other => panic!("expected created, got {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_unknown_kind() {
        let err = decode(br#"{"type":"bogus","data":{}}"#).unwrap_err();
        assert_eq!(
            err,
            CodecError::UnknownEventKind {
                raw: "bogus".into()
            }
        );
    }

    #[test]
    fn decode_rejects_payload_that_does_not_fit_kind() {
        let err = decode(br#"{"type":"tracked","data":{"userId":"x"}}"#).unwrap_err();
        assert!(matches!(
            err,
            CodecError::MalformedPayload {
                kind: Some(EventKind::Tracked),
                ..
            }
        ));
        assert!(err.to_string().starts_with("malformed tracked payload"));
    }

    #[test]
    fn decode_rejects_bad_uuid() {
        let err = decode(br#"{"type":"tracked","data":{"locationId":"nope"}}"#).unwrap_err();
        assert!(matches!(err, CodecError::MalformedPayload { .. }));
    }

    #[test]
    fn decode_rejects_non_envelope() {
        for raw in [&b"not json"[..], b"[]", br#"{"data":{}}"#, b""] {
            let err = decode(raw).unwrap_err();
            assert!(
                matches!(err, CodecError::MalformedPayload { kind: None, .. }),
                "{raw:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn decode_deleted_tolerates_empty_object_but_not_scalars() {
        assert_eq!(
            decode(br#"{"type":"deleted","data":{}}"#).expect("decode"),
            EventData::Deleted
        );
        assert_eq!(
            decode(br#"{"type":"restored"}"#).expect("decode"),
            EventData::Restored
        );
        assert!(decode(br#"{"type":"deleted","data":7}"#).is_err());
    }
}
