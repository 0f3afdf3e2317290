//! Assistant WebSocket wire protocol.
//!
//! Inbound frames are JSON objects tagged by `type`; only `user` frames are
//! acted on and are read field by field into a [`UserMessage`]. Every
//! outbound frame is one [`OutboundMessage`], and for a single query they are
//! always emitted in the order `retrieval → chunk* → done` (or a lone `error`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::ProjectId;

/// Message sent back when a `user` frame lacks a project or text.
pub const MISSING_FIELDS_MESSAGE: &str = "project_id and text required";

/// A `user` frame as received. Fields of the wrong JSON type are treated as absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserMessage {
    pub project_id: Option<String>,
    pub text: Option<String>,
}

/// A validated query, ready for retrieval.
#[derive(Clone, Debug, PartialEq)]
pub struct UserQuery {
    pub project_id: ProjectId,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("{}", MISSING_FIELDS_MESSAGE)]
    MissingFields,
}

impl UserMessage {
    pub fn validate(self) -> Result<UserQuery, ProtocolError> {
        let project_id = self
            .project_id
            .filter(|p| !p.is_empty())
            .ok_or(ProtocolError::MissingFields)?;
        let text = self
            .text
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .ok_or(ProtocolError::MissingFields)?;
        Ok(UserQuery {
            project_id: ProjectId::from_raw(project_id),
            text,
        })
    }
}

impl UserMessage {
    /// Read the fields of a `user` object. `project_id` wins over the
    /// camel-case `projectId` when both carry a string.
    fn from_object(obj: &Map<String, Value>) -> Self {
        let string_field = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_owned);
        Self {
            project_id: string_field("project_id").or_else(|| string_field("projectId")),
            text: string_field("text"),
        }
    }
}

/// Decode a text frame. Returns `None` for anything that should be dropped
/// silently: invalid JSON, non-objects, and non-`user` types. A `user` object
/// always decodes, so a malformed one still earns an `error` reply.
pub fn decode_frame(raw: &str) -> Option<UserMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let obj = value.as_object()?;
    match obj.get("type").and_then(Value::as_str) {
        Some("user") => Some(UserMessage::from_object(obj)),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Retrieval { hits: Vec<String> },
    Chunk { text: String },
    Done { cost: f64 },
    Error { message: String },
}

impl OutboundMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_user_message() {
        let msg = decode_frame(r#"{"type":"user","project_id":"p1","text":"hello"}"#).unwrap();
        assert_eq!(msg.project_id.as_deref(), Some("p1"));
        assert_eq!(msg.text.as_deref(), Some("hello"));
    }

    #[test]
    fn accepts_camel_case_project_id() {
        let msg = decode_frame(r#"{"type":"user","projectId":"p1","text":"hi"}"#).unwrap();
        assert_eq!(msg.project_id.as_deref(), Some("p1"));
    }

    #[test]
    fn both_project_keys_prefer_snake_case() {
        let msg = decode_frame(
            r#"{"type":"user","project_id":"p1","projectId":"p2","text":"hello"}"#,
        )
        .unwrap();
        assert_eq!(msg.project_id.as_deref(), Some("p1"));
        assert_eq!(msg.validate().unwrap().project_id.as_str(), "p1");

        let fallback = decode_frame(
            r#"{"type":"user","project_id":null,"projectId":"p2","text":"hello"}"#,
        )
        .unwrap();
        assert_eq!(fallback.project_id.as_deref(), Some("p2"));
    }

    #[test]
    fn malformed_user_frame_still_decodes() {
        let msg = decode_frame(r#"{"type":"user","text":["not","a","string"]}"#).unwrap();
        assert_eq!(msg.validate(), Err(ProtocolError::MissingFields));
    }

    #[test]
    fn ignores_other_types_and_garbage() {
        assert!(decode_frame(r#"{"type":"assistant","text":"x"}"#).is_none());
        assert!(decode_frame(r#"{"text":"no type"}"#).is_none());
        assert!(decode_frame(r#"["type","user"]"#).is_none());
        assert!(decode_frame("\"user\"").is_none());
        assert!(decode_frame("not json").is_none());
        assert!(decode_frame(r#"{"type":7,"text":"x"}"#).is_none());
    }

    #[test]
    fn wrong_field_types_count_as_missing() {
        let msg = decode_frame(r#"{"type":"user","project_id":7,"text":"x"}"#).unwrap();
        assert_eq!(msg.project_id, None);
        assert_eq!(msg.validate(), Err(ProtocolError::MissingFields));
    }

    #[test]
    fn validate_trims_text() {
        let query = UserMessage {
            project_id: Some("p1".into()),
            text: Some("  alpha  ".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(query.text, "alpha");
        assert_eq!(query.project_id.as_str(), "p1");
    }

    #[test]
    fn validate_rejects_blank_fields() {
        let blank_text = UserMessage {
            project_id: Some("p1".into()),
            text: Some("   ".into()),
        };
        assert!(blank_text.validate().is_err());

        let no_project = UserMessage {
            project_id: Some(String::new()),
            text: Some("hi".into()),
        };
        assert!(no_project.validate().is_err());
    }

    #[test]
    fn missing_fields_message() {
        assert_eq!(
            ProtocolError::MissingFields.to_string(),
            "project_id and text required"
        );
    }

    #[test]
    fn outbound_wire_shapes() {
        let cases = [
            (
                OutboundMessage::Retrieval { hits: vec!["a.txt".into()] },
                json!({"type": "retrieval", "hits": ["a.txt"]}),
            ),
            (
                OutboundMessage::Chunk { text: "hi ".into() },
                json!({"type": "chunk", "text": "hi "}),
            ),
            (
                OutboundMessage::Done { cost: 0.000042 },
                json!({"type": "done", "cost": 0.000042}),
            ),
            (
                OutboundMessage::error("boom"),
                json!({"type": "error", "message": "boom"}),
            ),
        ];
        for (msg, expected) in cases {
            assert_eq!(serde_json::to_value(&msg).unwrap(), expected);
        }
    }
}
