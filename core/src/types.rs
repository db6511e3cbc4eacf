use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Model => write!(f, "model"),
        }
    }
}

/// Binary payload (file, camera frame) carried inline in a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Standard base64, padded
    pub data: String,
    #[serde(alias = "mimeType")]
    pub mime_type: String,
}

impl Attachment {
    /// Encodes raw bytes; no validation beyond the encoding itself.
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            data: STANDARD.encode(bytes),
            mime_type: mime_type.into(),
        }
    }

    /// Decodes the payload back to the exact input bytes
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.data)
    }

    /// Size of the decoded payload, computed from the encoded length
    pub fn decoded_len(&self) -> usize {
        let padding = self.data.bytes().rev().take_while(|b| *b == b'=').count();
        (self.data.len() / 4 * 3).saturating_sub(padding)
    }
}

/// One content unit of a turn: text or an inline attachment, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPart", into = "RawPart")]
pub enum Part {
    Text(String),
    InlineData(Attachment),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(text) => Some(text),
            Part::InlineData(_) => None,
        }
    }
}

/// Wire shape of a part: `{"text": ..}` or `{"inline_data": {..}}`
#[derive(Serialize, Deserialize)]
struct RawPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(alias = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<Attachment>,
}

impl TryFrom<RawPart> for Part {
    type Error = String;

    fn try_from(raw: RawPart) -> Result<Self, Self::Error> {
        match (raw.text, raw.inline_data) {
            (Some(text), None) => Ok(Part::Text(text)),
            (None, Some(attachment)) => Ok(Part::InlineData(attachment)),
            (Some(_), Some(_)) => Err("part carries both text and inline_data".to_string()),
            (None, None) => Err("part carries neither text nor inline_data".to_string()),
        }
    }
}

impl From<Part> for RawPart {
    fn from(part: Part) -> Self {
        match part {
            Part::Text(text) => RawPart {
                text: Some(text),
                inline_data: None,
            },
            Part::InlineData(attachment) => RawPart {
                text: None,
                inline_data: Some(attachment),
            },
        }
    }
}

/// One message of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    /// Builds a turn, refusing an empty part list.
    pub fn new(role: Role, parts: Vec<Part>) -> Option<Self> {
        if parts.is_empty() {
            None
        } else {
            Some(Self { role, parts })
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::text(text)],
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    /// Text parts in order, attachments skipped
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(Part::as_text)
    }
}

/// Request to Gemini API to generate content.
///
/// The endpoint is stateless, so `contents` is always the full history.
#[derive(Serialize, Debug)]
pub struct GenerateContentRequest<'a> {
    pub contents: &'a [Turn],
}

/// Response from Gemini API
#[derive(Deserialize, Debug, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// Candidate in the response
#[derive(Deserialize, Debug)]
pub struct Candidate {
    pub content: Option<ContentResponsePart>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

/// Content part in the response
#[derive(Deserialize, Debug)]
pub struct ContentResponsePart {
    #[serde(default)]
    pub parts: Vec<PartResponse>,
    pub role: Option<String>,
}

/// Part response from the API
#[derive(Deserialize, Debug)]
pub struct PartResponse {
    pub text: Option<String>,
}

/// Error body returned with non-success statuses
#[derive(Deserialize, Debug)]
pub struct ApiErrorResponse {
    pub error: Option<ApiErrorDetail>,
}

#[derive(Deserialize, Debug)]
pub struct ApiErrorDetail {
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_part_wire_shape() {
        let turn = Turn {
            role: Role::User,
            parts: vec![
                Part::text("look"),
                Part::InlineData(Attachment::from_bytes(b"\x89PNG", "image/png")),
            ],
        };

        let value = serde_json::to_value(&turn).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "user",
                "parts": [
                    {"text": "look"},
                    {"inline_data": {"data": "iVBORw==", "mime_type": "image/png"}}
                ]
            })
        );
    }

    #[test]
    fn test_part_accepts_camel_case_aliases() {
        let part: Part = serde_json::from_value(json!({
            "inlineData": {"data": "AAE=", "mimeType": "application/octet-stream"}
        }))
        .unwrap();

        let Part::InlineData(attachment) = &part else {
            panic!("expected inline data, got {:?}", part);
        };
        assert_eq!(attachment.mime_type, "application/octet-stream");
        assert_eq!(attachment.decode().unwrap(), vec![0u8, 1u8]);
    }

    #[test]
    fn test_part_rejects_both_or_neither() {
        let both = serde_json::from_value::<Part>(json!({
            "text": "x",
            "inline_data": {"data": "AA==", "mime_type": "image/png"}
        }));
        assert!(both.is_err());

        let neither = serde_json::from_value::<Part>(json!({}));
        assert!(neither.is_err());
    }

    #[test]
    fn test_attachment_decoded_len() {
        for bytes in [&b""[..], b"a", b"ab", b"abc", b"abcd"] {
            let attachment = Attachment::from_bytes(bytes, "text/plain");
            assert_eq!(attachment.decoded_len(), bytes.len());
            assert_eq!(attachment.decode().unwrap(), bytes);
        }
    }

    #[test]
    fn test_turn_requires_parts() {
        assert!(Turn::new(Role::User, Vec::new()).is_none());
        let turn = Turn::new(Role::Model, vec![Part::text("hi")]).unwrap();
        assert_eq!(turn.texts().collect::<Vec<_>>(), vec!["hi"]);
    }

    #[test]
    fn test_response_ignores_unknown_fields() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"parts": [{"text": "hi there"}], "role": "model"},
                "finishReason": "STOP",
                "index": 0
            }],
            "usageMetadata": {"totalTokenCount": 12}
        }))
        .unwrap();

        let content = response.candidates[0].content.as_ref().unwrap();
        assert_eq!(content.parts[0].text.as_deref(), Some("hi there"));
    }
}
