//! Request and response types for the Anthropic Messages API.
//!
//! Everything derives `Serialize`/`Deserialize` to match the JSON shape the
//! `v1/messages` endpoint expects.

use serde::{Deserialize, Serialize};

/// Request body for the `/v1/messages` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesRequest {
    /// Model identifier (e.g. "claude-haiku-4-5-20251001").
    pub model: String,
    /// Upper bound on tokens in the generated reply.
    pub max_tokens: u32,
    pub messages: Vec<Message>,
}

/// A single message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// "user" or "assistant".
    pub role: String,
    pub content: String,
}

/// Response body from the `/v1/messages` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    /// Content blocks in the reply, normally a single text block.
    pub content: Vec<ContentBlock>,
    pub model: String,
    /// Why generation stopped ("end_turn", "max_tokens", ...); `None` while
    /// still in progress.
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

/// One content block in a reply, currently always text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Block kind ("text"). Serialized as "type" on the wire.
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// Token accounting for one API call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_request_roundtrip() {
        let req = MessagesRequest {
            model: "claude-haiku-4-5-20251001".into(),
            max_tokens: 1024,
            messages: vec![Message {
                role: "user".into(),
                content: "Checkup on 2025-12-15 10:00".into(),
            }],
        };
        let json = serde_json::to_string(&req).unwrap();
        let parsed: MessagesRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.model, "claude-haiku-4-5-20251001");
        assert_eq!(parsed.max_tokens, 1024);
        assert_eq!(parsed.messages.len(), 1);
        assert_eq!(parsed.messages[0].role, "user");
    }

    #[test]
    fn content_block_type_field_renames_correctly() {
        let block = ContentBlock {
            content_type: "text".into(),
            text: "hello".into(),
        };
        let json = serde_json::to_string(&block).unwrap();
        assert!(json.contains(r#""type""#));
        assert!(!json.contains("content_type"));
    }

    #[test]
    fn messages_response_deserialize_from_api_format() {
        let api_json = r#"{
            "id": "msg_123",
            "content": [{"type": "text", "text": "{\"title\": \"Checkup\"}"}],
            "model": "claude-haiku-4-5-20251001",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 5, "output_tokens": 15}
        }"#;
        let resp: MessagesResponse = serde_json::from_str(api_json).unwrap();
        assert_eq!(resp.id, "msg_123");
        assert_eq!(resp.content[0].content_type, "text");
        assert_eq!(resp.content[0].text, r#"{"title": "Checkup"}"#);
        assert_eq!(resp.usage.output_tokens, 15);
    }

    #[test]
    fn messages_response_null_stop_reason() {
        let json = r#"{
            "id": "msg_456",
            "content": [],
            "model": "test",
            "stop_reason": null,
            "usage": {"input_tokens": 0, "output_tokens": 0}
        }"#;
        let resp: MessagesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.stop_reason, None);
    }
}
