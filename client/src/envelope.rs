use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Frame kinds the client itself reacts to.
pub mod kinds {
    /// Liveness check.
    pub const PING: &str = "ping";
    /// Answer to a ping.
    pub const PONG: &str = "pong";
    /// Unsolicited liveness signal.
    pub const HEARTBEAT: &str = "heartbeat";
}

/// `{ "type": ..., "payload": ... }`, the only unit on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Discriminator.
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific body.
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    /// Builds an envelope.
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// A `ping` with an empty payload.
    #[must_use]
    pub fn ping() -> Self {
        Self::new(kinds::PING, json!({}))
    }

    /// A `pong` with an empty payload.
    #[must_use]
    pub fn pong() -> Self {
        Self::new(kinds::PONG, json!({}))
    }

    /// Parses a text frame; `None` if it is not an envelope.
    #[must_use]
    pub fn decode(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    /// Serializes to a text frame.
    #[must_use]
    pub fn to_text(&self) -> String {
        json!({ "type": self.kind, "payload": self.payload }).to_string()
    }

    /// `pong` or `heartbeat`.
    #[must_use]
    pub fn is_liveness(&self) -> bool {
        self.kind == kinds::PONG || self.kind == kinds::HEARTBEAT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_hub_frames() {
        let env = Envelope::decode(r#"{"type":"connected","payload":{"client_id":"x"}}"#).unwrap();
        assert_eq!(env.kind, "connected");
        assert_eq!(env.payload["client_id"], "x");

        let bare = Envelope::decode(r#"{"type":"heartbeat"}"#).unwrap();
        assert!(bare.is_liveness());
        assert!(Envelope::decode("not json").is_none());
    }

    #[test]
    fn text_form_uses_type_key() {
        let text = Envelope::pong().to_text();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "pong");
    }
}
