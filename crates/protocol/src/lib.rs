//! Scoreboard IPC wire contract.
//!
//! The scoreboard server exposes two ZeroMQ endpoints:
//! - a REQ/REP endpoint taking one JSON frame per call, `["call_name", {params}]`,
//!   and answering with `["ok" | "error", payload]`
//! - a PUB endpoint broadcasting opaque multi-frame events with no topic prefix

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_REQUEST_ENDPOINT: &str = "tcp://127.0.0.1:5555";
pub const DEFAULT_EVENT_ENDPOINT: &str = "tcp://127.0.0.1:5556";
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 100;

/// Subscription prefix matching every published message.
pub const SUBSCRIBE_ALL: &str = "";

pub mod status {
    pub const OK: &str = "ok";
    pub const ERROR: &str = "error";
}

/// Parameters of a single call, keyed by parameter name.
pub type Params = serde_json::Map<String, serde_json::Value>;

// ── Errors ───────────────────────────────────────────────────────────────────

/// A frame that does not follow the wire contract.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("reply carried no frames")]
    Empty,

    #[error("reply is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed frame: {0}")]
    Shape(String),
}

impl FrameError {
    #[must_use]
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }
}

// ── Frames ───────────────────────────────────────────────────────────────────

/// Gateway → server call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestFrame {
    pub call: String,
    pub params: Params,
}

impl RequestFrame {
    pub fn new(call: impl Into<String>, params: Params) -> Self {
        Self {
            call: call.into(),
            params,
        }
    }

    /// Encode as the single JSON frame the server expects.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FrameError> {
        Ok(serde_json::to_vec(&(&self.call, &self.params))?)
    }

    /// Decode a request frame. Used by server-side tooling and test peers.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FrameError> {
        let (call, params): (String, Params) = serde_json::from_slice(bytes)?;
        Ok(Self { call, params })
    }
}

/// Server → gateway reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyFrame {
    pub status: String,
    pub payload: serde_json::Value,
}

impl ReplyFrame {
    pub fn ok(payload: serde_json::Value) -> Self {
        Self {
            status: status::OK.into(),
            payload,
        }
    }

    pub fn error(payload: serde_json::Value) -> Self {
        Self {
            status: status::ERROR.into(),
            payload,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == status::OK
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, FrameError> {
        Ok(serde_json::to_vec(&(&self.status, &self.payload))?)
    }

    /// Decode the first frame of a reply.
    ///
    /// Anything other than a two-element JSON array whose first element is a
    /// string is rejected.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FrameError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        let serde_json::Value::Array(mut items) = value else {
            return Err(FrameError::shape("reply is not a JSON array"));
        };
        if items.len() != 2 {
            return Err(FrameError::shape(format!(
                "reply has {} elements, expected 2",
                items.len()
            )));
        }
        let payload = items.pop().unwrap_or_default();
        let status = match items.pop() {
            Some(serde_json::Value::String(s)) => s,
            Some(other) => {
                return Err(FrameError::shape(format!(
                    "reply status is not a string: {other}"
                )));
            },
            None => return Err(FrameError::shape("reply status missing")),
        };
        Ok(Self { status, payload })
    }

    /// Decode a multi-frame reply. Only the first frame carries data.
    pub fn from_frames<B: AsRef<[u8]>>(frames: &[B]) -> Result<Self, FrameError> {
        let first = frames.first().ok_or(FrameError::Empty)?;
        Self::from_slice(first.as_ref())
    }
}

// ── Data registries ──────────────────────────────────────────────────────────

/// Named record collections held by the scoreboard server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    #[default]
    Player,
    Game,
    Tournament,
}

impl RegistryKind {
    pub const ALL: [Self; 3] = [Self::Player, Self::Game, Self::Tournament];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Game => "game",
            Self::Tournament => "tournament",
        }
    }
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistryKind {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| FrameError::shape(format!("unknown registry kind: {s}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn request_encodes_as_pair() {
        let mut params = Params::new();
        params.insert("player_num".into(), json!(2));
        let frame = RequestFrame::new("set_turn", params);
        let bytes = frame.to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!(["set_turn", {"player_num": 2}]));
        assert_eq!(RequestFrame::from_slice(&bytes).unwrap(), frame);
    }

    #[test]
    fn request_without_params_sends_empty_object() {
        let bytes = RequestFrame::new("game_status", Params::new())
            .to_bytes()
            .unwrap();
        assert_eq!(bytes, br#"["game_status",{}]"#);
    }

    #[test]
    fn reply_ok_decodes() {
        let reply = ReplyFrame::from_slice(br#"["ok", {"game": "started"}]"#).unwrap();
        assert!(reply.is_ok());
        assert_eq!(reply.payload, json!({"game": "started"}));
    }

    #[test]
    fn reply_error_keeps_payload() {
        let reply = ReplyFrame::from_slice(br#"["error", {"reason": "x"}]"#).unwrap();
        assert!(!reply.is_ok());
        assert_eq!(reply.payload, json!({"reason": "x"}));
    }

    #[test]
    fn reply_null_payload() {
        let reply = ReplyFrame::from_slice(br#"["ok", null]"#).unwrap();
        assert_eq!(reply.payload, serde_json::Value::Null);
    }

    #[test]
    fn reply_rejects_wrong_arity() {
        let cases: [&[u8]; 3] = [br#"["ok"]"#, br#"["ok", 1, 2]"#, b"[]"];
        for raw in cases {
            assert!(matches!(
                ReplyFrame::from_slice(raw),
                Err(FrameError::Shape(_))
            ));
        }
    }

    #[test]
    fn reply_rejects_non_array() {
        assert!(matches!(
            ReplyFrame::from_slice(br#"{"status": "ok"}"#),
            Err(FrameError::Shape(_))
        ));
    }

    #[test]
    fn reply_rejects_non_string_status() {
        assert!(matches!(
            ReplyFrame::from_slice(br#"[1, null]"#),
            Err(FrameError::Shape(_))
        ));
    }

    #[test]
    fn reply_rejects_garbage() {
        assert!(matches!(
            ReplyFrame::from_slice(b"not json"),
            Err(FrameError::Json(_))
        ));
    }

    #[test]
    fn reply_from_no_frames() {
        let frames: Vec<Vec<u8>> = Vec::new();
        assert!(matches!(
            ReplyFrame::from_frames(&frames),
            Err(FrameError::Empty)
        ));
    }

    #[test]
    fn reply_uses_first_frame_only() {
        let frames = vec![br#"["ok", 7]"#.to_vec(), b"trailing".to_vec()];
        assert_eq!(ReplyFrame::from_frames(&frames).unwrap().payload, json!(7));
    }

    #[test]
    fn registry_kind_round_trip() {
        for kind in RegistryKind::ALL {
            assert_eq!(kind.as_str().parse::<RegistryKind>().unwrap(), kind);
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.as_str()));
        }
        assert!("referee".parse::<RegistryKind>().is_err());
    }
}
