//! Discord gateway payloads.
//!
//! Every gateway frame is a JSON object `{op, d, s, t}`. Only the opcodes
//! and dispatch events the auto-responder acts on are modelled; everything
//! else parses into [`GatewayEvent::Unknown`] or [`DispatchEvent::Other`].

use retort_core::{AdapterError, AdapterResult, MessageEvent};
use serde::Deserialize;
use serde_json::{Value, json};

/// Gateway opcodes.
pub mod opcode {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// A raw gateway frame.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayPayload {
    /// Opcode.
    pub op: u8,
    /// Event data.
    #[serde(default)]
    pub d: Value,
    /// Sequence number, for dispatches.
    #[serde(default)]
    pub s: Option<u64>,
    /// Event name, for dispatches.
    #[serde(default)]
    pub t: Option<String>,
}

/// `HELLO` data.
#[derive(Debug, Clone, Deserialize)]
pub struct Hello {
    /// Heartbeat interval in milliseconds.
    pub heartbeat_interval: u64,
}

/// A Discord user.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

/// `READY` dispatch data.
#[derive(Debug, Clone, Deserialize)]
pub struct Ready {
    /// The session's own user.
    pub user: User,
    pub session_id: String,
}

/// `MESSAGE_CREATE` dispatch data.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageCreate {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    pub author: User,
    /// Empty without the MESSAGE_CONTENT intent.
    #[serde(default)]
    pub content: String,
}

impl From<MessageCreate> for MessageEvent {
    fn from(msg: MessageCreate) -> Self {
        Self {
            message_id: msg.id,
            channel_id: msg.channel_id,
            author_id: msg.author.id,
            author_is_bot: msg.author.bot,
            content: msg.content,
        }
    }
}

/// Dispatch (opcode 0) events.
#[derive(Debug, Clone)]
pub enum DispatchEvent {
    Ready(Ready),
    MessageCreate(MessageCreate),
    /// Any other dispatch, by name.
    Other(String),
}

/// A decoded gateway frame.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Hello(Hello),
    Dispatch(Box<DispatchEvent>),
    /// The gateway asks for an immediate heartbeat.
    HeartbeatRequest,
    HeartbeatAck,
    Reconnect,
    InvalidSession {
        resumable: bool,
    },
    Unknown(u8),
}

impl GatewayPayload {
    /// Reads the frame envelope without interpreting `d`.
    pub fn from_slice(data: &[u8]) -> AdapterResult<Self> {
        serde_json::from_slice(data).map_err(|e| AdapterError::parse(e.to_string()))
    }
}

impl GatewayEvent {
    /// Decodes a frame, returning its sequence number alongside the event.
    ///
    /// A frame whose `d` does not decode is an error here; use
    /// [`GatewayPayload::from_slice`] and [`GatewayEvent::decode`] to keep
    /// the sequence number of such a frame.
    pub fn parse(data: &[u8]) -> AdapterResult<(Option<u64>, Self)> {
        let payload = GatewayPayload::from_slice(data)?;
        let seq = payload.s;
        Ok((seq, Self::decode(payload)?))
    }

    /// Interprets the data of an already parsed frame.
    pub fn decode(payload: GatewayPayload) -> AdapterResult<Self> {
        let event = match payload.op {
            opcode::HELLO => Self::Hello(from_data(payload.d)?),
            opcode::HEARTBEAT => Self::HeartbeatRequest,
            opcode::HEARTBEAT_ACK => Self::HeartbeatAck,
            opcode::RECONNECT => Self::Reconnect,
            opcode::INVALID_SESSION => Self::InvalidSession {
                resumable: payload.d.as_bool().unwrap_or(false),
            },
            opcode::DISPATCH => {
                let name = payload.t.unwrap_or_default();
                let event = match name.as_str() {
                    "READY" => DispatchEvent::Ready(from_data(payload.d)?),
                    "MESSAGE_CREATE" => DispatchEvent::MessageCreate(from_data(payload.d)?),
                    _ => DispatchEvent::Other(name),
                };
                Self::Dispatch(Box::new(event))
            }
            other => Self::Unknown(other),
        };

        Ok(event)
    }
}

fn from_data<T: serde::de::DeserializeOwned>(d: Value) -> AdapterResult<T> {
    serde_json::from_value(d).map_err(|e| AdapterError::parse(e.to_string()))
}

/// Builds a heartbeat frame carrying the last sequence number seen.
pub fn heartbeat(seq: Option<u64>) -> Value {
    json!({ "op": opcode::HEARTBEAT, "d": seq })
}

/// Builds an identify frame.
pub fn identify(token: &str, intents: u64) -> Value {
    json!({
        "op": opcode::IDENTIFY,
        "d": {
            "token": token,
            "intents": intents,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "retort",
                "device": "retort",
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> (Option<u64>, GatewayEvent) {
        GatewayEvent::parse(raw.as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_hello() {
        let (seq, event) = parse(r#"{"op":10,"d":{"heartbeat_interval":41250},"s":null,"t":null}"#);
        assert_eq!(seq, None);
        match event {
            GatewayEvent::Hello(hello) => assert_eq!(hello.heartbeat_interval, 41250),
            other => panic!("expected hello, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_ready() {
        let (seq, event) = parse(
            r#"{"op":0,"s":1,"t":"READY","d":{"v":10,"user":{"id":"42","username":"retort","bot":true},"session_id":"abc","guilds":[]}}"#,
        );
        assert_eq!(seq, Some(1));
        match event {
            GatewayEvent::Dispatch(dispatch) => match *dispatch {
                DispatchEvent::Ready(ready) => {
                    assert_eq!(ready.user.id, "42");
                    assert_eq!(ready.session_id, "abc");
                }
                other => panic!("expected ready, got {other:?}"),
            },
            other => panic!("expected dispatch, got {other:?}"),
        }
    }

    #[test]
    fn test_message_create_converts_to_event() {
        let (seq, event) = parse(
            r#"{"op":0,"s":7,"t":"MESSAGE_CREATE","d":{"id":"100","channel_id":"200","guild_id":"300","author":{"id":"400","username":"alice"},"content":"hello there","tts":false}}"#,
        );
        assert_eq!(seq, Some(7));
        let GatewayEvent::Dispatch(dispatch) = event else {
            panic!("expected dispatch");
        };
        let DispatchEvent::MessageCreate(msg) = *dispatch else {
            panic!("expected message create");
        };

        let event = MessageEvent::from(msg);
        assert_eq!(event.message_id, "100");
        assert_eq!(event.channel_id, "200");
        assert_eq!(event.author_id, "400");
        assert!(!event.author_is_bot);
        assert_eq!(event.content, "hello there");
    }

    #[test]
    fn test_parse_control_opcodes() {
        assert!(matches!(parse(r#"{"op":11}"#).1, GatewayEvent::HeartbeatAck));
        assert!(matches!(parse(r#"{"op":1,"d":null}"#).1, GatewayEvent::HeartbeatRequest));
        assert!(matches!(parse(r#"{"op":7,"d":null}"#).1, GatewayEvent::Reconnect));
        assert!(matches!(
            parse(r#"{"op":9,"d":true}"#).1,
            GatewayEvent::InvalidSession { resumable: true }
        ));
        assert!(matches!(parse(r#"{"op":42}"#).1, GatewayEvent::Unknown(42)));
    }

    #[test]
    fn test_other_dispatches_are_named() {
        let (_, event) = parse(r#"{"op":0,"s":3,"t":"TYPING_START","d":{}}"#);
        let GatewayEvent::Dispatch(dispatch) = event else {
            panic!("expected dispatch");
        };
        assert!(matches!(*dispatch, DispatchEvent::Other(ref name) if name == "TYPING_START"));
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        assert!(GatewayEvent::parse(b"not json").is_err());
        assert!(GatewayEvent::parse(br#"{"op":10,"d":{}}"#).is_err());
    }

    #[test]
    fn test_envelope_survives_bad_data() {
        let payload =
            GatewayPayload::from_slice(br#"{"op":0,"s":12,"t":"MESSAGE_CREATE","d":{"id":"1"}}"#)
                .unwrap();
        assert_eq!(payload.s, Some(12));
        assert!(GatewayEvent::decode(payload).is_err());
    }

    #[test]
    fn test_outbound_frames() {
        assert_eq!(heartbeat(None), json!({"op": 1, "d": null}));
        assert_eq!(heartbeat(Some(5)), json!({"op": 1, "d": 5}));

        let frame = identify("secret", 513);
        assert_eq!(frame["op"], 2);
        assert_eq!(frame["d"]["token"], "secret");
        assert_eq!(frame["d"]["intents"], 513);
    }
}
