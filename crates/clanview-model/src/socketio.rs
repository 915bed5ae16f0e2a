//! Socket.IO (protocol 5) packets carried over Engine.IO (protocol 4)
//! WebSocket text frames.
//!
//! ```text
//! 0{"sid":"..","pingInterval":25000,"pingTimeout":20000}   engine open
//! 2 / 3                                                    ping / pong
//! 40 / 40{"sid":".."}                                      namespace connect
//! 42["simulation_state",{...}]                             event
//! ```

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Path and query selecting the Engine.IO WebSocket transport.
pub const ENGINE_IO_PATH: &str = "/socket.io/?EIO=4&transport=websocket";

/// Errors decoding a text frame.
#[derive(Debug, Error)]
pub enum PacketError {
    #[error("empty frame")]
    Empty,

    #[error("unknown packet type {0:?}")]
    UnknownType(String),

    #[error("malformed packet: {0}")]
    Malformed(String),

    #[error("invalid packet JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Handshake values from the Engine.IO open packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    /// Milliseconds between server pings
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

impl OpenInfo {
    /// Silence after which the server is presumed gone.
    pub fn liveness_window(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.ping_interval + self.ping_timeout)
    }
}

/// One decoded text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(OpenInfo),
    Close,
    Ping,
    Pong,
    Noop,
    /// Namespace connected (from the server) or connect request (from us)
    Connect,
    Disconnect,
    ConnectError(String),
    Event {
        name: String,
        payload: Option<Value>,
    },
}

impl Packet {
    pub fn decode(text: &str) -> Result<Self, PacketError> {
        let mut chars = text.chars();
        let engine = chars.next().ok_or(PacketError::Empty)?;
        let rest = chars.as_str();

        match engine {
            '0' => Ok(Packet::Open(serde_json::from_str(rest)?)),
            '1' => Ok(Packet::Close),
            // Trailing ping/pong data carries no meaning here
            '2' => Ok(Packet::Ping),
            '3' => Ok(Packet::Pong),
            '6' => Ok(Packet::Noop),
            '4' => decode_message(rest),
            other => Err(PacketError::UnknownType(other.to_string())),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Packet::Open(info) => format!(
                "0{}",
                serde_json::json!({
                    "sid": info.sid,
                    "pingInterval": info.ping_interval,
                    "pingTimeout": info.ping_timeout,
                })
            ),
            Packet::Close => "1".to_string(),
            Packet::Ping => "2".to_string(),
            Packet::Pong => "3".to_string(),
            Packet::Noop => "6".to_string(),
            Packet::Connect => "40".to_string(),
            Packet::Disconnect => "41".to_string(),
            Packet::ConnectError(message) => {
                format!("44{}", serde_json::json!({ "message": message }))
            }
            Packet::Event { name, payload } => {
                let args = match payload {
                    Some(payload) => serde_json::json!([name, payload]),
                    None => serde_json::json!([name]),
                };
                format!("42{args}")
            }
        }
    }
}

fn decode_message(body: &str) -> Result<Packet, PacketError> {
    let mut chars = body.chars();
    let kind = chars
        .next()
        .ok_or_else(|| PacketError::Malformed("message without socket packet type".into()))?;
    let rest = skip_namespace(chars.as_str());

    match kind {
        '0' => Ok(Packet::Connect),
        '1' => Ok(Packet::Disconnect),
        '2' => decode_event(rest),
        '4' => {
            let message = serde_json::from_str::<Value>(rest)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| rest.to_string());
            Ok(Packet::ConnectError(message))
        }
        other => Err(PacketError::UnknownType(format!("4{other}"))),
    }
}

/// Drop a leading `/namespace,` if present.
fn skip_namespace(rest: &str) -> &str {
    if rest.starts_with('/') {
        match rest.find(',') {
            Some(comma) => &rest[comma + 1..],
            None => "",
        }
    } else {
        rest
    }
}

fn decode_event(rest: &str) -> Result<Packet, PacketError> {
    // An ack id may precede the argument array
    let args = rest.trim_start_matches(|c: char| c.is_ascii_digit());
    let Value::Array(mut items) = serde_json::from_str::<Value>(args)? else {
        return Err(PacketError::Malformed("event arguments are not an array".into()));
    };
    if items.is_empty() {
        return Err(PacketError::Malformed("event without a name".into()));
    }
    let Value::String(name) = items.remove(0) else {
        return Err(PacketError::Malformed("event name is not a string".into()));
    };
    let payload = if items.is_empty() {
        None
    } else {
        Some(items.remove(0))
    };
    Ok(Packet::Event { name, payload })
}

/// WebSocket endpoint for a server base URL.
///
/// URLs already naming the Socket.IO path are returned unchanged.
pub fn endpoint(base: &str) -> String {
    if base.contains("/socket.io/") {
        base.to_string()
    } else {
        format!("{}{}", base.trim_end_matches('/'), ENGINE_IO_PATH)
    }
}
