//! UI models that should be available on both wasm and native.
//!
//! Keeping these out of the wasm-only `web` module allows us to unit-test them
//! on the host, including the Socket.IO framing spoken by the training
//! backend.

use serde_json::Value;

/// Where the training backend listens by default.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Socket.IO event name carrying update events.
pub const TRAINING_UPDATE_EVENT: &str = "training_update";

const SOCKET_IO_PATH: &str = "/socket.io/";
const SOCKET_IO_QUERY: &str = "EIO=4&transport=websocket";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    /// The server closed the connection.
    Closed,
    Failed,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "connected",
            ConnectionState::Closed => "closed by server",
            ConnectionState::Failed => "connection failed",
        }
    }

    /// Whether a socket handle is (or may soon be) live.
    pub fn is_active(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }
}

/// Turn a backend address into its Socket.IO WebSocket endpoint.
///
/// `http(s)://` becomes `ws(s)://` and a bare `host:port` gets `ws://`. The
/// Engine.IO path and query are appended unless the input already names
/// `/socket.io/`. Returns `None` for blank input.
pub fn socket_io_url(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let url = if let Some(rest) = input.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if let Some(rest) = input.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if input.starts_with("ws://") || input.starts_with("wss://") {
        input.to_string()
    } else {
        format!("ws://{input}")
    };

    if url.contains(SOCKET_IO_PATH) {
        return Some(url);
    }
    Some(format!(
        "{}{SOCKET_IO_PATH}?{SOCKET_IO_QUERY}",
        url.trim_end_matches('/')
    ))
}

/// One text frame of an Engine.IO v4 / Socket.IO v5 WebSocket session.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketFrame {
    /// Engine.IO handshake (`0{...}`).
    Open,
    /// Engine.IO close (`1`).
    Close,
    /// Engine.IO heartbeat from the server (`2`).
    Ping,
    /// Socket.IO namespace connect acknowledged (`40{...}`).
    Connected,
    /// Socket.IO namespace disconnect (`41`).
    Disconnected,
    /// Socket.IO event (`42[name, data...]`); `data` is the first argument.
    Event { name: String, data: Value },
    /// Socket.IO connect refused (`44{...}`).
    ConnectError(String),
    /// Anything else (pong, noop, acks, binary placeholders).
    Other,
}

/// What the host should do with a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameAction {
    /// Send this text back on the socket.
    Reply(&'static str),
    State(ConnectionState),
    /// Payload of a `training_update` event.
    Update(Value),
    Ignore,
}

/// Parse one text frame. Returns `None` for frames that do not follow the
/// protocol (empty text, an event packet whose body is not a JSON array).
pub fn parse_frame(text: &str) -> Option<SocketFrame> {
    let mut chars = text.chars();
    let frame = match chars.next()? {
        '0' => SocketFrame::Open,
        '1' => SocketFrame::Close,
        '2' => SocketFrame::Ping,
        '4' => parse_packet(chars.as_str())?,
        _ => SocketFrame::Other,
    };
    Some(frame)
}

fn parse_packet(packet: &str) -> Option<SocketFrame> {
    let mut chars = packet.chars();
    let kind = chars.next()?;
    let body = skip_namespace(chars.as_str());
    let frame = match kind {
        '0' => SocketFrame::Connected,
        '1' => SocketFrame::Disconnected,
        '2' => {
            // Optional ack id before the argument array.
            let args = body.trim_start_matches(|c: char| c.is_ascii_digit());
            let Value::Array(mut args) = serde_json::from_str::<Value>(args).ok()? else {
                return None;
            };
            if args.is_empty() {
                return None;
            }
            let name = match args.remove(0) {
                Value::String(name) => name,
                _ => return None,
            };
            let data = if args.is_empty() {
                Value::Null
            } else {
                args.swap_remove(0)
            };
            SocketFrame::Event { name, data }
        }
        '4' => {
            let message = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| body.to_string());
            SocketFrame::ConnectError(message)
        }
        _ => SocketFrame::Other,
    };
    Some(frame)
}

/// Drop a `/namespace,` prefix if present.
fn skip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        match body.find(',') {
            Some(i) => &body[i + 1..],
            None => "",
        }
    } else {
        body
    }
}

impl SocketFrame {
    pub fn action(self) -> FrameAction {
        match self {
            // Join the default namespace once the transport is up.
            SocketFrame::Open => FrameAction::Reply("40"),
            SocketFrame::Ping => FrameAction::Reply("3"),
            SocketFrame::Connected => FrameAction::State(ConnectionState::Open),
            SocketFrame::Close | SocketFrame::Disconnected => {
                FrameAction::State(ConnectionState::Closed)
            }
            SocketFrame::ConnectError(_) => FrameAction::State(ConnectionState::Failed),
            SocketFrame::Event { name, data } if name == TRAINING_UPDATE_EVENT => {
                FrameAction::Update(data)
            }
            SocketFrame::Event { .. } | SocketFrame::Other => FrameAction::Ignore,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netscope::event::UpdateEvent;
    use netscope::tensor::NeuronHandle;

    #[test]
    fn socket_io_url_rewrites_schemes() {
        assert_eq!(
            socket_io_url(DEFAULT_SERVER_URL).as_deref(),
            Some("ws://localhost:5000/socket.io/?EIO=4&transport=websocket")
        );
        assert_eq!(
            socket_io_url(" https://example.org/ ").as_deref(),
            Some("wss://example.org/socket.io/?EIO=4&transport=websocket")
        );
        assert_eq!(
            socket_io_url("127.0.0.1:5000").as_deref(),
            Some("ws://127.0.0.1:5000/socket.io/?EIO=4&transport=websocket")
        );
        assert_eq!(
            socket_io_url("ws://h/socket.io/?EIO=4&transport=websocket").as_deref(),
            Some("ws://h/socket.io/?EIO=4&transport=websocket")
        );
        assert_eq!(socket_io_url("   "), None);
    }

    #[test]
    fn handshake_and_heartbeat_get_replies() {
        let open = r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#;
        assert_eq!(parse_frame(open).unwrap().action(), FrameAction::Reply("40"));
        assert_eq!(parse_frame("2").unwrap().action(), FrameAction::Reply("3"));
        assert_eq!(
            parse_frame(r#"40{"sid":"xyz"}"#).unwrap().action(),
            FrameAction::State(ConnectionState::Open)
        );
        assert_eq!(
            parse_frame("41").unwrap().action(),
            FrameAction::State(ConnectionState::Closed)
        );
        assert_eq!(parse_frame("3").unwrap().action(), FrameAction::Ignore);
    }

    #[test]
    fn training_update_frame_decodes_into_event() {
        let text = r#"42["training_update",{"epoch":0,"weights":[[[0.5,-0.5]]]}]"#;
        let FrameAction::Update(data) = parse_frame(text).unwrap().action() else {
            panic!("expected an update");
        };
        let event = UpdateEvent::from_value(data).unwrap();
        assert_eq!(event.epoch, Some(0));
        let weights = event.weights.unwrap();
        assert_eq!(weights.neuron(NeuronHandle::new(0, 0)), Some(&[0.5, -0.5][..]));
    }

    #[test]
    fn namespace_and_ack_id_are_skipped() {
        let frame = parse_frame(r#"42/train,7["training_update",{"batch":3}]"#).unwrap();
        assert_eq!(
            frame,
            SocketFrame::Event {
                name: TRAINING_UPDATE_EVENT.to_string(),
                data: serde_json::json!({"batch": 3}),
            }
        );
    }

    #[test]
    fn other_events_and_garbage_are_ignored() {
        let other = parse_frame(r#"42["log",{"x":1}]"#).unwrap();
        assert_eq!(other.action(), FrameAction::Ignore);
        assert_eq!(parse_frame(r#"42{"epoch":1}"#), None);
        assert_eq!(parse_frame("42[5]"), None);
        assert_eq!(parse_frame(""), None);
    }

    #[test]
    fn connect_error_carries_message() {
        let frame = parse_frame(r#"44{"message":"Not authorized"}"#).unwrap();
        assert_eq!(frame, SocketFrame::ConnectError("Not authorized".to_string()));
        assert_eq!(frame.action(), FrameAction::State(ConnectionState::Failed));
    }

    #[test]
    fn active_states() {
        assert!(ConnectionState::Open.is_active());
        assert!(ConnectionState::Connecting.is_active());
        assert!(!ConnectionState::Closed.is_active());
        assert!(!ConnectionState::default().is_active());
        assert_eq!(ConnectionState::Failed.label(), "connection failed");
    }
}
