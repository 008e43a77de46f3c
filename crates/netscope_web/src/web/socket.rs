use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{BinaryType, CloseEvent, Event, MessageEvent, WebSocket};

use crate::ui_model::{parse_frame, ConnectionState, FrameAction};

/// A live Socket.IO connection to the training backend.
///
/// The handle answers the Engine.IO handshake and heartbeats itself and hands
/// the payload of every `training_update` event to the update callback.
/// Dropping it detaches the callbacks and closes the socket.
pub(super) struct UpdateSocket {
    ws: WebSocket,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_error: Closure<dyn FnMut(Event)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
}

impl UpdateSocket {
    pub(super) fn connect<M, S>(url: &str, mut on_update: M, on_state: S) -> Result<Self, String>
    where
        M: FnMut(serde_json::Value) + 'static,
        S: Fn(ConnectionState) + Clone + 'static,
    {
        let ws = WebSocket::new(url).map_err(|e| format!("websocket: {}", js_error_text(&e)))?;
        ws.set_binary_type(BinaryType::Arraybuffer);

        let on_message = {
            let ws = ws.clone();
            let on_state = on_state.clone();
            Closure::wrap(Box::new(move |ev: MessageEvent| {
                let Some(text) = frame_text(&ev.data()) else {
                    console_warn("websocket: ignoring non-text frame");
                    return;
                };
                let Some(frame) = parse_frame(&text) else {
                    console_warn(&format!("socket.io: unrecognized frame {text:.64}"));
                    return;
                };
                match frame.action() {
                    FrameAction::Reply(reply) => {
                        if let Err(e) = ws.send_with_str(reply) {
                            console_warn(&format!("socket.io: send failed: {}", js_error_text(&e)));
                        }
                    }
                    FrameAction::State(state) => on_state(state),
                    FrameAction::Update(data) => on_update(data),
                    FrameAction::Ignore => {}
                }
            }) as Box<dyn FnMut(MessageEvent)>)
        };

        let on_error = {
            let on_state = on_state.clone();
            Closure::wrap(Box::new(move |_ev: Event| {
                console_warn("websocket: connection error");
                on_state(ConnectionState::Failed);
            }) as Box<dyn FnMut(Event)>)
        };

        let on_close = Closure::wrap(Box::new(move |ev: CloseEvent| {
            if !ev.was_clean() {
                console_warn(&format!("websocket: closed with code {}", ev.code()));
            }
            on_state(ConnectionState::Closed);
        }) as Box<dyn FnMut(CloseEvent)>);

        ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        Ok(Self {
            ws,
            _on_message: on_message,
            _on_error: on_error,
            _on_close: on_close,
        })
    }

    pub(super) fn disconnect(self) {
        drop(self);
    }
}

impl Drop for UpdateSocket {
    fn drop(&mut self) {
        self.ws.set_onmessage(None);
        self.ws.set_onerror(None);
        self.ws.set_onclose(None);
        if self.ws.ready_state() == WebSocket::OPEN {
            // Leave the namespace before closing the transport.
            let _ = self.ws.send_with_str("41");
        }
        let _ = self.ws.close();
    }
}

fn frame_text(data: &JsValue) -> Option<String> {
    if let Some(text) = data.as_string() {
        return Some(text);
    }
    let buf = data.dyn_ref::<js_sys::ArrayBuffer>()?;
    String::from_utf8(js_sys::Uint8Array::new(buf).to_vec()).ok()
}

fn js_error_text(v: &JsValue) -> String {
    v.as_string().unwrap_or_else(|| format!("{v:?}"))
}

pub(super) fn console_warn(msg: &str) {
    web_sys::console::warn_1(&JsValue::from_str(msg));
}
