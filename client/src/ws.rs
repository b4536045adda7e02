use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket, Window};

use doodleboard_shared::{ClientMessage, ServerMessage};

use crate::net::websocket_url;

#[derive(Debug)]
pub enum WsEvent {
    Open,
    Close,
    Error,
    Message(ServerMessage),
}

pub struct WsSender {
    socket: WebSocket,
}

impl WsSender {
    fn is_open(&self) -> bool {
        self.socket.ready_state() == WebSocket::OPEN
    }

    pub fn send(&self, message: &ClientMessage) {
        if !self.is_open() {
            return;
        }
        if let Ok(payload) = bincode::encode_to_vec(message, bincode::config::standard()) {
            let _ = self.socket.send_with_u8_array(&payload);
        }
    }
}

fn decode_message(data: &JsValue) -> Option<ServerMessage> {
    if let Ok(buffer) = data.clone().dyn_into::<js_sys::ArrayBuffer>() {
        let bytes = Uint8Array::new(&buffer).to_vec();
        return match bincode::decode_from_slice::<ServerMessage, _>(
            &bytes,
            bincode::config::standard(),
        ) {
            Ok((message, _)) => Some(message),
            Err(error) => {
                web_sys::console::error_1(
                    &format!("WS message bincode parse error: {error}").into(),
                );
                None
            }
        };
    }
    if let Some(text) = data.as_string() {
        return match serde_json::from_str::<ServerMessage>(&text) {
            Ok(message) => Some(message),
            Err(error) => {
                web_sys::console::error_1(&format!("WS message JSON parse error: {error}").into());
                None
            }
        };
    }
    web_sys::console::error_2(&"WS message data is not a string or arraybuffer".into(), data);
    None
}

pub fn connect_ws(
    window: &Window,
    on_event: impl 'static + FnMut(WsEvent),
) -> Result<Rc<WsSender>, JsValue> {
    let ws_url = websocket_url(window)?;
    let socket = WebSocket::new(&ws_url)?;
    let _ = Reflect::set(
        socket.as_ref(),
        &JsValue::from_str("binaryType"),
        &JsValue::from_str("arraybuffer"),
    );

    let sender = Rc::new(WsSender {
        socket: socket.clone(),
    });

    let on_event = Rc::new(RefCell::new(on_event));
    let open_reported = Rc::new(Cell::new(false));

    {
        let on_event = on_event.clone();
        let open_reported = open_reported.clone();
        let onopen = Closure::<dyn FnMut(Event)>::new(move |_| {
            open_reported.set(true);
            on_event.borrow_mut()(WsEvent::Open);
        });
        socket.set_onopen(Some(onopen.as_ref().unchecked_ref()));
        onopen.forget();
    }

    {
        let on_event = on_event.clone();
        let open_reported = open_reported.clone();
        let onclose = Closure::<dyn FnMut(CloseEvent)>::new(move |_| {
            open_reported.set(false);
            on_event.borrow_mut()(WsEvent::Close);
        });
        socket.set_onclose(Some(onclose.as_ref().unchecked_ref()));
        onclose.forget();
    }

    {
        let on_event = on_event.clone();
        let open_reported = open_reported.clone();
        let onerror = Closure::<dyn FnMut(Event)>::new(move |_| {
            open_reported.set(false);
            on_event.borrow_mut()(WsEvent::Error);
        });
        socket.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onerror.forget();
    }

    {
        let on_event = on_event.clone();
        let open_reported = open_reported.clone();
        let onmessage = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            if !open_reported.replace(true) {
                on_event.borrow_mut()(WsEvent::Open);
            }
            if let Some(message) = decode_message(&event.data()) {
                on_event.borrow_mut()(WsEvent::Message(message));
            }
        });
        socket.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
        onmessage.forget();
    }

    {
        let socket = socket.clone();
        let onbeforeunload = Closure::<dyn FnMut(Event)>::new(move |_| {
            let _ = socket.close();
        });
        window.add_event_listener_with_callback(
            "beforeunload",
            onbeforeunload.as_ref().unchecked_ref(),
        )?;
        onbeforeunload.forget();
    }

    Ok(sender)
}
