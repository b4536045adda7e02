use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::Reflect;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    CanvasRenderingContext2d, Element, Event, HtmlButtonElement, HtmlCanvasElement, HtmlElement,
    HtmlInputElement, HtmlSpanElement, PointerEvent,
};

use doodleboard_shared::{ClientMessage, ServerMessage};

use crate::dom::{
    event_to_point, get_element, prepare_canvas, resize_canvas, set_status, update_size_label,
};
use crate::gesture::Gesture;
use crate::palette::{picker_action_from_event, render_palette, render_shapes, PickerAction};
use crate::persistence::{PersistenceClient, StrokeStyle};
use crate::render::{clear, paint};
use crate::state::{DrawMode, DrawnSegment, State};
use crate::ws::{connect_ws, WsEvent};

fn document_ready_state(document: &web_sys::Document) -> Option<String> {
    Reflect::get(document.as_ref(), &JsValue::from_str("readyState"))
        .ok()?
        .as_string()
}

fn peers_label(count: u32) -> String {
    match count {
        0 | 1 => "Connected".to_string(),
        n => format!("Connected · {n} drawing"),
    }
}

fn handle_server_message(
    state: &Rc<RefCell<State>>,
    status_el: &Element,
    status_text: &Element,
    message: ServerMessage,
) {
    match message {
        ServerMessage::Welcome { peers } | ServerMessage::Peers { count: peers } => {
            set_status(status_el, status_text, "open", &peers_label(peers));
        }
        ServerMessage::Draw {
            segment,
            color,
            size,
        } => {
            let mut state = state.borrow_mut();
            paint(
                &mut state,
                DrawnSegment {
                    segment,
                    color,
                    size,
                },
            );
        }
        ServerMessage::Clear => clear(&mut state.borrow_mut()),
        ServerMessage::Stored { id, shape } => {
            web_sys::console::log_1(&format!("Stored {} stroke {id}", shape.as_str()).into());
        }
    }
}

#[wasm_bindgen(start)]
pub fn run() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;
    let started = Rc::new(Cell::new(false));

    if document_ready_state(&document).as_deref() == Some("complete") {
        started.set(true);
        return start_app();
    }

    let onload_started = started.clone();
    let onload = Closure::<dyn FnMut(Event)>::new(move |_| {
        if onload_started.replace(true) {
            return;
        }
        if let Err(err) = start_app() {
            web_sys::console::error_1(&err);
        }
    });
    window.add_event_listener_with_callback("load", onload.as_ref().unchecked_ref())?;
    onload.forget();

    Ok(())
}

fn start_app() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;

    let canvas: HtmlCanvasElement = get_element(&document, "board")?;
    let palette_el: HtmlElement = get_element(&document, "palette")?;
    let shapes_el: HtmlElement = get_element(&document, "shapes")?;
    let size_input: HtmlInputElement = get_element(&document, "size")?;
    let size_value: HtmlSpanElement = get_element(&document, "size-value")?;
    let clear_button: HtmlButtonElement = get_element(&document, "clear")?;
    let status_el: Element = get_element(&document, "status")?;
    let status_text: Element = get_element(&document, "status-text")?;

    let ctx = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("Missing 2d context"))?
        .dyn_into::<CanvasRenderingContext2d>()?;
    prepare_canvas(&canvas);

    let state = Rc::new(RefCell::new(State::new(canvas.clone(), ctx)));
    {
        let mut state = state.borrow_mut();
        resize_canvas(&window, &mut state);
        render_palette(&document, &palette_el, &state.palette, state.palette_selected);
        render_shapes(&document, &shapes_el, state.shape);
        size_input.set_value(&state.size.to_string());
        update_size_label(&size_input, &size_value);
    }

    set_status(&status_el, &status_text, "connecting", "Connecting…");
    let socket = {
        let state = state.clone();
        let status_el = status_el.clone();
        let status_text = status_text.clone();
        connect_ws(&window, move |event| match event {
            WsEvent::Open => set_status(&status_el, &status_text, "open", "Connected"),
            WsEvent::Close => set_status(&status_el, &status_text, "closed", "Offline"),
            WsEvent::Error => set_status(&status_el, &status_text, "closed", "Connection error"),
            WsEvent::Message(message) => {
                handle_server_message(&state, &status_el, &status_text, message)
            }
        })?
    };
    let persistence = Rc::new(PersistenceClient::select(&window, socket.clone()));

    {
        let resize_state = state.clone();
        let window_cb = window.clone();
        let onresize = Closure::<dyn FnMut()>::new(move || {
            let mut state = resize_state.borrow_mut();
            resize_canvas(&window_cb, &mut state);
        });
        window.add_event_listener_with_callback("resize", onresize.as_ref().unchecked_ref())?;
        onresize.forget();
    }

    {
        let down_state = state.clone();
        let down_canvas = canvas.clone();
        let ondown = Closure::<dyn FnMut(PointerEvent)>::new(move |event: PointerEvent| {
            if event.button() != 0 {
                return;
            }
            event.prevent_default();
            let Some(point) = event_to_point(&down_canvas, &event) else {
                return;
            };
            let mut state = down_state.borrow_mut();
            if matches!(state.mode, DrawMode::Drawing { .. }) {
                return;
            }
            state.mode = DrawMode::Drawing {
                pointer_id: event.pointer_id(),
                gesture: Gesture::start(point),
            };
            let _ = down_canvas.set_pointer_capture(event.pointer_id());
        });
        canvas.add_event_listener_with_callback("pointerdown", ondown.as_ref().unchecked_ref())?;
        ondown.forget();
    }

    {
        let move_state = state.clone();
        let move_canvas = canvas.clone();
        let move_socket = socket.clone();
        let onmove = Closure::<dyn FnMut(PointerEvent)>::new(move |event: PointerEvent| {
            let mut state = move_state.borrow_mut();
            let DrawMode::Drawing {
                pointer_id,
                gesture,
            } = &mut state.mode
            else {
                return;
            };
            if *pointer_id != event.pointer_id() {
                return;
            }
            event.prevent_default();
            let Some(segment) =
                event_to_point(&move_canvas, &event).and_then(|point| gesture.extend(point))
            else {
                return;
            };
            let color = state.color();
            let size = state.size;
            move_socket.send(&ClientMessage::Draw {
                segment,
                color: color.clone(),
                size,
            });
            paint(
                &mut state,
                DrawnSegment {
                    segment,
                    color,
                    size,
                },
            );
        });
        canvas.add_event_listener_with_callback("pointermove", onmove.as_ref().unchecked_ref())?;
        onmove.forget();
    }

    for event_name in ["pointerup", "pointercancel"] {
        let up_state = state.clone();
        let up_canvas = canvas.clone();
        let up_persistence = persistence.clone();
        let window_cb = window.clone();
        let onup = Closure::<dyn FnMut(PointerEvent)>::new(move |event: PointerEvent| {
            let (gesture, style, num_buckets) = {
                let mut state = up_state.borrow_mut();
                match &state.mode {
                    DrawMode::Drawing { pointer_id, .. } if *pointer_id == event.pointer_id() => {}
                    _ => return,
                }
                let DrawMode::Drawing { gesture, .. } =
                    std::mem::replace(&mut state.mode, DrawMode::Idle)
                else {
                    return;
                };
                let style = StrokeStyle {
                    shape: state.shape,
                    color: state.color(),
                    size: state.size,
                };
                (gesture, style, state.num_buckets)
            };
            let _ = up_canvas.release_pointer_capture(event.pointer_id());
            up_persistence.commit(&window_cb, &gesture, style, num_buckets);
        });
        canvas.add_event_listener_with_callback(event_name, onup.as_ref().unchecked_ref())?;
        onup.forget();
    }

    {
        let picker_state = state.clone();
        let picker_document = document.clone();
        let picker_palette = palette_el.clone();
        let picker_shapes = shapes_el.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let Some(action) = picker_action_from_event(&event) else {
                return;
            };
            let mut state = picker_state.borrow_mut();
            match action {
                PickerAction::Color(index) if index < state.palette.len() => {
                    state.palette_selected = index;
                    render_palette(
                        &picker_document,
                        &picker_palette,
                        &state.palette,
                        state.palette_selected,
                    );
                }
                PickerAction::Color(_) => {}
                PickerAction::Shape(shape) => {
                    state.shape = shape;
                    render_shapes(&picker_document, &picker_shapes, shape);
                }
            }
        });
        palette_el.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        shapes_el.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    {
        let size_state = state.clone();
        let size_input_cb = size_input.clone();
        let size_value_cb = size_value.clone();
        let oninput = Closure::<dyn FnMut(Event)>::new(move |_| {
            if let Ok(size) = size_input_cb.value().parse::<f32>() {
                if size.is_finite() {
                    size_state.borrow_mut().size = size.clamp(1.0, 60.0);
                }
            }
            update_size_label(&size_input_cb, &size_value_cb);
        });
        size_input.add_event_listener_with_callback("input", oninput.as_ref().unchecked_ref())?;
        oninput.forget();
    }

    {
        let clear_state = state.clone();
        let clear_socket = socket.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |_| {
            clear(&mut clear_state.borrow_mut());
            clear_socket.send(&ClientMessage::Clear);
        });
        clear_button.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    Ok(())
}
