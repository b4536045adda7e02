use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, HtmlCanvasElement, HtmlElement, HtmlInputElement, HtmlSpanElement,
    PointerEvent, Window,
};

use doodleboard_shared::Point;

use crate::render::redraw;
use crate::state::State;

pub fn get_element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    let element = document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("Missing element: {id}")))?;
    element
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("Invalid element type: {id}")))
}

pub fn update_size_label(input: &HtmlInputElement, value: &HtmlSpanElement) {
    value.set_text_content(Some(&input.value()));
}

pub fn set_status(status_el: &Element, status_text: &Element, state: &str, text: &str) {
    let _ = status_el.set_attribute("data-state", state);
    status_text.set_text_content(Some(text));
}

pub fn prepare_canvas(canvas: &HtmlCanvasElement) {
    if let Ok(element) = canvas.clone().dyn_into::<HtmlElement>() {
        let style = element.style();
        let _ = style.set_property("touch-action", "none");
        let _ = style.set_property("cursor", "crosshair");
    }
}

/// Matches the backing store to the CSS size times the device pixel ratio and
/// repaints every segment at the new scale.
pub fn resize_canvas(window: &Window, state: &mut State) {
    let rect = state.canvas.get_bounding_client_rect();
    let dpr = window.device_pixel_ratio();
    state.canvas.set_width((rect.width() * dpr) as u32);
    state.canvas.set_height((rect.height() * dpr) as u32);
    let _ = state.ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);
    state.board_width = rect.width();
    state.board_height = rect.height();
    redraw(state);
}

pub fn event_to_point(canvas: &HtmlCanvasElement, event: &PointerEvent) -> Option<Point> {
    let rect = canvas.get_bounding_client_rect();
    normalize_to_board(
        event.client_x() as f64 - rect.left(),
        event.client_y() as f64 - rect.top(),
        rect.width(),
        rect.height(),
    )
}

pub fn normalize_to_board(x: f64, y: f64, width: f64, height: f64) -> Option<Point> {
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    let point = Point::new((x / width) as f32, (y / height) as f32);
    point.is_finite().then_some(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_offsets_become_board_fractions() {
        assert_eq!(
            normalize_to_board(200.0, 50.0, 400.0, 100.0),
            Some(Point::new(0.5, 0.5))
        );
        assert_eq!(normalize_to_board(1.0, 1.0, 0.0, 100.0), None);
    }
}
