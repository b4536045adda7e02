use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event, HtmlButtonElement, HtmlElement};

use doodleboard_shared::Shape;

pub enum PickerAction {
    Color(usize),
    Shape(Shape),
}

fn create_button(document: &Document) -> Option<HtmlButtonElement> {
    document
        .create_element("button")
        .ok()?
        .dyn_into::<HtmlButtonElement>()
        .ok()
}

pub fn render_palette(
    document: &Document,
    palette_el: &HtmlElement,
    colors: &[String],
    selected: usize,
) {
    palette_el.set_inner_html("");
    for (index, color) in colors.iter().enumerate() {
        let Some(button) = create_button(document) else {
            continue;
        };
        let _ = button.set_attribute("type", "button");
        let _ = button.set_attribute("data-index", &index.to_string());
        let _ = button.set_attribute("aria-label", &format!("Use color {color}"));
        let _ = button.set_attribute(
            "aria-pressed",
            if index == selected { "true" } else { "false" },
        );
        let class_name = if index == selected {
            "swatch active"
        } else {
            "swatch"
        };
        let _ = button.set_attribute("class", class_name);
        let _ = button.style().set_property("background", color);
        let _ = palette_el.append_child(&button);
    }
}

pub fn render_shapes(document: &Document, shapes_el: &HtmlElement, selected: Shape) {
    shapes_el.set_inner_html("");
    for shape in Shape::ALL {
        let Some(button) = create_button(document) else {
            continue;
        };
        let name = shape.as_str();
        let _ = button.set_attribute("type", "button");
        let _ = button.set_attribute("data-shape", name);
        let _ = button.set_attribute("aria-label", &format!("Tag strokes as {name}"));
        let _ = button.set_attribute(
            "aria-pressed",
            if shape == selected { "true" } else { "false" },
        );
        let _ = button.set_attribute("class", "shape");
        button.set_text_content(Some(name));
        let _ = shapes_el.append_child(&button);
    }
}

pub fn picker_action_from_event(event: &Event) -> Option<PickerAction> {
    let mut current = event
        .target()
        .and_then(|target| target.dyn_into::<Element>().ok());
    while let Some(element) = current {
        if let Some(name) = element.get_attribute("data-shape") {
            return Shape::parse(&name).map(PickerAction::Shape);
        }
        if let Some(index) = element.get_attribute("data-index") {
            return index.parse::<usize>().ok().map(PickerAction::Color);
        }
        current = element.parent_element();
    }
    None
}
