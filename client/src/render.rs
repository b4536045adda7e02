use web_sys::CanvasRenderingContext2d;

use doodleboard_shared::{Point, Segment};

use crate::state::{DrawnSegment, State};

/// Board coordinates are fractions of the canvas size, so drawn strokes follow
/// the canvas when it is resized.
pub fn to_screen(board_width: f64, board_height: f64, point: Point) -> (f64, f64) {
    (point.x as f64 * board_width, point.y as f64 * board_height)
}

pub fn draw_segment(
    ctx: &CanvasRenderingContext2d,
    board_width: f64,
    board_height: f64,
    segment: Segment,
    color: &str,
    size: f32,
) {
    let (from_x, from_y) = to_screen(board_width, board_height, segment.from);
    let (to_x, to_y) = to_screen(board_width, board_height, segment.to);

    ctx.set_stroke_style_str(color);
    ctx.set_line_width(size as f64);
    ctx.set_line_cap("round");
    ctx.begin_path();
    ctx.move_to(from_x, from_y);
    ctx.line_to(to_x, to_y);
    ctx.stroke();
}

/// Draws a segment and remembers it for later repaints.
pub fn paint(state: &mut State, drawn: DrawnSegment) {
    draw_segment(
        &state.ctx,
        state.board_width,
        state.board_height,
        drawn.segment,
        &drawn.color,
        drawn.size,
    );
    state.drawn.push(drawn);
}

pub fn clear(state: &mut State) {
    state.drawn.clear();
    state
        .ctx
        .clear_rect(0.0, 0.0, state.board_width, state.board_height);
}

pub fn redraw(state: &State) {
    state
        .ctx
        .clear_rect(0.0, 0.0, state.board_width, state.board_height);
    for drawn in &state.drawn {
        draw_segment(
            &state.ctx,
            state.board_width,
            state.board_height,
            drawn.segment,
            &drawn.color,
            drawn.size,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn board_points_scale_with_canvas_size() {
        let (x, y) = to_screen(800.0, 600.0, Point::new(0.5, 0.25));
        assert_relative_eq!(x, 400.0);
        assert_relative_eq!(y, 150.0);
        let (x, y) = to_screen(400.0, 300.0, Point::new(0.5, 0.25));
        assert_relative_eq!(x, 200.0);
        assert_relative_eq!(y, 75.0);
    }
}
