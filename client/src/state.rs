use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use doodleboard_shared::{Segment, Shape};

use crate::gesture::{Gesture, DEFAULT_BUCKETS};

pub const DEFAULT_PALETTE: [&str; 6] = [
    "#1f1f1f", "#e4572e", "#f3a712", "#29bf12", "#2e86ab", "#a23b72",
];
pub const DEFAULT_SIZE: f32 = 6.0;

/// A segment already on the canvas, kept so the board can be repainted after a resize.
#[derive(Clone)]
pub struct DrawnSegment {
    pub segment: Segment,
    pub color: String,
    pub size: f32,
}

pub enum DrawMode {
    Idle,
    Drawing { pointer_id: i32, gesture: Gesture },
}

pub struct State {
    pub canvas: HtmlCanvasElement,
    pub ctx: CanvasRenderingContext2d,
    pub board_width: f64,
    pub board_height: f64,
    pub palette: Vec<String>,
    pub palette_selected: usize,
    pub shape: Shape,
    pub size: f32,
    pub num_buckets: i64,
    pub drawn: Vec<DrawnSegment>,
    pub mode: DrawMode,
}

impl State {
    pub fn new(canvas: HtmlCanvasElement, ctx: CanvasRenderingContext2d) -> Self {
        Self {
            canvas,
            ctx,
            board_width: 0.0,
            board_height: 0.0,
            palette: DEFAULT_PALETTE.iter().map(|color| color.to_string()).collect(),
            palette_selected: 0,
            shape: Shape::Freehand,
            size: DEFAULT_SIZE,
            num_buckets: DEFAULT_BUCKETS,
            drawn: Vec::new(),
            mode: DrawMode::Idle,
        }
    }

    pub fn color(&self) -> String {
        self.palette
            .get(self.palette_selected)
            .cloned()
            .unwrap_or_else(|| DEFAULT_PALETTE[0].to_string())
    }
}
