use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

mod document;
mod resample;

pub use document::{
    decode_board_document, encode_board_document, BoardDocument, DocumentDecodeError,
    StoredStroke, DOCUMENT_FILE_MAGIC, DOCUMENT_FILE_VERSION,
};
pub use resample::{
    reduce_data_points_with_spread, regroup_points, spread_gap, target_len, ResampleConfig,
    ResampleError, MAX_BUCKETS,
};

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One drawn line piece, from the previous pointer position to the current one.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
}

impl Segment {
    pub fn new(from: Point, to: Point) -> Self {
        Self { from, to }
    }

    pub fn is_finite(self) -> bool {
        self.from.is_finite() && self.to.is_finite()
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    #[default]
    Freehand,
    Line,
    Rectangle,
    Ellipse,
    Triangle,
}

impl Shape {
    pub const ALL: [Shape; 5] = [
        Shape::Freehand,
        Shape::Line,
        Shape::Rectangle,
        Shape::Ellipse,
        Shape::Triangle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Shape::Freehand => "freehand",
            Shape::Line => "line",
            Shape::Rectangle => "rectangle",
            Shape::Ellipse => "ellipse",
            Shape::Triangle => "triangle",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|shape| shape.as_str() == value)
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "draw")]
    Draw {
        segment: Segment,
        color: String,
        size: f32,
    },
    #[serde(rename = "clear")]
    Clear,
    #[serde(rename = "commit")]
    Commit {
        shape: Shape,
        color: String,
        size: f32,
        num_buckets: i64,
        gap: i64,
        samples: Vec<f32>,
    },
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "welcome")]
    Welcome { peers: u32 },
    #[serde(rename = "draw")]
    Draw {
        segment: Segment,
        color: String,
        size: f32,
    },
    #[serde(rename = "clear")]
    Clear,
    #[serde(rename = "peers")]
    Peers { count: u32 },
    #[serde(rename = "stored")]
    Stored { id: String, shape: Shape },
}
