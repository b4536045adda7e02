use std::sync::Arc;

use doodleboard_shared::{
    BoardDocument, ClientMessage, ResampleConfig, Segment, ServerMessage, Shape, StoredStroke,
    MAX_BUCKETS,
};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::state::{Board, MAX_SAMPLES_PER_STROKE, MAX_STROKES};

const DEFAULT_COLOR: &str = "#1f1f1f";
const DEFAULT_SIZE: f32 = 6.0;

#[derive(Debug, Error, PartialEq)]
pub enum CommitError {
    #[error("stroke has no samples")]
    Empty,
    #[error("stroke has {0} samples, more than allowed")]
    TooLarge(usize),
    #[error("sample count {0} is not a whole number of points")]
    OddLength(usize),
    #[error("stroke contains non-finite coordinates")]
    NonFinite,
    #[error(transparent)]
    Resample(#[from] doodleboard_shared::ResampleError),
}

/// A completed stroke before it is assigned an id.
pub struct StrokeCommit {
    pub shape: Shape,
    pub color: String,
    pub size: f32,
    pub num_buckets: i64,
    pub gap: i64,
    pub samples: Vec<f32>,
}

/// Returns the messages to broadcast and whether the sender should receive them too.
pub fn apply_client_message(
    board: &mut Board,
    sender: Uuid,
    message: ClientMessage,
) -> Option<(Vec<ServerMessage>, bool)> {
    match message {
        ClientMessage::Draw {
            segment,
            color,
            size,
        } => {
            if !segment.is_finite() {
                return None;
            }
            Some((
                vec![ServerMessage::Draw {
                    segment,
                    color: sanitize_color(color),
                    size: sanitize_size(size),
                }],
                false,
            ))
        }
        ClientMessage::Clear => Some((vec![ServerMessage::Clear], false)),
        ClientMessage::Commit {
            shape,
            color,
            size,
            num_buckets,
            gap,
            samples,
        } => {
            let commit = StrokeCommit {
                shape,
                color,
                size,
                num_buckets,
                gap,
                samples,
            };
            match store_commit(board, commit) {
                Ok(stroke) => {
                    let ack = ServerMessage::Stored {
                        id: stroke.id,
                        shape: stroke.shape,
                    };
                    if let Some(tx) = board.peers.get(&sender) {
                        let _ = tx.send(ack);
                    }
                }
                Err(error) => debug!(%sender, %error, "rejected stroke commit"),
            }
            None
        }
    }
}

/// Resamples raw segments with a validated config and stores the result.
pub fn store_segments(
    board: &mut Board,
    shape: Shape,
    color: String,
    size: f32,
    segments: &[Segment],
    config: ResampleConfig,
) -> Result<StoredStroke, CommitError> {
    if segments.iter().any(|segment| !segment.is_finite()) {
        return Err(CommitError::NonFinite);
    }
    let samples = config.apply(segments)?;
    store_commit(
        board,
        StrokeCommit {
            shape,
            color,
            size,
            num_buckets: config.num_buckets,
            gap: config.gap,
            samples,
        },
    )
}

pub fn store_commit(board: &mut Board, commit: StrokeCommit) -> Result<StoredStroke, CommitError> {
    let stroke = sanitize_commit(commit)?;
    board.document.strokes.push(stroke.clone());
    let overflow = board.document.strokes.len().saturating_sub(MAX_STROKES);
    if overflow > 0 {
        board.document.strokes.drain(0..overflow);
    }
    board.dirty = true;
    Ok(stroke)
}

pub fn sanitize_commit(commit: StrokeCommit) -> Result<StoredStroke, CommitError> {
    ResampleConfig {
        start_index: 0,
        gap: commit.gap,
        num_buckets: commit.num_buckets,
    }
    .validate()?;
    let len = commit.samples.len();
    if len == 0 {
        return Err(CommitError::Empty);
    }
    if len > MAX_SAMPLES_PER_STROKE {
        return Err(CommitError::TooLarge(len));
    }
    if len % 2 != 0 {
        return Err(CommitError::OddLength(len));
    }
    if commit.samples.iter().any(|value| !value.is_finite()) {
        return Err(CommitError::NonFinite);
    }
    Ok(StoredStroke {
        id: Uuid::now_v7().to_string(),
        shape: commit.shape,
        color: sanitize_color(commit.color),
        size: sanitize_size(commit.size),
        num_buckets: commit.num_buckets,
        gap: commit.gap,
        samples: commit.samples,
    })
}

/// Drops stored strokes that would no longer pass validation.
pub fn sanitize_document(document: BoardDocument) -> BoardDocument {
    let strokes = document
        .strokes
        .into_iter()
        .filter(|stroke| {
            stroke.num_buckets >= 1
                && stroke.num_buckets <= MAX_BUCKETS
                && !stroke.samples.is_empty()
                && stroke.samples.len() % 2 == 0
                && stroke.samples.iter().all(|value| value.is_finite())
        })
        .collect::<Vec<_>>();
    let overflow = strokes.len().saturating_sub(MAX_STROKES);
    BoardDocument {
        strokes: strokes.into_iter().skip(overflow).collect(),
    }
}

pub async fn broadcast_except(board: &Arc<RwLock<Board>>, sender: Uuid, message: ServerMessage) {
    let mut stale = Vec::new();
    {
        let board = board.read().await;
        for (id, tx) in board.peers.iter() {
            if *id == sender {
                continue;
            }
            if tx.send(message.clone()).is_err() {
                stale.push(*id);
            }
        }
    }

    if !stale.is_empty() {
        let mut board = board.write().await;
        for id in stale {
            board.peers.remove(&id);
        }
    }
}

pub async fn broadcast_all(board: &Arc<RwLock<Board>>, message: ServerMessage) {
    let mut stale = Vec::new();
    {
        let board = board.read().await;
        for (id, tx) in board.peers.iter() {
            if tx.send(message.clone()).is_err() {
                stale.push(*id);
            }
        }
    }

    if !stale.is_empty() {
        let mut board = board.write().await;
        for id in stale {
            board.peers.remove(&id);
        }
    }
}

fn sanitize_color(mut color: String) -> String {
    if color.is_empty() {
        return DEFAULT_COLOR.to_string();
    }
    if color.len() > 32 {
        let mut end = 32;
        while !color.is_char_boundary(end) {
            end -= 1;
        }
        color.truncate(end);
    }
    color
}

fn sanitize_size(size: f32) -> f32 {
    let size = if size.is_finite() { size } else { DEFAULT_SIZE };
    size.clamp(1.0, 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doodleboard_shared::{Point, ResampleError};
    use tokio::sync::mpsc;

    fn segment(x: f32) -> Segment {
        Segment::new(Point::new(x, 0.0), Point::new(x + 1.0, 1.0))
    }

    fn commit(samples: Vec<f32>) -> ClientMessage {
        ClientMessage::Commit {
            shape: Shape::Ellipse,
            color: String::new(),
            size: 200.0,
            num_buckets: 2,
            gap: 1,
            samples,
        }
    }

    #[test]
    fn draw_is_relayed_to_others_with_sanitized_style() {
        let mut board = Board::new(BoardDocument::default());
        let result = apply_client_message(
            &mut board,
            Uuid::new_v4(),
            ClientMessage::Draw {
                segment: segment(0.0),
                color: String::new(),
                size: f32::NAN,
            },
        );
        let (messages, include_sender) = result.unwrap();
        assert!(!include_sender);
        assert_eq!(
            messages,
            vec![ServerMessage::Draw {
                segment: segment(0.0),
                color: DEFAULT_COLOR.into(),
                size: DEFAULT_SIZE,
            }]
        );
        assert!(!board.dirty);
    }

    #[test]
    fn non_finite_draw_is_dropped() {
        let mut board = Board::new(BoardDocument::default());
        let bad = Segment::new(Point::new(f32::INFINITY, 0.0), Point::new(0.0, 0.0));
        assert!(apply_client_message(
            &mut board,
            Uuid::new_v4(),
            ClientMessage::Draw {
                segment: bad,
                color: "#000".into(),
                size: 2.0,
            },
        )
        .is_none());
    }

    #[test]
    fn commit_is_stored_and_acknowledged_to_sender_only() {
        let mut board = Board::new(BoardDocument::default());
        let sender = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();
        board.peers.insert(sender, tx);

        let result = apply_client_message(&mut board, sender, commit(vec![0.0, 0.0, 1.0, 1.0]));
        assert!(result.is_none());
        assert!(board.dirty);
        let stored = &board.document.strokes[0];
        assert_eq!(stored.color, DEFAULT_COLOR);
        assert_eq!(stored.size, 60.0);
        assert_eq!(stored.shape, Shape::Ellipse);
        match rx.try_recv().unwrap() {
            ServerMessage::Stored { id, shape } => {
                assert_eq!(id, stored.id);
                assert_eq!(shape, Shape::Ellipse);
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn malformed_commits_are_rejected() {
        let shape = Shape::Line;
        let make = |samples: Vec<f32>, num_buckets: i64| StrokeCommit {
            shape,
            color: "#000".into(),
            size: 2.0,
            num_buckets,
            gap: 1,
            samples,
        };
        assert_eq!(sanitize_commit(make(vec![], 2)).unwrap_err(), CommitError::Empty);
        assert_eq!(
            sanitize_commit(make(vec![0.0, 1.0, 2.0], 2)).unwrap_err(),
            CommitError::OddLength(3)
        );
        assert_eq!(
            sanitize_commit(make(vec![0.0, f32::NAN], 2)).unwrap_err(),
            CommitError::NonFinite
        );
        assert!(matches!(
            sanitize_commit(make(vec![0.0, 0.0], 0)).unwrap_err(),
            CommitError::Resample(ResampleError::DegenerateConfig { .. })
        ));
        assert_eq!(
            sanitize_commit(make(vec![0.0; MAX_SAMPLES_PER_STROKE + 2], 2)).unwrap_err(),
            CommitError::TooLarge(MAX_SAMPLES_PER_STROKE + 2)
        );
    }

    #[test]
    fn segments_are_resampled_before_storing() {
        let mut board = Board::new(BoardDocument::default());
        let segments = vec![segment(0.0), segment(2.0)];
        let config = ResampleConfig {
            start_index: 0,
            gap: 1,
            num_buckets: 3,
        };
        let stored = store_segments(
            &mut board,
            Shape::Triangle,
            "#abcdef".into(),
            4.0,
            &segments,
            config,
        )
        .unwrap();
        assert_eq!(stored.samples, vec![0.0, 0.0, 1.0, 1.0, 2.0, 0.0, 3.0, 1.0]);
        assert_eq!(stored.num_buckets, 3);
        assert_eq!(board.document.strokes.len(), 1);

        assert_eq!(
            store_segments(&mut board, Shape::Line, "#000".into(), 1.0, &[], config)
                .unwrap_err(),
            CommitError::Resample(ResampleError::InvalidInput)
        );
    }

    #[test]
    fn oldest_strokes_are_dropped_past_the_limit() {
        let mut board = Board::new(BoardDocument::default());
        for _ in 0..MAX_STROKES + 3 {
            store_commit(
                &mut board,
                StrokeCommit {
                    shape: Shape::Freehand,
                    color: "#000".into(),
                    size: 1.0,
                    num_buckets: 1,
                    gap: 1,
                    samples: vec![0.0, 0.0, 0.0, 0.0],
                },
            )
            .unwrap();
        }
        assert_eq!(board.document.strokes.len(), MAX_STROKES);
    }

    #[test]
    fn long_colors_are_truncated_on_char_boundaries() {
        let color = "é".repeat(40);
        let sanitized = sanitize_color(color);
        assert!(sanitized.len() <= 32);
        assert_eq!(sanitized.chars().count(), 16);
    }

    #[tokio::test]
    async fn broadcast_skips_sender_and_prunes_closed_peers() {
        let board = Arc::new(RwLock::new(Board::new(BoardDocument::default())));
        let sender = Uuid::new_v4();
        let listener = Uuid::new_v4();
        let gone = Uuid::new_v4();
        let (sender_tx, mut sender_rx) = mpsc::unbounded_channel();
        let (listener_tx, mut listener_rx) = mpsc::unbounded_channel();
        let (gone_tx, gone_rx) = mpsc::unbounded_channel();
        drop(gone_rx);
        {
            let mut board = board.write().await;
            board.peers.insert(sender, sender_tx);
            board.peers.insert(listener, listener_tx);
            board.peers.insert(gone, gone_tx);
        }

        broadcast_except(&board, sender, ServerMessage::Clear).await;
        assert_eq!(listener_rx.try_recv().unwrap(), ServerMessage::Clear);
        assert!(sender_rx.try_recv().is_err());
        assert_eq!(board.read().await.peers.len(), 2);

        broadcast_all(&board, ServerMessage::Peers { count: 2 }).await;
        assert_eq!(
            sender_rx.try_recv().unwrap(),
            ServerMessage::Peers { count: 2 }
        );
    }

    #[test]
    fn invalid_stored_strokes_are_dropped_on_load() {
        let good = StoredStroke {
            id: "a".into(),
            shape: Shape::Line,
            color: "#000".into(),
            size: 1.0,
            num_buckets: 1,
            gap: 1,
            samples: vec![0.0, 0.0, 1.0, 1.0],
        };
        let bad = StoredStroke {
            samples: vec![1.0],
            ..good.clone()
        };
        let document = sanitize_document(BoardDocument {
            strokes: vec![bad, good.clone()],
        });
        assert_eq!(document.strokes, vec![good]);
    }
}
