use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Shape;

pub const DOCUMENT_FILE_MAGIC: [u8; 4] = *b"DBRD";
pub const DOCUMENT_FILE_VERSION: u32 = 1;
const DOCUMENT_HEADER_LEN: usize = DOCUMENT_FILE_MAGIC.len() + std::mem::size_of::<u32>();

/// A completed gesture as it is persisted: the resampled coordinates plus the
/// parameters they were produced with.
#[derive(Clone, Debug, PartialEq, Encode, Decode, Serialize, Deserialize)]
pub struct StoredStroke {
    pub id: String,
    pub shape: Shape,
    pub color: String,
    pub size: f32,
    pub num_buckets: i64,
    pub gap: i64,
    pub samples: Vec<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Encode, Decode, Serialize, Deserialize)]
pub struct BoardDocument {
    pub strokes: Vec<StoredStroke>,
}

#[derive(Debug, Error)]
pub enum DocumentDecodeError {
    #[error("unsupported board document version {0}")]
    UnsupportedVersion(u32),
    #[error("invalid board document")]
    InvalidData,
}

pub fn encode_board_document(data: &BoardDocument) -> Result<Vec<u8>, bincode::error::EncodeError> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&DOCUMENT_FILE_MAGIC);
    payload.extend_from_slice(&DOCUMENT_FILE_VERSION.to_le_bytes());
    let body = bincode::encode_to_vec(data, bincode::config::standard())?;
    payload.extend_from_slice(&body);
    Ok(payload)
}

pub fn decode_board_document(payload: &[u8]) -> Result<BoardDocument, DocumentDecodeError> {
    if !(payload.len() >= DOCUMENT_HEADER_LEN && payload.starts_with(&DOCUMENT_FILE_MAGIC)) {
        return Err(DocumentDecodeError::InvalidData);
    }
    let version = u32::from_le_bytes(
        payload[DOCUMENT_FILE_MAGIC.len()..DOCUMENT_HEADER_LEN]
            .try_into()
            .map_err(|_| DocumentDecodeError::InvalidData)?,
    );
    let body = &payload[DOCUMENT_HEADER_LEN..];
    match version {
        1 => bincode::decode_from_slice(body, bincode::config::standard())
            .map(|(data, _)| data)
            .map_err(|_| DocumentDecodeError::InvalidData),
        _ => Err(DocumentDecodeError::UnsupportedVersion(version)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> BoardDocument {
        BoardDocument {
            strokes: vec![StoredStroke {
                id: "0190-test".into(),
                shape: Shape::Rectangle,
                color: "#3366ff".into(),
                size: 4.0,
                num_buckets: 2,
                gap: 1,
                samples: vec![0.0, 0.0, 1.0, 1.0],
            }],
        }
    }

    #[test]
    fn encoded_document_carries_header_and_decodes() {
        let document = sample_document();
        let payload = encode_board_document(&document).unwrap();
        assert!(payload.starts_with(b"DBRD"));
        assert_eq!(&payload[4..8], &1u32.to_le_bytes());
        assert_eq!(decode_board_document(&payload).unwrap(), document);
    }

    #[test]
    fn rejects_foreign_payloads() {
        assert!(matches!(
            decode_board_document(b"{\"strokes\":[]}"),
            Err(DocumentDecodeError::InvalidData)
        ));
        assert!(matches!(
            decode_board_document(b"DBRD"),
            Err(DocumentDecodeError::InvalidData)
        ));
    }

    #[test]
    fn rejects_future_versions() {
        let mut payload = encode_board_document(&sample_document()).unwrap();
        payload[4..8].copy_from_slice(&7u32.to_le_bytes());
        assert!(matches!(
            decode_board_document(&payload),
            Err(DocumentDecodeError::UnsupportedVersion(7))
        ));
    }
}
