use std::path::PathBuf;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use doodleboard_shared::{
    decode_board_document, encode_board_document, BoardDocument, DocumentDecodeError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("board {0} not found")]
    NotFound(String),
    #[error("i/o error for board {board_id}: {source}")]
    Io {
        board_id: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode board {board_id}: {source}")]
    Decode {
        board_id: String,
        #[source]
        source: DocumentDecodeError,
    },
    #[error("failed to encode board {board_id}: {source}")]
    Encode {
        board_id: String,
        #[source]
        source: bincode::error::EncodeError,
    },
    #[error("s3 request for board {board_id} failed: {message}")]
    Remote { board_id: String, message: String },
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn load_board(&self, board_id: &str) -> Result<BoardDocument, StorageError>;
    async fn save_board(&self, board_id: &str, data: &BoardDocument) -> Result<(), StorageError>;
    fn describe(&self) -> String;
}

pub struct FileStorage {
    document_dir: PathBuf,
}

impl FileStorage {
    pub async fn new(document_dir: PathBuf) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(&document_dir).await?;
        Ok(Self { document_dir })
    }

    fn path(&self, board_id: &str) -> PathBuf {
        self.document_dir.join(format!("{board_id}.bin"))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn load_board(&self, board_id: &str) -> Result<BoardDocument, StorageError> {
        let payload = match tokio::fs::read(self.path(board_id)).await {
            Ok(payload) => payload,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(board_id.to_string()));
            }
            Err(source) => {
                return Err(StorageError::Io {
                    board_id: board_id.to_string(),
                    source,
                });
            }
        };
        decode_data(board_id, &payload)
    }

    async fn save_board(&self, board_id: &str, data: &BoardDocument) -> Result<(), StorageError> {
        let payload = encode_data(board_id, data)?;
        // Write then rename so a crash mid-save never leaves a truncated document.
        let path = self.path(board_id);
        let tmp = path.with_extension("bin.tmp");
        let io_error = |source| StorageError::Io {
            board_id: board_id.to_string(),
            source,
        };
        tokio::fs::write(&tmp, payload).await.map_err(io_error)?;
        tokio::fs::rename(&tmp, &path).await.map_err(io_error)
    }

    fn describe(&self) -> String {
        format!("directory {}", self.document_dir.display())
    }
}

fn encode_data(board_id: &str, data: &BoardDocument) -> Result<Vec<u8>, StorageError> {
    encode_board_document(data).map_err(|source| StorageError::Encode {
        board_id: board_id.to_string(),
        source,
    })
}

fn decode_data(board_id: &str, payload: &[u8]) -> Result<BoardDocument, StorageError> {
    decode_board_document(payload).map_err(|source| StorageError::Decode {
        board_id: board_id.to_string(),
        source,
    })
}

#[derive(Clone, Debug)]
pub struct S3StorageConfig {
    pub bucket: String,
    pub prefix: Option<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl S3StorageConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: None,
            region: None,
            endpoint_url: None,
            force_path_style: false,
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

pub struct S3Storage {
    bucket: String,
    prefix: String,
    client: Client,
}

impl S3Storage {
    pub async fn new(config: S3StorageConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let (Some(access_key_id), Some(secret_access_key)) = (
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
        ) {
            let creds = Credentials::new(access_key_id, secret_access_key, None, None, "static");
            loader = loader.credentials_provider(creds);
        }
        if let Some(region) = config.region.clone() {
            loader = loader.region(aws_config::Region::new(region));
        }
        let shared = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint_url) = config.endpoint_url.as_ref() {
            builder = builder.endpoint_url(endpoint_url);
        }
        if config.force_path_style {
            builder = builder.force_path_style(true);
        }
        let client = Client::from_conf(builder.build());
        Self {
            bucket: config.bucket,
            prefix: normalize_prefix(config.prefix),
            client,
        }
    }

    fn object_key(&self, board_id: &str) -> String {
        object_key(&self.prefix, board_id)
    }
}

fn normalize_prefix(prefix: Option<String>) -> String {
    prefix.unwrap_or_default().trim_matches('/').to_string()
}

fn object_key(prefix: &str, board_id: &str) -> String {
    if prefix.is_empty() {
        format!("{board_id}.bin")
    } else {
        format!("{prefix}/{board_id}.bin")
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn load_board(&self, board_id: &str) -> Result<BoardDocument, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.object_key(board_id))
            .send()
            .await;
        let output = match response {
            Ok(output) => output,
            Err(error) => {
                if let Some(service_error) = error.as_service_error() {
                    if service_error.is_no_such_key() {
                        return Err(StorageError::NotFound(board_id.to_string()));
                    }
                }
                return Err(StorageError::Remote {
                    board_id: board_id.to_string(),
                    message: format!("{error:?}"),
                });
            }
        };
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|error| StorageError::Remote {
                board_id: board_id.to_string(),
                message: format!("{error:?}"),
            })?
            .into_bytes();
        decode_data(board_id, &bytes)
    }

    async fn save_board(&self, board_id: &str, data: &BoardDocument) -> Result<(), StorageError> {
        let payload = encode_data(board_id, data)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.object_key(board_id))
            .body(ByteStream::from(payload))
            .send()
            .await
            .map_err(|error| StorageError::Remote {
                board_id: board_id.to_string(),
                message: format!("{error:?}"),
            })?;
        Ok(())
    }

    fn describe(&self) -> String {
        if self.prefix.is_empty() {
            format!("s3://{}", self.bucket)
        } else {
            format!("s3://{}/{}", self.bucket, self.prefix)
        }
    }
}
