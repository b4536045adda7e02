use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use doodleboard_shared::{BoardDocument, ServerMessage};
use tokio::sync::{mpsc, Mutex, RwLock};
use uuid::Uuid;

use crate::storage::Storage;

pub const MAX_STROKES: usize = 2000;
pub const MAX_SAMPLES_PER_STROKE: usize = 16384;

#[derive(Clone)]
pub struct AppState {
    pub boards: Arc<RwLock<HashMap<String, Arc<RwLock<Board>>>>>,
    pub storage: Arc<dyn Storage>,
    pub save_interval: Duration,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, save_interval: Duration) -> Self {
        Self {
            boards: Arc::new(RwLock::new(HashMap::new())),
            storage,
            save_interval,
        }
    }
}

pub struct Board {
    pub peers: HashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
    pub document: BoardDocument,
    pub dirty: bool,
    /// Held across snapshot and write so saves of one board land in order.
    pub save_lock: Arc<Mutex<()>>,
}

impl Board {
    pub fn new(document: BoardDocument) -> Self {
        Self {
            peers: HashMap::new(),
            document,
            dirty: false,
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn peer_count(&self) -> u32 {
        self.peers.len() as u32
    }
}
