use std::fmt::Debug;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use gemini_core::Turn;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{ChatError, ChatResult};

/// Ordered turns of one conversation.
///
/// Serialized as a bare JSON array, the same shape as the request `contents`.
/// Deserializing goes through `from_turns`, so a turn without parts never
/// gets in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Turn>", into = "Vec<Turn>")]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a history, refusing turns without parts
    pub fn from_turns(turns: Vec<Turn>) -> ChatResult<Self> {
        if let Some(index) = turns.iter().position(|turn| turn.parts.is_empty()) {
            return Err(ChatError::InvalidHistory(format!("turn {} has no parts", index)));
        }
        Ok(Self { turns })
    }

    /// Strict parse of the persisted / exported form
    pub fn from_json(bytes: &[u8]) -> ChatResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| ChatError::InvalidHistory(e.to_string()))
    }

    /// Compact form used for persistence
    pub fn to_json(&self) -> ChatResult<Vec<u8>> {
        Ok(serde_json::to_vec(&self.turns)?)
    }

    /// Pretty-printed form used for the export artifact
    pub fn to_json_pretty(&self) -> ChatResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.turns)?)
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }
}

impl TryFrom<Vec<Turn>> for History {
    type Error = ChatError;

    fn try_from(turns: Vec<Turn>) -> ChatResult<Self> {
        Self::from_turns(turns)
    }
}

impl From<History> for Vec<Turn> {
    fn from(history: History) -> Self {
        history.turns
    }
}

/// Durable storage for one conversation's history
pub trait HistoryStore: Send + Sync + Debug {
    /// Reads the persisted history. Absent or malformed state is an empty
    /// history, never an error.
    fn load(&self) -> History;

    /// Replaces the persisted history. Readers see either the old or the new
    /// value, never a mix.
    fn save(&self, history: &History) -> ChatResult<()>;

    /// Resets the persisted history to `[]`
    fn clear(&self) -> ChatResult<()> {
        self.save(&History::new())
    }

    /// Serializes for download as a pretty-printed JSON array
    fn export(&self, history: &History) -> ChatResult<Vec<u8>> {
        history.to_json_pretty()
    }

    /// Exact inverse of `export`; malformed input is an error here
    fn import(&self, bytes: &[u8]) -> ChatResult<History> {
        History::from_json(bytes)
    }
}

/// Type alias for Arc-wrapped HistoryStore trait objects
pub type HistoryStoreRef = Arc<dyn HistoryStore>;

/// History kept in a single JSON file
#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    path: PathBuf,
}

impl FileHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HistoryStore for FileHistoryStore {
    fn load(&self) -> History {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No history file, starting empty");
                return History::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read history, starting empty");
                return History::new();
            }
        };

        match History::from_json(&bytes) {
            Ok(history) => {
                debug!(path = %self.path.display(), turns = history.len(), "Loaded history");
                history
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Malformed history, starting empty");
                History::new()
            }
        }
    }

    fn save(&self, history: &History) -> ChatResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        // Write next to the target, then rename over it
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&history.to_json()?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| ChatError::Storage(format!("Failed to replace {}: {}", self.path.display(), e)))?;

        debug!(path = %self.path.display(), turns = history.len(), "Saved history");
        Ok(())
    }
}

/// History kept in memory, in serialized form so it behaves like a file
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    raw: RwLock<Option<Vec<u8>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with arbitrary persisted bytes
    pub fn with_raw(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            raw: RwLock::new(Some(bytes.into())),
        }
    }

    /// Current persisted bytes, if anything was written
    pub fn raw(&self) -> Option<Vec<u8>> {
        self.raw.read().ok().and_then(|raw| raw.clone())
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn load(&self) -> History {
        let Some(bytes) = self.raw() else {
            return History::new();
        };
        History::from_json(&bytes).unwrap_or_else(|e| {
            warn!(error = %e, "Malformed in-memory history, starting empty");
            History::new()
        })
    }

    fn save(&self, history: &History) -> ChatResult<()> {
        let bytes = history.to_json()?;
        let mut raw = self
            .raw
            .write()
            .map_err(|e| ChatError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        *raw = Some(bytes);
        Ok(())
    }
}
