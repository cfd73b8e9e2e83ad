use std::fmt;
use std::path::PathBuf;

use layers::{Pin, PinId};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// One row of the pins file. At most one row per owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinRecord {
    pub id: PinId,
    pub owner_id: String,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,

    // ms since epoch
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub updated_at: u64,
}

impl PinRecord {
    /// Public view of the row; the owner id stays server-side.
    pub fn to_pin(&self) -> Pin {
        Pin {
            id: self.id.clone(),
            display_name: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
            lat: self.lat,
            lng: self.lng,
            location: self.location.clone(),
            anonymous: self.is_anonymous,
        }
    }
}

/// Fields a caller supplies when placing their pin.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPin {
    pub owner_id: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub location: Option<String>,
    pub is_anonymous: bool,
}

#[derive(Debug)]
pub enum PinStoreError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for PinStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinStoreError::Io(err) => write!(f, "pin store I/O error: {err}"),
            PinStoreError::Parse(err) => write!(f, "pin store corrupt: {err}"),
        }
    }
}

impl std::error::Error for PinStoreError {}

/// JSON-file pin table. Writes go to a temp file and are renamed into place;
/// the async mutex serializes read-modify-write cycles.
pub struct PinStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl PinStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn load_unlocked(&self) -> Result<Vec<PinRecord>, PinStoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(s) => serde_json::from_str(&s).map_err(PinStoreError::Parse),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(PinStoreError::Io(e)),
        }
    }

    async fn save_unlocked(&self, pins: &[PinRecord]) -> Result<(), PinStoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(PinStoreError::Io)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(pins).map_err(PinStoreError::Parse)?;
        tokio::fs::write(&tmp, text)
            .await
            .map_err(PinStoreError::Io)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(PinStoreError::Io)?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<PinRecord>, PinStoreError> {
        let _g = self.lock.lock().await;
        self.load_unlocked().await
    }

    /// Inserts or replaces the caller's pin. A replaced pin keeps its id and
    /// creation time.
    pub async fn upsert(&self, new: NewPin, now_ms: u64) -> Result<PinRecord, PinStoreError> {
        let _g = self.lock.lock().await;
        let mut pins = self.load_unlocked().await?;

        let existing = pins.iter().position(|p| p.owner_id == new.owner_id);
        let (id, created_at) = match existing {
            Some(i) => {
                let old = pins.remove(i);
                (old.id, old.created_at)
            }
            None => (next_id(&pins), now_ms),
        };

        let record = PinRecord {
            id,
            owner_id: new.owner_id,
            username: new.username,
            avatar_url: new.avatar_url,
            lat: new.lat,
            lng: new.lng,
            location: new.location,
            is_anonymous: new.is_anonymous,
            created_at,
            updated_at: now_ms,
        };
        pins.push(record.clone());
        self.save_unlocked(&pins).await?;
        Ok(record)
    }

    pub async fn delete_by_owner(&self, owner_id: &str) -> Result<bool, PinStoreError> {
        let _g = self.lock.lock().await;
        let mut pins = self.load_unlocked().await?;
        let before = pins.len();
        pins.retain(|p| p.owner_id != owner_id);
        let removed = pins.len() != before;
        if removed {
            self.save_unlocked(&pins).await?;
        }
        Ok(removed)
    }
}

// Numeric ids, one past the largest numeric id on file.
fn next_id(pins: &[PinRecord]) -> PinId {
    let max = pins
        .iter()
        .filter_map(|p| p.id.as_str().parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    PinId::new((max + 1).to_string())
}
