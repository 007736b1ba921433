//! Fulfillment Ledger
//!
//! Records which paid sessions have already received their report, so a
//! reloaded success page cannot trigger a second delivery. A claim is taken
//! before delivery starts and either completed or released afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use vin_core::{EmailAddress, Vin};

use crate::error::{PaymentError, Result};

/// Ledger key: SHA-256 over session id, VIN and normalized email
///
/// Keeps customer addresses out of the ledger file.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerKey(String);

impl LedgerKey {
    pub fn new(session_id: &str, vin: &Vin, email: &EmailAddress) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(session_id.trim().as_bytes());
        hasher.update([0u8]);
        hasher.update(vin.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(email.normalized().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of one paid session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// Delivery under way
    InFlight,
    /// Report delivered
    Fulfilled,
}

/// A ledger record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub state: EntryState,
    pub claimed_at: DateTime<Utc>,
    pub fulfilled_at: Option<DateTime<Utc>>,
}

/// Outcome of an atomic check-and-set
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Claim {
    /// Caller owns the session and may deliver
    Acquired,
    /// Another request is delivering this session right now
    InFlight,
    /// Report already delivered
    AlreadyFulfilled,
}

/// Fulfillment ledger storage trait
pub trait FulfillmentLedger: Send + Sync {
    /// Atomically claim a session for delivery
    fn claim(&self, key: &LedgerKey) -> Result<Claim>;

    /// Mark a claimed session as delivered
    fn complete(&self, key: &LedgerKey) -> Result<()>;

    /// Drop an in-flight claim after a failed delivery
    fn release(&self, key: &LedgerKey) -> Result<()>;

    /// Look up an entry
    fn get(&self, key: &LedgerKey) -> Result<Option<LedgerEntry>>;
}

fn poisoned<E>(_: E) -> PaymentError {
    PaymentError::Storage("ledger lock poisoned".into())
}

/// In-memory ledger (single process, lost on restart)
pub struct MemoryLedger {
    entries: RwLock<HashMap<LedgerKey, LedgerEntry>>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn with_entries(entries: HashMap<LedgerKey, LedgerEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    fn fulfilled_snapshot(&self) -> Result<HashMap<LedgerKey, LedgerEntry>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries
            .iter()
            .filter(|(_, e)| e.state == EntryState::Fulfilled)
            .map(|(k, e)| (k.clone(), e.clone()))
            .collect())
    }
}

impl FulfillmentLedger for MemoryLedger {
    fn claim(&self, key: &LedgerKey) -> Result<Claim> {
        let mut entries = self.entries.write().map_err(poisoned)?;

        match entries.get(key).map(|e| e.state) {
            Some(EntryState::Fulfilled) => Ok(Claim::AlreadyFulfilled),
            Some(EntryState::InFlight) => Ok(Claim::InFlight),
            None => {
                entries.insert(
                    key.clone(),
                    LedgerEntry {
                        state: EntryState::InFlight,
                        claimed_at: Utc::now(),
                        fulfilled_at: None,
                    },
                );
                Ok(Claim::Acquired)
            }
        }
    }

    fn complete(&self, key: &LedgerKey) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        let now = Utc::now();
        let entry = entries.entry(key.clone()).or_insert_with(|| LedgerEntry {
            state: EntryState::InFlight,
            claimed_at: now,
            fulfilled_at: None,
        });
        entry.state = EntryState::Fulfilled;
        entry.fulfilled_at = Some(now);
        Ok(())
    }

    fn release(&self, key: &LedgerKey) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        if entries.get(key).is_some_and(|e| e.state == EntryState::InFlight) {
            entries.remove(key);
        }
        Ok(())
    }

    fn get(&self, key: &LedgerKey) -> Result<Option<LedgerEntry>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }
}

/// Ledger persisted as a JSON snapshot of fulfilled sessions
///
/// In-flight claims stay in memory only; after a crash mid-delivery the
/// customer can retry.
pub struct FileLedger {
    path: PathBuf,
    inner: MemoryLedger,
    write_lock: Mutex<()>,
}

impl FileLedger {
    /// Open a ledger file, creating an empty ledger (and its directory) if
    /// it does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        fs::create_dir_all(Self::dir_of(&path))
            .map_err(|e| PaymentError::Storage(format!("create {}: {e}", path.display())))?;
        let entries: HashMap<LedgerKey, LedgerEntry> = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|e| PaymentError::Storage(format!("read {}: {e}", path.display())))?;
            if raw.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&raw)
                    .map_err(|e| PaymentError::Storage(format!("parse {}: {e}", path.display())))?
            }
        } else {
            HashMap::new()
        };

        tracing::info!(
            path = %path.display(),
            fulfilled = entries.len(),
            "Opened fulfillment ledger"
        );

        Ok(Self {
            path,
            inner: MemoryLedger::with_entries(entries),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir_of(path: &Path) -> &Path {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Write the fulfilled snapshot: temp file in the same directory, fsync,
    /// then rename over the ledger
    fn persist(&self) -> Result<()> {
        let _guard = self.write_lock.lock().map_err(poisoned)?;
        let snapshot = self.inner.fulfilled_snapshot()?;
        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| PaymentError::Storage(e.to_string()))?;

        let dir = Self::dir_of(&self.path);
        let temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
            PaymentError::Storage(format!("create temp file in {}: {e}", dir.display()))
        })?;

        let mut file = temp.as_file();
        file.write_all(&json)
            .and_then(|()| file.sync_all())
            .map_err(|e| PaymentError::Storage(format!("write {}: {e}", temp.path().display())))?;

        temp.persist(&self.path).map_err(|e| {
            PaymentError::Storage(format!("rename to {}: {}", self.path.display(), e.error))
        })?;
        Ok(())
    }
}

impl FulfillmentLedger for FileLedger {
    fn claim(&self, key: &LedgerKey) -> Result<Claim> {
        self.inner.claim(key)
    }

    fn complete(&self, key: &LedgerKey) -> Result<()> {
        self.inner.complete(key)?;
        self.persist()
    }

    fn release(&self, key: &LedgerKey) -> Result<()> {
        self.inner.release(key)
    }

    fn get(&self, key: &LedgerKey) -> Result<Option<LedgerEntry>> {
        self.inner.get(key)
    }
}
