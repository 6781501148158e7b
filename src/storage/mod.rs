//! # Storage Module - Contact and Message Preferences
//!
//! Persists the trusted contact list and the alert message as entries in a
//! small key-value preferences file:
//!
//! ```text
//! data/
//! └── prefs.json   ← { "contacts_list": "<json list>", "custom_message": "<text>" }
//! ```
//!
//! `contacts_list` holds the JSON encoding of an ordered `[{name, number}]`
//! list; `custom_message` is the alert text as-is.
//!
//! Reads never fail: a missing file, a missing key or a corrupt value loads
//! as an empty contact list / the default message. Every write replaces the
//! whole file under an exclusive lock (temp file + rename), so a reader sees
//! either the old or the new preferences.
//!
//! Values are read from disk on every call and never cached, so edits made
//! while the recurring alert is running apply to its next cycle.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use helpsathi::storage::ContactStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = ContactStore::new("./data").await?;
//!     store.add_contact("Mum", "+44 20 7946 0000").await?;
//!     store.save_message("I need help").await?;
//!     for contact in store.load_contacts().await {
//!         println!("{} <{}>", contact.name, contact.number);
//!     }
//!     Ok(())
//! }
//! ```

use anyhow::{anyhow, Result};
use fs2::FileExt;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::validation::{validate_contact, ContactError};

pub const PREFS_FILE: &str = "prefs.json";
pub const KEY_CONTACTS: &str = "contacts_list";
pub const KEY_CUSTOM_MESSAGE: &str = "custom_message";
pub const DEFAULT_ALERT_MESSAGE: &str = "Emergency, please check on me.";

/// A trusted contact. Insertion order is display order; duplicates are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub number: String,
}

impl Contact {
    pub fn new(name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            number: number.into(),
        }
    }
}

type Prefs = BTreeMap<String, String>;

/// File-backed store for contacts and the alert message.
#[derive(Debug, Clone)]
pub struct ContactStore {
    data_dir: PathBuf,
}

impl ContactStore {
    /// Open the store, creating the data directory if needed.
    pub async fn new(data_dir: &str) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .await
            .map_err(|e| anyhow!("Failed to create data directory {}: {}", data_dir, e))?;
        Ok(Self {
            data_dir: PathBuf::from(data_dir),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn prefs_path(&self) -> PathBuf {
        self.data_dir.join(PREFS_FILE)
    }

    /// Load the persisted contact list. Absent or unparseable data yields an empty list.
    pub async fn load_contacts(&self) -> Vec<Contact> {
        let prefs = self.read_prefs().await;
        match prefs.get(KEY_CONTACTS) {
            Some(raw) => match serde_json::from_str::<Vec<Contact>>(raw) {
                Ok(list) => list,
                Err(e) => {
                    warn!("Stored contact list is corrupt ({}); treating as empty", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        }
    }

    /// Replace the persisted contact list.
    pub async fn save_contacts(&self, contacts: &[Contact]) -> Result<()> {
        let encoded = serde_json::to_string(contacts)
            .map_err(|e| anyhow!("Failed to serialize contacts: {}", e))?;
        self.put(KEY_CONTACTS, encoded).await
    }

    /// Load the alert message, falling back to [`DEFAULT_ALERT_MESSAGE`].
    pub async fn load_message(&self) -> String {
        self.read_prefs()
            .await
            .remove(KEY_CUSTOM_MESSAGE)
            .unwrap_or_else(|| DEFAULT_ALERT_MESSAGE.to_string())
    }

    /// Overwrite the alert message.
    pub async fn save_message(&self, message: &str) -> Result<()> {
        self.put(KEY_CUSTOM_MESSAGE, message.to_string()).await
    }

    /// Validate, append and persist a new contact.
    pub async fn add_contact(&self, name: &str, number: &str) -> Result<Contact> {
        let (name, number) = validate_contact(name, number)?;
        let contact = Contact::new(name, number);
        let mut contacts = self.load_contacts().await;
        contacts.push(contact.clone());
        self.save_contacts(&contacts).await?;
        debug!("Contact added; {} stored", contacts.len());
        Ok(contact)
    }

    /// Remove the contact at `index` (display position, zero based) and persist.
    pub async fn remove_contact(&self, index: usize) -> Result<Contact> {
        let mut contacts = self.load_contacts().await;
        if index >= contacts.len() {
            return Err(ContactError::NoSuchContact { index }.into());
        }
        let removed = contacts.remove(index);
        self.save_contacts(&contacts).await?;
        debug!("Contact removed; {} stored", contacts.len());
        Ok(removed)
    }

    async fn read_prefs(&self) -> Prefs {
        let path = self.prefs_path();
        match fs::read_to_string(&path).await {
            Ok(data) => parse_prefs(&data).unwrap_or_else(|e| {
                warn!("Preferences file {} is corrupt ({}); ignoring it", path.display(), e);
                Prefs::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Prefs::new(),
            Err(e) => {
                warn!("Failed reading preferences {}: {}", path.display(), e);
                Prefs::new()
            }
        }
    }

    /// Set one key, keeping every other entry. The read-modify-write runs
    /// under an exclusive lock on a sidecar lock file.
    async fn put(&self, key: &str, value: String) -> Result<()> {
        let path = self.prefs_path();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || put_locked(&path, &key, value))
            .await
            .map_err(|e| anyhow!("Preferences write task failed: {}", e))?
    }
}

fn parse_prefs(data: &str) -> serde_json::Result<Prefs> {
    // Guard against any accidental leading NULs
    let cleaned = data.trim_start_matches('\0');
    if cleaned.trim().is_empty() {
        return Ok(Prefs::new());
    }
    serde_json::from_str(cleaned)
}

fn put_locked(path: &Path, key: &str, value: String) -> Result<()> {
    use std::fs::{self, File, OpenOptions};
    use std::io::Write;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(PREFS_FILE);

    let lock_file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(dir.join(format!(".{}.lock", base)))?;
    lock_file.lock_exclusive()?;

    let mut prefs = match fs::read_to_string(path) {
        Ok(data) => parse_prefs(&data).unwrap_or_else(|e| {
            warn!("Overwriting corrupt preferences {}: {}", path.display(), e);
            Prefs::new()
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Prefs::new(),
        Err(e) => return Err(anyhow!("Failed reading preferences {}: {}", path.display(), e)),
    };
    prefs.insert(key.to_string(), value);
    let content = serde_json::to_string_pretty(&prefs)?;

    let mut counter = 0u32;
    let staged = loop {
        let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut tmp) => {
                let staged = StagedFile::new(candidate);
                tmp.write_all(content.as_bytes())
                    .and_then(|_| tmp.flush())
                    .map_err(|e| anyhow!("Failed to write temp file for atomic write: {}", e))?;
                let _ = tmp.sync_all();
                break staged;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
                continue;
            }
            Err(e) => return Err(anyhow!("Failed to create temp file for atomic write: {}", e)),
        }
    };

    fs::rename(staged.path(), path)?;
    staged.keep();
    // Persist the rename (best-effort)
    if let Ok(dir_file) = File::open(dir) {
        let _ = dir_file.sync_all();
    }

    drop(lock_file);
    Ok(())
}

/// Temp file that is deleted on drop unless [`StagedFile::keep`] is called.
struct StagedFile {
    path: PathBuf,
    armed: bool,
}

impl StagedFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// The file has been renamed into place; nothing to clean up.
    fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!("Failed to remove temp file {}: {}", self.path.display(), e);
            }
        }
    }
}
