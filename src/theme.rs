//! Light/dark display mode persisted in a client-local key/value store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::bindings::{classes, ViewBindings};
use crate::dom::Document;
use crate::error::Result;

/// Storage key of the theme flag.
pub const THEME_KEY: &str = "theme";
/// Stored value meaning dark mode. Absence means light mode.
pub const DARK_VALUE: &str = "dark-mode";

// ---------------------------------------------------------------------------
// Key/value storage
// ---------------------------------------------------------------------------

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Process-local store; nothing survives the session.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// JSON object file, rewritten on every change.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(FileStore { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Theme
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Read the persisted theme. Anything but the dark value is light.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.get(THEME_KEY).as_deref() {
            Some(DARK_VALUE) => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Reflect the theme on the body class and the sun/moon icons.
    pub fn apply(self, doc: &mut Document, view: &ViewBindings) {
        match self {
            Theme::Dark => {
                doc.add_class(view.body, classes::DARK_MODE);
                doc.add_class(view.sun_icon, classes::HIDDEN);
                doc.remove_class(view.moon_icon, classes::HIDDEN);
            }
            Theme::Light => {
                doc.remove_class(view.body, classes::DARK_MODE);
                doc.remove_class(view.sun_icon, classes::HIDDEN);
                doc.add_class(view.moon_icon, classes::HIDDEN);
            }
        }
    }

    /// Write the flag, or clear it for light mode.
    pub fn persist(self, store: &mut dyn KeyValueStore) -> Result<()> {
        debug!(theme = ?self, "persisting theme");
        match self {
            Theme::Dark => store.set(THEME_KEY, DARK_VALUE),
            Theme::Light => store.remove(THEME_KEY),
        }
    }
}
