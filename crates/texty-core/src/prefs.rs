//! User preferences: a small key/value store scoped under [`APP_ID`].

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, warn};

use crate::{APP_ID, PreferencesError, disk};

pub const FONT_SIZE: &str = "font-size";
pub const TEXT_WRAP: &str = "text-wrap";
pub const WINDOW_WIDTH: &str = "window-width";
pub const WINDOW_HEIGHT: &str = "window-height";

pub const DEFAULT_FONT_SIZE: u32 = 22;
pub const MIN_FONT_SIZE: u32 = 8;
pub const MAX_FONT_SIZE: u32 = 96;

/// Backend holding typed values by key.
pub trait PreferenceStore {
    fn get_int(&self, key: &str) -> Option<i64>;
    fn set_int(&mut self, key: &str, value: i64);
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn set_bool(&mut self, key: &str, value: bool);

    /// Persist pending changes.
    fn flush(&mut self) -> Result<(), PreferencesError>;
}

/// Preferences kept in memory only; used when there is no config directory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    ints: BTreeMap<String, i64>,
    bools: BTreeMap<String, bool>,
}

impl PreferenceStore for MemoryStore {
    fn get_int(&self, key: &str) -> Option<i64> {
        self.ints.get(key).copied()
    }

    fn set_int(&mut self, key: &str, value: i64) {
        self.ints.insert(key.to_owned(), value);
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.bools.get(key).copied()
    }

    fn set_bool(&mut self, key: &str, value: bool) {
        self.bools.insert(key.to_owned(), value);
    }

    fn flush(&mut self) -> Result<(), PreferencesError> {
        Ok(())
    }
}

/// Preferences stored as a TOML file, with our keys in the `[APP_ID]` table.
/// Other top-level entries in the file are preserved.
#[derive(Debug)]
pub struct TomlStore {
    path: PathBuf,
    values: toml::Table,
    others: toml::Table,
    changed: bool,
}

impl TomlStore {
    /// `$XDG_CONFIG_HOME/texty/preferences.toml` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("texty").join("preferences.toml"))
    }

    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: PathBuf) -> Result<Self, PreferencesError> {
        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(source) => return Err(PreferencesError::Read { path, source }),
        };
        let mut others = match source.parse::<toml::Table>() {
            Ok(table) => table,
            Err(source) => return Err(PreferencesError::Parse { path, source }),
        };

        let values = match others.remove(APP_ID) {
            Some(toml::Value::Table(values)) => values,
            Some(other) => {
                warn!("{}: `{APP_ID}` is a {}, not a table", path.display(), other.type_str());
                toml::Table::new()
            }
            None => toml::Table::new(),
        };

        Ok(Self {
            path,
            values,
            others,
            changed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn set(&mut self, key: &str, value: toml::Value) {
        if self.values.get(key) != Some(&value) {
            self.values.insert(key.to_owned(), value);
            self.changed = true;
        }
    }
}

impl PreferenceStore for TomlStore {
    fn get_int(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(toml::Value::as_integer)
    }

    fn set_int(&mut self, key: &str, value: i64) {
        self.set(key, toml::Value::Integer(value));
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(toml::Value::as_bool)
    }

    fn set_bool(&mut self, key: &str, value: bool) {
        self.set(key, toml::Value::Boolean(value));
    }

    fn flush(&mut self) -> Result<(), PreferencesError> {
        if !self.changed {
            return Ok(());
        }

        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| PreferencesError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let mut document = self.others.clone();
        document.insert(APP_ID.to_owned(), toml::Value::Table(self.values.clone()));
        disk::atomic_write(&self.path, document.to_string().as_bytes()).map_err(|source| {
            PreferencesError::Write {
                path: self.path.clone(),
                source,
            }
        })?;

        debug!("wrote preferences to {}", self.path.display());
        self.changed = false;
        Ok(())
    }
}

/// Typed access to the settings the editor uses. One instance is shared by
/// every window of the application.
pub struct Preferences {
    store: Box<dyn PreferenceStore>,
}

impl Preferences {
    pub fn new(store: impl PreferenceStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Loads the on-disk store, falling back to memory if it is unusable.
    pub fn load() -> Self {
        let Some(path) = TomlStore::default_path() else {
            warn!("no config directory; preferences will not be saved");
            return Self::new(MemoryStore::default());
        };

        match TomlStore::open(path) {
            Ok(store) => {
                debug!("preferences loaded from {}", store.path().display());
                Self::new(store)
            }
            Err(err) => {
                warn!("{err}; using default preferences");
                Self::new(MemoryStore::default())
            }
        }
    }

    pub fn font_size(&self) -> u32 {
        self.store
            .get_int(FONT_SIZE)
            .and_then(|size| u32::try_from(size).ok())
            .map_or(DEFAULT_FONT_SIZE, |size| {
                size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
            })
    }

    pub fn set_font_size(&mut self, size: u32) {
        let size = size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        self.store.set_int(FONT_SIZE, i64::from(size));
        self.flush();
    }

    pub fn text_wrap(&self) -> bool {
        self.store.get_bool(TEXT_WRAP).unwrap_or(false)
    }

    pub fn set_text_wrap(&mut self, wrap: bool) {
        self.store.set_bool(TEXT_WRAP, wrap);
        self.flush();
    }

    /// Saved window size, if both dimensions were recorded.
    pub fn window_size(&self) -> Option<(u32, u32)> {
        let dimension = |key| {
            self.store
                .get_int(key)
                .and_then(|value| u32::try_from(value).ok())
                .filter(|&value| value > 0)
        };
        Some((dimension(WINDOW_WIDTH)?, dimension(WINDOW_HEIGHT)?))
    }

    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.store.set_int(WINDOW_WIDTH, i64::from(width));
        self.store.set_int(WINDOW_HEIGHT, i64::from(height));
        self.flush();
    }

    fn flush(&mut self) {
        if let Err(err) = self.store.flush() {
            warn!("{err}");
        }
    }
}
