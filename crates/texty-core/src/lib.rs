#![forbid(unsafe_code)]

//! Toolkit-free document logic for `texty`: the document session state
//! machine, file persistence and user preferences.

pub mod disk;
pub mod error;
pub mod handle;
pub mod prefs;
pub mod session;

pub use error::{PreferencesError, SessionError};
pub use handle::{FileHandle, display_name};
pub use prefs::{MemoryStore, PreferenceStore, Preferences, TomlStore};
pub use session::{Choice, DocumentSession, Effect, Intent, SessionState};

/// Application identifier; preference keys are scoped under it.
pub const APP_ID: &str = "ca.footeware.rs.texty";

/// Window title used while no file is bound to a session.
pub const DEFAULT_TITLE: &str = "Texty";
