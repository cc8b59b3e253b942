use std::{borrow::Cow, fmt, path::PathBuf};

/// An opaque reference to a storage location a document can be bound to.
pub trait FileHandle: Clone + PartialEq + fmt::Debug {
    /// Full location, e.g. a path or URI.
    fn location(&self) -> Cow<'_, str>;

    /// Human-readable name supplied by the platform, if it has one.
    fn label(&self) -> Option<String> {
        None
    }
}

impl FileHandle for PathBuf {
    fn location(&self) -> Cow<'_, str> {
        self.to_string_lossy()
    }
}

/// Name shown in window titles and toasts.
///
/// Prefers the handle's own label and falls back to the last segment of its
/// location.
pub fn display_name<H: FileHandle>(handle: &H) -> String {
    if let Some(label) = handle.label().filter(|label| !label.trim().is_empty()) {
        return label;
    }

    let location = handle.location();
    base_name(&location).unwrap_or(&location).to_owned()
}

fn base_name(location: &str) -> Option<&str> {
    location
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
}
