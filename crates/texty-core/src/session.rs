//! The document session: one window's binding to a backing file and its
//! clean/dirty lifecycle.
//!
//! The session performs no I/O itself. User commands and completion events
//! go in, and a list of [`Effect`]s comes out for the host to carry out:
//! show a prompt, start a load or save, update the title, show a toast or
//! close the window. Results of those effects are fed back through the
//! `*_chosen`, `*_answered` and `*_finished` methods. At most one operation
//! is pending at a time, and commands issued meanwhile are refused with
//! [`SessionError::Busy`].

use std::io;

use log::{debug, info, warn};

use crate::{DEFAULT_TITLE, FileHandle, SessionError, display_name};

/// The user action a confirmation or chained save was started on behalf of.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    New,
    Open,
    Close,
}

/// Answer to the unsaved-changes prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Choice {
    Cancel,
    Discard,
    Save,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    CleanUntitled,
    CleanTitled,
    DirtyUntitled,
    DirtyTitled,
}

/// Work the host must perform on behalf of the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect<H> {
    /// Ask cancel / discard / save about unsaved changes to `name`.
    Confirm { name: String },
    ChooseOpenFile,
    ChooseSaveFile { suggested_name: Option<String> },
    Load(H),
    Save { target: H, text: String },
    SetTitle(String),
    Toast(String),
    /// The window may close now.
    Close,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Pending<H> {
    Confirming(Intent),
    ChoosingOpen,
    ChoosingDestination {
        then: Option<Intent>,
    },
    Loading(H),
    Saving {
        target: H,
        generation: u64,
        then: Option<Intent>,
    },
}

type Effects<H> = Vec<Effect<H>>;

#[derive(Debug)]
pub struct DocumentSession<H> {
    text: String,
    backing_file: Option<H>,
    dirty: bool,
    generation: u64,
    pending: Option<Pending<H>>,
}

impl<H> Default for DocumentSession<H> {
    fn default() -> Self {
        Self {
            text: String::new(),
            backing_file: None,
            dirty: false,
            generation: 0,
            pending: None,
        }
    }
}

impl<H: FileHandle> DocumentSession<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Buffer for the editing widget. Call [`Self::note_edited`] whenever the
    /// widget reports a change.
    pub const fn text_mut(&mut self) -> &mut String {
        &mut self.text
    }

    pub const fn note_edited(&mut self) {
        self.dirty = true;
        self.generation = self.generation.wrapping_add(1);
    }

    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub const fn backing_file(&self) -> Option<&H> {
        self.backing_file.as_ref()
    }

    pub const fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// True while a load is in flight; the buffer is about to be replaced.
    pub const fn is_loading(&self) -> bool {
        matches!(self.pending, Some(Pending::Loading(_)))
    }

    /// True while the unsaved-changes prompt should be on screen.
    pub const fn is_confirming(&self) -> bool {
        matches!(self.pending, Some(Pending::Confirming(_)))
    }

    pub const fn state(&self) -> SessionState {
        match (self.dirty, self.backing_file.is_some()) {
            (false, false) => SessionState::CleanUntitled,
            (false, true) => SessionState::CleanTitled,
            (true, false) => SessionState::DirtyUntitled,
            (true, true) => SessionState::DirtyTitled,
        }
    }

    pub fn title(&self) -> String {
        self.backing_file
            .as_ref()
            .map_or_else(|| DEFAULT_TITLE.to_owned(), display_name)
    }

    pub fn new_document(&mut self) -> Result<Effects<H>, SessionError> {
        self.ensure_idle("new")?;
        if self.dirty {
            return Ok(self.confirm(Intent::New));
        }
        Ok(self.reset())
    }

    pub fn open(&mut self) -> Result<Effects<H>, SessionError> {
        self.ensure_idle("open")?;
        if self.dirty {
            return Ok(self.confirm(Intent::Open));
        }
        Ok(self.choose_open())
    }

    /// Opens `handle` directly, e.g. a path given on the command line.
    /// Refused when it would overwrite unsaved changes.
    pub fn open_file(&mut self, handle: H) -> Result<Effects<H>, SessionError> {
        self.ensure_idle("open file")?;
        if self.dirty {
            return Err(SessionError::UnsavedChanges);
        }
        self.pending = Some(Pending::Loading(handle.clone()));
        Ok(vec![Effect::Load(handle)])
    }

    pub fn save(&mut self) -> Result<Effects<H>, SessionError> {
        self.ensure_idle("save")?;
        if !self.dirty {
            debug!("save skipped: nothing changed");
            return Ok(Vec::new());
        }
        Ok(self.begin_save(None))
    }

    pub fn save_as(&mut self) -> Result<Effects<H>, SessionError> {
        self.ensure_idle("save as")?;
        Ok(self.choose_destination(None))
    }

    /// The window asked to close. Returns [`Effect::Close`] when it may.
    pub fn close(&mut self) -> Result<Effects<H>, SessionError> {
        self.ensure_idle("close")?;
        if self.dirty {
            return Ok(self.confirm(Intent::Close));
        }
        Ok(vec![Effect::Close])
    }

    pub fn confirmation_answered(&mut self, choice: Choice) -> Effects<H> {
        let Some(Pending::Confirming(intent)) = self.pending else {
            warn!("ignoring {choice:?}: no confirmation is pending");
            return Vec::new();
        };
        self.pending = None;
        debug!("confirmation for {intent:?} answered with {choice:?}");

        match choice {
            Choice::Cancel => Vec::new(),
            Choice::Discard => {
                let mut effects = self.reset();
                if intent != Intent::New {
                    effects.extend(self.proceed(intent));
                }
                effects
            }
            Choice::Save => self.begin_save(Some(intent)),
        }
    }

    /// Result of the open-file chooser; `None` means it was dismissed.
    pub fn open_chosen(&mut self, chosen: Option<H>) -> Effects<H> {
        if self.pending != Some(Pending::ChoosingOpen) {
            warn!("ignoring open chooser result: no chooser is pending");
            return Vec::new();
        }

        match chosen {
            Some(handle) => {
                self.pending = Some(Pending::Loading(handle.clone()));
                vec![Effect::Load(handle)]
            }
            None => {
                self.pending = None;
                Vec::new()
            }
        }
    }

    /// Result of the save-file chooser; `None` means it was dismissed.
    pub fn destination_chosen(&mut self, chosen: Option<H>) -> Effects<H> {
        let Some(Pending::ChoosingDestination { then }) = self.pending else {
            warn!("ignoring save chooser result: no chooser is pending");
            return Vec::new();
        };

        match chosen {
            Some(handle) => self.write_to(handle, then),
            None => {
                if let Some(intent) = then {
                    debug!("{intent:?} abandoned: save destination not chosen");
                }
                self.pending = None;
                Vec::new()
            }
        }
    }

    pub fn load_finished(&mut self, handle: &H, result: io::Result<Vec<u8>>) -> Effects<H> {
        if !matches!(&self.pending, Some(Pending::Loading(target)) if target == handle) {
            warn!("ignoring stray load completion for {}", handle.location());
            return Vec::new();
        }
        self.pending = None;

        let name = display_name(handle);
        let bytes = match result {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("unable to open {}: {err}", handle.location());
                return vec![Effect::Toast(format!("Unable to open “{name}”: {err}"))];
            }
        };
        let Ok(text) = String::from_utf8(bytes) else {
            warn!("unable to open {}: not valid UTF-8", handle.location());
            return vec![Effect::Toast(format!(
                "Unable to open “{name}”: file is not valid UTF-8 text"
            ))];
        };

        info!("opened {} ({} bytes)", handle.location(), text.len());
        self.text = text;
        self.backing_file = Some(handle.clone());
        self.dirty = false;
        self.generation = self.generation.wrapping_add(1);
        vec![Effect::SetTitle(name)]
    }

    pub fn save_finished(&mut self, handle: &H, result: io::Result<u64>) -> Effects<H> {
        let (generation, then) = match &self.pending {
            Some(Pending::Saving {
                target,
                generation,
                then,
            }) if target == handle => (*generation, *then),
            _ => {
                warn!("ignoring stray save completion for {}", handle.location());
                return Vec::new();
            }
        };
        self.pending = None;

        let name = display_name(handle);
        match result {
            Ok(len) => {
                info!("saved {} ({len} bytes)", handle.location());
                self.backing_file = Some(handle.clone());
                if generation == self.generation {
                    self.dirty = false;
                } else {
                    debug!("buffer changed while saving; keeping it dirty");
                }

                let mut effects = vec![
                    Effect::SetTitle(name.clone()),
                    Effect::Toast(format!("Saved “{name}”")),
                ];
                if let Some(intent) = then {
                    if self.dirty {
                        effects.extend(self.confirm(intent));
                    } else {
                        effects.extend(self.proceed(intent));
                    }
                }
                effects
            }
            Err(err) => {
                warn!("unable to save {}: {err}", handle.location());
                vec![Effect::Toast(format!("Unable to save “{name}”: {err}"))]
            }
        }
    }

    fn ensure_idle(&self, command: &str) -> Result<(), SessionError> {
        match &self.pending {
            Some(pending) => {
                debug!("{command} refused while {pending:?} is pending");
                Err(SessionError::Busy)
            }
            None => Ok(()),
        }
    }

    fn confirm(&mut self, intent: Intent) -> Effects<H> {
        self.pending = Some(Pending::Confirming(intent));
        vec![Effect::Confirm { name: self.title() }]
    }

    fn reset(&mut self) -> Effects<H> {
        self.text.clear();
        self.backing_file = None;
        self.dirty = false;
        self.generation = self.generation.wrapping_add(1);
        vec![Effect::SetTitle(DEFAULT_TITLE.to_owned())]
    }

    /// Continue `intent` once the buffer holds nothing worth keeping.
    fn proceed(&mut self, intent: Intent) -> Effects<H> {
        match intent {
            Intent::New => self.reset(),
            Intent::Open => self.choose_open(),
            Intent::Close => vec![Effect::Close],
        }
    }

    fn choose_open(&mut self) -> Effects<H> {
        self.pending = Some(Pending::ChoosingOpen);
        vec![Effect::ChooseOpenFile]
    }

    fn begin_save(&mut self, then: Option<Intent>) -> Effects<H> {
        match self.backing_file.clone() {
            Some(handle) => self.write_to(handle, then),
            None => self.choose_destination(then),
        }
    }

    fn choose_destination(&mut self, then: Option<Intent>) -> Effects<H> {
        self.pending = Some(Pending::ChoosingDestination { then });
        vec![Effect::ChooseSaveFile {
            suggested_name: self.backing_file.as_ref().map(display_name),
        }]
    }

    fn write_to(&mut self, target: H, then: Option<Intent>) -> Effects<H> {
        self.pending = Some(Pending::Saving {
            target: target.clone(),
            generation: self.generation,
            then,
        });
        vec![Effect::Save {
            target,
            text: self.text.clone(),
        }]
    }
}
