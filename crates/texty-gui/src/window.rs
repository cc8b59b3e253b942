use std::{borrow::Cow, collections::VecDeque, path::PathBuf};

use eframe::egui;
use log::info;
use texty_core::{
    DEFAULT_TITLE, DocumentSession, Effect, Preferences, SessionError,
    prefs::{MAX_FONT_SIZE, MIN_FONT_SIZE},
};

use crate::{
    io_worker::{Completion, IoWorker},
    prompt,
    toast::Toasts,
};

const FONT_SIZE_STEP: u32 = 2;
const CLOSE_BLOCKED: &str = "Another window has unsaved changes";

type Session = DocumentSession<PathBuf>;
type Effects = Vec<Effect<PathBuf>>;

/// What a window asks of the application after a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct WindowRequests {
    pub(crate) new_window: bool,
    pub(crate) quit: bool,
}

impl WindowRequests {
    pub(crate) const fn merge(&mut self, other: Self) {
        self.new_window |= other.new_window;
        self.quit |= other.quit;
    }
}

/// User actions collected from shortcuts and buttons during one frame.
#[derive(Clone, Copy, Debug, Default)]
struct Actions {
    new: bool,
    open: bool,
    save: bool,
    save_as: bool,
    toggle_wrap: bool,
    font_bigger: bool,
    font_smaller: bool,
    about: bool,
    new_window: bool,
    quit: bool,
}

impl Actions {
    fn from_shortcuts(ctx: &egui::Context) -> Self {
        ctx.input(|i| {
            let cmd = i.modifiers.command;
            let shift = i.modifiers.shift;
            Self {
                new: cmd && !shift && i.key_pressed(egui::Key::N),
                open: cmd && i.key_pressed(egui::Key::O),
                save: cmd && !shift && i.key_pressed(egui::Key::S),
                save_as: cmd && shift && i.key_pressed(egui::Key::S),
                toggle_wrap: cmd && shift && i.key_pressed(egui::Key::W),
                font_bigger: cmd
                    && (i.key_pressed(egui::Key::Equals) || i.key_pressed(egui::Key::Plus)),
                font_smaller: cmd && i.key_pressed(egui::Key::Minus),
                about: false,
                new_window: cmd && shift && i.key_pressed(egui::Key::N),
                quit: cmd && i.key_pressed(egui::Key::Q),
            }
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CloseState {
    Open,
    /// The session agreed to close; the app may still refuse.
    Approved,
    Closing,
}

/// One editor window: a document session, its background I/O and widgets.
pub(crate) struct EditorWindow {
    viewport: egui::ViewportId,
    builder: egui::ViewportBuilder,
    session: Session,
    io: IoWorker,
    toasts: Toasts,
    title: String,
    title_sent: bool,
    confirming: Option<String>,
    close_state: CloseState,
    show_about: bool,
}

impl EditorWindow {
    pub(crate) fn new(
        ctx: &egui::Context,
        viewport: egui::ViewportId,
        builder: egui::ViewportBuilder,
        launch_path: Option<PathBuf>,
    ) -> Self {
        let mut window = Self {
            viewport,
            builder,
            session: Session::new(),
            io: IoWorker::new(ctx.clone()),
            toasts: Toasts::default(),
            title: DEFAULT_TITLE.to_owned(),
            title_sent: false,
            confirming: None,
            close_state: CloseState::Open,
            show_about: false,
        };
        if let Some(path) = launch_path {
            window.run(|session| session.open_file(path));
        }
        window
    }

    pub(crate) const fn viewport_id(&self) -> egui::ViewportId {
        self.viewport
    }

    /// The viewport as it was opened, titled for the current document. Only
    /// the title changes from frame to frame.
    pub(crate) fn viewport_builder(&self) -> egui::ViewportBuilder {
        self.builder.clone().with_title(self.title.clone())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.close_state == CloseState::Closing
    }

    /// Closing this window now could lose work.
    pub(crate) const fn holds_unsaved_work(&self) -> bool {
        self.session.is_dirty() || self.session.is_busy()
    }

    /// Draws one frame. `close_blocked` refuses close requests, including one
    /// the session already approved. It is set for the main window while
    /// other windows hold unsaved work.
    pub(crate) fn show(
        &mut self,
        ctx: &egui::Context,
        prefs: &mut Preferences,
        close_blocked: bool,
    ) -> WindowRequests {
        self.drain_io();

        if ctx.input(|i| i.viewport().close_requested()) && self.close_state == CloseState::Open {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            if close_blocked {
                self.toasts.push(CLOSE_BLOCKED);
            } else {
                self.run(Session::close);
            }
        }

        let modal = self.confirming.is_some();
        let mut actions = if modal {
            Actions::default()
        } else {
            Actions::from_shortcuts(ctx)
        };

        let font_size = prefs.font_size();
        let wrap = prefs.text_wrap();

        egui::TopBottomPanel::top(self.id("header")).show(ctx, |ui| {
            ui.add_enabled_ui(!modal, |ui| {
                Self::show_header(ui, &mut actions, font_size, wrap);
            });
        });

        egui::TopBottomPanel::bottom(self.id("status")).show(ctx, |ui| {
            self.show_status(ui, font_size, wrap);
        });

        let editable = !modal && !self.session.is_loading();
        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_editor(ui, egui::FontId::monospace(font_size as f32), wrap, editable);
        });

        let requests = self.dispatch(actions, prefs);

        if let Some(name) = self.confirming.clone()
            && let Some(choice) = prompt::confirm_unsaved(ctx, self.id("confirm"), &name)
        {
            self.confirming = None;
            let effects = self.session.confirmation_answered(choice);
            self.apply(effects);
        }

        // Other windows stay editable while this one confirms or saves.
        if self.close_state == CloseState::Approved {
            if close_blocked {
                self.close_state = CloseState::Open;
                self.toasts.push(CLOSE_BLOCKED);
            } else {
                self.finish_close(ctx, prefs);
            }
        }

        let (about_id, toasts_id) = (self.id("about"), self.id("toasts"));
        prompt::about(ctx, about_id, &mut self.show_about);
        self.toasts.show(ctx, toasts_id);

        if !self.title_sent {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(self.title.clone()));
            self.title_sent = true;
        }

        requests
    }

    fn id(&self, name: &'static str) -> egui::Id {
        egui::Id::new((name, self.viewport))
    }

    fn show_header(ui: &mut egui::Ui, actions: &mut Actions, font_size: u32, wrap: bool) {
        ui.horizontal(|ui| {
            actions.new |= ui.button("New").on_hover_text("Ctrl+N").clicked();
            actions.open |= ui.button("Open").on_hover_text("Ctrl+O").clicked();
            actions.save |= ui.button("Save").on_hover_text("Ctrl+S").clicked();
            actions.save_as |= ui
                .button("Save As")
                .on_hover_text("Ctrl+Shift+S")
                .clicked();

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.menu_button("Menu", |ui| {
                    let mut wrap = wrap;
                    actions.toggle_wrap |= ui.checkbox(&mut wrap, "Wrap Text").changed();

                    ui.horizontal(|ui| {
                        ui.label(format!("Font Size {font_size}"));
                        actions.font_smaller |= ui
                            .add_enabled(font_size > MIN_FONT_SIZE, egui::Button::new("−"))
                            .clicked();
                        actions.font_bigger |= ui
                            .add_enabled(font_size < MAX_FONT_SIZE, egui::Button::new("+"))
                            .clicked();
                    });

                    ui.separator();
                    actions.new_window |= ui.button("New Window").clicked();
                    actions.about |= ui.button("About Texty").clicked();
                    actions.quit |= ui.button("Quit").clicked();
                });
            });
        });
    }

    fn show_status(&self, ui: &mut egui::Ui, font_size: u32, wrap: bool) {
        ui.horizontal(|ui| {
            ui.label(self.location_label());

            if self.session.is_dirty() {
                ui.separator();
                ui.colored_label(ui.visuals().warn_fg_color, "Modified");
            }
            if self.session.is_loading() {
                ui.separator();
                ui.spinner();
                ui.label("Loading…");
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(if wrap { "Wrap" } else { "No Wrap" });
                ui.separator();
                ui.label(format!("{font_size} pt"));
            });
        });
    }

    fn show_editor(&mut self, ui: &mut egui::Ui, font: egui::FontId, wrap: bool, editable: bool) {
        let size = ui.available_size();
        let mut layouter = |ui: &egui::Ui, buffer: &dyn egui::TextBuffer, wrap_width: f32| {
            let job = egui::text::LayoutJob::simple(
                buffer.as_str().to_owned(),
                font.clone(),
                ui.visuals().text_color(),
                if wrap { wrap_width } else { f32::INFINITY },
            );
            ui.painter().layout_job(job)
        };

        let editor_id = self.id("editor");
        let changed = egui::ScrollArea::new([!wrap, true])
            .id_salt(self.id("editor-scroll"))
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                let editor = egui::TextEdit::multiline(self.session.text_mut())
                    .id(editor_id)
                    .font(font.clone())
                    .frame(false)
                    .interactive(editable)
                    .desired_width(size.x)
                    .min_size(size)
                    .layouter(&mut layouter);
                ui.add(editor).changed()
            })
            .inner;

        if changed {
            self.session.note_edited();
        }
    }

    fn location_label(&self) -> Cow<'_, str> {
        self.session
            .backing_file()
            .map_or_else(|| Cow::Borrowed("Unsaved"), |path| path.to_string_lossy())
    }

    fn dispatch(&mut self, actions: Actions, prefs: &mut Preferences) -> WindowRequests {
        if actions.new {
            self.run(Session::new_document);
        }
        if actions.open {
            self.run(Session::open);
        }
        if actions.save_as {
            self.run(Session::save_as);
        } else if actions.save {
            self.run(Session::save);
        }

        if actions.toggle_wrap {
            prefs.set_text_wrap(!prefs.text_wrap());
        }
        if actions.font_bigger {
            prefs.set_font_size(prefs.font_size().saturating_add(FONT_SIZE_STEP));
        }
        if actions.font_smaller {
            prefs.set_font_size(prefs.font_size().saturating_sub(FONT_SIZE_STEP));
        }
        if actions.about {
            self.show_about = true;
        }

        WindowRequests {
            new_window: actions.new_window,
            quit: actions.quit,
        }
    }

    fn run(&mut self, command: impl FnOnce(&mut Session) -> Result<Effects, SessionError>) {
        match command(&mut self.session) {
            Ok(effects) => self.apply(effects),
            Err(err) => self.toasts.push(format!("Not now: {err}")),
        }
    }

    fn drain_io(&mut self) {
        for completion in self.io.poll() {
            let effects = match completion {
                Completion::Loaded { path, result } => self.session.load_finished(&path, result),
                Completion::Saved { path, result } => self.session.save_finished(&path, result),
            };
            self.apply(effects);
        }
    }

    fn apply(&mut self, effects: Effects) {
        let mut queue = VecDeque::from(effects);
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Confirm { name } => self.confirming = Some(name),
                Effect::ChooseOpenFile => {
                    let chosen = prompt::choose_open_file();
                    queue.extend(self.session.open_chosen(chosen));
                }
                Effect::ChooseSaveFile { suggested_name } => {
                    let chosen = prompt::choose_save_file(suggested_name.as_deref());
                    queue.extend(self.session.destination_chosen(chosen));
                }
                Effect::Load(path) => self.io.load(path),
                Effect::Save { target, text } => self.io.save(target, text),
                Effect::SetTitle(title) => {
                    self.title = title;
                    self.title_sent = false;
                }
                Effect::Toast(message) => self.toasts.push(message),
                Effect::Close => self.close_state = CloseState::Approved,
            }
        }
    }

    fn finish_close(&mut self, ctx: &egui::Context, prefs: &mut Preferences) {
        if let Some(rect) = ctx.input(|i| i.viewport().inner_rect) {
            prefs.set_window_size(rect.width().round() as u32, rect.height().round() as u32);
        }
        info!("closing window “{}”", self.title);
        self.close_state = CloseState::Closing;
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        time::{Duration, Instant},
    };

    use texty_core::{Choice, MemoryStore, SessionState};

    use super::*;

    fn open_window(ctx: &egui::Context, launch_path: Option<PathBuf>) -> EditorWindow {
        EditorWindow::new(
            ctx,
            egui::ViewportId::ROOT,
            egui::ViewportBuilder::default(),
            launch_path,
        )
    }

    fn dirty_window(ctx: &egui::Context) -> EditorWindow {
        let mut window = open_window(ctx, None);
        window.session.text_mut().push_str("draft");
        window.session.note_edited();
        window
    }

    fn close_request() -> egui::RawInput {
        let mut input = egui::RawInput::default();
        input
            .viewports
            .entry(egui::ViewportId::ROOT)
            .or_default()
            .events
            .push(egui::ViewportEvent::Close);
        input
    }

    fn key_press(key: egui::Key) -> egui::RawInput {
        egui::RawInput {
            events: vec![egui::Event::Key {
                key,
                physical_key: None,
                pressed: true,
                repeat: false,
                modifiers: egui::Modifiers::NONE,
            }],
            ..Default::default()
        }
    }

    fn frame(
        ctx: &egui::Context,
        window: &mut EditorWindow,
        prefs: &mut Preferences,
        input: egui::RawInput,
        close_blocked: bool,
    ) {
        let _ = ctx.run(input, |ctx| {
            window.show(ctx, prefs, close_blocked);
        });
    }

    fn settle(window: &mut EditorWindow) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while window.session.is_busy() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
            window.drain_io();
        }
    }

    #[test]
    fn launch_path_is_loaded_and_titles_the_window() {
        let path = std::env::temp_dir().join(format!("texty-launch-{}.txt", std::process::id()));
        fs::write(&path, "hello").ok();

        let ctx = egui::Context::default();
        let mut window = open_window(&ctx, Some(path.clone()));
        assert!(window.session.is_loading());
        settle(&mut window);

        assert_eq!(window.session.text(), "hello");
        assert_eq!(window.session.state(), SessionState::CleanTitled);
        assert_eq!(window.title, texty_core::display_name(&path));
        assert!(!window.title_sent);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn failed_launch_load_leaves_an_empty_document() {
        let path = std::env::temp_dir().join("texty-launch-missing/nothing.txt");

        let ctx = egui::Context::default();
        let mut window = open_window(&ctx, Some(path));
        settle(&mut window);

        assert_eq!(window.session.state(), SessionState::CleanUntitled);
        assert_eq!(window.title, DEFAULT_TITLE);
        assert!(!window.holds_unsaved_work());
    }

    #[test]
    fn save_completes_through_the_worker() {
        let path = std::env::temp_dir().join(format!("texty-window-save-{}.txt", std::process::id()));
        fs::write(&path, "draft").ok();

        let ctx = egui::Context::default();
        let mut window = open_window(&ctx, Some(path.clone()));
        settle(&mut window);

        window.session.text_mut().push_str(" two");
        window.session.note_edited();
        assert!(window.holds_unsaved_work());

        window.run(Session::save);
        settle(&mut window);

        assert_eq!(fs::read_to_string(&path).unwrap_or_default(), "draft two");
        assert!(!window.holds_unsaved_work());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn busy_commands_surface_a_toast_instead_of_acting() {
        let path = std::env::temp_dir().join(format!("texty-window-busy-{}.txt", std::process::id()));
        fs::write(&path, "x").ok();

        let ctx = egui::Context::default();
        let mut window = open_window(&ctx, Some(path.clone()));
        window.run(Session::close);
        assert_eq!(window.close_state, CloseState::Open);
        settle(&mut window);

        window.run(Session::close);
        assert_eq!(window.close_state, CloseState::Approved);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn blocked_close_keeps_the_window_open_with_a_toast() {
        let ctx = egui::Context::default();
        let mut prefs = Preferences::new(MemoryStore::default());
        let mut window = open_window(&ctx, None);

        frame(&ctx, &mut window, &mut prefs, close_request(), true);

        assert_eq!(window.close_state, CloseState::Open);
        assert!(window.confirming.is_none());
        assert_eq!(window.toasts.messages(), [CLOSE_BLOCKED]);
    }

    #[test]
    fn unblocked_clean_close_finishes_in_the_same_frame() {
        let ctx = egui::Context::default();
        let mut prefs = Preferences::new(MemoryStore::default());
        let mut window = open_window(&ctx, None);

        frame(&ctx, &mut window, &mut prefs, close_request(), false);

        assert!(window.is_closed());
        assert!(window.toasts.messages().is_empty());
    }

    #[test]
    fn escape_cancels_the_unsaved_changes_prompt() {
        let ctx = egui::Context::default();
        let mut prefs = Preferences::new(MemoryStore::default());
        let mut window = dirty_window(&ctx);

        frame(&ctx, &mut window, &mut prefs, close_request(), false);
        assert!(window.confirming.is_some());
        assert!(window.session.is_confirming());

        frame(&ctx, &mut window, &mut prefs, key_press(egui::Key::Escape), false);

        assert!(window.confirming.is_none());
        assert!(!window.session.is_busy());
        assert_eq!(window.session.state(), SessionState::DirtyUntitled);
        assert_eq!(window.session.text(), "draft");
        assert_eq!(window.close_state, CloseState::Open);
    }

    #[test]
    fn approved_close_is_refused_once_another_window_holds_unsaved_work() {
        let ctx = egui::Context::default();
        let mut prefs = Preferences::new(MemoryStore::default());
        let mut window = dirty_window(&ctx);

        frame(&ctx, &mut window, &mut prefs, close_request(), false);
        assert!(window.confirming.is_some());

        // Another window gains unsaved work while the prompt is up.
        window.confirming = None;
        let effects = window.session.confirmation_answered(Choice::Discard);
        window.apply(effects);
        assert_eq!(window.close_state, CloseState::Approved);

        frame(&ctx, &mut window, &mut prefs, egui::RawInput::default(), true);

        assert!(!window.is_closed());
        assert_eq!(window.close_state, CloseState::Open);
        assert_eq!(window.toasts.messages(), [CLOSE_BLOCKED]);
        assert_eq!(prefs.window_size(), None);
    }

    #[test]
    fn viewport_builder_keeps_its_size_and_follows_the_title() {
        let ctx = egui::Context::default();
        let builder = egui::ViewportBuilder::default().with_inner_size([640.0, 480.0]);
        let mut window = EditorWindow::new(&ctx, egui::ViewportId::ROOT, builder, None);
        window.apply(vec![Effect::SetTitle("notes.txt".to_owned())]);

        let builder = window.viewport_builder();
        assert_eq!(builder.inner_size, Some(egui::vec2(640.0, 480.0)));
        assert_eq!(builder.title.as_deref(), Some("notes.txt"));
    }

    #[test]
    fn requests_merge_by_union() {
        let mut requests = WindowRequests::default();
        requests.merge(WindowRequests {
            new_window: true,
            quit: false,
        });
        requests.merge(WindowRequests::default());
        assert_eq!(
            requests,
            WindowRequests {
                new_window: true,
                quit: false,
            }
        );
    }
}
