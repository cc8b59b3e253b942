#![forbid(unsafe_code)]
#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]

#[cfg(target_arch = "wasm32")]
compile_error!("texty is a native desktop app; web/wasm builds are not supported.");

use std::{ffi::OsString, path::PathBuf};

use eframe::egui;
use log::info;
use texty_core::{APP_ID, DEFAULT_TITLE, Preferences};

mod io_worker;
mod prompt;
mod toast;
mod window;

use window::{EditorWindow, WindowRequests};

const DEFAULT_WINDOW_SIZE: [f32; 2] = [1024.0, 768.0];
const MIN_WINDOW_SIZE: [f32; 2] = [480.0, 320.0];

/// The first argument names a file to open. There are no flags; a leading
/// `--` is skipped.
fn parse_launch_path<I, S>(args: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into).peekable();
    args.next_if(|arg| arg == "--");
    args.next().map(PathBuf::from)
}

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let launch_path = parse_launch_path(std::env::args_os().skip(1));
    let prefs = Preferences::load();
    info!("starting texty {}", env!("CARGO_PKG_VERSION"));

    // Viewport sizes are in points, so they scale with the OS DPI factor.
    let options = eframe::NativeOptions {
        viewport: window_builder(&prefs, DEFAULT_TITLE),
        ..Default::default()
    };
    eframe::run_native(
        "texty",
        options,
        Box::new(move |cc| Ok(Box::new(TextyApp::new(&cc.egui_ctx, prefs, launch_path)))),
    )
}

fn window_builder(prefs: &Preferences, title: &str) -> egui::ViewportBuilder {
    let size = prefs
        .window_size()
        .map_or(DEFAULT_WINDOW_SIZE, |(width, height)| {
            [width as f32, height as f32]
        });
    egui::ViewportBuilder::default()
        .with_title(title)
        .with_app_id(APP_ID)
        .with_inner_size(size)
        .with_min_inner_size(MIN_WINDOW_SIZE)
}

/// The application: shared preferences and every open editor window. The
/// first window lives in the root viewport; closing it quits.
struct TextyApp {
    prefs: Preferences,
    windows: Vec<EditorWindow>,
    next_window: u64,
}

impl TextyApp {
    fn new(ctx: &egui::Context, prefs: Preferences, launch_path: Option<PathBuf>) -> Self {
        // Ctrl+= and Ctrl+- change the editor font size instead.
        ctx.options_mut(|options| options.zoom_with_keyboard = false);

        let main = EditorWindow::new(
            ctx,
            egui::ViewportId::ROOT,
            window_builder(&prefs, DEFAULT_TITLE),
            launch_path,
        );
        Self {
            prefs,
            windows: vec![main],
            next_window: 1,
        }
    }

    fn open_window(&mut self, ctx: &egui::Context) {
        let viewport = egui::ViewportId::from_hash_of(("texty-window", self.next_window));
        self.next_window += 1;
        let builder = window_builder(&self.prefs, DEFAULT_TITLE);
        self.windows.push(EditorWindow::new(ctx, viewport, builder, None));
        info!("new window opened, {} open", self.windows.len());
    }
}

impl eframe::App for TextyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let others_unsaved = self
            .windows
            .iter()
            .skip(1)
            .any(EditorWindow::holds_unsaved_work);
        let mut requests = WindowRequests::default();

        let Self { prefs, windows, .. } = self;
        if let Some((main, others)) = windows.split_first_mut() {
            requests.merge(main.show(ctx, prefs, others_unsaved));

            for window in others {
                requests.merge(ctx.show_viewport_immediate(
                    window.viewport_id(),
                    window.viewport_builder(),
                    |ctx, _class| window.show(ctx, prefs, false),
                ));
            }
        }

        // The main window's close is carried out by eframe itself.
        let mut index = 0;
        self.windows.retain(|window| {
            let keep = index == 0 || !window.is_closed();
            index += 1;
            keep
        });

        if requests.new_window {
            self.open_window(ctx);
        }
        if requests.quit {
            ctx.send_viewport_cmd_to(egui::ViewportId::ROOT, egui::ViewportCommand::Close);
        }
    }
}
