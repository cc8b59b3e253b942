use std::path::PathBuf;

use eframe::egui;
use texty_core::Choice;

pub(crate) fn choose_open_file() -> Option<PathBuf> {
    rfd::FileDialog::new().set_title("Open File").pick_file()
}

pub(crate) fn choose_save_file(suggested_name: Option<&str>) -> Option<PathBuf> {
    let dialog = rfd::FileDialog::new().set_title("Save File");
    match suggested_name {
        Some(name) => dialog.set_file_name(name),
        None => dialog,
    }
    .save_file()
}

/// Draws the unsaved-changes prompt. Returns the user's answer once given;
/// Escape counts as cancel.
pub(crate) fn confirm_unsaved(ctx: &egui::Context, id: egui::Id, name: &str) -> Option<Choice> {
    if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        return Some(Choice::Cancel);
    }

    let mut choice = None;
    egui::Window::new("Unsaved changes")
        .id(id)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            ui.label(format!("“{name}” has unsaved changes."));
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                if ui.button("Cancel").clicked() {
                    choice = Some(Choice::Cancel);
                }
                if ui.button("Discard").clicked() {
                    choice = Some(Choice::Discard);
                }
                if ui.button("Save").clicked() {
                    choice = Some(Choice::Save);
                }
            });
        });
    choice
}

pub(crate) fn about(ctx: &egui::Context, id: egui::Id, open: &mut bool) {
    egui::Window::new("About Texty")
        .id(id)
        .open(open)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading("Texty");
                ui.label(format!("Version {}", env!("CARGO_PKG_VERSION")));
                ui.add_space(4.0);
                ui.label("A minimal text editor.");
                ui.label("Another fine mess by Footeware.ca");
                ui.hyperlink("http://footeware.ca");
                ui.add_space(4.0);
                ui.small("© 2024 Craig Foote");
            });
        });
}
