use std::{
    io,
    path::PathBuf,
    sync::mpsc::{self, Receiver, Sender},
    thread,
};

use eframe::egui;
use log::debug;
use texty_core::disk;

/// Outcome of a background load or save, tagged with the file it concerns.
#[derive(Debug)]
pub(crate) enum Completion {
    Loaded {
        path: PathBuf,
        result: io::Result<Vec<u8>>,
    },
    Saved {
        path: PathBuf,
        result: io::Result<u64>,
    },
}

/// Runs file reads and writes off the UI thread. Completions are picked up
/// with [`IoWorker::poll`] during the next frame.
pub(crate) struct IoWorker {
    ctx: egui::Context,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
}

impl IoWorker {
    pub(crate) fn new(ctx: egui::Context) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { ctx, tx, rx }
    }

    pub(crate) fn load(&self, path: PathBuf) {
        debug!("loading {}", path.display());
        self.spawn(move || {
            let result = disk::read_capped(&path);
            Completion::Loaded { path, result }
        });
    }

    pub(crate) fn save(&self, path: PathBuf, text: String) {
        debug!("saving {} ({} bytes)", path.display(), text.len());
        self.spawn(move || {
            let result = disk::atomic_write(&path, text.as_bytes());
            Completion::Saved { path, result }
        });
    }

    pub(crate) fn poll(&self) -> Vec<Completion> {
        self.rx.try_iter().collect()
    }

    fn spawn(&self, job: impl FnOnce() -> Completion + Send + 'static) {
        let tx = self.tx.clone();
        let ctx = self.ctx.clone();
        thread::spawn(move || {
            // The receiver is gone once the window has closed.
            if tx.send(job()).is_ok() {
                ctx.request_repaint();
            }
        });
    }
}
