use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use eframe::egui;

const TOAST_LIFETIME: Duration = Duration::from_secs(4);
const MAX_TOASTS: usize = 3;

/// Short-lived status messages shown at the bottom of a window.
#[derive(Default)]
pub(crate) struct Toasts {
    queue: VecDeque<(String, Instant)>,
}

impl Toasts {
    pub(crate) fn push(&mut self, message: impl Into<String>) {
        if self.queue.len() == MAX_TOASTS {
            self.queue.pop_front();
        }
        self.queue.push_back((message.into(), Instant::now() + TOAST_LIFETIME));
    }

    /// Drops expired toasts and returns how long until the next one expires.
    fn expire(&mut self, now: Instant) -> Option<Duration> {
        self.queue.retain(|(_, until)| *until > now);
        self.queue.iter().map(|(_, until)| *until - now).min()
    }

    pub(crate) fn show(&mut self, ctx: &egui::Context, id: egui::Id) {
        let Some(next_expiry) = self.expire(Instant::now()) else {
            return;
        };
        ctx.request_repaint_after(next_expiry);

        egui::Area::new(id)
            .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -40.0))
            .interactable(false)
            .show(ctx, |ui| {
                for (message, _) in &self.queue {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.label(message);
                    });
                }
            });
    }

    #[cfg(test)]
    pub(crate) fn messages(&self) -> Vec<&str> {
        self.queue.iter().map(|(message, _)| message.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_latest_toasts() {
        let mut toasts = Toasts::default();
        for message in ["one", "two", "three", "four"] {
            toasts.push(message);
        }
        assert_eq!(toasts.messages(), ["two", "three", "four"]);
    }

    #[test]
    fn toasts_expire_after_their_lifetime() {
        let mut toasts = Toasts::default();
        toasts.push("Saved “x.txt”");

        let now = Instant::now();
        assert!(toasts.expire(now).is_some());
        assert_eq!(toasts.expire(now + TOAST_LIFETIME * 2), None);
        assert!(toasts.messages().is_empty());
    }
}
