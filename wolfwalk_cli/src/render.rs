//! Terminal renderer and cue sink.

use std::io::Write;
use wolfwalk_core::motivation::{badge, chapter};
use wolfwalk_core::*;

/// Line-oriented renderer: prints only when what is on screen changes.
pub struct TerminalRenderer {
    /// Also redraw on every second of a running timer
    show_seconds: bool,
    last: Option<String>,
}

impl TerminalRenderer {
    pub fn new(show_seconds: bool) -> Self {
        Self {
            show_seconds,
            last: None,
        }
    }

    fn screen(&self, view: &SessionView) -> String {
        if let Some(summary) = &view.completion {
            return completion_screen(summary);
        }

        if !view.started {
            return format!(
                "Ready for the {} workout: {} steps.\n  First up: {} ({})\n  Press Enter to start.",
                view.workout_length, view.step_count, view.name, view.metric_label
            );
        }

        if let Some(message) = &view.rest_message {
            return format!(
                "Rest time! Take a breather.\n  {}\n  Press r when you're ready.",
                message
            );
        }

        let header = format!(
            "[{}/{}] {} | {} | {}",
            view.step_number,
            view.step_count,
            view.name,
            view.position_label(),
            view.metric_label
        );

        let detail = match (&view.countdown, view.mode) {
            (Some(beat), _) => format!("  {}", beat),
            (None, Mode::Timed) => match view.timer_phase {
                TimerPhase::Running => format!("  {} to go", self.clock(view)),
                TimerPhase::Paused => format!("  {} (paused, p to resume)", format_clock(view.seconds_remaining)),
                _ => format!("  {} - press Enter to start", format_clock(view.seconds_remaining)),
            },
            (None, _) => format!(
                "  Count: {}/{} - press Enter when done",
                view.rep_count,
                view.rep_target.unwrap_or_default()
            ),
        };

        format!("{}\n{}", header, detail)
    }

    fn clock(&self, view: &SessionView) -> String {
        if self.show_seconds {
            format_clock(view.seconds_remaining)
        } else {
            "timer running".to_string()
        }
    }
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, view: &SessionView) {
        let screen = self.screen(view);
        if self.last.as_deref() == Some(screen.as_str()) {
            return;
        }
        println!("{}", screen);
        self.last = Some(screen);
    }
}

fn completion_screen(summary: &CompletionSummary) -> String {
    let rewards = &summary.rewards;
    let mut out = format!(
        "Workout complete! {} exercises in {}.\n  Session #{} | streak {} | {} XP",
        summary.exercise_count,
        format_clock(summary.duration_seconds.max(0) as u32),
        rewards.total_sessions,
        rewards.streak,
        rewards.xp_total
    );
    if let Some(ch) = chapter(rewards.chapter) {
        out.push_str(&format!("\n  Chapter {}: {}", ch.number, ch.title));
    }
    for id in &rewards.new_badges {
        let name = badge(id).map(|b| b.name).unwrap_or(id.as_str());
        out.push_str(&format!("\n  New badge: {}", name));
    }
    if let Some(sticker) = &rewards.new_sticker {
        out.push_str(&format!("\n  New sticker: {}", sticker_label(sticker)));
    }
    out
}

/// `sticker_feather_blue` -> `feather blue`
pub fn sticker_label(id: &str) -> String {
    id.trim_start_matches("sticker_").replace('_', " ")
}

/// Rings the terminal bell on stderr
pub struct BellCues;

impl CueSink for BellCues {
    fn play_cue(&mut self, cue: Cue) {
        tracing::trace!("cue: {}", cue.name());
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
    }
}
