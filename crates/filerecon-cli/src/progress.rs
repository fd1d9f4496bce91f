use filerecon_core::{Phase, ProgressReporter};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

const TICKS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// - Enumerate phase: spinner (directory count unknown upfront)
/// - Scan, copy and organize phases: bar sized on first progress call
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_phase_start(&self, phase: Phase) {
        let pb = match phase {
            Phase::Enumerate => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::with_template("{spinner:.cyan} {msg}")
                        .unwrap()
                        .tick_chars(TICKS),
                );
                pb.set_message(format!("{}...", phase.label()));
                pb
            }
            _ => {
                let pb = ProgressBar::new(0);
                pb.set_style(
                    ProgressStyle::with_template(&format!(
                        "  {{spinner:.cyan}} {} [{{bar:30.cyan/dim}}] {{pos}}/{{len}} ({{eta}} remaining)",
                        phase.label()
                    ))
                    .unwrap()
                    .progress_chars("━╸─")
                    .tick_chars(TICKS),
                );
                pb
            }
        };
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_progress(&self, completed: usize, total: usize, _label: &str) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            if pb.length() != Some(total as u64) {
                pb.set_length(total as u64);
            }
            pb.set_position(completed as u64);
        }
    }

    fn on_phase_complete(&self, phase: Phase, items: usize, duration_secs: f64) {
        self.finish_bar();
        let noun = match phase {
            Phase::Enumerate | Phase::Scan => "directories",
            Phase::Copy | Phase::Organize => "files",
        };
        eprintln!(
            "  \x1b[32m✓\x1b[0m {}: {} {} in {:.2}s",
            phase.label(),
            items,
            noun,
            duration_secs
        );
    }
}
