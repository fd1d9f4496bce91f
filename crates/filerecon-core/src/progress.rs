/// Trait for reporting operation progress.
///
/// The CLI implements this with indicatif bars. All methods have default
/// no-op implementations. Calls always come from the driving thread.
pub trait ProgressReporter: Send + Sync {
    fn on_phase_start(&self, _phase: Phase) {}
    /// Invoked after each completed unit of work (one directory, one file).
    fn on_progress(&self, _completed: usize, _total: usize, _label: &str) {}
    fn on_phase_complete(&self, _phase: Phase, _items: usize, _duration_secs: f64) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Enumerate,
    Scan,
    Copy,
    Organize,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Enumerate => "Enumerating directories",
            Phase::Scan => "Scanning directories",
            Phase::Copy => "Copying files",
            Phase::Organize => "Organizing files",
        }
    }
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
