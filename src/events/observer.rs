//! AL-010: Search observers: the per-call side channel for progress reporting.
//!
//! An observer is passed explicitly into each search call. Resolvers report
//! element expansions while they run; the facade then reports steps in
//! construction order and finishes with one `on_complete`.

use crate::core::types::{PathReport, SearchStats, Step};

/// Receives search progress. Every callback defaults to a no-op.
///
/// Multi-path searches hold the observer across `.await`, so it must be `Send`.
pub trait SearchObserver: Send {
    /// An element is being decomposed or added to a frontier.
    fn on_expand(&mut self, _element: &str) {}

    /// One step of a found path, in construction order.
    fn on_step(&mut self, _index: usize, _step: &Step) {}

    /// A multi-path search accepted a new distinct path.
    fn on_path(&mut self, _index: usize, _report: &PathReport) {}

    /// Terminal event, emitted whether or not a path was found.
    fn on_complete(&mut self, _stats: &SearchStats) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SearchObserver for NoopObserver {}

/// Observer that keeps every callback in memory.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub expanded: Vec<String>,
    pub steps: Vec<(usize, Step)>,
    pub paths: Vec<PathReport>,
    pub completed: Option<SearchStats>,
}

impl SearchObserver for Recorder {
    fn on_expand(&mut self, element: &str) {
        self.expanded.push(element.to_string());
    }

    fn on_step(&mut self, index: usize, step: &Step) {
        self.steps.push((index, step.clone()));
    }

    fn on_path(&mut self, _index: usize, report: &PathReport) {
        self.paths.push(report.clone());
    }

    fn on_complete(&mut self, stats: &SearchStats) {
        self.completed = Some(*stats);
    }
}
