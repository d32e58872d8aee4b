//! AL-014: Append-only JSONL search event log.
//!
//! `EventLog` is a `SearchObserver`; every callback becomes one
//! `{"ts": ..., "event": ...}` line tagged with the search's run id.

use super::observer::SearchObserver;
use crate::core::types::{Algorithm, PathReport, SearchEvent, SearchStats, Step, TimestampedEvent};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current UTC time as ISO 8601.
pub fn now_iso8601() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format_iso8601(secs)
}

fn format_iso8601(epoch_secs: u64) -> String {
    let days = (epoch_secs / 86_400) as i64;
    let rem = epoch_secs % 86_400;
    let (y, m, d) = civil_from_days(days);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        y,
        m,
        d,
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    )
}

/// Days since 1970-01-01 to (year, month, day), proleptic Gregorian.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let y = yoe + era * 400 + i64::from(m <= 2);
    (y, m, d)
}

/// Generate a run ID.
pub fn generate_run_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("r-{:012x}", nanos & 0xFFFF_FFFF_FFFF)
}

/// Append one event to a JSONL log, creating parent directories as needed.
pub fn append_event(path: &Path, event: SearchEvent) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("cannot create {}: {}", parent.display(), e))?;
        }
    }

    let te = TimestampedEvent {
        ts: now_iso8601(),
        event,
    };
    let json = serde_json::to_string(&te).map_err(|e| format!("JSON serialize error: {}", e))?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("cannot open event log {}: {}", path.display(), e))?;

    writeln!(file, "{}", json).map_err(|e| format!("write error: {}", e))?;
    Ok(())
}

/// Observer writing search events to a JSONL file.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    run_id: String,
    trace_expansions: bool,
    error: Option<String>,
}

impl EventLog {
    pub fn new(path: &Path, trace_expansions: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            run_id: generate_run_id(),
            trace_expansions,
            error: None,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn search_started(&mut self, target: &str, algorithm: Algorithm, max_paths: usize) {
        self.record(SearchEvent::SearchStarted {
            run_id: self.run_id.clone(),
            target: target.to_string(),
            algorithm,
            max_paths,
        });
    }

    /// First write failure, if any. Later events are dropped after a failure.
    pub fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }

    fn record(&mut self, event: SearchEvent) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = append_event(&self.path, event) {
            self.error = Some(e);
        }
    }
}

impl SearchObserver for EventLog {
    fn on_expand(&mut self, element: &str) {
        if self.trace_expansions {
            self.record(SearchEvent::ElementExpanded {
                run_id: self.run_id.clone(),
                element: element.to_string(),
            });
        }
    }

    fn on_step(&mut self, index: usize, step: &Step) {
        self.record(SearchEvent::StepResolved {
            run_id: self.run_id.clone(),
            index,
            ingredients: step.ingredients.clone(),
            result: step.result.clone(),
        });
    }

    fn on_path(&mut self, index: usize, report: &PathReport) {
        self.record(SearchEvent::PathAccepted {
            run_id: self.run_id.clone(),
            index,
            steps: report.path.len(),
            fingerprint: report.fingerprint.clone(),
        });
    }

    fn on_complete(&mut self, stats: &SearchStats) {
        self.record(SearchEvent::SearchCompleted {
            run_id: self.run_id.clone(),
            nodes_explored: stats.nodes_explored,
            duration_ms: stats.duration.as_secs_f64() * 1000.0,
        });
    }
}
