//! AL-011: Multi-path orchestrator.
//!
//! Races a bounded number of single-path attempts on the blocking pool and
//! keeps the first `max_paths` distinct results. Attempt 0 runs the chosen
//! algorithm unperturbed, then one splice attempt per tier-valid top-level
//! recipe of the target, then seeded recipe-order perturbations. Every other
//! perturbation is steered: it pushes the recipes used by the first few
//! accepted paths to the back of their candidate lists, so later attempts
//! drift away from what was already found.
//!
//! Attempts run without an observer; expansions are only reported by
//! single-path searches.
//!
//! Shared state (accepted paths + signature set + counters) sits behind one
//! mutex. Once enough paths are accepted the cancellation token fires; no new
//! attempt is launched after that and in-flight attempts notice it at their
//! next loop boundary. Every launched attempt is joined before returning.

use super::index::{BasicSet, RecipeIndex, RecipeOrdering};
use super::path;
use super::resolve::run_algorithm;
use super::search::{Budget, SearchContext};
use super::types::{
    Algorithm, Combo, MultiPathResult, PathReport, ResolveError, SearchRun, SearchSettings,
    SearchStats, Step,
};
use crate::events::hasher;
use crate::events::observer::{NoopObserver, SearchObserver};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Tuning for one multi-path search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiPathOptions {
    pub max_paths: usize,
    /// Simultaneously running attempts
    pub concurrency: usize,
    /// Attempts launched per requested path
    pub attempt_multiplier: usize,
    /// Per-attempt wall-clock budget
    pub attempt_budget: Option<Duration>,
    /// Base seed for recipe-order perturbation
    pub seed: u64,
}

impl Default for MultiPathOptions {
    fn default() -> Self {
        Self::from_settings(&SearchSettings::default())
    }
}

impl MultiPathOptions {
    pub fn from_settings(settings: &SearchSettings) -> Self {
        Self {
            max_paths: settings.max_paths,
            concurrency: settings.concurrency,
            attempt_multiplier: settings.attempt_multiplier,
            attempt_budget: match settings.attempt_budget_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
            seed: settings.seed,
        }
    }

    /// Upper bound on launched attempts.
    pub fn attempt_limit(&self) -> usize {
        self.attempt_multiplier
            .saturating_mul(self.max_paths)
            .max(1)
    }
}

/// What one attempt does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptPlan {
    /// Run the algorithm on the target, optionally under a seeded ordering.
    Direct { seed: Option<u64> },
    /// Fix the target's top-level recipe, resolve its ingredients under a
    /// seeded ordering and join them with a final step.
    Splice { combo: Combo, seed: u64 },
    /// Seeded ordering with recipes of already-accepted paths moved last.
    Steered { seed: u64 },
}

/// Accepted paths a steered attempt looks at.
const STEER_PATHS: usize = 3;

/// Deterministic attempt list, truncated to `options.attempt_limit()`.
pub fn plan_attempts(
    ctx: &SearchContext,
    target: &str,
    options: &MultiPathOptions,
) -> Vec<AttemptPlan> {
    let limit = options.attempt_limit();
    let mut plans = vec![AttemptPlan::Direct { seed: None }];

    for combo in ctx.valid_candidates(target) {
        let seed = options.seed.wrapping_add(plans.len() as u64);
        plans.push(AttemptPlan::Splice {
            combo: combo.clone(),
            seed,
        });
    }
    while plans.len() < limit {
        let seed = options.seed.wrapping_add(plans.len() as u64);
        if plans.len() % 2 == 0 {
            plans.push(AttemptPlan::Direct { seed: Some(seed) });
        } else {
            plans.push(AttemptPlan::Steered { seed });
        }
    }

    plans.truncate(limit);
    plans
}

/// Run one attempt to completion (or until its budget says stop). `steer`
/// holds the steps of accepted paths and is only read by `Steered` plans.
pub fn run_attempt(
    index: &RecipeIndex,
    basics: &BasicSet,
    target: &str,
    algorithm: Algorithm,
    plan: &AttemptPlan,
    steer: &[Step],
    budget: Budget,
) -> SearchRun {
    match plan {
        AttemptPlan::Direct { seed: None } => {
            let ctx = SearchContext::new(index, basics).with_budget(budget);
            run_algorithm(algorithm, &ctx, target, &mut NoopObserver)
        }
        AttemptPlan::Direct { seed: Some(seed) } => {
            let ordering = RecipeOrdering::seeded(index, *seed);
            let ctx = SearchContext::new(index, basics)
                .with_ordering(&ordering)
                .with_budget(budget);
            run_algorithm(algorithm, &ctx, target, &mut NoopObserver)
        }
        AttemptPlan::Splice { combo, seed } => {
            let ordering = RecipeOrdering::seeded(index, *seed);
            let ctx = SearchContext::new(index, basics)
                .with_ordering(&ordering)
                .with_budget(budget);
            splice_attempt(&ctx, target, combo, algorithm)
        }
        AttemptPlan::Steered { seed } => {
            let ordering = RecipeOrdering::steered(index, *seed, steer);
            let ctx = SearchContext::new(index, basics)
                .with_ordering(&ordering)
                .with_budget(budget);
            run_algorithm(algorithm, &ctx, target, &mut NoopObserver)
        }
    }
}

fn splice_attempt(
    ctx: &SearchContext,
    target: &str,
    combo: &Combo,
    algorithm: Algorithm,
) -> SearchRun {
    let start = Instant::now();
    let mut nodes_explored = 0;
    let mut parts = Vec::with_capacity(2);
    let mut failure = None;

    for ingredient in [&combo.0, &combo.1] {
        if ctx.is_basic(ingredient) {
            continue;
        }
        let run = run_algorithm(algorithm, ctx, ingredient, &mut NoopObserver);
        nodes_explored += run.stats.nodes_explored;
        match run.result {
            Ok(part) => parts.push(part),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    let no_path = || ResolveError::NoPath {
        element: target.to_string(),
    };
    let result = match failure {
        Some(ResolveError::NoPath { .. }) | Some(ResolveError::NotFound { .. }) => Err(no_path()),
        Some(e) => Err(e),
        None => path::splice(target, combo, &parts, ctx).ok_or_else(no_path),
    };

    SearchRun {
        result,
        stats: SearchStats {
            nodes_explored: nodes_explored + 1,
            duration: start.elapsed(),
        },
    }
}

#[derive(Debug, Default)]
struct Shared {
    accepted: Vec<PathReport>,
    signatures: FxHashSet<String>,
    nodes_explored: usize,
    max_duration: Duration,
    completed: usize,
}

/// Everything an attempt needs, shared by all attempts of one search.
struct Job {
    index: Arc<RecipeIndex>,
    basics: Arc<BasicSet>,
    target: Arc<str>,
    algorithm: Algorithm,
    max_paths: usize,
    attempt_budget: Option<Duration>,
    shared: Arc<Mutex<Shared>>,
    cancel: CancellationToken,
    accepted_tx: mpsc::UnboundedSender<PathReport>,
}

impl Job {
    fn execute(&self, slot: usize, plan: &AttemptPlan) {
        if self.cancel.is_cancelled() {
            return;
        }
        let budget = match self.attempt_budget {
            Some(limit) => Budget::with_limit(limit),
            None => Budget::unbounded(),
        }
        .with_cancel(self.cancel.clone());

        let steer: Vec<Step> = match plan {
            AttemptPlan::Steered { .. } => self
                .shared
                .lock()
                .accepted
                .iter()
                .take(STEER_PATHS)
                .flat_map(|r| r.path.steps.iter().cloned())
                .collect(),
            _ => Vec::new(),
        };

        let run = run_attempt(
            &self.index,
            &self.basics,
            &self.target,
            self.algorithm,
            plan,
            &steer,
            budget,
        );

        let candidate = match run.result {
            Ok(path) => Some(path),
            Err(e @ (ResolveError::AttemptTimeout { .. } | ResolveError::Cancelled)) => {
                debug!(slot, reason = %e, "attempt abandoned");
                return;
            }
            Err(e) => {
                debug!(slot, reason = %e, "attempt found nothing");
                None
            }
        };

        let report = candidate.and_then(|p| {
            let ctx = SearchContext::new(&self.index, &self.basics);
            let violations = path::validate(&p, &ctx);
            if !violations.is_empty() {
                debug!(slot, violations = violations.len(), "attempt produced an invalid path");
                return None;
            }
            let signature = path::signature(&p);
            let fingerprint = hasher::signature_fingerprint(&signature);
            Some(PathReport {
                path: p,
                signature,
                fingerprint,
            })
        });

        let mut shared = self.shared.lock();
        shared.completed += 1;
        shared.nodes_explored += run.stats.nodes_explored;
        shared.max_duration = shared.max_duration.max(run.stats.duration);

        let Some(report) = report else {
            return;
        };
        if shared.accepted.len() >= self.max_paths {
            return;
        }
        if !shared.signatures.insert(report.signature.clone()) {
            debug!(slot, fingerprint = %report.fingerprint, "duplicate path");
            return;
        }

        debug!(slot, fingerprint = %report.fingerprint, steps = report.path.len(), "path accepted");
        shared.accepted.push(report.clone());
        // Receiver only goes away if the caller was dropped.
        let _ = self.accepted_tx.send(report);
        if shared.accepted.len() >= self.max_paths {
            self.cancel.cancel();
        }
    }
}

/// Race attempts for `target` and collect up to `options.max_paths` distinct
/// paths, ascending by step count. Accepted paths are reported to `observer`
/// as they arrive. The result may hold zero paths.
pub async fn run(
    index: Arc<RecipeIndex>,
    basics: Arc<BasicSet>,
    target: &str,
    algorithm: Algorithm,
    options: &MultiPathOptions,
    observer: &mut dyn SearchObserver,
) -> MultiPathResult {
    let plans = plan_attempts(&SearchContext::new(&index, &basics), target, options);
    let shared = Arc::new(Mutex::new(Shared::default()));
    let cancel = CancellationToken::new();
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let (accepted_tx, mut accepted_rx) = mpsc::unbounded_channel();

    let job = Arc::new(Job {
        index,
        basics,
        target: Arc::from(target),
        algorithm,
        max_paths: options.max_paths.max(1),
        attempt_budget: options.attempt_budget,
        shared: Arc::clone(&shared),
        cancel: cancel.clone(),
        accepted_tx,
    });

    let launcher = tokio::spawn(async move {
        let mut handles = Vec::with_capacity(plans.len());
        for (slot, plan) in plans.into_iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            if cancel.is_cancelled() {
                break;
            }
            let job = Arc::clone(&job);
            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                job.execute(slot, &plan);
            }));
        }

        let launched = handles.len();
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "attempt task failed");
            }
        }
        launched
    });

    let mut accepted = 0;
    while let Some(report) = accepted_rx.recv().await {
        observer.on_path(accepted, &report);
        for (i, step) in report.path.steps.iter().enumerate() {
            observer.on_step(i, step);
        }
        accepted += 1;
    }

    let attempts_launched = match launcher.await {
        Ok(n) => n,
        Err(e) => {
            error!(error = %e, "attempt launcher failed");
            0
        }
    };

    let mut state = shared.lock();
    let mut paths = std::mem::take(&mut state.accepted);
    paths.sort_by_key(|r| r.path.len());

    MultiPathResult {
        paths,
        stats: SearchStats {
            nodes_explored: state.nodes_explored,
            duration: state.max_duration,
        },
        attempts_launched,
        attempts_completed: state.completed,
    }
}
