//! AL-009: Search facade, the entry points collaborators call.
//!
//! `resolve_single` runs one resolver; `resolve_multiple` hands off to the
//! orchestrator when more than one path is wanted. The `_observed` variants
//! report each step in construction order and finish with one
//! `on_complete`, whether or not a path was found.

use super::bfs;
use super::bidirectional::{self, Traversal};
use super::dfs;
use super::index::{BasicSet, RecipeIndex};
use super::orchestrator::{self, MultiPathOptions};
use super::path;
use super::search::SearchContext;
use super::types::{
    Algorithm, MultiPathResult, Path, PathReport, Resolution, ResolveError, SearchRun,
    SearchStats,
};
use crate::events::hasher;
use crate::events::observer::{NoopObserver, SearchObserver};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Cheap checks before any expansion. `Ok(Some(_))` short-circuits with a
/// trivial path, `Ok(None)` means a search is needed.
pub fn preflight(ctx: &SearchContext, target: &str) -> Result<Option<Path>, ResolveError> {
    if ctx.is_basic(target) {
        return Ok(Some(Path::trivial(target)));
    }
    if !ctx.index.contains(target) {
        return Err(ResolveError::NotFound {
            element: target.to_string(),
        });
    }
    if ctx.valid_candidates(target).is_empty() {
        return Err(ResolveError::NoPath {
            element: target.to_string(),
        });
    }
    Ok(None)
}

/// Dispatch to the chosen resolver. No preflight.
pub fn run_algorithm(
    algorithm: Algorithm,
    ctx: &SearchContext,
    target: &str,
    observer: &mut dyn SearchObserver,
) -> SearchRun {
    match algorithm {
        Algorithm::Bfs => bfs::search(ctx, target, observer),
        Algorithm::Dfs => dfs::search(ctx, target, observer),
        Algorithm::Bidirectional => bidirectional::search(ctx, target, Traversal::Breadth, observer),
        Algorithm::BidirectionalDfs => {
            bidirectional::search(ctx, target, Traversal::Depth, observer)
        }
    }
}

pub fn resolve_single(
    ctx: &SearchContext,
    target: &str,
    algorithm: Algorithm,
) -> Result<Resolution, ResolveError> {
    resolve_single_observed(ctx, target, algorithm, &mut NoopObserver)
}

/// Single-path search with progress reporting.
pub fn resolve_single_observed(
    ctx: &SearchContext,
    target: &str,
    algorithm: Algorithm,
    observer: &mut dyn SearchObserver,
) -> Result<Resolution, ResolveError> {
    let start = Instant::now();
    let immediate = |result| SearchRun {
        result,
        stats: SearchStats {
            nodes_explored: 0,
            duration: start.elapsed(),
        },
    };

    let run = match preflight(ctx, target) {
        Ok(Some(path)) => immediate(Ok(path)),
        Ok(None) => run_algorithm(algorithm, ctx, target, observer),
        Err(e) => immediate(Err(e)),
    };

    if let Ok(ref path) = run.result {
        for (i, step) in path.steps.iter().enumerate() {
            observer.on_step(i, step);
        }
    }
    observer.on_complete(&run.stats);
    info!(
        element = %target,
        %algorithm,
        nodes = run.stats.nodes_explored,
        found = run.result.is_ok(),
        "search completed"
    );

    let stats = run.stats;
    run.result.map(|path| Resolution { path, stats })
}

pub async fn resolve_multiple(
    index: Arc<RecipeIndex>,
    basics: Arc<BasicSet>,
    target: &str,
    algorithm: Algorithm,
    options: &MultiPathOptions,
) -> Result<MultiPathResult, ResolveError> {
    resolve_multiple_observed(index, basics, target, algorithm, options, &mut NoopObserver).await
}

/// Up to `options.max_paths` distinct paths, ascending by step count.
/// `Err(NoPath)` when no attempt produced one.
pub async fn resolve_multiple_observed(
    index: Arc<RecipeIndex>,
    basics: Arc<BasicSet>,
    target: &str,
    algorithm: Algorithm,
    options: &MultiPathOptions,
    observer: &mut dyn SearchObserver,
) -> Result<MultiPathResult, ResolveError> {
    let start = Instant::now();
    let ctx = SearchContext::new(&index, &basics);

    let preflight_path = match preflight(&ctx, target) {
        Ok(found) => found,
        Err(e) => {
            observer.on_complete(&SearchStats {
                nodes_explored: 0,
                duration: start.elapsed(),
            });
            return Err(e);
        }
    };

    if options.max_paths <= 1 || preflight_path.is_some() {
        let resolution = resolve_single_observed(&ctx, target, algorithm, observer)?;
        let signature = path::signature(&resolution.path);
        let report = PathReport {
            fingerprint: hasher::signature_fingerprint(&signature),
            signature,
            path: resolution.path,
        };
        return Ok(MultiPathResult {
            paths: vec![report],
            stats: resolution.stats,
            attempts_launched: 1,
            attempts_completed: 1,
        });
    }

    let result = orchestrator::run(
        Arc::clone(&index),
        Arc::clone(&basics),
        target,
        algorithm,
        options,
        observer,
    )
    .await;
    observer.on_complete(&result.stats);
    info!(
        element = %target,
        %algorithm,
        paths = result.paths.len(),
        launched = result.attempts_launched,
        completed = result.attempts_completed,
        "multi-path search completed"
    );

    if result.paths.is_empty() {
        return Err(ResolveError::NoPath {
            element: target.to_string(),
        });
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CatalogRecord, Step};
    use crate::events::observer::Recorder;

    fn scenario() -> (RecipeIndex, BasicSet) {
        let index = RecipeIndex::from_records(&[
            CatalogRecord::new("C", 1, &[("A", "B")]),
            CatalogRecord::new("D", 2, &[("A", "C")]),
            CatalogRecord::new("X", 1, &[("X", "A")]),
            CatalogRecord::new("Lonely", 3, &[]),
        ]);
        (index, BasicSet::new(["A", "B"]))
    }

    const ALL: [Algorithm; 4] = [
        Algorithm::Bfs,
        Algorithm::Dfs,
        Algorithm::Bidirectional,
        Algorithm::BidirectionalDfs,
    ];

    #[test]
    fn test_al009_basic_target_is_trivial() {
        let (index, basics) = scenario();
        let ctx = SearchContext::new(&index, &basics);
        let mut rec = Recorder::default();
        let r = resolve_single_observed(&ctx, "A", Algorithm::Bfs, &mut rec).unwrap();
        assert!(r.path.is_empty());
        assert_eq!(r.stats.nodes_explored, 0);
        assert!(rec.expanded.is_empty());
        assert!(rec.completed.is_some());
    }

    #[test]
    fn test_al009_not_found() {
        let (index, basics) = scenario();
        let ctx = SearchContext::new(&index, &basics);
        assert_eq!(
            resolve_single(&ctx, "Unicorn", Algorithm::Dfs),
            Err(ResolveError::NotFound {
                element: "Unicorn".to_string()
            })
        );
    }

    #[test]
    fn test_al009_zero_recipes_is_no_path() {
        let (index, basics) = scenario();
        let ctx = SearchContext::new(&index, &basics);
        let mut rec = Recorder::default();
        let r = resolve_single_observed(&ctx, "Lonely", Algorithm::Bfs, &mut rec);
        assert!(matches!(r, Err(ResolveError::NoPath { .. })));
        assert!(rec.expanded.is_empty());
        assert!(rec.completed.is_some());
    }

    #[test]
    fn test_al009_self_reference_every_algorithm() {
        let (index, basics) = scenario();
        let ctx = SearchContext::new(&index, &basics);
        for algo in ALL {
            assert_eq!(
                resolve_single(&ctx, "X", algo),
                Err(ResolveError::NoPath {
                    element: "X".to_string()
                })
            );
        }
    }

    #[test]
    fn test_al009_two_step_scenario_every_algorithm() {
        let (index, basics) = scenario();
        let ctx = SearchContext::new(&index, &basics);
        for algo in ALL {
            let r = resolve_single(&ctx, "D", algo).unwrap();
            assert_eq!(
                r.path.steps,
                vec![Step::new("A", "B", "C"), Step::new("A", "C", "D")],
                "{algo}"
            );
        }
    }

    #[test]
    fn test_al009_observed_steps_in_order() {
        let (index, basics) = scenario();
        let ctx = SearchContext::new(&index, &basics);
        let mut rec = Recorder::default();
        resolve_single_observed(&ctx, "D", Algorithm::Bfs, &mut rec).unwrap();
        let results: Vec<&str> = rec.steps.iter().map(|(_, s)| s.result.as_str()).collect();
        assert_eq!(results, vec!["C", "D"]);
        assert_eq!(rec.steps[1].0, 1);
        assert!(rec.completed.unwrap().nodes_explored > 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_al009_multiple_single_decomposition() {
        let (index, basics) = scenario();
        let options = MultiPathOptions {
            max_paths: 3,
            ..MultiPathOptions::default()
        };
        let result = resolve_multiple(
            Arc::new(index),
            Arc::new(basics),
            "D",
            Algorithm::Bfs,
            &options,
        )
        .await
        .unwrap();
        assert_eq!(result.paths.len(), 1);
        assert_eq!(result.paths[0].signature, "C=A+B;D=A+C");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_al009_multiple_with_one_path_skips_orchestrator() {
        let (index, basics) = scenario();
        let result = resolve_multiple(
            Arc::new(index),
            Arc::new(basics),
            "D",
            Algorithm::Dfs,
            &MultiPathOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(result.attempts_launched, 1);
        assert!(result.paths[0].fingerprint.starts_with("blake3:"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_al009_multiple_runs_as_spawned_task() {
        let (index, basics) = scenario();
        let (index, basics) = (Arc::new(index), Arc::new(basics));
        let options = MultiPathOptions {
            max_paths: 2,
            ..MultiPathOptions::default()
        };

        let plain = {
            let (index, basics, options) = (Arc::clone(&index), Arc::clone(&basics), options.clone());
            tokio::spawn(async move {
                resolve_multiple(index, basics, "D", Algorithm::Bfs, &options).await
            })
        };
        let observed = tokio::spawn(async move {
            let mut rec = Recorder::default();
            let result =
                resolve_multiple_observed(index, basics, "D", Algorithm::Dfs, &options, &mut rec)
                    .await;
            (result, rec)
        });

        assert_eq!(plain.await.unwrap().unwrap().paths.len(), 1);
        let (result, rec) = observed.await.unwrap();
        assert_eq!(result.unwrap().paths.len(), 1);
        assert_eq!(rec.paths.len(), 1);
        assert!(rec.completed.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_al009_multiple_errors() {
        let (index, basics) = scenario();
        let (index, basics) = (Arc::new(index), Arc::new(basics));
        let options = MultiPathOptions {
            max_paths: 2,
            ..MultiPathOptions::default()
        };
        let missing = resolve_multiple(
            Arc::clone(&index),
            Arc::clone(&basics),
            "Unicorn",
            Algorithm::Bfs,
            &options,
        )
        .await;
        assert!(matches!(missing, Err(ResolveError::NotFound { .. })));

        let mut rec = Recorder::default();
        let cyclic = resolve_multiple_observed(index, basics, "X", Algorithm::Bfs, &options, &mut rec)
            .await;
        assert!(matches!(cyclic, Err(ResolveError::NoPath { .. })));
        assert!(rec.completed.is_some());
    }
}
