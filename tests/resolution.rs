//! End-to-end resolution through the public API: project loading, every
//! algorithm, multi-path search and the JSONL event log.

use alembic::core::index::{BasicSet, RecipeIndex};
use alembic::core::orchestrator::MultiPathOptions;
use alembic::core::parser;
use alembic::core::path;
use alembic::core::resolve::{
    resolve_multiple, resolve_multiple_observed, resolve_single, resolve_single_observed,
};
use alembic::core::search::SearchContext;
use alembic::core::types::{Algorithm, CatalogRecord, ResolveError, Step};
use alembic::events::eventlog::EventLog;
use alembic::events::observer::Recorder;
use std::sync::Arc;
use std::time::Duration;

const ALL: [Algorithm; 4] = [
    Algorithm::Bfs,
    Algorithm::Dfs,
    Algorithm::Bidirectional,
    Algorithm::BidirectionalDfs,
];

fn abcd() -> (RecipeIndex, BasicSet) {
    let index = RecipeIndex::from_records(&[
        CatalogRecord::new("C", 1, &[("A", "B")]),
        CatalogRecord::new("D", 2, &[("A", "C")]),
        CatalogRecord::new("X", 1, &[("X", "A")]),
        CatalogRecord::new("Orphan", 2, &[]),
    ]);
    (index, BasicSet::new(["A", "B"]))
}

const ELEMENTS_CONFIG: &str = r#"
version: "1.0"
catalog: elements.yaml
basics: [Air, Earth, Fire, Water, Time]
search:
  algorithm: bidirectional
  max_paths: 4
  attempt_budget_ms: 2000
"#;

const ELEMENTS_CATALOG: &str = r#"
- element: Mud
  tier: 1
  recipes: [[Water, Earth]]
- element: Lava
  tier: 1
  recipes: [[Earth, Fire]]
- element: Steam
  tier: 1
  recipes: [[Water, Fire], [Air, Fire]]
- element: Stone
  tier: 2
  recipes: [[Lava, Air], [Lava, Water], [Mud, Fire]]
- element: Cloud
  tier: 2
  recipes: [[Steam, Air], [Steam, Time]]
- element: Rain
  tier: 3
  recipes: [[Cloud, Water], [Cloud, Cloud]]
- element: Plant
  tier: 4
  recipes: [[Rain, Earth], [Rain, Mud], [Stone, Rain]]
- element: Forever
  tier: 3
  recipes: [[Forever, Time]]
"#;

fn elements_project() -> (tempfile::TempDir, parser::Project) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("alembic.yaml"), ELEMENTS_CONFIG).unwrap();
    std::fs::write(dir.path().join("elements.yaml"), ELEMENTS_CATALOG).unwrap();
    let project = parser::load_project(&dir.path().join("alembic.yaml")).unwrap();
    (dir, project)
}

#[test]
fn test_two_step_build_order() {
    let (index, basics) = abcd();
    let ctx = SearchContext::new(&index, &basics);
    for algorithm in ALL {
        let r = resolve_single(&ctx, "D", algorithm).unwrap();
        assert_eq!(
            r.path.steps,
            vec![Step::new("A", "B", "C"), Step::new("A", "C", "D")],
            "{algorithm}"
        );
    }
}

#[test]
fn test_self_reference_never_loops() {
    let (index, basics) = abcd();
    let ctx = SearchContext::new(&index, &basics);
    for algorithm in ALL {
        assert_eq!(
            resolve_single(&ctx, "X", algorithm),
            Err(ResolveError::NoPath {
                element: "X".to_string()
            })
        );
    }
}

#[test]
fn test_basic_unknown_and_empty_targets() {
    let (index, basics) = abcd();
    let ctx = SearchContext::new(&index, &basics);
    let mut rec = Recorder::default();
    let r = resolve_single_observed(&ctx, "B", Algorithm::Bfs, &mut rec).unwrap();
    assert!(r.path.is_empty());
    assert!(rec.expanded.is_empty());

    assert!(matches!(
        resolve_single(&ctx, "Dragon", Algorithm::Dfs),
        Err(ResolveError::NotFound { .. })
    ));
    assert!(matches!(
        resolve_single(&ctx, "Orphan", Algorithm::Bidirectional),
        Err(ResolveError::NoPath { .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_multiple_with_single_decomposition() {
    let (index, basics) = abcd();
    let options = MultiPathOptions {
        max_paths: 3,
        attempt_budget: Some(Duration::from_secs(2)),
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
    assert_eq!(result.attempts_completed, result.attempts_launched);
}

#[test]
fn test_project_every_algorithm_valid() {
    let (_dir, project) = elements_project();
    assert!(parser::validate_catalog(&project.records, &project.basics)
        .iter()
        .any(|f| f.message.contains("self-referencing")));

    let ctx = SearchContext::new(&project.index, &project.basics);
    for algorithm in ALL {
        for target in ["Mud", "Stone", "Cloud", "Rain", "Plant"] {
            let r = resolve_single(&ctx, target, algorithm).unwrap();
            assert!(
                path::validate(&r.path, &ctx).is_empty(),
                "{algorithm} {target}: {:?}",
                r.path
            );
        }
        assert!(resolve_single(&ctx, "Forever", algorithm).is_err());
    }
}

#[test]
fn test_project_deterministic() {
    let (_dir, project) = elements_project();
    let ctx = SearchContext::new(&project.index, &project.basics);
    for algorithm in ALL {
        let a = resolve_single(&ctx, "Plant", algorithm).unwrap();
        let b = resolve_single(&ctx, "Plant", algorithm).unwrap();
        assert_eq!(a.path, b.path);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_project_distinct_paths() {
    let (_dir, project) = elements_project();
    let options = MultiPathOptions::from_settings(&project.config.search);
    assert_eq!(options.max_paths, 4);

    let mut rec = Recorder::default();
    let result = resolve_multiple_observed(
        Arc::clone(&project.index),
        Arc::clone(&project.basics),
        "Plant",
        project.config.search.algorithm,
        &options,
        &mut rec,
    )
    .await
    .unwrap();

    assert!(!result.paths.is_empty());
    assert!(result.paths.len() <= 4);
    let ctx = SearchContext::new(&project.index, &project.basics);
    let mut signatures: Vec<&str> = result.paths.iter().map(|r| r.signature.as_str()).collect();
    for report in &result.paths {
        assert!(path::validate(&report.path, &ctx).is_empty());
        assert_eq!(report.signature, path::signature(&report.path));
    }
    signatures.sort_unstable();
    signatures.dedup();
    assert_eq!(signatures.len(), result.paths.len());
    assert_eq!(rec.paths.len(), result.paths.len());
    assert!(rec.completed.is_some());
}

#[test]
fn test_event_log_records_search() {
    let (dir, project) = elements_project();
    let ctx = SearchContext::new(&project.index, &project.basics);
    let log_path = dir.path().join("logs/events.jsonl");
    let mut log = EventLog::new(&log_path, true);
    log.search_started("Rain", Algorithm::Dfs, 1);
    let r = resolve_single_observed(&ctx, "Rain", Algorithm::Dfs, &mut log).unwrap();
    assert!(log.take_error().is_none());

    let content = std::fs::read_to_string(&log_path).unwrap();
    let events: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let kinds: Vec<&str> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
    assert_eq!(kinds.first(), Some(&"search_started"));
    assert_eq!(kinds.last(), Some(&"search_completed"));
    assert!(kinds.contains(&"element_expanded"));
    assert_eq!(
        kinds.iter().filter(|k| **k == "step_resolved").count(),
        r.path.len()
    );
    assert!(events.iter().all(|e| e["run_id"] == log.run_id()));
}
