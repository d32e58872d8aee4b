//! AL-004: Breadth-first resolver.
//!
//! Explores whole decomposition branches FIFO. A branch carries the elements
//! it still needs, the steps committed so far and the recipe it chose for
//! each element it expanded. The first branch whose remaining elements are
//! all basic wins. That is round-optimal, not step-count-optimal.

use super::path;
use super::search::SearchContext;
use super::types::{Combo, Path, ResolveError, SearchRun, SearchStats, Step};
use crate::events::observer::SearchObserver;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::time::Instant;

/// One partial decomposition. Cloned per alternative recipe.
#[derive(Debug, Clone, Default)]
struct Branch {
    remaining: Vec<String>,
    steps: Vec<Step>,
    expanded: FxHashSet<String>,
    step_keys: FxHashSet<(String, String, String)>,
    chosen: FxHashMap<String, Combo>,
}

impl Branch {
    fn root(target: &str) -> Self {
        Self {
            remaining: vec![target.to_string()],
            ..Self::default()
        }
    }

    /// Commit `combo → element` at `pos`, replacing the element in
    /// `remaining` with its non-basic ingredients.
    fn commit(&mut self, pos: usize, element: &str, combo: &Combo, ctx: &SearchContext) {
        self.expanded.insert(element.to_string());
        self.chosen
            .entry(element.to_string())
            .or_insert_with(|| combo.clone());

        let key = (combo.0.clone(), combo.1.clone(), element.to_string());
        if self.step_keys.insert(key) {
            self.steps.push(Step::from_combo(combo, element));
        }

        let needed: Vec<String> = [&combo.0, &combo.1]
            .into_iter()
            .filter(|i| !ctx.is_basic(i))
            .cloned()
            .collect();
        self.remaining.splice(pos..=pos, needed);
    }
}

/// Run a breadth-first search for `target`.
pub fn search(ctx: &SearchContext, target: &str, observer: &mut dyn SearchObserver) -> SearchRun {
    let start = Instant::now();
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let result = explore(ctx, target, observer, &mut seen);
    SearchRun {
        result,
        stats: SearchStats {
            nodes_explored: seen.len(),
            duration: start.elapsed(),
        },
    }
}

fn explore(
    ctx: &SearchContext,
    target: &str,
    observer: &mut dyn SearchObserver,
    seen: &mut FxHashSet<String>,
) -> Result<Path, ResolveError> {
    let mut queue = VecDeque::new();
    queue.push_back(Branch::root(target));

    while let Some(mut branch) = queue.pop_front() {
        ctx.check_budget()?;

        for id in &branch.remaining {
            if !seen.contains(id) {
                seen.insert(id.clone());
            }
        }

        let Some(pos) = branch.remaining.iter().position(|e| !ctx.is_basic(e)) else {
            // Terminal. Steps were committed top-down; emit ingredients first.
            if let Some(steps) = path::build_order(target, &branch.steps, ctx) {
                return Ok(Path {
                    target: target.to_string(),
                    steps,
                });
            }
            continue;
        };

        let element = branch.remaining[pos].clone();
        if branch.expanded.contains(&element) {
            branch.remaining.remove(pos);
            queue.push_back(branch);
            continue;
        }

        observer.on_expand(&element);
        for combo in ctx.valid_candidates(&element) {
            if let Some(existing) = branch.chosen.get(&element) {
                if existing != combo {
                    continue;
                }
            }
            let mut next = branch.clone();
            next.commit(pos, &element, combo, ctx);
            queue.push_back(next);
        }
    }

    Err(ResolveError::NoPath {
        element: target.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::index::{BasicSet, RecipeIndex, RecipeOrdering};
    use crate::core::search::Budget;
    use crate::core::types::CatalogRecord;
    use crate::events::observer::{NoopObserver, Recorder};
    use std::time::Duration;

    fn scenario() -> (RecipeIndex, BasicSet) {
        let index = RecipeIndex::from_records(&[
            CatalogRecord::new("C", 1, &[("A", "B")]),
            CatalogRecord::new("D", 2, &[("A", "C")]),
            CatalogRecord::new("E", 3, &[("C", "D")]),
        ]);
        (index, BasicSet::new(["A", "B"]))
    }

    #[test]
    fn test_al004_two_step_scenario() {
        let (index, basics) = scenario();
        let ctx = SearchContext::new(&index, &basics);
        let run = search(&ctx, "D", &mut NoopObserver);
        let p = run.result.unwrap();
        assert_eq!(
            p.steps,
            vec![Step::new("A", "B", "C"), Step::new("A", "C", "D")]
        );
    }

    #[test]
    fn test_al004_shared_ingredient_not_duplicated() {
        let (index, basics) = scenario();
        let ctx = SearchContext::new(&index, &basics);
        let run = search(&ctx, "E", &mut NoopObserver);
        let p = run.result.unwrap();
        assert_eq!(p.len(), 3);
        assert_eq!(p.steps.last().unwrap().result, "E");
        assert!(path::validate(&p, &ctx).is_empty());
        assert_eq!(run.stats.nodes_explored, 3);
    }

    #[test]
    fn test_al004_self_reference_is_no_path() {
        let index = RecipeIndex::from_records(&[CatalogRecord::new("X", 1, &[("X", "A")])]);
        let basics = BasicSet::new(["A"]);
        let ctx = SearchContext::new(&index, &basics);
        let run = search(&ctx, "X", &mut NoopObserver);
        assert_eq!(
            run.result,
            Err(ResolveError::NoPath {
                element: "X".to_string()
            })
        );
    }

    #[test]
    fn test_al004_skips_invalid_recipes() {
        let index = RecipeIndex::from_records(&[
            CatalogRecord::new("C", 1, &[("A", "B")]),
            CatalogRecord::new("D", 2, &[("Ghost", "A"), ("D", "A"), ("C", "B")]),
        ]);
        let basics = BasicSet::new(["A", "B"]);
        let ctx = SearchContext::new(&index, &basics);
        let p = search(&ctx, "D", &mut NoopObserver).result.unwrap();
        assert_eq!(p.steps.last().unwrap(), &Step::new("C", "B", "D"));
    }

    #[test]
    fn test_al004_prefers_shallow_branch() {
        // D via (C, C2) needs two more rounds, D via (A, C) only one.
        let index = RecipeIndex::from_records(&[
            CatalogRecord::new("C", 1, &[("A", "B")]),
            CatalogRecord::new("C2", 2, &[("C", "B")]),
            CatalogRecord::new("D", 3, &[("C2", "C"), ("A", "C")]),
        ]);
        let basics = BasicSet::new(["A", "B"]);
        let ctx = SearchContext::new(&index, &basics);
        let p = search(&ctx, "D", &mut NoopObserver).result.unwrap();
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn test_al004_dead_ingredient_falls_back() {
        let index = RecipeIndex::from_records(&[
            CatalogRecord::new("Dead", 1, &[]),
            CatalogRecord::new("C", 1, &[("A", "B")]),
            CatalogRecord::new("D", 2, &[("Dead", "A"), ("C", "A")]),
        ]);
        let basics = BasicSet::new(["A", "B"]);
        let ctx = SearchContext::new(&index, &basics);
        let p = search(&ctx, "D", &mut NoopObserver).result.unwrap();
        assert_eq!(p.steps, vec![Step::new("A", "B", "C"), Step::new("C", "A", "D")]);
    }

    #[test]
    fn test_al004_reports_expansions() {
        let (index, basics) = scenario();
        let ctx = SearchContext::new(&index, &basics);
        let mut rec = Recorder::default();
        search(&ctx, "D", &mut rec).result.unwrap();
        assert_eq!(rec.expanded, vec!["D", "C"]);
    }

    #[test]
    fn test_al004_deterministic() {
        let (index, basics) = scenario();
        let ctx = SearchContext::new(&index, &basics);
        let a = search(&ctx, "E", &mut NoopObserver).result.unwrap();
        let b = search(&ctx, "E", &mut NoopObserver).result.unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_al004_ordering_changes_choice() {
        let index = RecipeIndex::from_records(&[
            CatalogRecord::new("C", 1, &[("A", "B"), ("B", "A"), ("A", "A"), ("B", "B")]),
        ]);
        let basics = BasicSet::new(["A", "B"]);
        let firsts: FxHashSet<Step> = (0..32)
            .map(|seed| {
                let ord = RecipeOrdering::seeded(&index, seed);
                let ctx = SearchContext::new(&index, &basics).with_ordering(&ord);
                search(&ctx, "C", &mut NoopObserver).result.unwrap().steps[0].clone()
            })
            .collect();
        assert!(firsts.len() > 1);
    }

    #[test]
    fn test_al004_budget_timeout() {
        let (index, basics) = scenario();
        let ctx = SearchContext::new(&index, &basics).with_budget(Budget::with_limit(Duration::ZERO));
        let run = search(&ctx, "D", &mut NoopObserver);
        assert!(matches!(run.result, Err(ResolveError::AttemptTimeout { .. })));
    }
}
