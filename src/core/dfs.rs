//! AL-005: Depth-first resolver.
//!
//! Recursive and memoized. The cycle guard is an explicit chain of
//! ancestors passed down the recursion, so an element already being resolved
//! higher up the same branch fails locally without touching the memo.
//! Policy: the first recipe (in candidate order) whose ingredients both
//! resolve wins. No attempt is made to minimise step count.

use super::path;
use super::search::SearchContext;
use super::types::{Path, ResolveError, SearchRun, SearchStats, Step};
use crate::events::observer::SearchObserver;
use rustc_hash::{FxHashMap, FxHashSet};
use std::time::Instant;

/// Elements on the current recursion branch, innermost first.
#[derive(Debug, Clone, Copy)]
struct Ancestors<'p> {
    element: &'p str,
    parent: Option<&'p Ancestors<'p>>,
}

impl Ancestors<'_> {
    fn contains(&self, id: &str) -> bool {
        let mut cursor = Some(self);
        while let Some(frame) = cursor {
            if frame.element == id {
                return true;
            }
            cursor = frame.parent;
        }
        false
    }
}

struct Walker<'c, 'a, 'o> {
    ctx: &'c SearchContext<'a>,
    observer: &'o mut dyn SearchObserver,
    memo: FxHashMap<String, Option<Vec<Step>>>,
    seen: FxHashSet<String>,
}

impl Walker<'_, '_, '_> {
    fn resolve(
        &mut self,
        element: &str,
        ancestors: Option<&Ancestors<'_>>,
    ) -> Result<Option<Vec<Step>>, ResolveError> {
        if self.ctx.is_basic(element) {
            return Ok(Some(Vec::new()));
        }
        if ancestors.is_some_and(|a| a.contains(element)) {
            return Ok(None);
        }
        if let Some(hit) = self.memo.get(element) {
            return Ok(hit.clone());
        }

        self.seen.insert(element.to_string());
        self.observer.on_expand(element);
        let frame = Ancestors {
            element,
            parent: ancestors,
        };

        for combo in self.ctx.valid_candidates(element) {
            self.ctx.check_budget()?;
            let Some(mut steps) = self.resolve(&combo.0, Some(&frame))? else {
                continue;
            };
            let Some(right) = self.resolve(&combo.1, Some(&frame))? else {
                continue;
            };
            path::merge_steps(&mut steps, &right);
            path::merge_steps(&mut steps, &[Step::from_combo(combo, element)]);
            self.memo.insert(element.to_string(), Some(steps.clone()));
            return Ok(Some(steps));
        }

        self.memo.insert(element.to_string(), None);
        Ok(None)
    }
}

/// Run a depth-first search for `target`.
pub fn search(ctx: &SearchContext, target: &str, observer: &mut dyn SearchObserver) -> SearchRun {
    let start = Instant::now();
    let mut walker = Walker {
        ctx,
        observer,
        memo: FxHashMap::default(),
        seen: FxHashSet::default(),
    };

    let result = match walker.resolve(target, None) {
        Ok(Some(steps)) => Ok(Path {
            target: target.to_string(),
            steps,
        }),
        Ok(None) => Err(ResolveError::NoPath {
            element: target.to_string(),
        }),
        Err(e) => Err(e),
    };

    SearchRun {
        result,
        stats: SearchStats {
            nodes_explored: walker.seen.len(),
            duration: start.elapsed(),
        },
    }
}
