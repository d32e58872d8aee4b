//! AL-006: Bidirectional resolver.
//!
//! Alternates a forward round (elements buildable from what is already
//! reachable) with a backward round (decompose the target's requirements).
//! After every round the two sides are checked for a meeting point; on a
//! meeting the recorded combos are merged and handed to the reconstructor.
//! `Traversal::Depth` swaps both frontiers for stacks; the meeting and
//! reconstruction contract is unchanged.

use super::reconstruct::reconstruct;
use super::search::SearchContext;
use super::types::{Combo, Path, ResolveError, SearchRun, SearchStats, Step};
use crate::events::observer::SearchObserver;
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::time::Instant;

/// Frontier discipline for both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Whole layers per round (FIFO).
    Breadth,
    /// One element per round, most recently discovered first (LIFO).
    Depth,
}

struct Frontiers<'c, 'a> {
    ctx: &'c SearchContext<'a>,
    target: &'c str,
    traversal: Traversal,
    /// Reachable from basics, tagged with the constructing combo.
    forward: IndexMap<String, Option<Combo>>,
    /// Discovered but not yet added (Depth only).
    forward_stack: Vec<(String, Combo)>,
    stacked: FxHashSet<String>,
    /// Required by the target, tagged with (consumer, consumer's combo).
    backward: IndexMap<String, Option<(String, Combo)>>,
    frontier: VecDeque<String>,
    /// Meeting points already tried, with the forward size at the time.
    tried: FxHashMap<String, usize>,
    seen: FxHashSet<String>,
}

impl<'c, 'a> Frontiers<'c, 'a> {
    fn new(ctx: &'c SearchContext<'a>, target: &'c str, traversal: Traversal) -> Self {
        let forward = ctx.basics.iter().map(|b| (b.to_string(), None)).collect();
        let mut backward = IndexMap::new();
        backward.insert(target.to_string(), None);
        let mut seen = FxHashSet::default();
        seen.insert(target.to_string());
        Self {
            ctx,
            target,
            traversal,
            forward,
            forward_stack: Vec::new(),
            stacked: FxHashSet::default(),
            backward,
            frontier: VecDeque::from([target.to_string()]),
            tried: FxHashMap::default(),
            seen,
        }
    }

    fn run(&mut self, observer: &mut dyn SearchObserver) -> Result<Path, ResolveError> {
        loop {
            self.ctx.check_budget()?;
            let forward_grew = self.forward_round(observer);
            if let Some(path) = self.meet() {
                return Ok(path);
            }

            self.ctx.check_budget()?;
            let backward_grew = self.backward_round(observer);
            if let Some(path) = self.meet() {
                return Ok(path);
            }

            if !forward_grew
                && !backward_grew
                && self.forward_stack.is_empty()
                && self.frontier.is_empty()
            {
                return Err(ResolveError::NoPath {
                    element: self.target.to_string(),
                });
            }
        }
    }

    fn buildable(&self, combo: &Combo) -> bool {
        self.forward.contains_key(&combo.0) && self.forward.contains_key(&combo.1)
    }

    fn forward_round(&mut self, observer: &mut dyn SearchObserver) -> bool {
        let discovered: Vec<(String, Combo)> = self
            .ctx
            .index
            .elements()
            .filter(|e| !self.forward.contains_key(*e) && !self.stacked.contains(*e))
            .filter_map(|e| {
                self.ctx
                    .valid_candidates(e)
                    .into_iter()
                    .find(|c| self.buildable(c))
                    .map(|c| (e.to_string(), c.clone()))
            })
            .collect();

        match self.traversal {
            Traversal::Breadth => {
                let grew = !discovered.is_empty();
                for (element, combo) in discovered {
                    self.add_forward(element, combo, observer);
                }
                grew
            }
            Traversal::Depth => {
                for (element, combo) in discovered {
                    self.stacked.insert(element.clone());
                    self.forward_stack.push((element, combo));
                }
                match self.forward_stack.pop() {
                    Some((element, combo)) => {
                        self.stacked.remove(&element);
                        self.add_forward(element, combo, observer);
                        true
                    }
                    None => false,
                }
            }
        }
    }

    fn add_forward(&mut self, element: String, combo: Combo, observer: &mut dyn SearchObserver) {
        observer.on_expand(&element);
        self.seen.insert(element.clone());
        self.forward.insert(element, Some(combo));
    }

    fn backward_round(&mut self, observer: &mut dyn SearchObserver) -> bool {
        let batch: Vec<String> = match self.traversal {
            Traversal::Breadth => self.frontier.drain(..).collect(),
            Traversal::Depth => self.frontier.pop_back().into_iter().collect(),
        };

        let mut grew = false;
        for element in batch {
            observer.on_expand(&element);
            for combo in self.ctx.valid_candidates(&element) {
                for ingredient in [&combo.0, &combo.1] {
                    if self.backward.contains_key(ingredient) {
                        continue;
                    }
                    self.backward
                        .insert(ingredient.clone(), Some((element.clone(), combo.clone())));
                    self.seen.insert(ingredient.clone());
                    if !self.ctx.is_basic(ingredient) {
                        self.frontier.push_back(ingredient.clone());
                    }
                    grew = true;
                }
            }
        }
        grew
    }

    fn forward_combos(&self) -> IndexMap<String, Combo> {
        self.forward
            .iter()
            .filter_map(|(e, c)| c.as_ref().map(|c| (e.clone(), c.clone())))
            .collect()
    }

    /// Combos along the backward chain from `element` up to the target.
    fn backward_chain(&self, element: &str) -> IndexMap<String, Combo> {
        let mut combos = IndexMap::new();
        let mut cursor = element;
        while let Some(Some((consumer, combo))) = self.backward.get(cursor) {
            combos
                .entry(consumer.clone())
                .or_insert_with(|| combo.clone());
            cursor = consumer.as_str();
        }
        combos
    }

    fn meet(&mut self) -> Option<Path> {
        if self.forward.contains_key(self.target) {
            if let Some(steps) = reconstruct(self.target, &self.forward_combos(), self.ctx) {
                return Some(self.path(steps));
            }
        }

        let size = self.forward.len();
        let meeting: Vec<String> = self
            .backward
            .keys()
            .filter(|e| e.as_str() != self.target && self.forward.contains_key(e.as_str()))
            .filter(|e| self.tried.get(e.as_str()).is_none_or(|&at| at < size))
            .cloned()
            .collect();

        for element in meeting {
            self.tried.insert(element.clone(), size);
            let mut combos = self.backward_chain(&element);
            // Forward combos are known to be buildable; they take precedence.
            for (e, c) in self.forward_combos() {
                combos.insert(e, c);
            }
            if let Some(steps) = reconstruct(self.target, &combos, self.ctx) {
                return Some(self.path(steps));
            }
        }
        None
    }

    fn path(&self, steps: Vec<Step>) -> Path {
        Path {
            target: self.target.to_string(),
            steps,
        }
    }
}

/// Run a bidirectional search for `target`.
pub fn search(
    ctx: &SearchContext,
    target: &str,
    traversal: Traversal,
    observer: &mut dyn SearchObserver,
) -> SearchRun {
    let start = Instant::now();
    let mut frontiers = Frontiers::new(ctx, target, traversal);
    let result = frontiers.run(observer);
    SearchRun {
        result,
        stats: SearchStats {
            nodes_explored: frontiers.seen.len(),
            duration: start.elapsed(),
        },
    }
}
