//! AL-003: Search context: the read-only view every resolver runs against.
//!
//! Bundles the recipe index, the basic set, an optional per-attempt recipe
//! ordering and the attempt budget. The tier invariant lives here:
//! `tier(a) < tier(result)` and `tier(b) < tier(result)`, strictly, with
//! basics at tier 0.

use super::index::{BasicSet, RecipeIndex, RecipeOrdering};
use super::types::{Combo, Rejection, ResolveError};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Wall-clock limit and cooperative cancellation for one attempt.
#[derive(Debug, Clone, Default)]
pub struct Budget {
    limit: Option<(Instant, Duration)>,
    cancel: Option<CancellationToken>,
}

impl Budget {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Budget that expires `limit` from now.
    pub fn with_limit(limit: Duration) -> Self {
        Self {
            limit: Some((Instant::now() + limit, limit)),
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Called at loop boundaries. Cancellation wins over timeout.
    pub fn check(&self) -> Result<(), ResolveError> {
        if let Some(ref token) = self.cancel {
            if token.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }
        }
        if let Some((deadline, budget)) = self.limit {
            if Instant::now() >= deadline {
                return Err(ResolveError::AttemptTimeout { budget });
            }
        }
        Ok(())
    }
}

/// Everything a single-path resolver reads.
#[derive(Debug, Clone)]
pub struct SearchContext<'a> {
    pub index: &'a RecipeIndex,
    pub basics: &'a BasicSet,
    ordering: Option<&'a RecipeOrdering>,
    budget: Budget,
}

impl<'a> SearchContext<'a> {
    pub fn new(index: &'a RecipeIndex, basics: &'a BasicSet) -> Self {
        Self {
            index,
            basics,
            ordering: None,
            budget: Budget::unbounded(),
        }
    }

    pub fn with_ordering(mut self, ordering: &'a RecipeOrdering) -> Self {
        self.ordering = Some(ordering);
        self
    }

    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    pub fn is_basic(&self, id: &str) -> bool {
        self.basics.contains(id)
    }

    /// Basics are tier 0 regardless of what the catalog says.
    pub fn tier_of(&self, id: &str) -> Option<u32> {
        if self.is_basic(id) {
            Some(0)
        } else {
            self.index.tier_of(id)
        }
    }

    /// Check the tier invariant for `combo → result`.
    pub fn check_combo(&self, combo: &Combo, result: &str) -> Result<(), Rejection> {
        let missing = |element: &str| Rejection::InvalidTierData {
            element: element.to_string(),
        };
        let result_tier = self.tier_of(result).ok_or_else(|| missing(result))?;
        let a_tier = self.tier_of(&combo.0).ok_or_else(|| missing(&combo.0))?;
        let b_tier = self.tier_of(&combo.1).ok_or_else(|| missing(&combo.1))?;
        if a_tier >= result_tier || b_tier >= result_tier {
            return Err(Rejection::Cycle);
        }
        Ok(())
    }

    /// Candidate recipes of `id` in this context's order.
    pub fn candidates(&self, id: &str) -> Vec<&'a Combo> {
        self.index.ordered_recipes(id, self.ordering)
    }

    /// Candidates that pass the tier invariant.
    pub fn valid_candidates(&self, id: &str) -> Vec<&'a Combo> {
        self.candidates(id)
            .into_iter()
            .filter(|c| self.check_combo(c, id).is_ok())
            .collect()
    }

    pub fn check_budget(&self) -> Result<(), ResolveError> {
        self.budget.check()
    }
}
