//! AL-007: Path utilities: validation, canonical signatures, build order.
//!
//! `validate` is the executable form of the path invariants: topological
//! validity, the tier invariant on every step, no duplicate steps and no
//! contradictory resolution of one element.

use super::search::SearchContext;
use super::types::{Combo, Path, Rejection, Step};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

/// A broken path invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathViolation {
    /// Ingredient neither basic nor produced by an earlier step.
    MissingIngredient { step: usize, ingredient: String },
    /// Step breaks the tier invariant.
    TierViolation { step: usize, rejection: Rejection },
    /// Same `(a, b, result)` appears twice.
    DuplicateStep { step: usize },
    /// Element produced twice with different ingredient pairs.
    ContradictoryResolution { step: usize, element: String },
    /// Last step does not produce the target.
    WrongFinalElement { expected: String, actual: Option<String> },
}

impl fmt::Display for PathViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingIngredient { step, ingredient } => write!(
                f,
                "step {}: ingredient '{}' is not available yet",
                step + 1,
                ingredient
            ),
            Self::TierViolation { step, rejection } => {
                write!(f, "step {}: {}", step + 1, rejection)
            }
            Self::DuplicateStep { step } => write!(f, "step {}: duplicate step", step + 1),
            Self::ContradictoryResolution { step, element } => write!(
                f,
                "step {}: '{}' already produced by a different recipe",
                step + 1,
                element
            ),
            Self::WrongFinalElement { expected, actual } => match actual {
                Some(a) => write!(f, "path ends at '{}', expected '{}'", a, expected),
                None => write!(f, "empty path for non-basic '{}'", expected),
            },
        }
    }
}

/// Check every path invariant. Empty result = valid.
pub fn validate(path: &Path, ctx: &SearchContext) -> Vec<PathViolation> {
    let mut violations = Vec::new();
    let mut produced: FxHashMap<&str, (&str, &str)> = FxHashMap::default();
    let mut seen: FxHashSet<(&str, &str, &str)> = FxHashSet::default();

    for (i, step) in path.steps.iter().enumerate() {
        for ingredient in &step.ingredients {
            if !ctx.is_basic(ingredient) && !produced.contains_key(ingredient.as_str()) {
                violations.push(PathViolation::MissingIngredient {
                    step: i,
                    ingredient: ingredient.clone(),
                });
            }
        }

        if let Err(rejection) = ctx.check_combo(&step.combo(), &step.result) {
            violations.push(PathViolation::TierViolation { step: i, rejection });
        }

        if !seen.insert(step.key()) {
            violations.push(PathViolation::DuplicateStep { step: i });
            continue;
        }

        let pair = (step.ingredients[0].as_str(), step.ingredients[1].as_str());
        match produced.get(step.result.as_str()) {
            Some(existing) if *existing != pair => {
                violations.push(PathViolation::ContradictoryResolution {
                    step: i,
                    element: step.result.clone(),
                });
            }
            Some(_) => {}
            None => {
                produced.insert(&step.result, pair);
            }
        }
    }

    match path.steps.last() {
        Some(last) if last.result != path.target => {
            violations.push(PathViolation::WrongFinalElement {
                expected: path.target.clone(),
                actual: Some(last.result.clone()),
            });
        }
        None if !ctx.is_basic(&path.target) => {
            violations.push(PathViolation::WrongFinalElement {
                expected: path.target.clone(),
                actual: None,
            });
        }
        _ => {}
    }

    violations
}

/// Canonical signature: sorted `result=a+b` tokens joined by `;`.
pub fn signature(path: &Path) -> String {
    let mut tokens: Vec<String> = path.steps.iter().map(Step::token).collect();
    tokens.sort();
    tokens.dedup();
    tokens.join(";")
}

/// Append `from` onto `into`, skipping any step whose result `into` already
/// produces. The first resolution of an element wins.
pub fn merge_steps(into: &mut Vec<Step>, from: &[Step]) {
    for step in from {
        if !into.iter().any(|s| s.result == step.result) {
            into.push(step.clone());
        }
    }
}

/// Order `steps` so ingredients precede consumers, keeping only the steps the
/// target needs. Returns `None` when a needed element has no step.
pub fn build_order(target: &str, steps: &[Step], ctx: &SearchContext) -> Option<Vec<Step>> {
    let mut by_result: FxHashMap<&str, &Step> = FxHashMap::default();
    for step in steps {
        by_result.entry(step.result.as_str()).or_insert(step);
    }

    fn visit<'s>(
        element: &str,
        by_result: &FxHashMap<&str, &'s Step>,
        ctx: &SearchContext,
        in_progress: &mut FxHashSet<String>,
        done: &mut FxHashSet<String>,
        out: &mut Vec<Step>,
    ) -> bool {
        if ctx.is_basic(element) || done.contains(element) {
            return true;
        }
        if !in_progress.insert(element.to_string()) {
            return false;
        }
        let Some(step) = by_result.get(element) else {
            return false;
        };
        for ingredient in &step.ingredients {
            if !visit(ingredient, by_result, ctx, in_progress, done, out) {
                return false;
            }
        }
        in_progress.remove(element);
        done.insert(element.to_string());
        out.push((*step).clone());
        true
    }

    let mut out = Vec::new();
    let mut in_progress = FxHashSet::default();
    let mut done = FxHashSet::default();
    if visit(target, &by_result, ctx, &mut in_progress, &mut done, &mut out) {
        Some(out)
    } else {
        None
    }
}

/// Join ingredient sub-paths under a final `combo → target` step.
pub fn splice(target: &str, combo: &Combo, parts: &[Path], ctx: &SearchContext) -> Option<Path> {
    let mut steps = Vec::new();
    for part in parts {
        merge_steps(&mut steps, &part.steps);
    }
    merge_steps(&mut steps, &[Step::from_combo(combo, target)]);
    let ordered = build_order(target, &steps, ctx)?;
    Some(Path {
        target: target.to_string(),
        steps: ordered,
    })
}
