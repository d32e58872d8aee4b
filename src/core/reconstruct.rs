//! AL-008: Path reconstruction from an element → combo map.
//!
//! Kahn-style: start from the basics, repeatedly make available every pending
//! element whose chosen ingredients are already available, stop once the
//! target is built. Elements with no recorded combo (or a recorded combo that
//! breaks the tier invariant) fall back to the first tier-valid recipe in the
//! index whose ingredients are available. If a scan makes no progress, one
//! relaxed scan lets recorded elements fall back too before giving up.

use super::path;
use super::search::SearchContext;
use super::types::{Combo, Step};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashSet;

/// Rebuild a build order for `target`. Basics never appear as results, no
/// element is produced twice, and entries the target does not need are
/// dropped. Returns `None` when the target cannot be built.
pub fn reconstruct(
    target: &str,
    combos: &IndexMap<String, Combo>,
    ctx: &SearchContext,
) -> Option<Vec<Step>> {
    if ctx.is_basic(target) {
        return Some(Vec::new());
    }

    let mut pending: IndexSet<String> = IndexSet::new();
    pending.insert(target.to_string());
    for (element, (a, b)) in combos {
        for id in [element, a, b] {
            if !ctx.is_basic(id) {
                pending.insert(id.clone());
            }
        }
    }

    let mut available: FxHashSet<String> = ctx.basics.iter().map(str::to_string).collect();
    let mut order: Vec<Step> = Vec::new();
    let mut relaxed = false;

    while !available.contains(target) {
        let snapshot: Vec<String> = pending.iter().cloned().collect();
        let mut progressed = false;

        for element in snapshot {
            let ready = |c: &Combo| available.contains(&c.0) && available.contains(&c.1);
            let recorded = combos
                .get(&element)
                .filter(|c| ctx.check_combo(c, &element).is_ok());

            let chosen = match recorded {
                Some(c) if ready(c) => Some(c.clone()),
                Some(_) if !relaxed => None,
                _ => ctx
                    .valid_candidates(&element)
                    .into_iter()
                    .find(|c| ready(*c))
                    .cloned(),
            };

            if let Some(combo) = chosen {
                order.push(Step::from_combo(&combo, &element));
                available.insert(element.clone());
                pending.shift_remove(&element);
                progressed = true;
            }
        }

        if progressed {
            relaxed = false;
        } else if !relaxed {
            relaxed = true;
        } else {
            return None;
        }
    }

    let needed: FxHashSet<String> = path::build_order(target, &order, ctx)?
        .into_iter()
        .map(|s| s.result)
        .collect();
    order.retain(|s| needed.contains(&s.result));
    Some(order)
}
