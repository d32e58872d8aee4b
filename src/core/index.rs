//! AL-002: Recipe index: read-only element lookup built once per catalog load.
//!
//! `tier_of` and `recipes_of` never fail: an element missing from the catalog
//! has no tier and no recipes, which every resolver treats as a dead end.
//! Iteration follows catalog order so searches are deterministic.

use super::types::{CatalogRecord, Combo, Step};
use indexmap::{IndexMap, IndexSet};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default)]
struct Entry {
    tier: Option<u32>,
    recipes: Vec<Combo>,
}

/// Immutable element → (tier, recipes) lookup.
#[derive(Debug, Clone, Default)]
pub struct RecipeIndex {
    entries: IndexMap<String, Entry>,
}

impl RecipeIndex {
    /// Build the index. A repeated element id replaces the earlier record.
    pub fn from_records(records: &[CatalogRecord]) -> Self {
        let mut entries = IndexMap::with_capacity(records.len());
        for record in records {
            entries.insert(
                record.element.clone(),
                Entry {
                    tier: record.tier,
                    recipes: record.recipes.clone(),
                },
            );
        }
        Self { entries }
    }

    pub fn tier_of(&self, id: &str) -> Option<u32> {
        self.entries.get(id).and_then(|e| e.tier)
    }

    pub fn recipes_of(&self, id: &str) -> &[Combo] {
        self.entries
            .get(id)
            .map(|e| e.recipes.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Element ids in catalog order.
    pub fn elements(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of recipes across all elements.
    pub fn recipe_count(&self) -> usize {
        self.entries.values().map(|e| e.recipes.len()).sum()
    }

    /// Recipes of `id`, permuted by `ordering` when one is supplied.
    pub fn ordered_recipes<'a>(
        &'a self,
        id: &str,
        ordering: Option<&RecipeOrdering>,
    ) -> Vec<&'a Combo> {
        let recipes = self.recipes_of(id);
        match ordering.and_then(|o| o.permutation(id)) {
            Some(perm) if perm.len() == recipes.len() => {
                perm.iter().map(|&i| &recipes[i]).collect()
            }
            _ => recipes.iter().collect(),
        }
    }
}

/// Elements treated as freely available (tier 0). External configuration,
/// never derived from the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicSet {
    members: IndexSet<String>,
}

impl BasicSet {
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// A seeded permutation of every multi-recipe element's candidate list.
///
/// Each search attempt owns its ordering; the index itself is never mutated.
#[derive(Debug, Clone, Default)]
pub struct RecipeOrdering {
    seed: u64,
    permutations: FxHashMap<String, Vec<usize>>,
}

impl RecipeOrdering {
    pub fn seeded(index: &RecipeIndex, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut permutations = FxHashMap::default();
        for (id, entry) in &index.entries {
            if entry.recipes.len() < 2 {
                continue;
            }
            let mut perm: Vec<usize> = (0..entry.recipes.len()).collect();
            perm.shuffle(&mut rng);
            permutations.insert(id.clone(), perm);
        }
        Self { seed, permutations }
    }

    /// Seeded ordering that also moves every recipe used by one of `avoid`
    /// to the back of its element's list. Ingredient order is ignored when
    /// matching; relative order inside each group is kept.
    pub fn steered(index: &RecipeIndex, seed: u64, avoid: &[Step]) -> Self {
        let mut ordering = Self::seeded(index, seed);
        for step in avoid {
            let Some(perm) = ordering.permutations.get_mut(&step.result) else {
                continue;
            };
            let recipes = index.recipes_of(&step.result);
            let [a, b] = &step.ingredients;
            let used = |i: &usize| {
                let (x, y) = &recipes[*i];
                (x == a && y == b) || (x == b && y == a)
            };
            let (mut kept, moved): (Vec<usize>, Vec<usize>) =
                perm.iter().copied().partition(|i| !used(i));
            kept.extend(moved);
            *perm = kept;
        }
        ordering
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn permutation(&self, id: &str) -> Option<&[usize]> {
        self.permutations.get(id).map(Vec::as_slice)
    }
}
