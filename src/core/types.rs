//! AL-001: Core types: catalog records, steps, paths, search results.
//!
//! Defines the in-memory shapes shared by every resolver, the project config
//! schema, and the search events written to the JSONL event log. Catalog and
//! config types derive Serialize/Deserialize so any collaborator format maps
//! onto them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// An ingredient pair `(a, b)` that combines into one result element.
pub type Combo = (String, String);

// ============================================================================
// Catalog records
// ============================================================================

/// One element record as delivered by the catalog-ingestion collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Element identifier
    pub element: String,

    /// Tier (acyclicity ordering). Missing tier makes every combination
    /// producing or consuming this element invalid.
    #[serde(default)]
    pub tier: Option<u32>,

    /// Alternative ingredient pairs, in catalog order
    #[serde(default)]
    pub recipes: Vec<Combo>,

    /// Icon URL carried through from ingestion (informational)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl CatalogRecord {
    pub fn new(element: &str, tier: u32, recipes: &[(&str, &str)]) -> Self {
        Self {
            element: element.to_string(),
            tier: Some(tier),
            recipes: recipes
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
            image_url: None,
        }
    }
}

// ============================================================================
// Steps and paths
// ============================================================================

/// A single applied combination: `ingredients[0] + ingredients[1] = result`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Step {
    pub ingredients: [String; 2],
    pub result: String,
}

impl Step {
    pub fn new(a: &str, b: &str, result: &str) -> Self {
        Self {
            ingredients: [a.to_string(), b.to_string()],
            result: result.to_string(),
        }
    }

    pub fn from_combo(combo: &Combo, result: &str) -> Self {
        Self::new(&combo.0, &combo.1, result)
    }

    /// Dedup key: `(a, b, result)`.
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.ingredients[0], &self.ingredients[1], &self.result)
    }

    pub fn combo(&self) -> Combo {
        (self.ingredients[0].clone(), self.ingredients[1].clone())
    }

    /// Canonical signature token `result=a+b`.
    pub fn token(&self) -> String {
        format!(
            "{}={}+{}",
            self.result, self.ingredients[0], self.ingredients[1]
        )
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} + {} = {}",
            self.ingredients[0], self.ingredients[1], self.result
        )
    }
}

/// An ordered build sequence ending at `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    pub target: String,
    pub steps: Vec<Step>,
}

impl Path {
    /// Path for a target that needs no combination (basic element).
    pub fn trivial(target: &str) -> Self {
        Self {
            target: target.to_string(),
            steps: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Diagnostic counters for one search call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Distinct elements the search touched
    pub nodes_explored: usize,
    /// Wall-clock duration (for multi-path: the longest single attempt)
    pub duration: Duration,
}

/// Outcome of one resolver run. Stats are kept even when no path was found.
#[derive(Debug, Clone)]
pub struct SearchRun {
    pub result: Result<Path, ResolveError>,
    pub stats: SearchStats,
}

/// A successful single-path search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub path: Path,
    pub stats: SearchStats,
}

/// A path accepted by the multi-path orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathReport {
    pub path: Path,
    /// Sorted `result=a+b` tokens joined by `;`
    pub signature: String,
    /// BLAKE3 fingerprint of the signature
    pub fingerprint: String,
}

/// Result of a multi-path search.
#[derive(Debug, Clone)]
pub struct MultiPathResult {
    /// Distinct paths, ascending by step count
    pub paths: Vec<PathReport>,
    pub stats: SearchStats,
    pub attempts_launched: usize,
    pub attempts_completed: usize,
}

// ============================================================================
// Algorithms
// ============================================================================

/// Single-path search algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    #[default]
    Bfs,
    Dfs,
    Bidirectional,
    BidirectionalDfs,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bfs => write!(f, "bfs"),
            Self::Dfs => write!(f, "dfs"),
            Self::Bidirectional => write!(f, "bidirectional"),
            Self::BidirectionalDfs => write!(f, "bidirectional-dfs"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "bfs" => Ok(Self::Bfs),
            "dfs" => Ok(Self::Dfs),
            "bidirectional" | "bidi" | "bidirectional-bfs" | "bidi-bfs" => {
                Ok(Self::Bidirectional)
            }
            "bidirectional-dfs" | "bidi-dfs" => Ok(Self::BidirectionalDfs),
            other => Err(format!(
                "unknown algorithm '{}' (expected bfs, dfs, bidirectional, bidirectional-dfs)",
                other
            )),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Why a search call produced no path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Target is neither basic nor present in the recipe index.
    NotFound { element: String },
    /// Search space exhausted without reaching a terminal state.
    NoPath { element: String },
    /// A bounded attempt ran past its wall-clock budget.
    AttemptTimeout { budget: Duration },
    /// The shared cancellation signal was observed.
    Cancelled,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { element } => write!(f, "element '{}' not found in catalog", element),
            Self::NoPath { element } => write!(f, "no path found to create '{}'", element),
            Self::AttemptTimeout { budget } => {
                write!(f, "search exceeded its {}ms budget", budget.as_millis())
            }
            Self::Cancelled => write!(f, "search cancelled"),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Why a single combination was skipped during search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Ingredient tier not strictly below the result tier (includes self-reference).
    Cycle,
    /// An element of the combination has no tier information.
    InvalidTierData { element: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cycle => write!(f, "tier order violated"),
            Self::InvalidTierData { element } => write!(f, "no tier for '{}'", element),
        }
    }
}

// ============================================================================
// Project config (alembic.yaml)
// ============================================================================

/// Root project configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlembicConfig {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Catalog file, relative to the config file
    pub catalog: String,

    /// Elements treated as freely available
    pub basics: Vec<String>,

    /// Search defaults
    #[serde(default)]
    pub search: SearchSettings,
}

/// Search defaults, overridable from the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default)]
    pub algorithm: Algorithm,

    #[serde(default = "default_max_paths")]
    pub max_paths: usize,

    /// Simultaneously running attempts
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Attempts launched per requested path
    #[serde(default = "default_attempt_multiplier")]
    pub attempt_multiplier: usize,

    /// Per-attempt wall-clock budget, 0 = unbounded
    #[serde(default = "default_attempt_budget_ms")]
    pub attempt_budget_ms: u64,

    /// Base seed for recipe-order perturbation
    #[serde(default)]
    pub seed: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            max_paths: default_max_paths(),
            concurrency: default_concurrency(),
            attempt_multiplier: default_attempt_multiplier(),
            attempt_budget_ms: default_attempt_budget_ms(),
            seed: 0,
        }
    }
}

fn default_max_paths() -> usize {
    1
}

fn default_concurrency() -> usize {
    10
}

fn default_attempt_multiplier() -> usize {
    5
}

fn default_attempt_budget_ms() -> u64 {
    5000
}

// ============================================================================
// Search events
// ============================================================================

/// Search event for the JSONL event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SearchEvent {
    SearchStarted {
        run_id: String,
        target: String,
        algorithm: Algorithm,
        max_paths: usize,
    },
    ElementExpanded {
        run_id: String,
        element: String,
    },
    StepResolved {
        run_id: String,
        index: usize,
        ingredients: [String; 2],
        result: String,
    },
    PathAccepted {
        run_id: String,
        index: usize,
        steps: usize,
        fingerprint: String,
    },
    SearchCompleted {
        run_id: String,
        nodes_explored: usize,
        duration_ms: f64,
    },
}

/// Timestamped event wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: SearchEvent,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_al001_record_parse_json() {
        let json = r#"[
            {"element": "Mud", "tier": 1, "recipes": [["Water", "Earth"]], "image_url": "x.png"},
            {"element": "Air", "tier": 0}
        ]"#;
        let records: Vec<CatalogRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tier, Some(1));
        assert_eq!(
            records[0].recipes,
            vec![("Water".to_string(), "Earth".to_string())]
        );
        assert!(records[1].recipes.is_empty());
    }

    #[test]
    fn test_al001_record_missing_tier() {
        let json = r#"{"element": "Ghost", "recipes": []}"#;
        let r: CatalogRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.tier, None);
    }

    #[test]
    fn test_al001_step_display_and_token() {
        let s = Step::new("Water", "Earth", "Mud");
        assert_eq!(s.to_string(), "Water + Earth = Mud");
        assert_eq!(s.token(), "Mud=Water+Earth");
        assert_eq!(s.key(), ("Water", "Earth", "Mud"));
    }

    #[test]
    fn test_al001_step_serde_shape() {
        let s = Step::new("A", "B", "C");
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, r#"{"ingredients":["A","B"],"result":"C"}"#);
    }

    #[test]
    fn test_al001_algorithm_parse() {
        assert_eq!("bfs".parse::<Algorithm>().unwrap(), Algorithm::Bfs);
        assert_eq!("DFS".parse::<Algorithm>().unwrap(), Algorithm::Dfs);
        assert_eq!(
            "bidi".parse::<Algorithm>().unwrap(),
            Algorithm::Bidirectional
        );
        assert_eq!(
            "bidirectional_dfs".parse::<Algorithm>().unwrap(),
            Algorithm::BidirectionalDfs
        );
        assert!("astar".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_al001_algorithm_display_roundtrip() {
        for algo in [
            Algorithm::Bfs,
            Algorithm::Dfs,
            Algorithm::Bidirectional,
            Algorithm::BidirectionalDfs,
        ] {
            assert_eq!(algo.to_string().parse::<Algorithm>().unwrap(), algo);
        }
    }

    #[test]
    fn test_al001_resolve_error_display() {
        let e = ResolveError::NotFound {
            element: "Unicorn".to_string(),
        };
        assert!(e.to_string().contains("not found"));
        let e = ResolveError::NoPath {
            element: "Unicorn".to_string(),
        };
        assert!(e.to_string().contains("no path"));
        let e = ResolveError::AttemptTimeout {
            budget: Duration::from_millis(250),
        };
        assert!(e.to_string().contains("250ms"));
    }

    #[test]
    fn test_al001_config_defaults() {
        let yaml = r#"
version: "1.0"
catalog: recipes.json
basics: [Air, Earth, Fire, Water]
"#;
        let config: AlembicConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.basics.len(), 4);
        assert_eq!(config.search, SearchSettings::default());
        assert_eq!(config.search.concurrency, 10);
        assert_eq!(config.search.attempt_multiplier, 5);
    }

    #[test]
    fn test_al001_config_search_block() {
        let yaml = r#"
version: "1.0"
catalog: recipes.yaml
basics: [Air]
search:
  algorithm: bidirectional_dfs
  max_paths: 4
  seed: 9
"#;
        let config: AlembicConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.search.algorithm, Algorithm::BidirectionalDfs);
        assert_eq!(config.search.max_paths, 4);
        assert_eq!(config.search.seed, 9);
        assert_eq!(config.search.attempt_budget_ms, 5000);
    }

    #[test]
    fn test_al001_search_event_serde() {
        let event = SearchEvent::SearchStarted {
            run_id: "r-abc".to_string(),
            target: "Mud".to_string(),
            algorithm: Algorithm::Dfs,
            max_paths: 1,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"search_started\""));
        assert!(json.contains("\"algorithm\":\"dfs\""));
    }
}
