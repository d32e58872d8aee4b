//! AL-013: Config and catalog loading and validation.
//!
//! Parses alembic.yaml and the recipe catalog it points at, and validates
//! structural constraints:
//! - Version must be "1.0"
//! - Basics must be non-empty and unique
//! - Search settings must be usable (concurrency, multiplier, max_paths >= 1)
//! - Catalog ids must be non-empty and unique
//! - Recipes should respect the tier order
//!
//! Catalog findings are reported, never fatal: the resolvers skip any
//! combination that breaks the tier order anyway.

use super::index::{BasicSet, RecipeIndex};
use super::types::{AlembicConfig, CatalogRecord};
use crate::events::hasher;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

fn finding(message: String) -> ValidationError {
    ValidationError { message }
}

/// Parse an alembic.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<AlembicConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_config(&content)
}

/// Parse an alembic.yaml from a string.
pub fn parse_config(yaml: &str) -> Result<AlembicConfig, String> {
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &AlembicConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(finding(format!(
            "version must be \"1.0\", got \"{}\"",
            config.version
        )));
    }

    if config.catalog.trim().is_empty() {
        errors.push(finding("catalog path must not be empty".to_string()));
    }

    if config.basics.is_empty() {
        errors.push(finding("basics must not be empty".to_string()));
    }
    let mut seen = FxHashSet::default();
    for basic in &config.basics {
        if basic.is_empty() {
            errors.push(finding("basics contains an empty element id".to_string()));
        } else if !seen.insert(basic.as_str()) {
            errors.push(finding(format!("basic '{}' listed twice", basic)));
        }
    }

    let search = &config.search;
    if search.concurrency == 0 {
        errors.push(finding("search.concurrency must be at least 1".to_string()));
    }
    if search.attempt_multiplier == 0 {
        errors.push(finding(
            "search.attempt_multiplier must be at least 1".to_string(),
        ));
    }
    if search.max_paths == 0 {
        errors.push(finding("search.max_paths must be at least 1".to_string()));
    }

    errors
}

/// Parse catalog records. YAML for `.yaml`/`.yml`, JSON otherwise.
pub fn parse_catalog(content: &str, path: &Path) -> Result<Vec<CatalogRecord>, String> {
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        serde_yaml_ng::from_str(content).map_err(|e| format!("YAML parse error: {}", e))
    } else {
        serde_json::from_str(content).map_err(|e| format!("JSON parse error: {}", e))
    }
}

/// Load catalog records from disk.
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogRecord>, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read catalog {}: {}", path.display(), e))?;
    parse_catalog(&content, path).map_err(|e| format!("{}: {}", path.display(), e))
}

/// Structural findings for a catalog. Returns a list (empty = clean).
pub fn validate_catalog(records: &[CatalogRecord], basics: &BasicSet) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut tiers: FxHashMap<&str, Option<u32>> = FxHashMap::default();
    let mut seen = FxHashSet::default();

    for record in records {
        if record.element.is_empty() {
            errors.push(finding("catalog record with empty element id".to_string()));
            continue;
        }
        if !seen.insert(record.element.as_str()) {
            errors.push(finding(format!(
                "element '{}' defined more than once (last definition wins)",
                record.element
            )));
        }
        tiers.insert(&record.element, record.tier);
    }

    let tier_of = |id: &str| -> Option<u32> {
        if basics.contains(id) {
            Some(0)
        } else {
            tiers.get(id).copied().flatten()
        }
    };

    for record in records {
        let element = record.element.as_str();
        if element.is_empty() {
            continue;
        }
        if tier_of(element).is_none() {
            errors.push(finding(format!("element '{}' has no tier", element)));
        }

        for (a, b) in &record.recipes {
            if a == element || b == element {
                errors.push(finding(format!(
                    "element '{}' has self-referencing recipe {} + {}",
                    element, a, b
                )));
                continue;
            }
            for ingredient in [a, b] {
                if tier_of(ingredient).is_none() {
                    errors.push(finding(format!(
                        "recipe {} + {} for '{}' references '{}' which has no tier",
                        a, b, element, ingredient
                    )));
                }
            }
            if let (Some(rt), Some(at), Some(bt)) = (tier_of(element), tier_of(a), tier_of(b)) {
                if at >= rt || bt >= rt {
                    errors.push(finding(format!(
                        "recipe {} + {} (tiers {}, {}) cannot produce '{}' (tier {})",
                        a, b, at, bt, element, rt
                    )));
                }
            }
        }
    }

    errors
}

/// A loaded project: config plus the index built from its catalog.
#[derive(Debug, Clone)]
pub struct Project {
    pub config: AlembicConfig,
    pub records: Vec<CatalogRecord>,
    pub index: Arc<RecipeIndex>,
    pub basics: Arc<BasicSet>,
    pub catalog_path: PathBuf,
    /// BLAKE3 hash of the catalog file
    pub fingerprint: String,
}

/// Load alembic.yaml, validate it and load the catalog it names. The catalog
/// path is relative to the config file's directory.
pub fn load_project(config_path: &Path) -> Result<Project, String> {
    let config = parse_config_file(config_path)?;
    let errors = validate_config(&config);
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(format!(
            "invalid config {}: {}",
            config_path.display(),
            messages.join("; ")
        ));
    }

    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    let catalog_path = base.join(&config.catalog);
    let records = load_catalog(&catalog_path)?;
    let fingerprint = hasher::hash_file(&catalog_path)?;

    Ok(Project {
        index: Arc::new(RecipeIndex::from_records(&records)),
        basics: Arc::new(BasicSet::new(config.basics.iter().cloned())),
        config,
        records,
        catalog_path,
        fingerprint,
    })
}
