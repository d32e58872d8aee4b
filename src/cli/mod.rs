//! AL-017: CLI subcommands: init, validate, inspect, resolve, completions.

use crate::core::orchestrator::MultiPathOptions;
use crate::core::parser::{self, Project};
use crate::core::resolve;
use crate::core::search::{Budget, SearchContext};
use crate::core::types::{Algorithm, PathReport, SearchStats, Step};
use crate::events::eventlog::EventLog;
use crate::events::hasher;
use crate::events::observer::{NoopObserver, SearchObserver};
use clap::{CommandFactory, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "alembic",
    version,
    about = "Tier-checked recipe resolution with concurrent multi-path discovery"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new alembic project
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate alembic.yaml and its catalog
    Validate {
        /// Path to alembic.yaml
        #[arg(short, long, default_value = "alembic.yaml")]
        file: PathBuf,
    },

    /// Show an element's tier and which of its recipes are usable
    Inspect {
        /// Element id
        element: String,

        /// Path to alembic.yaml
        #[arg(short, long, default_value = "alembic.yaml")]
        file: PathBuf,
    },

    /// Find how to build an element from the basics
    Resolve {
        /// Target element id
        target: String,

        /// Path to alembic.yaml
        #[arg(short, long, default_value = "alembic.yaml")]
        file: PathBuf,

        /// Search algorithm (bfs, dfs, bidirectional, bidirectional-dfs)
        #[arg(short, long)]
        algorithm: Option<Algorithm>,

        /// Number of distinct paths to look for
        #[arg(short = 'n', long)]
        paths: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Append search events to this JSONL file
        #[arg(long)]
        events: Option<PathBuf>,

        /// Include element expansions in the event log (single-path only)
        #[arg(long, requires = "events")]
        trace_expansions: bool,

        /// Base seed for recipe-order perturbation
        #[arg(long)]
        seed: Option<u64>,

        /// Simultaneously running attempts
        #[arg(long)]
        concurrency: Option<usize>,

        /// Per-attempt budget in milliseconds (0 = unbounded)
        #[arg(long)]
        budget_ms: Option<u64>,
    },

    /// Print shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

/// Flag overrides for `resolve`.
#[derive(Debug, Default)]
struct ResolveFlags {
    algorithm: Option<Algorithm>,
    paths: Option<usize>,
    json: bool,
    events: Option<PathBuf>,
    trace_expansions: bool,
    seed: Option<u64>,
    concurrency: Option<usize>,
    budget_ms: Option<u64>,
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Inspect { element, file } => cmd_inspect(&file, &element),
        Commands::Resolve {
            target,
            file,
            algorithm,
            paths,
            json,
            events,
            trace_expansions,
            seed,
            concurrency,
            budget_ms,
        } => cmd_resolve(
            &file,
            &target,
            ResolveFlags {
                algorithm,
                paths,
                json,
                events,
                trace_expansions,
                seed,
                concurrency,
                budget_ms,
            },
        ),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "alembic", &mut std::io::stdout());
            Ok(())
        }
    }
}

const CONFIG_TEMPLATE: &str = r#"version: "1.0"
catalog: recipes.json
basics: [Air, Earth, Fire, Water, Time]

search:
  algorithm: bfs
  max_paths: 1
  concurrency: 10
  attempt_multiplier: 5
  attempt_budget_ms: 5000
  seed: 0
"#;

const CATALOG_TEMPLATE: &str = r#"[
  {"element": "Mud", "tier": 1, "recipes": [["Water", "Earth"]]},
  {"element": "Steam", "tier": 1, "recipes": [["Water", "Fire"]]},
  {"element": "Brick", "tier": 2, "recipes": [["Mud", "Fire"], ["Mud", "Air"]]},
  {"element": "Cloud", "tier": 2, "recipes": [["Steam", "Air"]]},
  {"element": "Wall", "tier": 3, "recipes": [["Brick", "Brick"]]},
  {"element": "House", "tier": 4, "recipes": [["Wall", "Wall"], ["Wall", "Brick"]]}
]
"#;

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join("alembic.yaml");
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }
    std::fs::create_dir_all(path)
        .map_err(|e| format!("cannot create {}: {}", path.display(), e))?;

    std::fs::write(&config_path, CONFIG_TEMPLATE)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;
    println!("Initialized alembic project at {}", path.display());
    println!("  Created: {}", config_path.display());

    let catalog_path = path.join("recipes.json");
    if !catalog_path.exists() {
        std::fs::write(&catalog_path, CATALOG_TEMPLATE)
            .map_err(|e| format!("cannot write {}: {}", catalog_path.display(), e))?;
        println!("  Created: {}", catalog_path.display());
    }
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let config = parser::parse_config_file(file)?;
    let errors = parser::validate_config(&config);
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        return Err(format!("{} validation error(s)", errors.len()));
    }

    let project = parser::load_project(file)?;
    let findings = parser::validate_catalog(&project.records, &project.basics);
    println!(
        "OK: {} ({} elements, {} recipes, {} basics)",
        project.catalog_path.display(),
        project.index.len(),
        project.index.recipe_count(),
        project.basics.len()
    );
    println!("  Catalog: {}", project.fingerprint);
    for f in &findings {
        println!("  WARN: {}", f);
    }
    if !findings.is_empty() {
        println!(
            "  {} finding(s); affected recipes are skipped during search",
            findings.len()
        );
    }
    Ok(())
}

fn cmd_inspect(file: &Path, element: &str) -> Result<(), String> {
    let project = parser::load_project(file)?;
    let ctx = SearchContext::new(&project.index, &project.basics);
    if !ctx.is_basic(element) && !project.index.contains(element) {
        return Err(format!("element '{}' not found in catalog", element));
    }

    let tier = ctx
        .tier_of(element)
        .map(|t| t.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!("{}", element);
    println!("  Tier:  {}", tier);
    println!("  Basic: {}", if ctx.is_basic(element) { "yes" } else { "no" });

    let candidates = ctx.candidates(element);
    if candidates.is_empty() {
        println!("  Recipes: none");
        return Ok(());
    }
    println!("  Recipes:");
    for combo in candidates {
        match ctx.check_combo(combo, element) {
            Ok(()) => println!("    ok    {} + {}", combo.0, combo.1),
            Err(rejection) => println!("    skip  {} + {} ({})", combo.0, combo.1, rejection),
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct PathOutput<'a> {
    steps: &'a [Step],
    signature: &'a str,
    fingerprint: &'a str,
}

#[derive(Serialize)]
struct ResolveOutput<'a> {
    target: &'a str,
    algorithm: Algorithm,
    paths: Vec<PathOutput<'a>>,
    nodes_explored: usize,
    duration_ms: f64,
}

fn search_options(project: &Project, flags: &ResolveFlags) -> Result<MultiPathOptions, String> {
    let mut settings = project.config.search.clone();
    if let Some(n) = flags.paths {
        settings.max_paths = n;
    }
    if let Some(seed) = flags.seed {
        settings.seed = seed;
    }
    if let Some(c) = flags.concurrency {
        settings.concurrency = c;
    }
    if let Some(ms) = flags.budget_ms {
        settings.attempt_budget_ms = ms;
    }
    if settings.max_paths == 0 {
        return Err("--paths must be at least 1".to_string());
    }
    if settings.concurrency == 0 {
        return Err("--concurrency must be at least 1".to_string());
    }
    Ok(MultiPathOptions::from_settings(&settings))
}

fn cmd_resolve(file: &Path, target: &str, flags: ResolveFlags) -> Result<(), String> {
    let project = parser::load_project(file)?;
    let algorithm = flags.algorithm.unwrap_or(project.config.search.algorithm);
    let options = search_options(&project, &flags)?;
    if flags.trace_expansions && options.max_paths > 1 {
        return Err("--trace-expansions only applies to single-path searches (-n 1)".to_string());
    }

    let mut event_log = flags
        .events
        .as_deref()
        .map(|path| EventLog::new(path, flags.trace_expansions));
    let mut noop = NoopObserver;
    let observer: &mut dyn SearchObserver = match event_log.as_mut() {
        Some(log) => {
            log.search_started(target, algorithm, options.max_paths);
            log
        }
        None => &mut noop,
    };

    let (reports, stats) = if options.max_paths <= 1 {
        let budget = options
            .attempt_budget
            .map_or_else(Budget::unbounded, Budget::with_limit);
        let ctx = SearchContext::new(&project.index, &project.basics).with_budget(budget);
        let resolution = resolve::resolve_single_observed(&ctx, target, algorithm, observer)
            .map_err(|e| e.to_string())?;
        let signature = crate::core::path::signature(&resolution.path);
        let report = PathReport {
            fingerprint: hasher::signature_fingerprint(&signature),
            signature,
            path: resolution.path,
        };
        (vec![report], resolution.stats)
    } else {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .build()
            .map_err(|e| format!("cannot start runtime: {}", e))?;
        let result = runtime
            .block_on(resolve::resolve_multiple_observed(
                project.index.clone(),
                project.basics.clone(),
                target,
                algorithm,
                &options,
                observer,
            ))
            .map_err(|e| e.to_string())?;
        (result.paths, result.stats)
    };

    if flags.json {
        print_json(target, algorithm, &reports, &stats)?;
    } else {
        print_paths(target, algorithm, &reports, &stats);
    }

    if let Some(err) = event_log.as_mut().and_then(EventLog::take_error) {
        return Err(format!("event log: {}", err));
    }
    Ok(())
}

fn print_paths(target: &str, algorithm: Algorithm, reports: &[PathReport], stats: &SearchStats) {
    println!(
        "{} ({}): {} path(s), {} nodes explored in {:.2}ms",
        target,
        algorithm,
        reports.len(),
        stats.nodes_explored,
        stats.duration.as_secs_f64() * 1000.0
    );
    for (i, report) in reports.iter().enumerate() {
        println!();
        println!(
            "Path {} ({} steps, {})",
            i + 1,
            report.path.len(),
            report.fingerprint
        );
        if report.path.is_empty() {
            println!("  {} is a basic element", target);
        }
        for (n, step) in report.path.steps.iter().enumerate() {
            println!("  {:>3}. {}", n + 1, step);
        }
    }
}

fn print_json(
    target: &str,
    algorithm: Algorithm,
    reports: &[PathReport],
    stats: &SearchStats,
) -> Result<(), String> {
    let output = ResolveOutput {
        target,
        algorithm,
        paths: reports
            .iter()
            .map(|r| PathOutput {
                steps: &r.path.steps,
                signature: &r.signature,
                fingerprint: &r.fingerprint,
            })
            .collect(),
        nodes_explored: stats.nodes_explored,
        duration_ms: stats.duration.as_secs_f64() * 1000.0,
    };
    let json =
        serde_json::to_string_pretty(&output).map_err(|e| format!("JSON serialize error: {}", e))?;
    println!("{}", json);
    Ok(())
}
