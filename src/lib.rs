//! Alembic, a recipe resolution engine.
//!
//! Finds how to build a target element from a set of basics through pairwise
//! recipes, with tier order as the acyclicity guarantee. BFS, DFS and
//! bidirectional resolvers, plus a concurrent orchestrator that races
//! perturbed attempts for distinct paths.

pub mod cli;
pub mod core;
pub mod events;
