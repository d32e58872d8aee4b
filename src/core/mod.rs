//! Core engine: types, recipe index, resolvers, multi-path orchestration.

pub mod bfs;
pub mod bidirectional;
pub mod dfs;
pub mod index;
pub mod orchestrator;
pub mod parser;
pub mod path;
pub mod reconstruct;
pub mod resolve;
pub mod search;
pub mod types;
