//! Events: search observers, JSONL event log, BLAKE3 fingerprints.

pub mod eventlog;
pub mod hasher;
pub mod observer;
