#![allow(dead_code)]

use std::path::Path;

use codemap::{IgnoreRules, MemoryTree};
use tracing_subscriber::EnvFilter;

/// Route `tracing` output through the test harness; honours `RUST_LOG`.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn tree(files: &[(&str, &str)]) -> MemoryTree {
    let mut t = MemoryTree::new();
    for (path, content) in files {
        t.insert(*path, content.as_bytes().to_vec());
    }
    t
}

/// Rules anchored at an in-memory tree root.
pub fn rules(patterns: &[&str]) -> IgnoreRules {
    IgnoreRules::from_patterns(Path::new("."), patterns).unwrap()
}
