use serde::{Deserialize, Serialize};
use std::path::Path;

/// File read from the tree root; missing or malformed means defaults.
pub const CONFIG_FILE_NAME: &str = ".codemap.json";

/// Controls which paths are excluded from extraction and resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Patterns applied first.
    pub default_patterns: Vec<String>,

    /// Project-specific patterns (e.g. "node_modules/", "*.pb.go").
    pub extra_patterns: Vec<String>,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            default_patterns: vec![".git/**".to_string()],
            extra_patterns: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// String literals with more characters than this are truncated in signature views.
    pub max_literal_len: usize,
    pub ignore: IgnoreConfig,
    /// Worker threads for per-file fan-out. `None` uses one per CPU core.
    pub workers: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_literal_len: 100,
            ignore: IgnoreConfig::default(),
            workers: None,
        }
    }
}

pub fn load_config(repo_root: &Path) -> Config {
    let primary = repo_root.join(CONFIG_FILE_NAME);

    let text = std::fs::read_to_string(&primary);
    let Ok(text) = text else { return Config::default() };

    serde_json::from_str::<Config>(&text).unwrap_or_else(|e| {
        tracing::warn!(path = %primary.display(), error = %e, "ignoring malformed config");
        Config::default()
    })
}

/// Run `f` on a dedicated pool when `workers` is set, otherwise on rayon's global pool.
pub(crate) fn with_workers<T: Send>(workers: Option<usize>, f: impl FnOnce() -> T + Send) -> T {
    match workers.filter(|n| *n > 0) {
        Some(n) => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
            Ok(pool) => pool.install(f),
            Err(e) => {
                tracing::warn!(error = %e, "falling back to the global worker pool");
                f()
            }
        },
        None => f(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config(dir.path());
        assert_eq!(cfg.max_literal_len, 100);
        assert_eq!(cfg.ignore.default_patterns, vec![".git/**".to_string()]);
        assert!(cfg.workers.is_none());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{ "max_literal_len": 40, "ignore": { "extra_patterns": ["dist/"] } }"#,
        )
        .unwrap();
        let cfg = load_config(dir.path());
        assert_eq!(cfg.max_literal_len, 40);
        assert_eq!(cfg.ignore.extra_patterns, vec!["dist/".to_string()]);
        assert_eq!(cfg.ignore.default_patterns, vec![".git/**".to_string()]);
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{ not json").unwrap();
        assert_eq!(load_config(dir.path()).max_literal_len, 100);
    }

    #[test]
    fn dedicated_pool_runs_closure() {
        assert_eq!(with_workers(Some(2), || rayon::current_num_threads()), 2);
        assert_eq!(with_workers(None, || 7), 7);
    }
}
