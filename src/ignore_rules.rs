use std::path::Path;

use anyhow::{Context, Result};
use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::config::IgnoreConfig;

/// Decides whether a root-relative path is excluded from extraction and resolution.
pub trait IgnorePredicate: Send + Sync {
    fn should_ignore(&self, path: &Path) -> bool;
}

impl<F> IgnorePredicate for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn should_ignore(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Ignores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIgnore;

impl IgnorePredicate for NoIgnore {
    fn should_ignore(&self, _path: &Path) -> bool {
        false
    }
}

/// Gitignore-style rules anchored at the tree root.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    matcher: Gitignore,
}

impl IgnoreRules {
    /// Default patterns followed by the configured extras, so an extra
    /// `!pattern` can re-include a default exclusion.
    pub fn from_config(root: &Path, cfg: &IgnoreConfig) -> Result<Self> {
        let lines: Vec<&str> = cfg
            .default_patterns
            .iter()
            .chain(&cfg.extra_patterns)
            .map(String::as_str)
            .collect();
        Self::from_patterns(root, &lines)
    }

    /// Build a matcher from in-memory pattern lines.
    pub fn from_patterns<S: AsRef<str>>(root: &Path, patterns: &[S]) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(root);
        for line in patterns {
            builder
                .add_line(None, line.as_ref())
                .with_context(|| format!("Invalid ignore pattern: {}", line.as_ref()))?;
        }
        let matcher = builder.build().context("Failed to build ignore matcher")?;
        tracing::debug!(
            patterns = matcher.num_ignores() + matcher.num_whitelists(),
            "ignore rules built"
        );
        Ok(Self { matcher })
    }
}

impl IgnorePredicate for IgnoreRules {
    fn should_ignore(&self, path: &Path) -> bool {
        let rel = path.strip_prefix("./").unwrap_or(path);
        if rel.as_os_str().is_empty() || rel.is_absolute() {
            return false;
        }
        self.matcher.matched_path_or_any_parents(rel, false).is_ignore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> &'static Path {
        Path::new(".")
    }

    #[test]
    fn git_directory_is_ignored_by_default() {
        let rules = IgnoreRules::from_config(root(), &IgnoreConfig::default()).unwrap();
        assert!(rules.should_ignore(Path::new(".git/HEAD")));
        assert!(rules.should_ignore(Path::new(".git/refs/heads/main")));
        assert!(!rules.should_ignore(Path::new("main.go")));
    }

    #[test]
    fn extra_patterns_are_honored() {
        let cfg = IgnoreConfig {
            extra_patterns: vec![
                "node_modules/".to_string(),
                "*.log".to_string(),
                "!keep.log".to_string(),
            ],
            ..IgnoreConfig::default()
        };
        let rules = IgnoreRules::from_config(root(), &cfg).unwrap();
        assert!(rules.should_ignore(Path::new("web/node_modules/react/index.js")));
        assert!(rules.should_ignore(Path::new("debug.log")));
        assert!(!rules.should_ignore(Path::new("keep.log")));
        assert!(!rules.should_ignore(Path::new("src/app.go")));
    }

    #[test]
    fn parent_directory_matches_exclude_children() {
        let rules = IgnoreRules::from_patterns(root(), &["vendor/"]).unwrap();
        assert!(rules.should_ignore(Path::new("vendor/lib/x.go")));
        assert!(rules.should_ignore(Path::new("./vendor/lib/x.go")));
        assert!(!rules.should_ignore(Path::new("src/vendor.go")));
    }

    #[test]
    fn invalid_patterns_are_errors() {
        assert!(IgnoreRules::from_patterns(root(), &["a/{b"]).is_err());
    }

    #[test]
    fn closures_are_predicates() {
        let only_tests = |p: &Path| p.starts_with("tests");
        assert!(only_tests.should_ignore(Path::new("tests/a.go")));
        assert!(!NoIgnore.should_ignore(Path::new("tests/a.go")));
    }
}
