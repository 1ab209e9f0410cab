//! Cross-file symbol resolution.
//!
//! Phase 1 collects the type and function names referenced by each anchor.
//! Phase 2 walks the tree once and keeps every file that declares one of
//! those names. The closure is one hop: files found in phase 2 are never
//! mined for further symbols.
//!
//! Names are matched exactly with no scope or package awareness, so two
//! unrelated declarations of `Process` both match. That over-inclusion is
//! accepted in exchange for never dropping a real dependency.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use tree_sitter::Query;

use crate::cancel::CancelToken;
use crate::config::{with_workers, Config};
use crate::error::MapError;
use crate::ignore_rules::IgnorePredicate;
use crate::language::{path_ext_lower, Grammar, ResolutionSupport};
use crate::parser_pool::global_pool;
use crate::queries::{
    collect_captures, definition_query, has_match, node_text, query_set, sources, SymbolNames,
};
use crate::signature::SourceFile;
use crate::tree::{normalize_path_for_output, SourceTree};

/// Non-fatal problems met during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionWarning {
    /// The anchor's language has no verified symbol queries; it is kept
    /// but contributes no symbols.
    UnsupportedAnchor { path: String, extension: String },
    AnchorParseFailed { path: String },
    ScanParseFailed { path: String },
}

/// Anchors plus every file that defines a symbol they reference.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolutionResult {
    files: BTreeSet<String>,
    warnings: Vec<ResolutionWarning>,
}

impl ResolutionResult {
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains(path)
    }

    /// Resolved paths in ascending order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn warnings(&self) -> &[ResolutionWarning] {
        &self.warnings
    }

    pub fn into_paths(self) -> Vec<String> {
        self.files.into_iter().collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub workers: Option<usize>,
    pub cancel: CancelToken,
}

impl ResolveOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            workers: cfg.workers,
            cancel: CancelToken::new(),
        }
    }
}

/// Outcome of reading symbols from one anchor.
enum AnchorUsage {
    Unsupported,
    ParseFailed,
    Symbols(SymbolNames),
}

/// Outcome of scanning one candidate file in phase 2.
enum ScanOutcome {
    Defines(String),
    Misses,
    ParseFailed(String),
}

pub fn resolve_files<T, S>(
    anchors: &[S],
    tree: &T,
    ignore: &dyn IgnorePredicate,
) -> Result<ResolutionResult>
where
    T: SourceTree + ?Sized,
    S: AsRef<Path>,
{
    resolve_files_with(anchors, tree, ignore, &ResolveOptions::default())
}

pub fn resolve_files_with<T, S>(
    anchors: &[S],
    tree: &T,
    ignore: &dyn IgnorePredicate,
    opts: &ResolveOptions,
) -> Result<ResolutionResult>
where
    T: SourceTree + ?Sized,
    S: AsRef<Path>,
{
    let mut result = ResolutionResult::default();

    // Phase 1: usage extraction, accumulated per extension.
    let mut per_ext: BTreeMap<String, SymbolNames> = BTreeMap::new();
    for anchor in anchors {
        opts.cancel.check()?;
        let anchor = anchor.as_ref();
        let rel_path = normalize_path_for_output(anchor);
        result.files.insert(rel_path.clone());

        let content = tree
            .read(anchor)
            .with_context(|| format!("Failed to read anchor {rel_path}"))?;
        let ext = path_ext_lower(anchor);

        match anchor_usage(anchor, &content)? {
            AnchorUsage::Unsupported => {
                tracing::warn!(
                    path = %rel_path,
                    extension = %ext,
                    "no symbol queries for anchor language"
                );
                result.warnings.push(ResolutionWarning::UnsupportedAnchor {
                    path: rel_path,
                    extension: ext,
                });
            }
            AnchorUsage::ParseFailed => {
                tracing::warn!(path = %rel_path, "anchor failed to parse; no symbols extracted");
                result.warnings.push(ResolutionWarning::AnchorParseFailed { path: rel_path });
            }
            AnchorUsage::Symbols(names) => {
                tracing::debug!(
                    path = %rel_path,
                    types = names.types.len(),
                    functions = names.functions.len(),
                    "anchor symbols"
                );
                per_ext.entry(ext).or_default().extend(names);
            }
        }
    }

    // Phase 2: definition search across the rest of the tree.
    let mut queries: BTreeMap<String, (Grammar, Query)> = BTreeMap::new();
    for (ext, names) in &per_ext {
        let Some(grammar) = Grammar::from_extension(ext) else { continue };
        if let Some(q) = definition_query(grammar, names)? {
            queries.insert(ext.clone(), (grammar, q));
        }
    }
    if queries.is_empty() {
        return Ok(result);
    }

    let mut candidates: Vec<(String, PathBuf)> = tree
        .walk()
        .context("Failed to walk source tree")?
        .into_iter()
        .filter(|e| !e.is_dir && queries.contains_key(&path_ext_lower(&e.path)))
        .map(|e| (normalize_path_for_output(&e.path), e.path))
        .filter(|(rel_path, path)| !result.files.contains(rel_path) && !ignore.should_ignore(path))
        .collect();
    candidates.sort_by(|a, b| a.0.cmp(&b.0));
    tracing::debug!(
        files = candidates.len(),
        extensions = queries.len(),
        "scanning for definitions"
    );

    let outcomes: Vec<ScanOutcome> = with_workers(opts.workers, || {
        candidates
            .par_iter()
            .map(|(rel_path, path)| scan_file(tree, rel_path, path, &queries, &opts.cancel))
            .collect::<Result<Vec<_>>>()
    })?;

    for outcome in outcomes {
        match outcome {
            ScanOutcome::Defines(path) => {
                result.files.insert(path);
            }
            ScanOutcome::ParseFailed(path) => {
                tracing::warn!(path = %path, "skipping file that failed to parse");
                result.warnings.push(ResolutionWarning::ScanParseFailed { path });
            }
            ScanOutcome::Misses => {}
        }
    }

    tracing::info!(anchors = anchors.len(), files = result.files.len(), "resolution complete");
    Ok(result)
}

/// Symbol names referenced by `file`, or `None` when its language has no
/// usage queries.
pub fn symbols_used_by(file: &SourceFile) -> Result<Option<SymbolNames>> {
    match anchor_usage(&file.path, &file.content)? {
        AnchorUsage::Unsupported => Ok(None),
        AnchorUsage::ParseFailed => Err(MapError::Parse {
            path: file.path.clone(),
        }
        .into()),
        AnchorUsage::Symbols(names) => Ok(Some(names)),
    }
}

fn anchor_usage(path: &Path, source: &[u8]) -> Result<AnchorUsage, MapError> {
    let Some(grammar) = Grammar::for_path(path) else {
        return Ok(AnchorUsage::Unsupported);
    };
    let support = grammar.language().resolution_support();
    if support == ResolutionSupport::Unsupported
        || !grammar.is_available()
        || sources(grammar).usage.is_none()
    {
        return Ok(AnchorUsage::Unsupported);
    }
    if support == ResolutionSupport::Partial {
        tracing::debug!(
            path = %path.display(),
            language = grammar.language().name(),
            "partial symbol coverage"
        );
    }

    let set = query_set(grammar)?;
    let Some(usage) = &set.usage else {
        return Ok(AnchorUsage::Unsupported);
    };

    let tree = {
        let mut parser = global_pool().checkout(grammar)?;
        parser.parse_bytes(source)
    };
    let Some(tree) = tree else {
        return Ok(AnchorUsage::ParseFailed);
    };

    let mut names = SymbolNames::default();
    let mut local: BTreeSet<String> = BTreeSet::new();
    for (cap, node) in collect_captures(usage, tree.root_node(), source) {
        let text = node_text(source, node).trim();
        if text.is_empty() || set.is_denied(text) {
            continue;
        }
        match cap {
            "type.usage" => {
                names.types.insert(text.to_string());
            }
            "func.usage" => {
                names.functions.insert(text.to_string());
            }
            "ignore" => {
                local.insert(text.to_string());
            }
            _ => {}
        }
    }
    names.types.retain(|n| !local.contains(n));
    names.functions.retain(|n| !local.contains(n));

    Ok(AnchorUsage::Symbols(names))
}

fn scan_file<T>(
    tree: &T,
    rel_path: &str,
    path: &Path,
    queries: &BTreeMap<String, (Grammar, Query)>,
    cancel: &CancelToken,
) -> Result<ScanOutcome>
where
    T: SourceTree + ?Sized,
{
    cancel.check()?;

    let Some((grammar, query)) = queries.get(&path_ext_lower(path)) else {
        return Ok(ScanOutcome::Misses);
    };
    let source = tree.read(path).with_context(|| format!("Failed to read {rel_path}"))?;

    let parsed = {
        let mut parser = global_pool().checkout(*grammar)?;
        parser.parse_bytes(&source)
    };
    let Some(parsed) = parsed else {
        return Ok(ScanOutcome::ParseFailed(rel_path.to_string()));
    };

    if has_match(query, parsed.root_node(), &source) {
        tracing::debug!(path = rel_path, "defines an anchor symbol");
        Ok(ScanOutcome::Defines(rel_path.to_string()))
    } else {
        Ok(ScanOutcome::Misses)
    }
}
