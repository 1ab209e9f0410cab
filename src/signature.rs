use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use tree_sitter::Node;

use crate::cancel::CancelToken;
use crate::config::{with_workers, Config};
use crate::cut::{cut, CutRange};
use crate::error::MapError;
use crate::ignore_rules::IgnorePredicate;
use crate::language::Grammar;
use crate::parser_pool::global_pool;
use crate::queries::{collect_captures, node_text, query_set, QuerySet};
use crate::tree::{looks_like_text, normalize_path_for_output, SourceTree};

/// Statement left in place of an elided Python body.
const STUB: &str = "pass";

/// A file read from a tree. Never mutated; extraction builds new buffers.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: Vec<u8>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// A file with bodies elided and long literals truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureView {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub max_literal_len: usize,
    pub workers: Option<usize>,
    pub cancel: CancelToken,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ExtractOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            max_literal_len: cfg.max_literal_len,
            workers: cfg.workers,
            cancel: CancelToken::new(),
        }
    }
}

/// Reduce one file to its signature view.
///
/// Unrecognized extensions (and grammars compiled out of this build) pass
/// through unchanged.
pub fn extract_signature(file: &SourceFile, max_literal_len: usize) -> Result<String> {
    let Some(grammar) = Grammar::for_path(&file.path).filter(|g| g.is_available()) else {
        return Ok(String::from_utf8_lossy(&file.content).into_owned());
    };

    let set = query_set(grammar)?;
    let source = file.content.as_slice();

    let tree = {
        let mut parser = global_pool().checkout(grammar)?;
        parser.parse_bytes(source).ok_or_else(|| MapError::Parse {
            path: file.path.clone(),
        })?
    };
    let root = tree.root_node();

    let (mut ranges, bodies) = body_ranges(set, root, source);
    ranges.extend(literal_ranges(set, root, source, &bodies, max_literal_len));

    let reduced = cut(source, &ranges)
        .with_context(|| format!("Invalid cut set for {}", file.path.display()))?;
    Ok(normalize(&String::from_utf8_lossy(&reduced)))
}

/// Signature views for every text file in `tree`, sorted by path.
///
/// The first read or extraction failure aborts the whole call.
pub fn generate_output<T>(
    tree: &T,
    max_literal_len: usize,
    ignore: &dyn IgnorePredicate,
) -> Result<Vec<SignatureView>>
where
    T: SourceTree + ?Sized,
{
    let opts = ExtractOptions {
        max_literal_len,
        ..ExtractOptions::default()
    };
    generate_output_with(tree, ignore, &opts)
}

pub fn generate_output_with<T>(
    tree: &T,
    ignore: &dyn IgnorePredicate,
    opts: &ExtractOptions,
) -> Result<Vec<SignatureView>>
where
    T: SourceTree + ?Sized,
{
    let mut candidates: Vec<(String, PathBuf)> = tree
        .walk()
        .context("Failed to walk source tree")?
        .into_iter()
        .filter(|e| !e.is_dir && !ignore.should_ignore(&e.path))
        .map(|e| (normalize_path_for_output(&e.path), e.path))
        .collect();
    candidates.sort_by(|a, b| a.0.cmp(&b.0));
    tracing::debug!(files = candidates.len(), "extracting signatures");

    let views: Vec<Option<SignatureView>> = with_workers(opts.workers, || {
        candidates
            .par_iter()
            .map(|(rel_path, path)| view_for(tree, rel_path, path, opts))
            .collect::<Result<Vec<_>>>()
    })?;

    let views: Vec<SignatureView> = views.into_iter().flatten().collect();
    tracing::info!(files = views.len(), "signature views generated");
    Ok(views)
}

fn view_for<T>(
    tree: &T,
    rel_path: &str,
    path: &Path,
    opts: &ExtractOptions,
) -> Result<Option<SignatureView>>
where
    T: SourceTree + ?Sized,
{
    opts.cancel.check()?;

    let content = tree.read(path).with_context(|| format!("Failed to read {rel_path}"))?;
    if !looks_like_text(&content) {
        tracing::debug!(path = rel_path, "skipping non-text file");
        return Ok(None);
    }

    let file = SourceFile::new(path, content);
    let reduced = extract_signature(&file, opts.max_literal_len)
        .with_context(|| format!("Failed to generate signature view for {rel_path}"))?;
    Ok(Some(SignatureView {
        path: rel_path.to_string(),
        content: reduced,
    }))
}

// ── Body elision ────────────────────────────────────────────────────────────

/// Cut ranges for executable bodies, plus the outermost body node spans used
/// to skip literals that vanish with a body.
fn body_ranges(set: &QuerySet, root: Node, source: &[u8]) -> (Vec<CutRange>, Vec<(usize, usize)>) {
    let mut ranges = Vec::new();
    let mut spans = Vec::new();

    for (name, node) in collect_captures(&set.body, root, source) {
        let range = match name {
            "body" => Some(CutRange::new(gap_start(source, node.start_byte()), node.end_byte())),
            "body.inline" => Some(CutRange::new(node.start_byte(), node.end_byte()).prefixed("{}")),
            "body.stub" => stub_range(node, source),
            _ => continue,
        };
        spans.push((node.start_byte(), node.end_byte()));
        ranges.extend(range);
    }

    (ranges, outermost(spans))
}

/// Start of the run of spaces and tabs ending at `at`, so removing a body
/// does not leave `func f() ` behind.
fn gap_start(source: &[u8], at: usize) -> usize {
    let mut start = at;
    while start > 0 && matches!(source[start - 1], b' ' | b'\t') {
        start -= 1;
    }
    start
}

/// Replace an indentation-scoped body with `pass`, keeping a leading
/// docstring. A body holding only its docstring is left alone.
fn stub_range(block: Node, source: &[u8]) -> Option<CutRange> {
    let mut end = block.end_byte();
    // The block swallows the newline of its last statement; keep it so the
    // next declaration stays on its own line.
    while end > block.start_byte() && source[end - 1].is_ascii_whitespace() {
        end -= 1;
    }

    match leading_docstring(block) {
        Some(doc) if end <= doc.end_byte() => None,
        Some(doc) => {
            let indent = line_indent(source, doc.start_byte());
            Some(CutRange::new(doc.end_byte(), end).prefixed(format!("\n{indent}{STUB}")))
        }
        None => Some(CutRange::new(block.start_byte(), end).prefixed(STUB)),
    }
}

fn leading_docstring(block: Node) -> Option<Node> {
    let mut cursor = block.walk();
    let first = block.named_children(&mut cursor).find(|n| n.kind() != "comment")?;
    is_docstring_statement(first).then_some(first)
}

fn is_docstring_statement(stmt: Node) -> bool {
    stmt.kind() == "expression_statement"
        && stmt.named_child_count() == 1
        && stmt.named_child(0).is_some_and(|c| c.kind() == "string")
}

fn line_indent(source: &[u8], at: usize) -> String {
    let line_start = source[..at].iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
    source[line_start..at]
        .iter()
        .take_while(|b| **b == b' ' || **b == b'\t')
        .map(|b| *b as char)
        .collect()
}

fn outermost(mut spans: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
    let mut out: Vec<(usize, usize)> = Vec::new();
    for s in spans {
        match out.last() {
            Some(last) if s.0 < last.1 => {}
            _ => out.push(s),
        }
    }
    out
}

fn inside_any(spans: &[(usize, usize)], start: usize, end: usize) -> bool {
    let idx = spans.partition_point(|s| s.0 <= start);
    idx > 0 && end <= spans[idx - 1].1
}

// ── Literal truncation ──────────────────────────────────────────────────────

fn literal_ranges(
    set: &QuerySet,
    root: Node,
    source: &[u8],
    bodies: &[(usize, usize)],
    max_literal_len: usize,
) -> Vec<CutRange> {
    let mut out = Vec::new();
    for (name, node) in collect_captures(&set.literal, root, source) {
        if name != "string" {
            continue;
        }
        let (start, end) = (node.start_byte(), node.end_byte());
        if inside_any(bodies, start, end)
            || has_interpolation(node)
            || is_module_or_class_docstring(node)
        {
            continue;
        }
        if let Some(range) = truncation_range(node_text(source, node), start, max_literal_len) {
            out.push(range);
        }
    }
    out
}

/// Keep the opening delimiter and the first `max_len` characters, drop the
/// rest of the content, keep the closing delimiter.
pub(crate) fn truncation_range(text: &str, start: usize, max_len: usize) -> Option<CutRange> {
    let (open, close) = literal_delimiters(text)?;
    let content = &text[open..text.len() - close];
    let (keep, _) = content.char_indices().nth(max_len)?;
    Some(CutRange::with_ellipsis(start + open + keep, start + text.len() - close))
}

/// Byte lengths of the opening and closing delimiters, including any
/// alphabetic string prefix (`r`, `b`, `f`, ...) on the opening side.
fn literal_delimiters(text: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let prefix = bytes.iter().take_while(|b| b.is_ascii_alphabetic()).count();
    let quote = *bytes.get(prefix)?;
    if !matches!(quote, b'"' | b'\'' | b'`') {
        return None;
    }

    let rest = &bytes[prefix..];
    let triple = rest.len() >= 6
        && rest[..3].iter().all(|b| *b == quote)
        && rest[rest.len() - 3..].iter().all(|b| *b == quote);
    let q = if triple { 3 } else { 1 };
    if rest.len() < 2 * q || bytes.last() != Some(&quote) {
        return None;
    }
    Some((prefix + q, q))
}

fn has_interpolation(node: Node) -> bool {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .any(|c| matches!(c.kind(), "template_substitution" | "interpolation"));
    found
}

fn is_module_or_class_docstring(node: Node) -> bool {
    let Some(stmt) = node.parent().filter(|p| is_docstring_statement(*p)) else {
        return false;
    };
    let Some(scope) = stmt.parent().filter(|p| matches!(p.kind(), "module" | "block")) else {
        return false;
    };
    leading_docstring(scope).is_some_and(|doc| doc.id() == stmt.id())
}

// ── Normalization ───────────────────────────────────────────────────────────

/// Drop the blank run an elided trailing body leaves at the end of the file.
/// Line endings and everything inside the text are kept as they are.
fn normalize(text: &str) -> String {
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_keeps_quotes_and_prefix() {
        let text = "\"This is a long single constant\"";
        let r = truncation_range(text, 0, 10).unwrap();
        let out = cut(text.as_bytes(), &[r]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\"This is a ...\"");
    }

    #[test]
    fn short_literals_are_left_alone() {
        assert!(truncation_range("\"short\"", 0, 10).is_none());
        assert!(truncation_range("\"exactly10!\"", 0, 10).is_none());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "'ééééééééééééé'";
        let r = truncation_range(text, 0, 3).unwrap();
        let out = cut(text.as_bytes(), &[r]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "'ééé...'");
    }

    #[test]
    fn python_delimiters() {
        assert_eq!(literal_delimiters("\"\"\"doc\"\"\""), Some((3, 3)));
        assert_eq!(literal_delimiters("rb'raw'"), Some((3, 1)));
        assert_eq!(literal_delimiters("`tpl`"), Some((1, 1)));
        assert_eq!(literal_delimiters("\"\""), Some((1, 1)));
        assert_eq!(literal_delimiters("ident"), None);
    }

    #[test]
    fn outermost_spans_drop_nested() {
        let spans = outermost(vec![(10, 20), (0, 5), (12, 15), (30, 40)]);
        assert_eq!(spans, vec![(0, 5), (10, 20), (30, 40)]);
        assert!(inside_any(&spans, 12, 18));
        assert!(!inside_any(&spans, 18, 25));
        assert!(!inside_any(&spans, 6, 8));
    }

    #[test]
    fn gap_start_stops_at_line_break() {
        let src = b"func f() \t{\n\t{}";
        assert_eq!(gap_start(src, 10), 8);
        assert_eq!(gap_start(src, 13), 12);
        assert_eq!(gap_start(src, 0), 0);
    }

    #[test]
    fn normalization_keeps_inner_whitespace() {
        assert_eq!(normalize("\nfunc f()\r\n`a   \nb`\r\n\r\n"), "func f()\r\n`a   \nb`");
    }
}
