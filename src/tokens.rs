//! Token estimates for fitting views into a model's context window.
//!
//! Counts use the `o200k_base` encoding with special tokens treated as text.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use tiktoken_rs::CoreBPE;

use crate::config::with_workers;
use crate::ignore_rules::IgnorePredicate;
use crate::signature::SignatureView;
use crate::tree::{looks_like_text, normalize_path_for_output, SourceTree};

fn encoder() -> Result<&'static CoreBPE> {
    static BPE: OnceLock<Result<CoreBPE, String>> = OnceLock::new();

    BPE.get_or_init(|| tiktoken_rs::o200k_base().map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| anyhow!("Failed to load o200k_base encoding: {e}"))
}

pub fn count_tokens(text: &str) -> Result<usize> {
    Ok(encoder()?.encode_ordinary(text).len())
}

/// Token count for one file of a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileTokens {
    pub path: String,
    pub tokens: usize,
}

/// Sum of the tokens in every view's content.
pub fn total_tokens(views: &[SignatureView]) -> Result<usize> {
    views.iter().map(|v| count_tokens(&v.content)).sum()
}

/// Token counts of the full contents of every text file in `tree`, sorted
/// by path. Ignored and binary files are left out; a read failure aborts.
pub fn count_tree_tokens<T>(
    tree: &T,
    ignore: &dyn IgnorePredicate,
    workers: Option<usize>,
) -> Result<Vec<FileTokens>>
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

    let counts: Vec<Option<FileTokens>> = with_workers(workers, || {
        candidates
            .par_iter()
            .map(|(rel_path, path)| file_tokens(tree, rel_path, path))
            .collect::<Result<Vec<_>>>()
    })?;

    let counts: Vec<FileTokens> = counts.into_iter().flatten().collect();
    tracing::debug!(files = counts.len(), "token counts computed");
    Ok(counts)
}

fn file_tokens<T>(tree: &T, rel_path: &str, path: &Path) -> Result<Option<FileTokens>>
where
    T: SourceTree + ?Sized,
{
    let content = tree.read(path).with_context(|| format!("Failed to read {rel_path}"))?;
    if !looks_like_text(&content) {
        return Ok(None);
    }
    let tokens = count_tokens(&String::from_utf8_lossy(&content))?;
    Ok(Some(FileTokens {
        path: rel_path.to_string(),
        tokens,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_plain_text() {
        assert_eq!(count_tokens("").unwrap(), 0);
        assert_eq!(count_tokens("hello world").unwrap(), 2);
    }

    #[test]
    fn special_token_text_is_ordinary() {
        assert!(count_tokens("<|endoftext|>").unwrap() > 1);
    }

    #[test]
    fn total_adds_up_views() {
        let views = vec![
            SignatureView {
                path: "a.go".to_string(),
                content: "hello world".to_string(),
            },
            SignatureView {
                path: "b.go".to_string(),
                content: "hello".to_string(),
            },
        ];
        assert_eq!(total_tokens(&views).unwrap(), 3);
    }
}
