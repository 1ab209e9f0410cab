use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::{MapError, MapResult};

/// Bytes inspected when deciding whether a file is text.
const SNIFF_LEN: usize = 8 * 1024;

/// One entry produced by [`SourceTree::walk`]; `path` is relative to the tree root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Read-only view of a directory tree.
pub trait SourceTree: Sync {
    /// Every directory and file under the root, as root-relative paths.
    fn walk(&self) -> MapResult<Vec<TreeEntry>>;

    /// Full bytes of a root-relative file.
    fn read(&self, path: &Path) -> MapResult<Vec<u8>>;
}

/// A tree rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct DiskTree {
    root: PathBuf,
}

impl DiskTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SourceTree for DiskTree {
    fn walk(&self) -> MapResult<Vec<TreeEntry>> {
        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut entries = Vec::new();
        for item in walker {
            let dent = item.map_err(|e| MapError::Walk {
                path: self.root.clone(),
                message: e.to_string(),
            })?;
            if dent.depth() == 0 {
                continue;
            }
            let is_dir = dent.file_type().is_some_and(|ft| ft.is_dir());
            let rel = dent
                .path()
                .strip_prefix(&self.root)
                .map_err(|_| MapError::Walk {
                    path: dent.path().to_path_buf(),
                    message: format!("not under {}", self.root.display()),
                })?
                .to_path_buf();
            entries.push(TreeEntry { path: rel, is_dir });
        }
        Ok(entries)
    }

    fn read(&self, path: &Path) -> MapResult<Vec<u8>> {
        std::fs::read(self.root.join(path)).map_err(|source| MapError::Read {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// An in-memory tree. Directories are implied by file paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> &mut Self {
        self.files.insert(path.into(), content.into());
        self
    }

    pub fn with(mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }
}

impl SourceTree for MemoryTree {
    fn walk(&self) -> MapResult<Vec<TreeEntry>> {
        let mut dirs: BTreeSet<PathBuf> = BTreeSet::new();
        for path in self.files.keys() {
            let mut parent = path.parent();
            while let Some(p) = parent.filter(|p| !p.as_os_str().is_empty()) {
                dirs.insert(p.to_path_buf());
                parent = p.parent();
            }
        }

        let mut entries: Vec<TreeEntry> = dirs
            .into_iter()
            .map(|path| TreeEntry { path, is_dir: true })
            .chain(self.files.keys().map(|path| TreeEntry {
                path: path.clone(),
                is_dir: false,
            }))
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    fn read(&self, path: &Path) -> MapResult<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| MapError::Read {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file in tree"),
        })
    }
}

/// Heuristic text check: no NUL bytes and valid UTF-8 in the sniffed prefix.
///
/// A multi-byte character split by the sniff boundary still counts as text.
pub fn looks_like_text(content: &[u8]) -> bool {
    let head = &content[..content.len().min(SNIFF_LEN)];
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none() && content.len() > SNIFF_LEN,
    }
}

/// Root-relative path rendered with `/` separators and no leading `./`.
pub fn normalize_path_for_output(p: &Path) -> String {
    let parts: Vec<String> = p
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect();
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_tree_walk_lists_implied_directories() {
        let tree = MemoryTree::new()
            .with("pkg/utils.go", "package pkg\n")
            .with("main.go", "package main\n");
        let entries = tree.walk().unwrap();
        let listed: Vec<(String, bool)> = entries
            .iter()
            .map(|e| (normalize_path_for_output(&e.path), e.is_dir))
            .collect();
        assert_eq!(
            listed,
            vec![
                ("main.go".to_string(), false),
                ("pkg".to_string(), true),
                ("pkg/utils.go".to_string(), false),
            ]
        );
    }

    #[test]
    fn disk_tree_walks_relative_paths() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("a/b/c.py"), "x = 1\n").unwrap();
        std::fs::write(dir.path().join(".hidden"), "kept\n").unwrap();

        let tree = DiskTree::new(dir.path());
        let files: Vec<String> = tree
            .walk()
            .unwrap()
            .into_iter()
            .filter(|e| !e.is_dir)
            .map(|e| normalize_path_for_output(&e.path))
            .collect();
        assert_eq!(files, vec![".hidden".to_string(), "a/b/c.py".to_string()]);
        assert_eq!(tree.read(Path::new("a/b/c.py")).unwrap(), b"x = 1\n");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let tree = MemoryTree::new();
        assert!(matches!(tree.read(Path::new("nope.go")), Err(MapError::Read { .. })));
    }

    #[test]
    fn text_detection() {
        assert!(looks_like_text(b"package main\n"));
        assert!(looks_like_text(b""));
        assert!(looks_like_text("héllo".as_bytes()));
        assert!(!looks_like_text(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"));
        assert!(!looks_like_text(&[0xff, 0xfe, 0xfd, b'a']));
    }

    #[test]
    fn output_paths_use_forward_slashes() {
        assert_eq!(normalize_path_for_output(Path::new("./a/b.go")), "a/b.go");
    }
}
