mod common;

use std::path::Path;

use codemap::error::MapResult;
use codemap::render::render_code_map;
use codemap::{
    count_tree_tokens, generate_output, generate_output_with, load_config, total_tokens,
    CancelToken, DiskTree, ExtractOptions, IgnoreRules, MapError, MemoryTree, NoIgnore,
    SourceTree, TreeEntry,
};
use tempfile::TempDir;

fn sample_tree() -> MemoryTree {
    common::tree(&[
        ("zeta/last.go", "package zeta\n\nfunc Last() {\n\treturn\n}\n"),
        ("alpha.py", "def a():\n    return 1\n"),
        ("docs/notes.md", "plain notes\n"),
        (".git/HEAD", "ref: refs/heads/main\n"),
        ("web/app.ts", "export function boot(): void {\n  start();\n}\n"),
    ])
    .with("assets/logo.png", b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec())
}

#[test]
fn output_is_sorted_and_skips_ignored_and_binary_files() {
    common::init_test_tracing();
    let tree = sample_tree();
    let views = generate_output(&tree, 100, &common::rules(&[".git/**"])).unwrap();

    let paths: Vec<&str> = views.iter().map(|v| v.path.as_str()).collect();
    assert_eq!(paths, vec!["alpha.py", "docs/notes.md", "web/app.ts", "zeta/last.go"]);

    assert_eq!(views[0].content, "def a():\n    pass");
    assert_eq!(views[1].content, "plain notes\n");
    assert_eq!(views[2].content, "export function boot(): void");
    assert_eq!(views[3].content, "package zeta\n\nfunc Last()");
}

#[test]
fn repeated_runs_are_identical() {
    let tree = sample_tree();
    let first = generate_output(&tree, 10, &NoIgnore).unwrap();
    let second = generate_output(&tree, 10, &NoIgnore).unwrap();
    assert_eq!(first, second);
    assert!(first.iter().any(|v| v.path == ".git/HEAD"));
}

struct FlakyTree {
    inner: MemoryTree,
    broken: &'static str,
}

impl SourceTree for FlakyTree {
    fn walk(&self) -> MapResult<Vec<TreeEntry>> {
        self.inner.walk()
    }

    fn read(&self, path: &Path) -> MapResult<Vec<u8>> {
        if path == Path::new(self.broken) {
            return Err(MapError::Read {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            });
        }
        self.inner.read(path)
    }
}

#[test]
fn one_unreadable_file_aborts_the_call_naming_it() {
    let tree = FlakyTree {
        inner: sample_tree(),
        broken: "web/app.ts",
    };
    let err = generate_output(&tree, 100, &NoIgnore).unwrap_err();
    assert!(format!("{err:#}").contains("web/app.ts"), "{err:#}");
    assert!(matches!(err.downcast_ref::<MapError>(), Some(MapError::Read { .. })));
}

#[test]
fn cancelled_calls_return_no_partial_output() {
    let opts = ExtractOptions::default();
    opts.cancel.cancel();
    let err = generate_output_with(&sample_tree(), &NoIgnore, &opts).unwrap_err();
    assert!(matches!(err.downcast_ref::<MapError>(), Some(MapError::Cancelled)));
}

#[test]
fn cancel_token_clones_share_state() {
    let token = CancelToken::new();
    let handle = token.clone();
    assert!(!token.is_cancelled());
    handle.cancel();
    assert!(token.is_cancelled());
}

#[test]
fn disk_tree_honors_config_file() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::create_dir_all(root.join("vendor/dep")).unwrap();
    std::fs::create_dir_all(root.join(".git")).unwrap();
    std::fs::write(root.join(".git/config"), "[core]\n").unwrap();
    std::fs::write(
        root.join(".codemap.json"),
        r#"{ "max_literal_len": 4, "workers": 2, "ignore": { "extra_patterns": ["vendor/", ".codemap*"] } }"#,
    )
    .unwrap();
    std::fs::write(
        root.join("src/lib.go"),
        "package src\n\nconst Name = \"truncated here\"\n\nfunc Do() {}\n",
    )
    .unwrap();
    std::fs::write(root.join("vendor/dep/dep.go"), "package dep\n").unwrap();

    let cfg = load_config(root);
    let rules = IgnoreRules::from_config(root, &cfg.ignore).unwrap();
    let tree = DiskTree::new(root);
    let views = generate_output_with(&tree, &rules, &ExtractOptions::from_config(&cfg)).unwrap();

    assert_eq!(views.len(), 1, "{views:?}");
    assert_eq!(views[0].path, "src/lib.go");
    assert_eq!(views[0].content, "package src\n\nconst Name = \"trun...\"\n\nfunc Do()");

    let xml = render_code_map(&views).unwrap();
    assert!(xml.starts_with("<code_map><file><path>src/lib.go</path><file_map>package src"));
}

#[test]
fn token_counts_follow_the_walk_and_shrink_with_views() {
    let tree = sample_tree();
    let rules = common::rules(&[".git/**"]);
    let full = count_tree_tokens(&tree, &rules, Some(2)).unwrap();

    let paths: Vec<&str> = full.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["alpha.py", "docs/notes.md", "web/app.ts", "zeta/last.go"]);
    assert!(full.iter().all(|f| f.tokens > 0));

    let views = generate_output(&tree, 100, &rules).unwrap();
    let full_total: usize = full.iter().map(|f| f.tokens).sum();
    assert!(total_tokens(&views).unwrap() < full_total);
}
