//! Compact signature views and one-hop symbol resolution over multi-language
//! source trees, for assembling LLM code-assistant context.

pub mod cancel;
pub mod config;
pub mod cut;
pub mod error;
pub mod ignore_rules;
pub mod language;
pub mod parser_pool;
pub mod queries;
pub mod render;
pub mod resolver;
pub mod signature;
pub mod syntax;
pub mod tokens;
pub mod tree;

pub use cancel::CancelToken;
pub use config::{load_config, Config, IgnoreConfig};
pub use cut::{collapse, CutRange};
pub use error::MapError;
pub use ignore_rules::{IgnorePredicate, IgnoreRules, NoIgnore};
pub use language::{Grammar, Language, ResolutionSupport};
pub use resolver::{
    resolve_files, resolve_files_with, ResolutionResult, ResolutionWarning, ResolveOptions,
};
pub use signature::{
    extract_signature, generate_output, generate_output_with, ExtractOptions, SignatureView,
    SourceFile,
};
pub use syntax::{check_syntax, SyntaxCheck};
pub use tokens::{count_tokens, count_tree_tokens, total_tokens, FileTokens};
pub use tree::{DiskTree, MemoryTree, SourceTree, TreeEntry};
