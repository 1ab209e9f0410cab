use std::path::Path;

use crate::error::{MapError, MapResult};

/// Source languages with structural support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Go,
    Java,
    Python,
    JavaScript,
    TypeScript,
}

/// How far symbol resolution can be trusted for a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSupport {
    /// Usage and definition queries cover the language's declaration forms.
    Full,
    /// Queries exist but only cover a subset of reference forms (imports,
    /// direct calls, annotations). Misses are expected.
    Partial,
    /// No verified queries; anchors are kept but contribute no symbols.
    Unsupported,
}

/// A concrete tree-sitter grammar. TypeScript has two (`.ts` and `.tsx`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    Go,
    Java,
    Python,
    JavaScript,
    TypeScript,
    Tsx,
}

impl Grammar {
    pub const ALL: [Grammar; 6] = [
        Grammar::Go,
        Grammar::Java,
        Grammar::Python,
        Grammar::JavaScript,
        Grammar::TypeScript,
        Grammar::Tsx,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Grammar::Go => "go",
            Grammar::Java => "java",
            Grammar::Python => "python",
            Grammar::JavaScript => "javascript",
            Grammar::TypeScript => "typescript",
            Grammar::Tsx => "tsx",
        }
    }

    pub fn language(self) -> Language {
        match self {
            Grammar::Go => Language::Go,
            Grammar::Java => Language::Java,
            Grammar::Python => Language::Python,
            Grammar::JavaScript => Language::JavaScript,
            Grammar::TypeScript | Grammar::Tsx => Language::TypeScript,
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// The compiled-in tree-sitter language, if its feature is enabled.
    pub fn ts_language(self) -> MapResult<tree_sitter::Language> {
        let lang: Option<tree_sitter::Language> = match self {
            #[cfg(feature = "lang-go")]
            Grammar::Go => Some(tree_sitter_go::LANGUAGE.into()),
            #[cfg(feature = "lang-java")]
            Grammar::Java => Some(tree_sitter_java::LANGUAGE.into()),
            #[cfg(feature = "lang-python")]
            Grammar::Python => Some(tree_sitter_python::LANGUAGE.into()),
            #[cfg(feature = "lang-javascript")]
            Grammar::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            #[cfg(feature = "lang-typescript")]
            Grammar::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            #[cfg(feature = "lang-typescript")]
            Grammar::Tsx => Some(tree_sitter_typescript::LANGUAGE_TSX.into()),
            #[allow(unreachable_patterns)]
            _ => None,
        };
        lang.ok_or(MapError::UnknownGrammar { grammar: self.name() })
    }

    pub fn is_available(self) -> bool {
        self.ts_language().is_ok()
    }

    pub fn from_extension(ext: &str) -> Option<Grammar> {
        match ext.to_ascii_lowercase().as_str() {
            "go" => Some(Grammar::Go),
            "java" => Some(Grammar::Java),
            "py" | "pyi" => Some(Grammar::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(Grammar::JavaScript),
            "ts" | "mts" | "cts" => Some(Grammar::TypeScript),
            "tsx" => Some(Grammar::Tsx),
            _ => None,
        }
    }

    pub fn for_path(path: &Path) -> Option<Grammar> {
        Grammar::from_extension(&path_ext_lower(path))
    }
}

impl Language {
    pub fn name(self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::Java => "java",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Language> {
        Grammar::from_extension(ext).map(Grammar::language)
    }

    pub fn resolution_support(self) -> ResolutionSupport {
        match self {
            Language::Go => ResolutionSupport::Full,
            Language::Python | Language::TypeScript => ResolutionSupport::Partial,
            Language::Java | Language::JavaScript => ResolutionSupport::Unsupported,
        }
    }
}

/// Lowercased extension without the dot, or `""`.
pub fn path_ext_lower(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}
