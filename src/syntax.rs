use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::error::MapError;
use crate::language::Grammar;
use crate::parser_pool::global_pool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyntaxCheck {
    /// A grammar exists for the file's extension.
    pub parser_found: bool,
    /// The parse tree contains ERROR or MISSING nodes.
    pub has_error: bool,
}

/// Parse `content` with the grammar chosen by `path`'s extension and report
/// whether the tree has syntax errors.
pub fn check_syntax(path: &Path, content: &[u8]) -> Result<SyntaxCheck> {
    let Some(grammar) = Grammar::for_path(path).filter(|g| g.is_available()) else {
        return Ok(SyntaxCheck {
            parser_found: false,
            has_error: false,
        });
    };
    if content.is_empty() {
        return Ok(SyntaxCheck {
            parser_found: true,
            has_error: false,
        });
    }

    let mut parser = global_pool().checkout(grammar)?;
    let tree = parser.parse_bytes(content).ok_or_else(|| MapError::Parse {
        path: path.to_path_buf(),
    })?;
    Ok(SyntaxCheck {
        parser_found: true,
        has_error: tree.root_node().has_error(),
    })
}
