use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, OnceLock};

use tree_sitter::{Parser, Tree};

use crate::error::{MapError, MapResult};
use crate::language::Grammar;

/// Per-grammar stacks of idle parsers.
///
/// A `Parser` holds mutable state, so each task checks one out, parses, and
/// the guard returns it on drop. The pool only grows to the peak number of
/// concurrent users.
pub struct ParserPool {
    idle: [Mutex<Vec<Parser>>; 6],
}

impl Default for ParserPool {
    fn default() -> Self {
        Self {
            idle: std::array::from_fn(|_| Mutex::new(Vec::new())),
        }
    }
}

impl ParserPool {
    pub fn checkout(&self, grammar: Grammar) -> MapResult<PooledParser<'_>> {
        let reused = self.idle[grammar.index()]
            .lock()
            .map(|mut stack| stack.pop())
            .unwrap_or(None);

        let parser = match reused {
            Some(p) => p,
            None => {
                let mut p = Parser::new();
                p.set_language(&grammar.ts_language()?).map_err(|e| MapError::Query {
                    grammar: grammar.name(),
                    message: e.to_string(),
                })?;
                p
            }
        };

        Ok(PooledParser {
            pool: self,
            grammar,
            parser,
        })
    }

    pub fn idle_count(&self, grammar: Grammar) -> usize {
        self.idle[grammar.index()].lock().map(|s| s.len()).unwrap_or(0)
    }
}

/// Process-wide pool shared by extraction, resolution and syntax checks.
pub fn global_pool() -> &'static ParserPool {
    static POOL: OnceLock<ParserPool> = OnceLock::new();
    POOL.get_or_init(ParserPool::default)
}

/// A checked-out parser; returns to its pool when dropped.
pub struct PooledParser<'p> {
    pool: &'p ParserPool,
    grammar: Grammar,
    parser: Parser,
}

impl PooledParser<'_> {
    /// Parse a full buffer from scratch. `None` means the parser gave up.
    pub fn parse_bytes(&mut self, source: &[u8]) -> Option<Tree> {
        self.parser.parse(source, None)
    }
}

impl Deref for PooledParser<'_> {
    type Target = Parser;

    fn deref(&self) -> &Parser {
        &self.parser
    }
}

impl DerefMut for PooledParser<'_> {
    fn deref_mut(&mut self) -> &mut Parser {
        &mut self.parser
    }
}

impl Drop for PooledParser<'_> {
    fn drop(&mut self) {
        let mut parser = std::mem::replace(&mut self.parser, Parser::new());
        parser.reset();
        if let Ok(mut stack) = self.pool.idle[self.grammar.index()].lock() {
            stack.push(parser);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsers_are_returned_on_drop() {
        let pool = ParserPool::default();
        {
            let mut a = pool.checkout(Grammar::Go).unwrap();
            let b = pool.checkout(Grammar::Go).unwrap();
            assert!(a.parse_bytes(b"package main\n").is_some());
            drop(b);
            assert_eq!(pool.idle_count(Grammar::Go), 1);
        }
        assert_eq!(pool.idle_count(Grammar::Go), 2);
        assert_eq!(pool.idle_count(Grammar::Python), 0);
    }

    #[test]
    fn reused_parser_keeps_its_grammar() {
        let pool = ParserPool::default();
        drop(pool.checkout(Grammar::Python).unwrap());
        let mut p = pool.checkout(Grammar::Python).unwrap();
        let tree = p.parse_bytes(b"def f():\n    return 1\n").unwrap();
        assert_eq!(tree.root_node().kind(), "module");
        assert!(!tree.root_node().has_error());
    }
}
