//! Structural query sources per grammar, and the compiled, shared `QuerySet`.
//!
//! Capture names used across all grammars:
//! - `@body`: executable region removed outright.
//! - `@body.inline`: body replaced with `{}` where the surrounding code
//!   needs the braces to stay well formed (expressions, object members,
//!   static blocks).
//! - `@body.stub`: indentation-scoped body replaced with `pass` (a leading
//!   docstring is kept).
//! - `@string`: literal eligible for truncation.
//! - `@type.usage`, `@func.usage`: referenced symbol names.
//! - `@ignore`: names declared locally (type params, local types) that must
//!   not count as external references.
//! - `@definition`: declared name matched against the accumulated symbols.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use tree_sitter::{Node, Query, QueryCursor, StreamingIterator};

use crate::error::{MapError, MapResult};
use crate::language::Grammar;

/// Static query sources for one grammar.
pub struct LanguageQueries {
    pub body: &'static str,
    pub literal: &'static str,
    pub usage: Option<&'static str>,
    /// Names never treated as references (builtins, primitives, self tokens).
    pub deny: &'static [&'static str],
    pub definitions: Option<DefinitionPatterns>,
}

/// Definition patterns split by symbol kind. Each pattern captures the
/// declared name as `@definition`; the name filter is appended at build time.
pub struct DefinitionPatterns {
    pub types: &'static [&'static str],
    pub functions: &'static [&'static str],
    /// Match every accumulated name against every pattern, regardless of the
    /// kind it was captured as. Used where usage captures can't tell a class
    /// instantiation from a function call.
    pub merge_kinds: bool,
}

// ── Go ──────────────────────────────────────────────────────────────────────

const GO_BODY: &str = r#"
(function_declaration body: (block) @body)
(method_declaration body: (block) @body)
"#;

const GO_LITERAL: &str = r#"
(interpreted_string_literal) @string
(raw_string_literal) @string
"#;

const GO_USAGE: &str = r#"
((type_identifier) @type.usage)
(type_spec name: (type_identifier) @ignore)
(type_alias name: (type_identifier) @ignore)
(type_parameter_declaration name: (identifier) @ignore)
(call_expression function: (identifier) @func.usage)
(call_expression function: (selector_expression field: (field_identifier) @func.usage))
"#;

const GO_DENY: &[&str] = &[
    // predeclared types
    "any", "bool", "byte", "comparable", "complex64", "complex128", "error", "float32",
    "float64", "int", "int8", "int16", "int32", "int64", "rune", "string", "uint", "uint8",
    "uint16", "uint32", "uint64", "uintptr",
    // builtin functions
    "append", "cap", "clear", "close", "complex", "copy", "delete", "imag", "len", "make",
    "max", "min", "new", "panic", "print", "println", "real", "recover",
];

const GO_QUERIES: LanguageQueries = LanguageQueries {
    body: GO_BODY,
    literal: GO_LITERAL,
    usage: Some(GO_USAGE),
    deny: GO_DENY,
    definitions: Some(DefinitionPatterns {
        types: &[
            "(type_spec name: (type_identifier) @definition)",
            "(type_alias name: (type_identifier) @definition)",
        ],
        functions: &[
            "(function_declaration name: (identifier) @definition)",
            "(method_declaration name: (field_identifier) @definition)",
        ],
        merge_kinds: false,
    }),
};

// ── Java ────────────────────────────────────────────────────────────────────

const JAVA_BODY: &str = r#"
(method_declaration body: (block) @body)
(constructor_declaration body: (constructor_body) @body)
(static_initializer (block) @body.inline)
"#;

const JAVA_LITERAL: &str = r#"
(string_literal) @string
"#;

// Java symbol queries are not verified; anchors take the degraded path.
const JAVA_QUERIES: LanguageQueries = LanguageQueries {
    body: JAVA_BODY,
    literal: JAVA_LITERAL,
    usage: None,
    deny: &[],
    definitions: None,
};

// ── Python ──────────────────────────────────────────────────────────────────

const PYTHON_BODY: &str = r#"
(function_definition body: (block) @body.stub)
"#;

const PYTHON_LITERAL: &str = r#"
(string) @string
"#;

const PYTHON_USAGE: &str = r#"
(class_definition superclasses: (argument_list (identifier) @type.usage))
(class_definition superclasses: (argument_list (attribute attribute: (identifier) @type.usage)))
(type (identifier) @type.usage)
(type (generic_type (identifier) @type.usage))
(subscript value: (identifier) @type.usage)
(import_from_statement name: (dotted_name (identifier) @type.usage))
(import_from_statement name: (aliased_import name: (dotted_name (identifier) @type.usage)))
(call function: (identifier) @func.usage)
(call function: (attribute attribute: (identifier) @func.usage))
(decorator (identifier) @func.usage)
(decorator (call function: (identifier) @func.usage))
"#;

const PYTHON_DENY: &[&str] = &[
    "str", "int", "float", "bool", "bytes", "None", "Any", "List", "Dict", "Set", "Tuple",
    "Optional", "Union", "Callable", "Type", "TypeVar", "Generic", "Protocol", "ABC",
    "abstractmethod", "dataclass", "typing", "abc", "dataclasses", "P", "R", "T", "pkg",
    "models", "base", "utils", "self", "cls", "object", "print", "super", "len", "range",
    "isinstance", "list", "dict", "set", "tuple",
];

const PYTHON_QUERIES: LanguageQueries = LanguageQueries {
    body: PYTHON_BODY,
    literal: PYTHON_LITERAL,
    usage: Some(PYTHON_USAGE),
    deny: PYTHON_DENY,
    definitions: Some(DefinitionPatterns {
        types: &["(class_definition name: (identifier) @definition)"],
        functions: &["(function_definition name: (identifier) @definition)"],
        merge_kinds: true,
    }),
};

// ── JavaScript / TypeScript ─────────────────────────────────────────────────

const JS_BODY: &str = r#"
(function_declaration body: (statement_block) @body)
(generator_function_declaration body: (statement_block) @body)
(class_body (method_definition body: (statement_block) @body))
(object (method_definition body: (statement_block) @body.inline))
(function_expression body: (statement_block) @body.inline)
(generator_function body: (statement_block) @body.inline)
(arrow_function body: (statement_block) @body.inline)
"#;

const JS_LITERAL: &str = r#"
(string) @string
(template_string) @string
"#;

// JavaScript symbol queries are not verified; anchors take the degraded path.
const JS_QUERIES: LanguageQueries = LanguageQueries {
    body: JS_BODY,
    literal: JS_LITERAL,
    usage: None,
    deny: &[],
    definitions: None,
};

const TS_USAGE: &str = r#"
(import_specifier name: (identifier) @type.usage)
((type_identifier) @type.usage)
(class_declaration name: (type_identifier) @ignore)
(interface_declaration name: (type_identifier) @ignore)
(type_alias_declaration name: (type_identifier) @ignore)
(type_parameter name: (type_identifier) @ignore)
(new_expression constructor: (identifier) @type.usage)
(call_expression function: (identifier) @func.usage)
"#;

const TS_DENY: &[&str] = &[
    "Array", "ReadonlyArray", "Promise", "PromiseLike", "Awaited", "Record", "Partial",
    "Required", "Readonly", "Pick", "Omit", "Exclude", "Extract", "NonNullable", "ReturnType",
    "Parameters", "InstanceType", "Map", "Set", "WeakMap", "WeakSet", "Date", "Error",
    "RegExp", "Object", "String", "Number", "Boolean", "Function", "Symbol", "Iterable",
    "Iterator", "AsyncIterable", "T", "K", "V", "U", "require", "parseInt", "parseFloat",
    "setTimeout", "setInterval", "clearTimeout", "clearInterval", "this", "super",
];

const TS_DEFINITIONS: DefinitionPatterns = DefinitionPatterns {
    types: &[
        "(class_declaration name: (type_identifier) @definition)",
        "(abstract_class_declaration name: (type_identifier) @definition)",
        "(interface_declaration name: (type_identifier) @definition)",
        "(enum_declaration name: (identifier) @definition)",
        "(type_alias_declaration name: (type_identifier) @definition)",
        "(internal_module name: (identifier) @definition)",
    ],
    functions: &[
        "(function_declaration name: (identifier) @definition)",
        "(variable_declarator name: (identifier) @definition)",
    ],
    merge_kinds: true,
};

const TS_QUERIES: LanguageQueries = LanguageQueries {
    body: JS_BODY,
    literal: JS_LITERAL,
    usage: Some(TS_USAGE),
    deny: TS_DENY,
    definitions: Some(TS_DEFINITIONS),
};

pub fn sources(grammar: Grammar) -> &'static LanguageQueries {
    match grammar {
        Grammar::Go => &GO_QUERIES,
        Grammar::Java => &JAVA_QUERIES,
        Grammar::Python => &PYTHON_QUERIES,
        Grammar::JavaScript => &JS_QUERIES,
        Grammar::TypeScript | Grammar::Tsx => &TS_QUERIES,
    }
}

// ── Compiled sets ───────────────────────────────────────────────────────────

/// Compiled body, literal and usage queries for one grammar.
///
/// Built once per grammar on first use and shared read-only by every worker.
pub struct QuerySet {
    pub grammar: Grammar,
    pub language: tree_sitter::Language,
    pub body: Query,
    pub literal: Query,
    pub usage: Option<Query>,
    pub deny: &'static [&'static str],
}

impl QuerySet {
    fn build(grammar: Grammar) -> MapResult<Self> {
        let language = grammar.ts_language()?;
        let src = sources(grammar);
        let usage = match src.usage {
            Some(q) => Some(compile(grammar, &language, q)?),
            None => None,
        };
        Ok(Self {
            grammar,
            body: compile(grammar, &language, src.body)?,
            literal: compile(grammar, &language, src.literal)?,
            usage,
            deny: src.deny,
            language,
        })
    }

    pub fn is_denied(&self, name: &str) -> bool {
        self.deny.contains(&name)
    }
}

/// The shared query set for `grammar`, compiling it on first use.
pub fn query_set(grammar: Grammar) -> MapResult<&'static QuerySet> {
    static SETS: [OnceLock<Result<QuerySet, String>>; 6] = [const { OnceLock::new() }; 6];

    let slot = SETS[grammar.index()]
        .get_or_init(|| QuerySet::build(grammar).map_err(|e| e.to_string()));
    slot.as_ref().map_err(|message| MapError::Query {
        grammar: grammar.name(),
        message: message.clone(),
    })
}

fn compile(grammar: Grammar, language: &tree_sitter::Language, src: &str) -> MapResult<Query> {
    Query::new(language, src).map_err(|e| MapError::Query {
        grammar: grammar.name(),
        message: e.to_string(),
    })
}

/// Every `(capture name, node)` pair produced by running `query` over `root`.
pub(crate) fn collect_captures<'q, 't>(
    query: &'q Query,
    root: Node<'t>,
    source: &[u8],
) -> Vec<(&'q str, Node<'t>)> {
    let names = query.capture_names();
    let mut cursor = QueryCursor::new();
    let mut out = Vec::new();

    let mut matches = cursor.matches(query, root, source);
    while let Some(m) = matches.next() {
        for cap in m.captures {
            out.push((names[cap.index as usize], cap.node));
        }
    }
    out
}

/// True if `query` produces at least one match (predicates included).
pub(crate) fn has_match(query: &Query, root: Node, source: &[u8]) -> bool {
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, root, source);
    matches.next().is_some()
}

pub(crate) fn node_text<'a>(source: &'a [u8], node: Node) -> &'a str {
    std::str::from_utf8(&source[node.start_byte()..node.end_byte()]).unwrap_or("")
}

// ── Definition queries ──────────────────────────────────────────────────────

/// Symbol names collected from anchors, split by the kind they were captured as.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolNames {
    pub types: BTreeSet<String>,
    pub functions: BTreeSet<String>,
}

impl SymbolNames {
    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.functions.is_empty()
    }

    pub fn extend(&mut self, other: SymbolNames) {
        self.types.extend(other.types);
        self.functions.extend(other.functions);
    }
}

/// Build the `#any-of?` definition query source for `names`.
///
/// Returns `None` when the grammar has no definition patterns or there is
/// nothing to look for.
pub fn definition_query_source(grammar: Grammar, names: &SymbolNames) -> Option<String> {
    let patterns = sources(grammar).definitions.as_ref()?;

    let all: BTreeSet<&String> = names.types.iter().chain(names.functions.iter()).collect();
    let (type_names, func_names): (Vec<&String>, Vec<&String>) = if patterns.merge_kinds {
        (all.iter().copied().collect(), all.iter().copied().collect())
    } else {
        (names.types.iter().collect(), names.functions.iter().collect())
    };

    let mut out = String::new();
    for (group, group_names) in [(patterns.types, &type_names), (patterns.functions, &func_names)] {
        if group_names.is_empty() {
            continue;
        }
        let list = group_names
            .iter()
            .map(|n| format!("\"{}\"", escape_query_string(n)))
            .collect::<Vec<_>>()
            .join(" ");
        for pattern in group {
            out.push_str(&format!("({pattern} (#any-of? @definition {list}))\n"));
        }
    }

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Compile the definition query for `names`.
pub fn definition_query(grammar: Grammar, names: &SymbolNames) -> MapResult<Option<Query>> {
    let Some(src) = definition_query_source(grammar, names) else {
        return Ok(None);
    };
    let language = grammar.ts_language()?;
    compile(grammar, &language, &src).map(Some)
}

fn escape_query_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
