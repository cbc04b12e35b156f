//! Import extraction
//!
//! Every module reference in a component is a dependency edge, and the
//! policy gate can only judge what is extracted here. Extraction runs an
//! ordered list of [`ImportExtractor`]s over every node of the tree; the
//! first extractor that recognizes a node produces its record, the rest
//! decline.

use crate::parser::{ParsedSource, SourcePosition};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Syntactic form of a module reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportKind {
    /// `import a from 'm'`, `import { a as b } from 'm'`
    Static,
    /// `import * as ns from 'm'`
    Namespace,
    /// `import 'm'`
    SideEffect,
    /// `import type { T } from 'm'`
    TypeOnly,
    /// `export { a } from 'm'`, `export * from 'm'`
    ReExport,
    /// `import x = require('m')`
    RequireAlias,
    /// `import('m')`
    Dynamic,
    /// `require('m')`
    Require,
}

/// Where a specifier points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportOrigin {
    /// Bare package specifier (`react`, `@scope/pkg`, `lodash/debounce`)
    Package,
    /// Path specifier (`./x`, `../x`, `/x`)
    Relative,
    /// Specifier is computed at runtime; the identifier holds the raw expression
    Unresolved,
}

/// A module reference found in source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportRecord {
    /// Module identifier exactly as written (quotes stripped)
    pub specifier: String,
    /// Syntactic form
    pub kind: ImportKind,
    /// Package, path or computed
    pub origin: ImportOrigin,
    /// Start of the referencing declaration or call
    pub position: SourcePosition,
    /// Byte range of the referencing declaration or call
    pub bytes: Range<usize>,
}

impl ImportRecord {
    fn new(
        node: tree_sitter::Node<'_>,
        specifier: String,
        kind: ImportKind,
        origin: ImportOrigin,
    ) -> Self {
        Self {
            specifier,
            kind,
            origin,
            position: SourcePosition::from_point(node.start_position()),
            bytes: node.byte_range(),
        }
    }
}

/// One layer of the extraction pipeline
pub trait ImportExtractor: Send + Sync {
    /// Name used in trace output
    fn name(&self) -> &'static str;

    /// Produce a record for `node`, or decline with `None`
    fn extract(&self, node: tree_sitter::Node<'_>, source: &str) -> Option<ImportRecord>;
}

/// `import ... from 'm'`, `import 'm'`, `import type ... from 'm'`
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticImportExtractor;

impl ImportExtractor for StaticImportExtractor {
    fn name(&self) -> &'static str {
        "static-import"
    }

    fn extract(&self, node: tree_sitter::Node<'_>, source: &str) -> Option<ImportRecord> {
        if node.kind() != "import_statement" {
            return None;
        }
        let specifier = string_value(node.child_by_field_name("source")?, source)?;

        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        let kind = if children.iter().any(|c| c.kind() == "type" && !c.is_named()) {
            ImportKind::TypeOnly
        } else if let Some(clause) = children.iter().find(|c| c.kind() == "import_clause") {
            let mut clause_cursor = clause.walk();
            let namespace = clause
                .children(&mut clause_cursor)
                .any(|c| c.kind() == "namespace_import");
            if namespace {
                ImportKind::Namespace
            } else {
                ImportKind::Static
            }
        } else {
            ImportKind::SideEffect
        };

        let origin = origin_of(&specifier);
        Some(ImportRecord::new(node, specifier, kind, origin))
    }
}

/// `export ... from 'm'`
#[derive(Debug, Clone, Copy, Default)]
pub struct ReExportExtractor;

impl ImportExtractor for ReExportExtractor {
    fn name(&self) -> &'static str {
        "re-export"
    }

    fn extract(&self, node: tree_sitter::Node<'_>, source: &str) -> Option<ImportRecord> {
        if node.kind() != "export_statement" {
            return None;
        }
        let specifier = string_value(node.child_by_field_name("source")?, source)?;
        let origin = origin_of(&specifier);
        Some(ImportRecord::new(node, specifier, ImportKind::ReExport, origin))
    }
}

/// `import x = require('m')`
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireAliasExtractor;

impl ImportExtractor for RequireAliasExtractor {
    fn name(&self) -> &'static str {
        "require-alias"
    }

    fn extract(&self, node: tree_sitter::Node<'_>, source: &str) -> Option<ImportRecord> {
        if node.kind() != "import_require_clause" {
            return None;
        }
        let specifier = string_value(node.child_by_field_name("source")?, source)?;
        let origin = origin_of(&specifier);
        Some(ImportRecord::new(
            node,
            specifier,
            ImportKind::RequireAlias,
            origin,
        ))
    }
}

/// `import('m')` and `require('m')` calls
///
/// A call whose argument is not a literal string is still recorded, with the
/// raw argument text as the specifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleCallExtractor;

impl ImportExtractor for ModuleCallExtractor {
    fn name(&self) -> &'static str {
        "module-call"
    }

    fn extract(&self, node: tree_sitter::Node<'_>, source: &str) -> Option<ImportRecord> {
        if node.kind() != "call_expression" {
            return None;
        }
        let function = node.child_by_field_name("function")?;
        let kind = match function.kind() {
            "import" => ImportKind::Dynamic,
            "identifier" if node_text(function, source) == "require" => ImportKind::Require,
            _ => return None,
        };

        let arguments = node.child_by_field_name("arguments")?;
        let mut cursor = arguments.walk();
        let first = arguments.named_children(&mut cursor).next();

        let record = match first.and_then(|arg| string_value(arg, source)) {
            Some(specifier) => {
                let origin = origin_of(&specifier);
                ImportRecord::new(node, specifier, kind, origin)
            }
            None => {
                let raw = first.map_or_else(
                    || node_text(arguments, source).to_string(),
                    |arg| node_text(arg, source).to_string(),
                );
                ImportRecord::new(node, raw, kind, ImportOrigin::Unresolved)
            }
        };
        Some(record)
    }
}

/// Default pipeline, in evaluation order
#[must_use]
pub fn default_extractors() -> Vec<Box<dyn ImportExtractor>> {
    vec![
        Box::new(StaticImportExtractor),
        Box::new(ReExportExtractor),
        Box::new(RequireAliasExtractor),
        Box::new(ModuleCallExtractor),
    ]
}

/// Run `extractors` over every node of `parsed`, ordered by source position
#[must_use]
pub fn extract_imports(
    parsed: &ParsedSource,
    extractors: &[Box<dyn ImportExtractor>],
) -> Vec<ImportRecord> {
    let mut records = Vec::new();
    visit(parsed.root(), parsed.source(), extractors, &mut records);
    records.sort_by_key(|r| (r.bytes.start, r.bytes.end));
    records
}

fn visit(
    node: tree_sitter::Node<'_>,
    source: &str,
    extractors: &[Box<dyn ImportExtractor>],
    records: &mut Vec<ImportRecord>,
) {
    if let Some(record) = extractors.iter().find_map(|e| {
        let found = e.extract(node, source);
        if let Some(r) = &found {
            tracing::trace!(extractor = e.name(), specifier = %r.specifier, "import found");
        }
        found
    }) {
        records.push(record);
    }

    // keep descending: dynamic imports can sit anywhere, including inside
    // the arguments of another module call
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit(child, source, extractors, records);
    }
}

/// Classify a specifier
#[must_use]
pub fn origin_of(specifier: &str) -> ImportOrigin {
    let relative = matches!(specifier, "." | "..")
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/');
    if relative {
        ImportOrigin::Relative
    } else {
        ImportOrigin::Package
    }
}

fn node_text<'s>(node: tree_sitter::Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Literal value of a string node, or of a template string without
/// substitutions
fn string_value(node: tree_sitter::Node<'_>, source: &str) -> Option<String> {
    match node.kind() {
        "string" => {}
        "template_string" => {
            let mut cursor = node.walk();
            if node
                .named_children(&mut cursor)
                .any(|c| c.kind() == "template_substitution")
            {
                return None;
            }
        }
        _ => return None,
    }
    let text = node_text(node, source);
    let mut chars = text.chars();
    let (first, last) = (chars.next()?, chars.next_back()?);
    if first == last && matches!(first, '\'' | '"' | '`') {
        Some(chars.as_str().to_string())
    } else {
        None
    }
}
