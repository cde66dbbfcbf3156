use crate::models::{top_level, ImportSet};
use tree_sitter::{Node, Parser, Tree};

use super::{ExtractStrategy, ImportExtractor, ParserError};

/// Syntax-tree import extractor backed by tree-sitter-python
pub struct PythonParser {
    parser: Parser,
}

/// The node shapes import extraction cares about
enum ImportNode<'tree> {
    /// `import a.b, c as d`
    Import(Node<'tree>),
    /// `from a.b import c` and `from .a import b`
    From(Node<'tree>),
    /// `from __future__ import annotations`
    Future,
    Other(Node<'tree>),
}

impl<'tree> ImportNode<'tree> {
    fn classify(node: Node<'tree>) -> Self {
        match node.kind() {
            "import_statement" => ImportNode::Import(node),
            "import_from_statement" => ImportNode::From(node),
            "future_import_statement" => ImportNode::Future,
            _ => ImportNode::Other(node),
        }
    }
}

impl PythonParser {
    pub fn new() -> Result<Self, ParserError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| ParserError::InitError(e.to_string()))?;

        Ok(Self { parser })
    }

    fn extract_imports(&self, source: &str, tree: &Tree) -> ImportSet {
        let mut imports = ImportSet::new();
        self.traverse_node(tree.root_node(), source, &mut imports);
        imports
    }

    fn traverse_node(&self, node: Node, source: &str, imports: &mut ImportSet) {
        match ImportNode::classify(node) {
            ImportNode::Import(node) => self.parse_import_statement(node, source, imports),
            ImportNode::From(node) => self.parse_import_from_statement(node, source, imports),
            ImportNode::Future => {
                imports.insert("__future__".to_string());
            }
            ImportNode::Other(node) => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    self.traverse_node(child, source, imports);
                }
            }
        }
    }

    /// `import x, y.z` or `import x as alias`
    fn parse_import_statement(&self, node: Node, source: &str, imports: &mut ImportSet) {
        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            let target = match name.kind() {
                "aliased_import" => match name.child_by_field_name("name") {
                    Some(inner) => inner,
                    None => continue,
                },
                _ => name,
            };
            self.insert_module(target, source, imports);
        }
    }

    /// `from x.y import z`; only the module path counts, never the imported names.
    /// `from . import x` has no module path and contributes nothing.
    fn parse_import_from_statement(&self, node: Node, source: &str, imports: &mut ImportSet) {
        let Some(module) = node.child_by_field_name("module_name") else {
            return;
        };

        match module.kind() {
            "relative_import" => {
                let mut cursor = module.walk();
                let dotted = module
                    .children(&mut cursor)
                    .find(|child| child.kind() == "dotted_name");
                if let Some(dotted) = dotted {
                    self.insert_module(dotted, source, imports);
                }
            }
            _ => self.insert_module(module, source, imports),
        }
    }

    fn insert_module(&self, node: Node, source: &str, imports: &mut ImportSet) {
        let name = top_level(self.get_node_text(&node, source));
        if !name.is_empty() {
            imports.insert(name.to_string());
        }
    }

    fn get_node_text<'s>(&self, node: &Node, source: &'s str) -> &'s str {
        &source[node.byte_range()]
    }
}

/// Depth-first search for the first error or missing node
fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error() || child.is_missing())
        .find_map(first_error)
}

/// Python 2 statements the grammar still accepts but Python 3 rejects
const LEGACY_STATEMENTS: &[&str] = &["print_statement", "exec_statement"];

fn first_legacy_statement(node: Node) -> Option<Node> {
    if LEGACY_STATEMENTS.contains(&node.kind()) {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_legacy_statement)
}

impl ImportExtractor for PythonParser {
    fn extract(&mut self, source: &str) -> Result<ImportSet, ParserError> {
        let tree = self.parser.parse(source, None).ok_or(ParserError::NoTree)?;
        let root = tree.root_node();

        let invalid = if root.has_error() {
            Some(first_error(root).unwrap_or(root))
        } else {
            first_legacy_statement(root)
        };
        if let Some(node) = invalid {
            let position = node.start_position();
            return Err(ParserError::ParseError {
                line: position.row + 1,
                column: position.column,
            });
        }

        Ok(self.extract_imports(source, &tree))
    }

    fn strategy(&self) -> ExtractStrategy {
        ExtractStrategy::Syntax
    }
}
