use tree_sitter::{Node, Parser, Tree};

use crate::error::{HookError, Result};

/// PHP parser using Tree-sitter
pub struct PhpParser {
    parser: Parser,
}

impl PhpParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_php::LANGUAGE_PHP.into())
            .map_err(|e| HookError::Parse(format!("Failed to set PHP language: {}", e)))?;

        Ok(Self { parser })
    }

    /// Parse a full PHP source file. A tree containing syntax errors is rejected.
    pub fn parse(&mut self, source: &str) -> Result<Tree> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| HookError::Parse("Failed to parse PHP code".to_string()))?;

        let root = tree.root_node();
        if root.has_error() {
            let line = first_error_line(root).unwrap_or(0);
            return Err(HookError::Parse(format!("Syntax error near line {}", line)));
        }

        Ok(tree)
    }
}

/// 1-based line of the first ERROR or MISSING node in source order
fn first_error_line(root: Node) -> Option<usize> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node.start_position().row + 1);
        }
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

/// Extract text content of a node
pub fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}
