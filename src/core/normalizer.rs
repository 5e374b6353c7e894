//! Canonical rendering of PHP call expressions and their arguments.
//!
//! Rendered code follows one whitespace style regardless of how the call was
//! written: one space after every comma, a space inside every opening and
//! before every closing parenthesis or bracket, and no other runs of
//! whitespace. Argument lists are additionally reduced to short parameter
//! names that can be pasted into a callback signature.

use std::ops::Range;

use regex::Regex;
use tree_sitter::Node;

use crate::error::Result;
use super::parser::node_text;

/// Placeholder used for array literal arguments
const ITEMS_PLACEHOLDER: &str = "$items";

pub struct CodeNormalizer {
    whitespace: Regex,
    call_gap: Regex,
    open_gap: Regex,
    close_gap: Regex,
    horizontal_whitespace: Regex,
}

impl CodeNormalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            whitespace: Regex::new(r"\s+")?,
            call_gap: Regex::new(r"(\w) \(")?,
            open_gap: Regex::new(r"([\(\[]) ")?,
            close_gap: Regex::new(r" ([\)\],])")?,
            horizontal_whitespace: Regex::new(r"[^\S\r\n]+")?,
        })
    }

    /// Render a node as canonical single-line source, dropping comments.
    ///
    /// String literals only have their whitespace runs collapsed; the spacing
    /// rules never reach inside them.
    pub fn pretty_print(&self, node: Node, source: &str) -> String {
        if is_string_literal(node.kind()) {
            return self.collapse_whitespace(node_text(node, source));
        }

        let mut text = String::new();
        let mut literals = Vec::new();
        let mut position = node.start_byte();

        for (range, kind) in verbatim_ranges(node) {
            text.push_str(&source[position..range.start]);
            match kind {
                Verbatim::Comment => text.push(' '),
                Verbatim::String => {
                    text.push_str(&literal_placeholder(literals.len()));
                    literals.push(self.collapse_whitespace(&source[range.clone()]));
                }
            }
            position = range.end;
        }
        text.push_str(&source[position..node.end_byte()]);

        let mut rendered = self.canonicalize(text.trim());
        for (index, literal) in literals.iter().enumerate() {
            rendered = rendered.replacen(&literal_placeholder(index), literal, 1);
        }
        rendered
    }

    /// Apply the canonical whitespace style to arbitrary source text
    pub fn canonicalize(&self, text: &str) -> String {
        let collapsed = self.whitespace.replace_all(text, " ");
        let tightened = self.call_gap.replace_all(&collapsed, "$1(");
        let tightened = self.open_gap.replace_all(&tightened, "$1");
        let tightened = self.close_gap.replace_all(&tightened, "$1");

        let chars: Vec<char> = tightened.chars().collect();
        let mut spaced = String::with_capacity(chars.len() + chars.len() / 4);
        let mut last: Option<char> = None;

        for (i, &c) in chars.iter().enumerate() {
            match c {
                ',' | '(' | '[' => {
                    spaced.push(c);
                    last = Some(c);
                    if !chars.get(i + 1).is_some_and(|next| next.is_whitespace()) {
                        spaced.push(' ');
                        last = Some(' ');
                    }
                }
                ')' | ']' => {
                    if last.is_some_and(|prev| !prev.is_whitespace()) {
                        spaced.push(' ');
                    }
                    spaced.push(c);
                    last = Some(c);
                }
                _ => {
                    spaced.push(c);
                    last = Some(c);
                }
            }
        }

        self.whitespace.replace_all(&spaced, " ").into_owned()
    }

    /// Simplified parameter names for a call's argument values.
    ///
    /// The first argument is kept verbatim (pretty-printed) so generated
    /// samples can reuse the real hook expression.
    pub fn simplify_parameters(&self, args: &[Node], source: &str) -> Vec<String> {
        let mut fallback_count = 0;

        args.iter()
            .enumerate()
            .map(|(index, &arg)| {
                if index == 0 {
                    return self.pretty_print(arg, source);
                }
                simple_parameter_name(arg, source).unwrap_or_else(|| {
                    fallback_count += 1;
                    format!("$var{}", fallback_count)
                })
            })
            .collect()
    }

    /// Hook name for a name-carrying argument: unquoted literal, or the
    /// normalized expression text when the name is computed
    pub fn hook_name(&self, node: Node, source: &str) -> String {
        match plain_string_value(node, source) {
            Some(value) => value.trim().to_string(),
            None => self.pretty_print(node, source).trim().to_string(),
        }
    }

    /// Attribute names declared by an array literal of defaults
    pub fn attribute_names(&self, node: Node, source: &str) -> Vec<String> {
        if node.kind() != "array_creation_expression" {
            return Vec::new();
        }

        named_children(node)
            .into_iter()
            .filter(|element| element.kind() == "array_element_initializer")
            .filter_map(|element| {
                let parts = named_children(element);
                if parts.len() < 2 {
                    return None;
                }
                Some(self.hook_name(parts[0], source))
            })
            .collect()
    }

    fn collapse_whitespace(&self, text: &str) -> String {
        self.whitespace.replace_all(text, " ").into_owned()
    }

    /// Doc comment text with horizontal whitespace runs collapsed
    pub fn doc_block(&self, comment: &str) -> String {
        self.horizontal_whitespace.replace_all(comment, " ").into_owned()
    }
}

fn simple_parameter_name(arg: Node, source: &str) -> Option<String> {
    match arg.kind() {
        "variable_name" => Some(node_text(arg, source).to_string()),
        "integer" | "float" => scalar_name(node_text(arg, source)),
        "string" | "encapsed_string" => {
            plain_string_value(arg, source).and_then(|value| scalar_name(&value))
        }
        "array_creation_expression" => Some(ITEMS_PLACEHOLDER.to_string()),
        "subscript_expression" => {
            let index = named_children(arg).into_iter().nth(1)?;
            match index.kind() {
                "variable_name" => Some(node_text(index, source).to_string()),
                "string" | "encapsed_string" => {
                    plain_string_value(index, source).map(|value| format!("${}", value))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn scalar_name(value: &str) -> Option<String> {
    if value.contains(char::is_whitespace) {
        None
    } else {
        Some(format!("${}", value))
    }
}

/// Value of a string literal without interpolation, quotes removed
pub fn plain_string_value(node: Node, source: &str) -> Option<String> {
    let text = node_text(node, source);
    match node.kind() {
        "string" => {
            let inner = text
                .strip_prefix(['b', 'B'])
                .unwrap_or(text)
                .strip_prefix('\'')?
                .strip_suffix('\'')?;
            Some(inner.replace("\\'", "'").replace("\\\\", "\\"))
        }
        "encapsed_string" => {
            let interpolated = named_children(node).into_iter().any(|child| {
                !matches!(child.kind(), "string_content" | "string_value" | "escape_sequence")
            });
            if interpolated {
                return None;
            }
            let inner = text
                .strip_prefix(['b', 'B'])
                .unwrap_or(text)
                .strip_prefix('"')?
                .strip_suffix('"')?;
            Some(inner.to_string())
        }
        _ => None,
    }
}

/// Named children of a node, excluding comments
pub fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// Source spans that bypass the spacing rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verbatim {
    Comment,
    String,
}

fn is_string_literal(kind: &str) -> bool {
    matches!(kind, "string" | "encapsed_string")
}

/// Stands in for a string literal while the surrounding code is canonicalized.
/// Private-use delimiters never occur in real PHP source.
fn literal_placeholder(index: usize) -> String {
    format!("\u{E000}{}\u{E001}", index)
}

/// Byte ranges of comments and string literals inside a node, in source order.
/// Neither kind is descended into.
fn verbatim_ranges(node: Node) -> Vec<(Range<usize>, Verbatim)> {
    let mut ranges = Vec::new();
    let mut cursor = node.walk();
    if !cursor.goto_first_child() {
        return ranges;
    }

    loop {
        let current = cursor.node();
        if current.kind() == "comment" {
            ranges.push((current.byte_range(), Verbatim::Comment));
        } else if is_string_literal(current.kind()) {
            ranges.push((current.byte_range(), Verbatim::String));
        } else if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() || cursor.node() == node {
                return ranges;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::PhpParser;
    use tree_sitter::Tree;

    fn parse(source: &str) -> Tree {
        PhpParser::new().unwrap().parse(source).unwrap()
    }

    fn first_call(node: Node) -> Option<Node> {
        if node.kind() == "function_call_expression" {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        children.into_iter().find_map(first_call)
    }

    fn call_args(call: Node) -> Vec<Node> {
        let arguments = call.child_by_field_name("arguments").unwrap();
        named_children(arguments)
            .into_iter()
            .filter(|arg| arg.kind() == "argument")
            .map(|arg| *named_children(arg).last().unwrap())
            .collect()
    }

    #[test]
    fn test_canonicalize_spacing_rules() {
        let normalizer = CodeNormalizer::new().unwrap();
        assert_eq!(
            normalizer.canonicalize("apply_filters('filter_1',$a,$b,$c)"),
            "apply_filters( 'filter_1', $a, $b, $c )"
        );
        assert_eq!(
            normalizer.canonicalize("do_action ( 'action_2', 1, 2, 3 )"),
            "do_action( 'action_2', 1, 2, 3 )"
        );
        assert_eq!(normalizer.canonicalize("f(g())"), "f( g( ) )");
        assert_eq!(normalizer.canonicalize("f([[1],[2]])"), "f( [ [ 1 ], [ 2 ] ] )");
    }

    #[test]
    fn test_pretty_print_multiline_call() {
        let normalizer = CodeNormalizer::new().unwrap();
        let source = "<?php\ndo_action( \n\t'action_3',\n\t[1, 2, 3]\n);\n";
        let tree = parse(source);
        let call = first_call(tree.root_node()).unwrap();

        assert_eq!(
            normalizer.pretty_print(call, source),
            "do_action( 'action_3', [ 1, 2, 3 ] )"
        );
    }

    #[test]
    fn test_pretty_print_drops_inner_comments() {
        let normalizer = CodeNormalizer::new().unwrap();
        let source = "<?php\ndo_action( 'a', /* why */ $b // trailing\n);\n";
        let tree = parse(source);
        let call = first_call(tree.root_node()).unwrap();

        assert_eq!(normalizer.pretty_print(call, source), "do_action( 'a', $b )");
    }

    #[test]
    fn test_pretty_print_leaves_string_literals_alone() {
        let normalizer = CodeNormalizer::new().unwrap();
        let source = "<?php\ndo_action('x','a , b',\"c (d)\",   'e [ f ]' . $g);\n";
        let tree = parse(source);
        let call = first_call(tree.root_node()).unwrap();

        assert_eq!(
            normalizer.pretty_print(call, source),
            "do_action( 'x', 'a , b', \"c (d)\", 'e [ f ]' . $g )"
        );
    }

    #[test]
    fn test_pretty_print_collapses_whitespace_inside_strings() {
        let normalizer = CodeNormalizer::new().unwrap();
        let source = "<?php\ndo_action( 'x', 'two\n   lines' );\n";
        let tree = parse(source);
        let call = first_call(tree.root_node()).unwrap();

        assert_eq!(normalizer.pretty_print(call, source), "do_action( 'x', 'two lines' )");
    }

    #[test]
    fn test_simplify_parameters_rules() {
        let normalizer = CodeNormalizer::new().unwrap();
        let source = "<?php\napply_filters( 'x', $post, 'arg1', 42, 'two words', [1], $args['id'], $map[$key], $obj->prop, foo(), $list[0] );\n";
        let tree = parse(source);
        let call = first_call(tree.root_node()).unwrap();

        let params = normalizer.simplify_parameters(&call_args(call), source);
        assert_eq!(
            params,
            vec![
                "'x'", "$post", "$arg1", "$42", "$var1", "$items", "$id", "$key", "$var2",
                "$var3", "$var4",
            ]
        );
    }

    #[test]
    fn test_simplify_parameters_counter_is_per_call() {
        let normalizer = CodeNormalizer::new().unwrap();
        let source = "<?php\ndo_action( 'a', f() );\n";
        let tree = parse(source);
        let call = first_call(tree.root_node()).unwrap();
        let args = call_args(call);

        assert_eq!(normalizer.simplify_parameters(&args, source)[1], "$var1");
        assert_eq!(normalizer.simplify_parameters(&args, source)[1], "$var1");
    }

    #[test]
    fn test_hook_name_strips_only_plain_literals() {
        let normalizer = CodeNormalizer::new().unwrap();
        let source = "<?php\ndo_action( 'filter_2_' . $plugin_dir_name . '/captainhooks.php' );\ndo_action( \"plain\" );\ndo_action( \"hook_{$name}\" );\n";
        let tree = parse(source);
        let root = tree.root_node();

        let mut names = Vec::new();
        let mut cursor = root.walk();
        for statement in root.children(&mut cursor) {
            if let Some(call) = first_call(statement) {
                names.push(normalizer.hook_name(call_args(call)[0], source));
            }
        }

        assert_eq!(
            names,
            vec![
                "'filter_2_' . $plugin_dir_name . '/captainhooks.php'",
                "plain",
                "\"hook_{$name}\"",
            ]
        );
    }

    #[test]
    fn test_attribute_names_from_defaults_array() {
        let normalizer = CodeNormalizer::new().unwrap();
        let source = "<?php\nshortcode_atts( array( 'width' => 10, \"height\" => 20, 'orphan' ), $atts, 'box' );\n";
        let tree = parse(source);
        let call = first_call(tree.root_node()).unwrap();

        let names = normalizer.attribute_names(call_args(call)[0], source);
        assert_eq!(names, vec!["width", "height"]);
    }

    #[test]
    fn test_doc_block_collapses_horizontal_whitespace() {
        let normalizer = CodeNormalizer::new().unwrap();
        assert_eq!(
            normalizer.doc_block("/**\n *   Fires   early.\n\t */"),
            "/**\n * Fires early.\n */"
        );
    }
}
