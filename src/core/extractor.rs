use tree_sitter::Node;
use tracing::debug;

use crate::error::Result;
use super::hook::{HookKind, HookSet, HookUsage};
use super::normalizer::{named_children, CodeNormalizer};
use super::parser::{node_text, PhpParser};
use super::shortcodes::{ShortcodeReconciler, ShortcodeRegistration};

/// Function calls that declare or describe a hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HookCall {
    Action,
    Filter,
    ShortcodeRegistration,
    ShortcodeDefaults,
}

impl HookCall {
    fn from_callee(name: &str) -> Option<Self> {
        match name {
            "do_action" => Some(HookCall::Action),
            "apply_filters" => Some(HookCall::Filter),
            "add_shortcode" => Some(HookCall::ShortcodeRegistration),
            "shortcode_atts" => Some(HookCall::ShortcodeDefaults),
            _ => None,
        }
    }
}

/// Accumulates one file's usages during a single traversal
struct FilePass {
    actions: Vec<HookUsage>,
    filters: Vec<HookUsage>,
    shortcodes: ShortcodeReconciler,
}

/// Finds hook call sites in PHP source
pub struct HookExtractor {
    parser: PhpParser,
    normalizer: CodeNormalizer,
}

impl HookExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: PhpParser::new()?,
            normalizer: CodeNormalizer::new()?,
        })
    }

    /// Extract actions, filters and shortcodes from one source file
    pub fn extract(&mut self, source: &str) -> Result<HookSet> {
        let tree = self.parser.parse(source)?;

        let mut pass = FilePass {
            actions: Vec::new(),
            filters: Vec::new(),
            shortcodes: ShortcodeReconciler::new(),
        };

        // Pre-order walk keeps calls in source order, outer calls first
        let mut cursor = tree.root_node().walk();
        loop {
            let node = cursor.node();
            if node.kind() == "function_call_expression" {
                self.visit_call(node, source, &mut pass);
            }

            if cursor.goto_first_child() {
                continue;
            }
            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return Ok(HookSet {
                        actions: pass.actions,
                        filters: pass.filters,
                        shortcodes: pass.shortcodes.into_usages(),
                    });
                }
            }
        }
    }

    fn visit_call(&self, node: Node, source: &str, pass: &mut FilePass) {
        // Only bare names match; qualified, variable and dynamic callees are skipped
        let Some(callee) = node.child_by_field_name("function") else {
            return;
        };
        if callee.kind() != "name" {
            return;
        }
        let Some(call) = HookCall::from_callee(node_text(callee, source)) else {
            return;
        };

        let args = argument_values(node);
        let line_start = node.start_position().row + 1;
        let line_end = node.end_position().row + 1;

        match call {
            HookCall::Action | HookCall::Filter => {
                let Some(&name_arg) = args.first() else {
                    debug!("Skipping hook call without a name at line {}", line_start);
                    return;
                };
                let kind = if call == HookCall::Action {
                    HookKind::Action
                } else {
                    HookKind::Filter
                };
                let usage = HookUsage {
                    hook_name: self.normalizer.hook_name(name_arg, source),
                    kind,
                    line_start,
                    line_end,
                    source_code: self.normalizer.pretty_print(node, source),
                    doc_comment: self.doc_comment(node, source),
                    parameters: self.normalizer.simplify_parameters(&args, source),
                    file: String::new(),
                };
                match kind {
                    HookKind::Action => pass.actions.push(usage),
                    _ => pass.filters.push(usage),
                }
            }
            HookCall::ShortcodeRegistration => {
                let Some(&name_arg) = args.first() else {
                    return;
                };
                pass.shortcodes.register(ShortcodeRegistration {
                    hook_name: self.normalizer.hook_name(name_arg, source),
                    line_start,
                    line_end,
                    source_code: self.normalizer.pretty_print(node, source),
                    doc_comment: self.doc_comment(node, source),
                });
            }
            HookCall::ShortcodeDefaults => {
                let (Some(&defaults), Some(&name_arg)) = (args.first(), args.get(1)) else {
                    debug!("Skipping shortcode defaults without a name at line {}", line_start);
                    return;
                };
                let hook_name = self.normalizer.hook_name(name_arg, source);
                let attributes = self.normalizer.attribute_names(defaults, source);
                pass.shortcodes.declare_defaults(&hook_name, attributes);
            }
        }
    }

    /// Nearest `/** */` comment directly preceding the call's enclosing statement
    fn doc_comment(&self, node: Node, source: &str) -> String {
        let statement = enclosing_statement(node);
        let mut previous = statement.prev_sibling();

        while let Some(sibling) = previous {
            if sibling.kind() != "comment" {
                break;
            }
            let text = node_text(sibling, source);
            if text.starts_with("/**") {
                return self.normalizer.doc_block(text);
            }
            previous = sibling.prev_sibling();
        }

        String::new()
    }
}

/// Argument value expressions of a call, in order
fn argument_values(call: Node) -> Vec<Node> {
    let Some(arguments) = call.child_by_field_name("arguments") else {
        return Vec::new();
    };

    named_children(arguments)
        .into_iter()
        .filter_map(|arg| match arg.kind() {
            // Named arguments carry the parameter name first; the value is last
            "argument" => named_children(arg).last().copied(),
            "variadic_unpacking" => Some(arg),
            _ => None,
        })
        .collect()
}

fn enclosing_statement(node: Node) -> Node {
    let mut current = node;
    while let Some(parent) = current.parent() {
        if is_statement(current.kind()) {
            return current;
        }
        current = parent;
    }
    current
}

fn is_statement(kind: &str) -> bool {
    (kind.ends_with("_statement") && kind != "compound_statement")
        || kind.ends_with("_declaration")
        || kind == "function_definition"
}
