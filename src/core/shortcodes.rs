use std::collections::HashMap;

use super::hook::{HookKind, HookUsage};

/// A shortcode name registration call, e.g. `add_shortcode( 'box', 'cb' )`
#[derive(Debug, Clone)]
pub struct ShortcodeRegistration {
    pub hook_name: String,
    pub line_start: usize,
    pub line_end: usize,
    pub source_code: String,
    pub doc_comment: String,
}

/// Merges shortcode registrations and attribute-default declarations seen
/// during one file pass into one usage per shortcode name.
///
/// Either call form may come first. The last registration wins for span, code
/// and doc comment; attribute names accumulate in first-seen order.
#[derive(Debug, Default)]
pub struct ShortcodeReconciler {
    usages: Vec<HookUsage>,
    index: HashMap<String, usize>,
}

impl ShortcodeReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, registration: ShortcodeRegistration) {
        let usage = self.entry(&registration.hook_name);
        usage.line_start = registration.line_start;
        usage.line_end = registration.line_end;
        usage.source_code = registration.source_code;
        usage.doc_comment = registration.doc_comment;
    }

    pub fn declare_defaults(&mut self, hook_name: &str, attributes: Vec<String>) {
        let usage = self.entry(hook_name);
        for attribute in attributes {
            if !usage.parameters.contains(&attribute) {
                usage.parameters.push(attribute);
            }
        }
    }

    /// Usages in the order their names were first seen
    pub fn into_usages(self) -> Vec<HookUsage> {
        self.usages
    }

    fn entry(&mut self, hook_name: &str) -> &mut HookUsage {
        let position = match self.index.get(hook_name) {
            Some(&position) => position,
            None => {
                self.usages.push(HookUsage {
                    hook_name: hook_name.to_string(),
                    kind: HookKind::Shortcode,
                    line_start: 0,
                    line_end: 0,
                    source_code: String::new(),
                    doc_comment: String::new(),
                    parameters: Vec::new(),
                    file: String::new(),
                });
                self.index.insert(hook_name.to_string(), self.usages.len() - 1);
                self.usages.len() - 1
            }
        };
        &mut self.usages[position]
    }
}
