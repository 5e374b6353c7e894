use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HookError;

/// Which recognized call form produced a usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookKind {
    Action,
    Filter,
    Shortcode,
}

impl HookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::Action => "action",
            HookKind::Filter => "filter",
            HookKind::Shortcode => "shortcode",
        }
    }

    /// Function a consumer calls to attach a callback to this kind of hook
    pub fn registration_function(&self) -> &'static str {
        match self {
            HookKind::Action => "add_action",
            HookKind::Filter => "add_filter",
            HookKind::Shortcode => "add_shortcode",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookKind {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "action" => Ok(HookKind::Action),
            "filter" => Ok(HookKind::Filter),
            "shortcode" => Ok(HookKind::Shortcode),
            other => Err(HookError::Parse(format!("Unknown hook kind: {}", other))),
        }
    }
}

/// One call site of a hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookUsage {
    /// Literal hook name, or normalized expression text for computed names
    pub hook_name: String,

    pub kind: HookKind,

    /// 1-based line span; 0 when a shortcode was only seen through its defaults
    pub line_start: usize,
    pub line_end: usize,

    /// Canonical rendering of the full call expression
    pub source_code: String,

    pub doc_comment: String,

    /// Hook-name expression followed by simplified argument names
    pub parameters: Vec<String>,

    /// Path relative to the scanned root, empty for standalone sources
    #[serde(default)]
    pub file: String,
}

/// All usages sharing one hook name, as reported to consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookGroup {
    pub hook_name: String,
    pub kind: HookKind,
    pub arg_count: usize,
    pub doc_comment: String,
    pub sample_code: String,
    pub usages: Vec<HookUsage>,
    pub visible: bool,
    pub expanded: bool,
}

/// Flat per-kind usages, as produced by extraction and stored in the cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookSet {
    pub actions: Vec<HookUsage>,
    pub filters: Vec<HookUsage>,
    pub shortcodes: Vec<HookUsage>,
}

impl HookSet {
    /// Append another file's usages, tagging each with its relative path
    pub fn merge_file(&mut self, other: HookSet, file: &str) {
        let tag = |mut usage: HookUsage| {
            usage.file = file.to_string();
            usage
        };
        self.actions.extend(other.actions.into_iter().map(tag));
        self.filters.extend(other.filters.into_iter().map(tag));
        self.shortcodes.extend(other.shortcodes.into_iter().map(tag));
    }

    pub fn len(&self) -> usize {
        self.actions.len() + self.filters.len() + self.shortcodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &HookUsage> {
        self.actions
            .iter()
            .chain(self.filters.iter())
            .chain(self.shortcodes.iter())
    }

    pub fn usages_mut(&mut self, kind: HookKind) -> &mut Vec<HookUsage> {
        match kind {
            HookKind::Action => &mut self.actions,
            HookKind::Filter => &mut self.filters,
            HookKind::Shortcode => &mut self.shortcodes,
        }
    }
}

/// Grouped hooks for one scanned folder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub actions: Vec<HookGroup>,
    pub filters: Vec<HookGroup>,
    pub shortcodes: Vec<HookGroup>,

    /// Non-fatal problems, e.g. a cache store that failed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
