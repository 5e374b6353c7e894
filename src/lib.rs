//! Static discovery of WordPress-style hooks (actions, filters and shortcodes)
//! in PHP source trees.

pub mod config;
pub mod core;
pub mod error;

pub use config::Config;
pub use core::{Engine, HookGroup, HookKind, HookSet, HookUsage, ScanResult};
pub use error::{HookError, Result};
