mod hook;
mod parser;
mod normalizer;
mod shortcodes;
mod extractor;
mod enumerator;
mod aggregator;
mod cache;
mod engine;
mod livemode;

pub use hook::{HookGroup, HookKind, HookSet, HookUsage, ScanResult};
pub use parser::PhpParser;
pub use normalizer::CodeNormalizer;
pub use shortcodes::{ShortcodeReconciler, ShortcodeRegistration};
pub use extractor::HookExtractor;
pub use enumerator::{SourceEnumerator, SourceFile};
pub use aggregator::HookAggregator;
pub use cache::{CacheGateway, CacheRecord, JsonFileCache, MemoryCache};
pub use livemode::{LiveLog, LiveMarker, LiveModeStore};

// Export the main engine
pub use engine::{Engine, FilePreview};
