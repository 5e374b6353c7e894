use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{HookError, Result};
use super::{
    CacheGateway, CacheRecord, HookAggregator, HookExtractor, HookKind, HookSet, JsonFileCache,
    ScanResult, SourceEnumerator,
};

/// Raw contents of one file under a scanned folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePreview {
    pub file: String,
    pub code: String,
}

/// Outcome of asking the cache for a folder
enum CacheResolution {
    Hit(HookSet),
    Miss,
}

/// Main orchestration engine: cache lookup, scanning, grouping
pub struct Engine {
    config: Config,
    extractor: HookExtractor,
    enumerator: SourceEnumerator,
    aggregator: HookAggregator,
    cache: Option<Box<dyn CacheGateway>>,
}

impl Engine {
    /// Create an engine using the configured JSON file cache, if enabled
    pub fn new(config: Config) -> Result<Self> {
        let cache: Option<Box<dyn CacheGateway>> = if config.cache.enabled {
            Some(Box::new(JsonFileCache::new(&config.cache.dir)))
        } else {
            debug!("Hook cache disabled");
            None
        };
        Self::build(config, cache)
    }

    /// Create an engine backed by a caller-supplied cache gateway
    pub fn with_cache(config: Config, cache: Box<dyn CacheGateway>) -> Result<Self> {
        Self::build(config, Some(cache))
    }

    fn build(config: Config, cache: Option<Box<dyn CacheGateway>>) -> Result<Self> {
        Ok(Self {
            extractor: HookExtractor::new()?,
            enumerator: SourceEnumerator::new(&config.scan),
            aggregator: HookAggregator::new()?,
            cache,
            config,
        })
    }

    /// Hooks declared under `path`, grouped per kind.
    ///
    /// Callers that may trigger refreshes concurrently must serialize them per
    /// path; two interleaved refreshes can leave a mixed record set behind.
    pub fn get_path_hooks(
        &mut self,
        path: &Path,
        force_refresh: bool,
        cache_result: bool,
    ) -> Result<ScanResult> {
        let root = resolve_root(path)?;
        let folder = root.to_string_lossy().to_string();
        let mut warnings = Vec::new();

        let resolution = if force_refresh {
            CacheResolution::Miss
        } else {
            self.resolve_cache(&folder)
        };

        let hooks = match resolution {
            CacheResolution::Hit(hooks) => {
                info!("Using cached hooks for {}", folder);
                hooks
            }
            CacheResolution::Miss => {
                let hooks = self.scan(&root);
                if cache_result {
                    if let Err(e) = self.store(&folder, &hooks) {
                        warn!("Failed to cache hooks for {}: {}", folder, e);
                        warnings.push(e.to_string());
                    }
                }
                hooks
            }
        };

        Ok(ScanResult {
            actions: self.aggregator.reduce_and_sort(hooks.actions)?,
            filters: self.aggregator.reduce_and_sort(hooks.filters)?,
            shortcodes: self.aggregator.reduce_and_sort(hooks.shortcodes)?,
            warnings,
        })
    }

    /// Stateless single-source extraction
    pub fn get_hooks_for_source(&mut self, source: &str) -> Result<HookSet> {
        self.extractor.extract(source)
    }

    /// Raw contents of `file` (relative to `root`), which must stay inside `root`
    pub fn preview_file(&self, root: &Path, file: &str) -> Result<FilePreview> {
        let root = resolve_root(root)?;
        let full_path = root
            .join(file.trim_start_matches('/'))
            .canonicalize()
            .map_err(|_| HookError::InvalidPath(root.join(file)))?;

        if !full_path.starts_with(&root) || !full_path.is_file() {
            return Err(HookError::InvalidPath(full_path));
        }

        Ok(FilePreview {
            file: file.to_string(),
            code: fs::read_to_string(&full_path)?,
        })
    }

    fn resolve_cache(&self, folder: &str) -> CacheResolution {
        let Some(cache) = self.cache.as_ref() else {
            return CacheResolution::Miss;
        };

        match load_cached(&**cache, folder, self.kinds()) {
            Ok(hooks) => {
                let complete = self.kinds().iter().all(|&kind| match kind {
                    HookKind::Action => !hooks.actions.is_empty(),
                    HookKind::Filter => !hooks.filters.is_empty(),
                    HookKind::Shortcode => !hooks.shortcodes.is_empty(),
                });
                if complete {
                    CacheResolution::Hit(hooks)
                } else {
                    debug!("Cache incomplete for {}", folder);
                    CacheResolution::Miss
                }
            }
            Err(e) => {
                warn!("Cache load failed for {}, rescanning: {}", folder, e);
                CacheResolution::Miss
            }
        }
    }

    fn scan(&mut self, root: &Path) -> HookSet {
        let mut hooks = HookSet::default();
        let mut files_scanned = 0;
        let mut files_failed = 0;

        for file in self.enumerator.enumerate(root) {
            let size = fs::metadata(&file.absolute_path).map(|m| m.len()).unwrap_or(0);
            if size > self.config.scan.max_file_size {
                warn!("Skipping {}: exceeds maximum size limit", file.relative_path);
                continue;
            }

            let source = match fs::read(&file.absolute_path) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warn!("Skipping unreadable file {}: {}", file.relative_path, e);
                    continue;
                }
            };

            match self.extractor.extract(&source) {
                Ok(file_hooks) => {
                    debug!("{}: {} hooks", file.relative_path, file_hooks.len());
                    hooks.merge_file(file_hooks, &file.relative_path);
                    files_scanned += 1;
                }
                Err(e) => {
                    warn!("Failed to parse {}: {}", file.absolute_path.display(), e);
                    files_failed += 1;
                }
            }
        }

        if !self.config.scan.include_shortcodes {
            hooks.shortcodes.clear();
        }

        info!(
            "Scanned {} files in {} ({} failed): {} actions, {} filters, {} shortcodes",
            files_scanned,
            root.display(),
            files_failed,
            hooks.actions.len(),
            hooks.filters.len(),
            hooks.shortcodes.len()
        );

        hooks
    }

    fn store(&mut self, folder: &str, hooks: &HookSet) -> Result<()> {
        let Some(cache) = self.cache.as_mut() else {
            return Ok(());
        };

        let records = hooks
            .iter()
            .map(|usage| CacheRecord::from_usage(folder, usage))
            .collect::<Result<Vec<_>>>()?;
        cache.replace_usages(folder, records)
    }

    fn kinds(&self) -> &'static [HookKind] {
        if self.config.scan.include_shortcodes {
            &[HookKind::Action, HookKind::Filter, HookKind::Shortcode]
        } else {
            &[HookKind::Action, HookKind::Filter]
        }
    }
}

fn resolve_root(path: &Path) -> Result<PathBuf> {
    let root = path
        .canonicalize()
        .map_err(|_| HookError::InvalidPath(path.to_path_buf()))?;
    if !root.is_dir() {
        return Err(HookError::InvalidPath(path.to_path_buf()));
    }
    Ok(root)
}

fn load_cached(cache: &dyn CacheGateway, folder: &str, kinds: &[HookKind]) -> Result<HookSet> {
    let mut hooks = HookSet::default();
    for &kind in kinds {
        let usages = cache
            .load_usages(folder, kind)?
            .into_iter()
            .map(CacheRecord::into_usage)
            .collect::<Result<Vec<_>>>()?;
        *hooks.usages_mut(kind) = usages;
    }
    Ok(hooks)
}
