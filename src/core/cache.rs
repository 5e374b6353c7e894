//! Per-folder storage of extracted hook usages.
//!
//! Records are stored flat, one per usage, after parameter simplification and
//! before grouping; grouping and sample generation always happen on read.
//! Replacing a folder's records is all-or-nothing so files that vanished from
//! disk never leave stale rows behind. Concurrent refreshes of the same folder
//! are not coordinated here and must be serialized by the caller.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{HookError, Result};
use super::hook::{HookKind, HookUsage};

/// Storable form of one usage, keyed by the scanned folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub folder: String,
    pub kind: HookKind,
    pub hook_name: String,
    pub line_start: usize,
    pub line_end: usize,
    pub source_code: String,
    pub doc_comment: String,
    pub file: String,

    /// JSON-encoded parameter list, opaque to the gateway
    pub parameters: String,
}

impl CacheRecord {
    pub fn from_usage(folder: &str, usage: &HookUsage) -> Result<Self> {
        Ok(Self {
            folder: folder.to_string(),
            kind: usage.kind,
            hook_name: usage.hook_name.clone(),
            line_start: usage.line_start,
            line_end: usage.line_end,
            source_code: usage.source_code.clone(),
            doc_comment: usage.doc_comment.clone(),
            file: usage.file.clone(),
            parameters: serde_json::to_string(&usage.parameters)?,
        })
    }

    pub fn into_usage(self) -> Result<HookUsage> {
        Ok(HookUsage {
            parameters: serde_json::from_str(&self.parameters)?,
            hook_name: self.hook_name,
            kind: self.kind,
            line_start: self.line_start,
            line_end: self.line_end,
            source_code: self.source_code,
            doc_comment: self.doc_comment,
            file: self.file,
        })
    }
}

/// Load/store previously computed usages per scanned folder
pub trait CacheGateway {
    /// Stored records of one kind for a folder, empty when nothing is cached
    fn load_usages(&self, folder: &str, kind: HookKind) -> Result<Vec<CacheRecord>>;

    /// Replace every record stored for a folder with `records`
    fn replace_usages(&mut self, folder: &str, records: Vec<CacheRecord>) -> Result<()>;
}

/// In-process cache, mainly for hosts that keep the engine alive between scans
#[derive(Debug, Default)]
pub struct MemoryCache {
    folders: HashMap<String, Vec<CacheRecord>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheGateway for MemoryCache {
    fn load_usages(&self, folder: &str, kind: HookKind) -> Result<Vec<CacheRecord>> {
        Ok(self
            .folders
            .get(folder)
            .map(|records| records.iter().filter(|r| r.kind == kind).cloned().collect())
            .unwrap_or_default())
    }

    fn replace_usages(&mut self, folder: &str, records: Vec<CacheRecord>) -> Result<()> {
        self.folders.insert(folder.to_string(), records);
        Ok(())
    }
}

/// One JSON file per folder, named by the SHA-256 of the folder key
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    dir: PathBuf,
}

impl JsonFileCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn folder_path(&self, folder: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(folder.as_bytes());
        self.dir.join(format!("{:x}.json", hasher.finalize()))
    }
}

impl CacheGateway for JsonFileCache {
    fn load_usages(&self, folder: &str, kind: HookKind) -> Result<Vec<CacheRecord>> {
        let path = self.folder_path(folder);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| HookError::CacheUnavailable(format!("{}: {}", path.display(), e)))?;
        let records: Vec<CacheRecord> = serde_json::from_str(&content)
            .map_err(|e| HookError::CacheUnavailable(format!("{}: {}", path.display(), e)))?;

        // Guard against hash collisions between folder keys
        Ok(records
            .into_iter()
            .filter(|r| r.folder == folder && r.kind == kind)
            .collect())
    }

    fn replace_usages(&mut self, folder: &str, records: Vec<CacheRecord>) -> Result<()> {
        let unavailable = |e: std::io::Error| HookError::CacheUnavailable(e.to_string());

        fs::create_dir_all(&self.dir).map_err(unavailable)?;
        let path = self.folder_path(folder);
        let content = serde_json::to_string(&records)?;

        // Temp file + rename so readers never see a partial record set
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let temp_path = path.with_extension(format!("{}.{}.tmp", std::process::id(), nanos));
        fs::write(&temp_path, content).map_err(unavailable)?;
        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(unavailable(e));
        }

        debug!("Cached {} records for {} in {}", records.len(), folder, path.display());
        Ok(())
    }
}
