//! Live mode bookkeeping: which hooks are being observed and what their
//! invocations carried.
//!
//! Interception itself belongs to the host runtime. A host subscribes to
//! [`LiveModeStore::active_markers`] and reports each invocation through
//! [`LiveModeStore::record_invocation`]. The store is file backed and expects a
//! single writer at a time.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::LiveModeConfig;
use crate::error::{HookError, Result};
use super::hook::HookKind;

const MARKERS_FILE: &str = "markers.json";
const LOGS_FILE: &str = "logs.json";

/// A hook marked for observation until `expiry`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveMarker {
    pub hook: String,
    pub kind: HookKind,
    pub num_args: usize,
    pub expiry: DateTime<Utc>,
}

/// Arguments of one observed invocation, keyed `arg1`, `arg2`, ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveLog {
    pub hook: String,
    pub kind: HookKind,
    pub date: DateTime<Utc>,
    pub log: Map<String, Value>,
}

pub struct LiveModeStore {
    dir: PathBuf,
    window: Duration,
    page_size: usize,
}

impl LiveModeStore {
    pub fn new(config: &LiveModeConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            window: Duration::minutes(config.window_minutes),
            page_size: config.page_size,
        }
    }

    /// Start observing a hook, or extend the window of an existing marker
    pub fn mark(
        &self,
        hook: &str,
        kind: HookKind,
        num_args: usize,
        now: DateTime<Utc>,
    ) -> Result<LiveMarker> {
        if kind == HookKind::Shortcode {
            return Err(HookError::LiveMode("shortcodes cannot be observed".to_string()));
        }

        let mut markers: Vec<LiveMarker> = self.read(MARKERS_FILE)?;
        let expiry = now + self.window;

        let marker = match markers.iter_mut().find(|m| m.hook == hook && m.kind == kind) {
            Some(existing) => {
                existing.expiry = expiry;
                existing.clone()
            }
            None => {
                let marker = LiveMarker {
                    hook: hook.to_string(),
                    kind,
                    num_args,
                    expiry,
                };
                markers.push(marker.clone());
                marker
            }
        };

        self.write(MARKERS_FILE, &markers)?;
        debug!("Observing {} '{}' until {}", kind, hook, marker.expiry);
        Ok(marker)
    }

    /// Markers whose window has not yet closed
    pub fn active_markers(&self, now: DateTime<Utc>) -> Result<Vec<LiveMarker>> {
        let markers: Vec<LiveMarker> = self.read(MARKERS_FILE)?;
        Ok(markers.into_iter().filter(|m| m.expiry > now).collect())
    }

    /// Log one invocation. For filters, returns the value the callback must pass through.
    pub fn record_invocation(
        &self,
        hook: &str,
        kind: HookKind,
        args: Vec<Value>,
        now: DateTime<Utc>,
    ) -> Result<Option<Value>> {
        let passthrough = match kind {
            HookKind::Filter => Some(args.first().cloned().unwrap_or(Value::Null)),
            _ => None,
        };

        let log = args
            .into_iter()
            .enumerate()
            .map(|(i, value)| (format!("arg{}", i + 1), value))
            .collect();

        let mut logs: Vec<LiveLog> = self.read(LOGS_FILE)?;
        logs.push(LiveLog {
            hook: hook.to_string(),
            kind,
            date: now,
            log,
        });
        self.write(LOGS_FILE, &logs)?;

        Ok(passthrough)
    }

    /// Newest logs first; with `latest`, only the newest entry after it
    pub fn logs(
        &self,
        hook: &str,
        kind: HookKind,
        latest: Option<DateTime<Utc>>,
    ) -> Result<Vec<LiveLog>> {
        let logs: Vec<LiveLog> = self.read(LOGS_FILE)?;

        let mut matching: Vec<LiveLog> = logs
            .into_iter()
            .rev()
            .filter(|l| l.hook == hook && l.kind == kind)
            .filter(|l| latest.map_or(true, |after| l.date > after))
            .collect();
        matching.sort_by(|a, b| b.date.cmp(&a.date));

        let limit = if latest.is_some() { 1 } else { self.page_size };
        matching.truncate(limit);
        Ok(matching)
    }

    fn read<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(T::default());
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        let temp_path = temp_path_for(&path);
        fs::write(&temp_path, serde_json::to_string_pretty(value)?)?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    path.with_extension(format!("{}.tmp", std::process::id()))
}
