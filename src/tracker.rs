use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::store::KeyValueStore;
use crate::utils::error::Result;

const LINE_PREFIX: &str = "PreviousValue";

/// Tracks the last observed value per target, backed by one state file
/// holding `PreviousValue<index>=<value>` lines:
///
/// ```text
/// PreviousValue0=May 31, 2021
/// PreviousValue1=April 2, 2020
/// ```
///
/// Indexes are controlled by the caller and assumed to match the
/// configured target list. One check cycle builds a fresh tracker from
/// the file, stages new values while diffing, and flushes everything
/// back in a single write at the end.
pub struct ChangeTracker {
    store: Arc<dyn KeyValueStore>,
    file_name: String,
    values: BTreeMap<usize, String>,
    dirty: bool,
}

impl ChangeTracker {
    /// Reads and parses the saved state. Lines that do not fit the
    /// `PreviousValue<index>=<value>` shape are skipped with a warning
    /// rather than failing the load; a partially written file should
    /// degrade to "never seen", not break the run.
    pub async fn load(store: Arc<dyn KeyValueStore>, file_name: &str) -> Result<Self> {
        let saved_text = store.read_all(file_name).await?;

        let mut values = BTreeMap::new();
        for line in saved_text.lines() {
            if line.is_empty() {
                continue;
            }
            match Self::parse_line(line) {
                Some((index, value)) => {
                    debug!("loaded previous value for target {index}: {value}");
                    values.insert(index, value);
                }
                None => warn!("skipping malformed state line: {line}"),
            }
        }

        Ok(Self {
            store,
            file_name: file_name.to_string(),
            values,
            dirty: false,
        })
    }

    fn parse_line(line: &str) -> Option<(usize, String)> {
        let (key, value) = line.split_once('=')?;
        let index = key.strip_prefix(LINE_PREFIX)?.parse().ok()?;
        Some((index, value.to_string()))
    }

    /// True when the given value differs from the saved one. An index
    /// that was never saved always counts as changed (first run).
    pub fn diff(&self, index: usize, new_value: &str) -> bool {
        match self.values.get(&index) {
            Some(saved) => saved != new_value,
            None => true,
        }
    }

    /// Records a new value, pending the next flush.
    pub fn stage(&mut self, index: usize, new_value: &str) {
        self.values.insert(index, new_value.to_string());
        self.dirty = true;
    }

    /// Combined check-and-stage: when the value changed it is staged
    /// immediately, so a second call with the same value reports no
    /// change. Callers do not make a separate commit call.
    pub fn has_changed(&mut self, index: usize, new_value: &str) -> bool {
        let changed = self.diff(index, new_value);
        if changed {
            self.stage(index, new_value);
        }
        changed
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Writes the whole mapping back when anything was staged; a no-op
    /// reporting success otherwise. A failed write is logged and
    /// reported as `false`; whether losing the persist is fatal is
    /// the caller's call, not this layer's.
    pub async fn flush(&mut self) -> bool {
        if !self.dirty {
            return true;
        }

        let mut output = String::new();
        for (index, value) in &self.values {
            output.push_str(&format!("{LINE_PREFIX}{index}={value}\r\n"));
        }

        match self.store.write_all(&self.file_name, &output).await {
            Ok(()) => {
                self.dirty = false;
                true
            }
            Err(e) => {
                warn!("failed to persist tracker state to {}: {e}", self.file_name);
                false
            }
        }
    }
}
