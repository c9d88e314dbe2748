use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::utils::error::{AppError, Result};

/// One tracked page: where to fetch it and how to cut the target text
/// out of it. Identity is the position in the configured target list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub url: String,
    /// Marker text that does not change, used to locate the target.
    pub label: String,
    /// Offset from the end of the label to the start of the target text.
    pub offset: i64,
    /// Length of the target text, in bytes.
    pub length: usize,
}

/// Where configuration values come from. Production code layers the
/// process environment over a file-per-key secrets directory; tests
/// substitute a map.
pub trait ConfigSource: Send + Sync {
    fn read_value(&self, key: &str) -> Option<String>;
}

/// Reads plain values from the process environment.
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn read_value(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Reads secrets mounted as one file per key under a directory, the
/// way container orchestrators expose them.
pub struct FileSecretSource {
    dir: PathBuf,
}

impl FileSecretSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ConfigSource for FileSecretSource {
    fn read_value(&self, key: &str) -> Option<String> {
        let path = self.dir.join(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Some(contents.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("failed to read secret file {}: {}", path.display(), e);
                }
                None
            }
        }
    }
}

/// Chains sources; the first one that knows a key wins.
#[derive(Default)]
pub struct LayeredSource {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl LayeredSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl ConfigSource for LayeredSource {
    fn read_value(&self, key: &str) -> Option<String> {
        self.sources.iter().find_map(|s| s.read_value(key))
    }
}

#[cfg(test)]
impl ConfigSource for HashMap<String, String> {
    fn read_value(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Global (non-target) keys read eagerly at load.
const GLOBAL_KEYS: &[&str] = &[
    "lastChangedFileName",
    "dirName",
    "notifyEndpoint",
    "notifyTopic",
    "notifyToken",
    "checkSchedule",
    "requestTimeoutSecs",
];

const TARGET_URL_KEY: &str = "webSiteUrl";
const TARGET_LABEL_KEY: &str = "targetText";
const TARGET_OFFSET_KEY: &str = "targetTextOffset";
const TARGET_LENGTH_KEY: &str = "targetTextLength";

/// Immutable snapshot of everything the process was configured with,
/// built once at startup and passed by reference from there on.
#[derive(Debug)]
pub struct Settings {
    values: HashMap<String, String>,
    targets: Vec<TargetSpec>,
}

impl Settings {
    pub fn load(source: &dyn ConfigSource) -> Result<Self> {
        let mut values = HashMap::new();
        for key in GLOBAL_KEYS {
            if let Some(value) = source.read_value(key) {
                values.insert((*key).to_string(), value);
            }
        }

        let targets = Self::read_targets(source)?;
        info!("loaded settings with {} targets", targets.len());

        Ok(Self { values, targets })
    }

    /// Looks up a global key. Returns the empty string when the key was
    /// not configured.
    pub fn value(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn targets(&self) -> &[TargetSpec] {
        &self.targets
    }

    // Keep reading numbered entries until the url key is missing or
    // blank. Key names are a compatibility contract with existing
    // deployments; do not rename them.
    fn read_targets(source: &dyn ConfigSource) -> Result<Vec<TargetSpec>> {
        let mut targets = Vec::new();
        let mut i = 1;
        loop {
            let url = match source.read_value(&format!("{TARGET_URL_KEY}{i}")) {
                Some(u) if !u.trim().is_empty() => u.trim().to_string(),
                _ => break,
            };
            Url::parse(&url)
                .map_err(|e| AppError::Config(format!("{TARGET_URL_KEY}{i} is not a valid URL: {e}")))?;

            let label = source
                .read_value(&format!("{TARGET_LABEL_KEY}{i}"))
                .unwrap_or_default()
                .trim()
                .to_string();
            let offset = Self::read_int::<i64>(source, &format!("{TARGET_OFFSET_KEY}{i}"))?;
            let length = Self::read_int::<usize>(source, &format!("{TARGET_LENGTH_KEY}{i}"))?;

            debug!("target {i}: url={url}, label={label}, offset={offset}, length={length}");
            targets.push(TargetSpec {
                url,
                label,
                offset,
                length,
            });
            i += 1;
        }
        Ok(targets)
    }

    fn read_int<T: std::str::FromStr>(source: &dyn ConfigSource, key: &str) -> Result<T> {
        let raw = source
            .read_value(key)
            .ok_or_else(|| AppError::Config(format!("missing required key {key}")))?;
        raw.trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key} is not a valid number: '{raw}'")))
    }
}
