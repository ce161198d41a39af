// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persistent `pb` defaults.
//!
//! Read from `--config <file>` or `config.json` under the platform config
//! directory (e.g. `~/.config/phasebridge`). A missing default file means
//! built-in defaults; a missing explicit file is an error. Command-line flags
//! always win over the file.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use phasebridge::{Format, HashAlgorithm, PayloadMode, PolicyConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

const FILE_NAME: &str = "config.json";

/// Defaults applied when a flag is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Numeric policy for `pb encode`.
    pub policy: PolicyConfig,
    /// Payload mode for `pb encode`.
    pub mode: PayloadMode,
    /// Digest written into `hash_raw`.
    pub hash_algorithm: HashAlgorithm,
    /// Output container when the extension does not decide it.
    pub format: Option<String>,
}

impl CliConfig {
    /// Platform location of the default settings file.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "flyingrobots", "phasebridge")
            .map(|proj| proj.config_dir().join(FILE_NAME))
    }

    /// Load `explicit`, or the platform default when `None`.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::read(path);
        }
        let Some(path) = Self::default_path() else {
            return Ok(Self::default());
        };
        match fs::read(&path) {
            Ok(bytes) => Self::parse(&bytes, &path),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err).with_context(|| format!("reading {}", path.display())),
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&bytes, path)
    }

    fn parse(bytes: &[u8], path: &Path) -> Result<Self> {
        let config: Self = serde_json::from_slice(bytes)
            .with_context(|| format!("parsing {}", path.display()))?;
        if let Some(name) = &config.format {
            name.parse::<Format>()
                .with_context(|| format!("{}: format", path.display()))?;
        }
        debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    /// Configured default container format, if any.
    pub fn default_format(&self) -> Option<Format> {
        self.format.as_deref().and_then(|name| name.parse().ok())
    }
}
