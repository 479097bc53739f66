//! Packaging options.
//!
//! Every recognized option is a field of [`PackConfig`]. Unset fields take
//! the defaults documented on each field; a config can also be read from a
//! TOML file, e.g.
//!
//! ```toml
//! crx_path = "dist/my-extension.crx"
//! zip_path = "dist/my-extension.zip"
//! xml_path = "dist/update.xml"
//! key_path = "keys/my-extension.pem"
//! codebase_url = "https://example.com/my-extension.crx"
//! force_date_time = "2019-03-24T23:29:00Z"
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{InputError, PackError};
use crate::manifest::ExtensionManifest;

/// Options for one packaging run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackConfig {
    /// Container output. Default: `<manifest name>.crx` in the working
    /// directory, `web-extension.crx` if the manifest has no usable name.
    pub crx_path: Option<PathBuf>,
    /// Bare archive output. Default: not written.
    pub zip_path: Option<PathBuf>,
    /// Update descriptor output. Default: not written.
    pub xml_path: Option<PathBuf>,
    /// Private key to sign with. Default: a fresh in-memory key.
    pub key_path: Option<PathBuf>,
    /// Where to save the key when one is generated. Default: not saved.
    /// Ignored when `key_path` is set.
    pub save_generated_key: Option<PathBuf>,
    /// Download location written into the descriptor. Default: the
    /// container's file name.
    pub codebase_url: Option<String>,
    /// Timestamp stamped on every archive entry. Default: each file's mtime.
    pub force_date_time: Option<DateTime<Utc>>,
}

impl PackConfig {
    /// Read a config from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Io`] if the file cannot be read, or
    /// [`InputError::Config`] if it is not a valid config.
    pub fn from_file(path: &Path) -> Result<Self, PackError> {
        let content = std::fs::read_to_string(path).map_err(|e| PackError::io(path, e))?;
        Self::parse(&content)
    }

    /// Parse a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::Config`] on unknown keys or invalid values.
    pub fn parse(content: &str) -> Result<Self, PackError> {
        toml::from_str(content).map_err(|e| InputError::Config(e.to_string()).into())
    }

    /// Overlay every field set in `other` on top of `self`.
    pub fn merged_with(mut self, other: PackConfig) -> Self {
        fn pick<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }
        pick(&mut self.crx_path, other.crx_path);
        pick(&mut self.zip_path, other.zip_path);
        pick(&mut self.xml_path, other.xml_path);
        pick(&mut self.key_path, other.key_path);
        pick(&mut self.save_generated_key, other.save_generated_key);
        pick(&mut self.codebase_url, other.codebase_url);
        pick(&mut self.force_date_time, other.force_date_time);
        self
    }

    /// Resolve the container path for a given manifest.
    pub fn resolved_crx_path(&self, manifest: &ExtensionManifest) -> PathBuf {
        self.crx_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.crx", manifest.file_stem())))
    }

    /// Resolve the descriptor codebase for a given container path.
    pub fn resolved_codebase(&self, crx_path: &Path) -> String {
        self.codebase_url.clone().unwrap_or_else(|| {
            crx_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }

    /// Every output path this config names explicitly.
    pub fn output_paths(&self) -> impl Iterator<Item = &Path> {
        [
            self.crx_path.as_deref(),
            self.zip_path.as_deref(),
            self.xml_path.as_deref(),
            self.save_generated_key.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}
