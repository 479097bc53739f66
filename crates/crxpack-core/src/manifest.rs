//! The two fields of `manifest.json` the packager cares about.

use serde::Deserialize;
use serde_json::Value;

use crate::error::InputError;

/// File name of the extension manifest, relative to the extension root.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Fallback stem for output files when the manifest has no usable name.
pub const DEFAULT_STEM: &str = "web-extension";

/// Identity fields extracted from `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionManifest {
    /// Value of the required `version` field.
    pub version: String,
    /// Value of the optional `name` field.
    pub name: Option<String>,
}

#[derive(Deserialize)]
struct RawManifest {
    #[serde(default)]
    version: Option<Value>,
    #[serde(default)]
    name: Option<Value>,
}

impl ExtensionManifest {
    /// Parse the raw bytes of `manifest.json`.
    ///
    /// A leading UTF-8 byte-order mark is ignored. Fields other than
    /// `version` and `name` are not inspected.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::InvalidManifest`] if the bytes are not a JSON
    /// object, or [`InputError::MissingVersion`] if `version` is absent or
    /// not a string.
    pub fn parse(bytes: &[u8]) -> Result<Self, InputError> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let raw: RawManifest = serde_json::from_slice(bytes)?;

        let version = match raw.version {
            Some(Value::String(v)) if !v.trim().is_empty() => v,
            _ => return Err(InputError::MissingVersion),
        };
        let name = match raw.name {
            Some(Value::String(n)) => Some(n),
            _ => None,
        };

        Ok(Self { version, name })
    }

    /// File stem for default output names, derived from `name`.
    ///
    /// Characters outside `[A-Za-z0-9._-]` become `-`. Localized names
    /// (`__MSG_key__`) and names that sanitize to nothing fall back to
    /// [`DEFAULT_STEM`].
    pub fn file_stem(&self) -> String {
        let Some(name) = self.name.as_deref() else {
            return DEFAULT_STEM.to_string();
        };
        if name.starts_with("__MSG_") {
            return DEFAULT_STEM.to_string();
        }

        let mut stem = String::with_capacity(name.len());
        for c in name.trim().chars() {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                stem.push(c);
            } else if !stem.ends_with('-') {
                stem.push('-');
            }
        }
        let stem = stem.trim_matches(|c| c == '-' || c == '.');

        if stem.is_empty() {
            DEFAULT_STEM.to_string()
        } else {
            stem.to_string()
        }
    }
}
