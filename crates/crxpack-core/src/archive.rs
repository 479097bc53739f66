//! Deterministic ZIP archives.
//!
//! The archive embedded in a CRX is signed byte-for-byte, so two runs over
//! the same files must produce the same bytes on any machine. Everything the
//! ZIP writer would otherwise pick up from the environment is pinned here:
//!
//! | Property | Policy |
//! |---|---|
//! | Entry order | Byte-wise lexicographic order of the relative path |
//! | Path separator | `/` |
//! | Entries | Regular files only, no directory records |
//! | Timestamp | UTC, floored to an even second, clamped to the DOS range |
//! | Permissions | `0o644` |
//! | Compression | Deflate, level 9 |

use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use chrono::{DateTime, Datelike, Timelike, Utc};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{EncodingError, InputError, PackError};
use crate::manifest::MANIFEST_FILE;

/// Earliest DOS timestamp: 1980-01-01T00:00:00Z.
const DOS_EPOCH_MIN: i64 = 315_532_800;

/// Latest DOS timestamp: 2107-12-31T23:59:58Z.
const DOS_EPOCH_MAX: i64 = 4_354_819_198;

const FILE_MODE: u32 = 0o644;

/// One file destined for the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Path relative to the extension root, `/`-separated.
    pub relative_path: String,
    /// File contents.
    pub content: Vec<u8>,
    /// Modification time recorded in the archive.
    pub modified_at: DateTime<Utc>,
}

impl SourceEntry {
    /// Build an entry, normalizing `\` separators to `/`.
    pub fn new(
        relative_path: impl Into<String>,
        content: impl Into<Vec<u8>>,
        modified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            relative_path: relative_path.into().replace('\\', "/"),
            content: content.into(),
            modified_at,
        }
    }
}

/// The validated, ordered set of files to package.
///
/// Paths are unique and entries iterate in archive order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    entries: BTreeMap<String, SourceEntry>,
}

impl SourceSet {
    /// Build a set from entries in any order.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::InvalidPath`] for paths that are empty,
    /// absolute, contain `\`, or contain `.`/`..` segments, and
    /// [`InputError::DuplicatePath`] if two entries share a path.
    pub fn new(entries: impl IntoIterator<Item = SourceEntry>) -> Result<Self, InputError> {
        let mut map = BTreeMap::new();
        for entry in entries {
            validate_path(&entry.relative_path)?;
            let key = entry.relative_path.clone();
            if map.insert(key.clone(), entry).is_some() {
                return Err(InputError::DuplicatePath(key));
            }
        }
        Ok(Self { entries: map })
    }

    /// Entries in archive order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceEntry> {
        self.entries.values()
    }

    /// Look up an entry by relative path.
    pub fn get(&self, relative_path: &str) -> Option<&SourceEntry> {
        self.entries.get(relative_path)
    }

    /// Take an entry out of the set.
    pub fn remove(&mut self, relative_path: &str) -> Option<SourceEntry> {
        self.entries.remove(relative_path)
    }

    /// The root `manifest.json`, if present.
    pub fn manifest(&self) -> Option<&SourceEntry> {
        self.get(MANIFEST_FILE)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate_path(path: &str) -> Result<(), InputError> {
    let invalid = path.is_empty()
        || path.starts_with('/')
        || path.contains([':', '\\'])
        || path
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if invalid {
        return Err(InputError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Encoded ZIP bytes of a [`SourceSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveBytes(Vec<u8>);

impl ArchiveBytes {
    /// Wrap bytes read back from an existing container.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Raw archive bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into the raw bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the archive is zero bytes long.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names of the archived files, in stored order.
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError::Archive`] if the bytes are not a readable ZIP.
    pub fn entry_names(&self) -> Result<Vec<String>, PackError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(self.0.as_slice()))?;
        let mut names = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            names.push(archive.by_index(i)?.name().to_string());
        }
        Ok(names)
    }
}

impl AsRef<[u8]> for ArchiveBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Encode `entries` as a deterministic ZIP archive.
///
/// See the [module-level documentation](self) for the fixed policies.
///
/// # Errors
///
/// Returns [`InputError::Empty`] for an empty set and
/// [`InputError::MissingManifest`] if there is no root `manifest.json`;
/// both are checked before anything is written. ZIP writer failures are
/// reported as [`EncodingError::Archive`].
pub fn build(entries: &SourceSet) -> Result<ArchiveBytes, PackError> {
    if entries.is_empty() {
        return Err(InputError::Empty.into());
    }
    if entries.manifest().is_none() {
        return Err(InputError::MissingManifest.into());
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for entry in entries.iter() {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(9))
            .last_modified_time(dos_timestamp(&entry.modified_at)?)
            .unix_permissions(FILE_MODE);

        writer.start_file(entry.relative_path.as_str(), options)?;
        writer
            .write_all(&entry.content)
            .map_err(|e| EncodingError::Archive(e.into()))?;
        tracing::trace!(path = %entry.relative_path, bytes = entry.content.len(), "archived");
    }

    let bytes = writer.finish()?.into_inner();
    tracing::debug!(
        entries = entries.len(),
        bytes = bytes.len(),
        "built archive"
    );
    Ok(ArchiveBytes(bytes))
}

/// Quantize a timestamp to the archive's 2-second DOS precision.
///
/// The instant is taken in UTC (never local time), clamped to the DOS range,
/// and floored to an even second.
fn dos_timestamp(at: &DateTime<Utc>) -> Result<zip::DateTime, EncodingError> {
    let secs = at.timestamp().clamp(DOS_EPOCH_MIN, DOS_EPOCH_MAX) & !1;
    let utc = DateTime::<Utc>::from_timestamp(secs, 0).ok_or(EncodingError::Timestamp(secs))?;

    zip::DateTime::from_date_and_time(
        utc.year() as u16,
        utc.month() as u8,
        utc.day() as u8,
        utc.hour() as u8,
        utc.minute() as u8,
        utc.second() as u8,
    )
    .map_err(|_| EncodingError::Timestamp(secs))
}
