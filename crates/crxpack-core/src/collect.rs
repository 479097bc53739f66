//! Turning input paths into a [`SourceSet`].
//!
//! Inputs may be files, directories, or glob patterns. The extension root is
//! the directory holding the shallowest `manifest.json` among the collected
//! files, and every archive path is relative to it.

use std::collections::BTreeSet;
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::archive::{SourceEntry, SourceSet};
use crate::error::{InputError, PackError};
use crate::manifest::MANIFEST_FILE;

/// Knobs for [`collect`].
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    /// Stamp every entry with this time instead of its mtime.
    pub force_date_time: Option<DateTime<Utc>>,
    /// Files to leave out, typically the outputs of a previous run.
    pub exclude: Vec<PathBuf>,
}

/// Gather the files named by `inputs` into a validated [`SourceSet`].
///
/// A lone input naming a `manifest.json` file packs that file's whole
/// directory. Directories are walked recursively; symlinks are skipped.
///
/// # Errors
///
/// - [`InputError::Empty`] if `inputs` is empty (checked before any
///   filesystem access) or nothing was found.
/// - [`InputError::MissingManifest`] if no `manifest.json` was collected.
/// - [`InputError::OutsideRoot`] for files outside the extension root.
/// - [`InputError::NoMatch`] / [`InputError::Pattern`] for glob inputs.
/// - [`PackError::Io`] if a path cannot be read.
pub fn collect(inputs: &[PathBuf], options: &CollectOptions) -> Result<SourceSet, PackError> {
    collect_rooted(inputs, options).map(|(sources, _)| sources)
}

/// Like [`collect`], also returning the canonical extension root.
///
/// # Errors
///
/// As for [`collect`].
pub fn collect_rooted(
    inputs: &[PathBuf],
    options: &CollectOptions,
) -> Result<(SourceSet, PathBuf), PackError> {
    if inputs.is_empty() {
        return Err(InputError::Empty.into());
    }

    let lone_manifest = match inputs {
        [single] if single.is_file() && single.file_name().is_some_and(|n| n == MANIFEST_FILE) => {
            Some(single)
        }
        _ => None,
    };

    let mut files = BTreeSet::new();
    if let Some(manifest) = lone_manifest {
        let dir = parent_dir(manifest);
        tracing::debug!(dir = %dir.display(), "packing directory of manifest");
        walk(dir, &mut files)?;
    } else {
        for input in inputs {
            expand(input, &mut files)?;
        }
    }

    let excluded: BTreeSet<PathBuf> = options
        .exclude
        .iter()
        .filter_map(|p| std::fs::canonicalize(p).ok())
        .collect();
    files.retain(|f| !excluded.contains(f));

    if files.is_empty() {
        return Err(InputError::Empty.into());
    }

    let root = find_root(&files)?;
    tracing::debug!(root = %root.display(), files = files.len(), "collected inputs");

    let mut entries = Vec::with_capacity(files.len());
    for file in &files {
        let relative = archive_path(file, &root)?;
        let content = std::fs::read(file).map_err(|e| PackError::io(file, e))?;
        let modified_at = match options.force_date_time {
            Some(at) => at,
            None => std::fs::metadata(file)
                .and_then(|m| m.modified())
                .map(DateTime::<Utc>::from)
                .map_err(|e| PackError::io(file, e))?,
        };
        entries.push(SourceEntry::new(relative, content, modified_at));
    }

    Ok((SourceSet::new(entries)?, root))
}

/// Drop `output` from `sources` if it is an existing file under `root`.
///
/// Used for outputs whose path is only known once the manifest has been
/// read. Returns whether an entry was removed.
pub fn exclude_output(sources: &mut SourceSet, root: &Path, output: &Path) -> bool {
    let Ok(path) = std::fs::canonicalize(output) else {
        return false;
    };
    let Ok(relative) = archive_path(&path, root) else {
        return false;
    };
    let removed = sources.remove(&relative).is_some();
    if removed {
        tracing::debug!(path = %relative, "skipping previous output");
    }
    removed
}

/// Add the files named by one input.
fn expand(input: &Path, files: &mut BTreeSet<PathBuf>) -> Result<(), PackError> {
    match std::fs::metadata(input) {
        Ok(meta) if meta.is_dir() => walk(input, files),
        Ok(_) => {
            files.insert(canonical(input)?);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound && is_pattern(input) => {
            expand_pattern(input, files)
        }
        Err(e) => Err(PackError::io(input, e)),
    }
}

fn expand_pattern(pattern: &Path, files: &mut BTreeSet<PathBuf>) -> Result<(), PackError> {
    let text = pattern.to_string_lossy();
    let matches = glob::glob(&text).map_err(|e| InputError::Pattern {
        pattern: text.to_string(),
        message: e.to_string(),
    })?;

    let mut matched = false;
    for entry in matches {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            PackError::io(path, e.into_error())
        })?;
        matched = true;
        if path.is_dir() {
            walk(&path, files)?;
        } else if path.is_file() {
            files.insert(canonical(&path)?);
        }
    }

    if !matched {
        return Err(InputError::NoMatch(text.into_owned()).into());
    }
    Ok(())
}

fn walk(dir: &Path, files: &mut BTreeSet<PathBuf>) -> Result<(), PackError> {
    for entry in walkdir::WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf);
            PackError::io(path, io::Error::from(e))
        })?;
        if entry.file_type().is_file() {
            files.insert(canonical(entry.path())?);
        }
    }
    Ok(())
}

/// Directory of the shallowest collected `manifest.json`.
fn find_root(files: &BTreeSet<PathBuf>) -> Result<PathBuf, PackError> {
    files
        .iter()
        .filter(|f| f.file_name().is_some_and(|n| n == MANIFEST_FILE))
        .min_by_key(|f| f.components().count())
        .map(|f| parent_dir(f).to_path_buf())
        .ok_or_else(|| InputError::MissingManifest.into())
}

fn archive_path(file: &Path, root: &Path) -> Result<String, PackError> {
    let relative = file
        .strip_prefix(root)
        .map_err(|_| InputError::OutsideRoot {
            path: file.to_path_buf(),
            root: root.to_path_buf(),
        })?;

    let invalid = || InputError::InvalidPath(relative.to_string_lossy().into_owned());
    let mut parts = Vec::new();
    for component in relative.components() {
        let Component::Normal(part) = component else {
            return Err(invalid().into());
        };
        parts.push(part.to_str().ok_or_else(invalid)?);
    }
    Ok(parts.join("/"))
}

fn canonical(path: &Path) -> Result<PathBuf, PackError> {
    std::fs::canonicalize(path).map_err(|e| PackError::io(path, e))
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn is_pattern(path: &Path) -> bool {
    path.to_string_lossy().contains(['*', '?', '['])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn forced() -> CollectOptions {
        CollectOptions {
            force_date_time: DateTime::from_timestamp(1_553_470_140, 0),
            exclude: Vec::new(),
        }
    }

    fn extension(dir: &Path) -> PathBuf {
        let root = dir.join("ext");
        fs::create_dir_all(root.join("js")).unwrap();
        fs::write(root.join("manifest.json"), br#"{"version":"1.0"}"#).unwrap();
        fs::write(root.join("js/background.js"), b"console.log(1);").unwrap();
        fs::write(root.join("icon.png"), [0u8; 8]).unwrap();
        root
    }

    fn names(set: &SourceSet) -> Vec<&str> {
        set.iter().map(|e| e.relative_path.as_str()).collect()
    }

    #[test]
    fn no_inputs_is_empty() {
        let err = collect(&[], &CollectOptions::default()).unwrap_err();
        assert!(matches!(err, PackError::Input(InputError::Empty)));
    }

    #[test]
    fn directory_is_walked() {
        let dir = tempfile::tempdir().unwrap();
        let root = extension(dir.path());
        let set = collect(&[root], &forced()).unwrap();
        assert_eq!(names(&set), vec!["icon.png", "js/background.js", "manifest.json"]);
    }

    #[test]
    fn lone_manifest_packs_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = extension(dir.path());
        let set = collect(&[root.join("manifest.json")], &forced()).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.get("js/background.js").unwrap().content, b"console.log(1);");
    }

    #[test]
    fn explicit_files_are_relative_to_manifest_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = extension(dir.path());
        let set = collect(
            &[root.join("manifest.json"), root.join("js/background.js")],
            &forced(),
        )
        .unwrap();
        assert_eq!(names(&set), vec!["js/background.js", "manifest.json"]);
    }

    #[test]
    fn glob_patterns_expand() {
        let dir = tempfile::tempdir().unwrap();
        let root = extension(dir.path());
        let set = collect(
            &[root.join("manifest.json"), root.join("js/*.js")],
            &forced(),
        )
        .unwrap();
        assert_eq!(names(&set), vec!["js/background.js", "manifest.json"]);
    }

    #[test]
    fn unmatched_glob_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = extension(dir.path());
        let err = collect(&[root.join("manifest.json"), root.join("*.css")], &forced()).unwrap_err();
        assert!(matches!(err, PackError::Input(InputError::NoMatch(_))));
    }

    #[test]
    fn malformed_glob_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect(&[dir.path().join("[")], &forced()).unwrap_err();
        assert!(matches!(err, PackError::Input(InputError::Pattern { .. })));
    }

    #[test]
    fn missing_path_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect(&[dir.path().join("absent")], &forced()).unwrap_err();
        assert!(matches!(err, PackError::Io { .. }));
    }

    #[test]
    fn no_manifest_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.js"), b"").unwrap();
        let err = collect(&[dir.path().to_path_buf()], &forced()).unwrap_err();
        assert!(matches!(err, PackError::Input(InputError::MissingManifest)));
    }

    #[test]
    fn empty_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect(&[dir.path().to_path_buf()], &forced()).unwrap_err();
        assert!(matches!(err, PackError::Input(InputError::Empty)));
    }

    #[test]
    fn shallowest_manifest_wins() {
        let dir = tempfile::tempdir().unwrap();
        let root = extension(dir.path());
        fs::create_dir_all(root.join("vendor")).unwrap();
        fs::write(root.join("vendor/manifest.json"), b"{}").unwrap();

        let set = collect(&[root], &forced()).unwrap();
        assert!(set.get("vendor/manifest.json").is_some());
        assert_eq!(set.manifest().unwrap().content, br#"{"version":"1.0"}"#);
    }

    #[test]
    fn files_outside_root_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let root = extension(dir.path());
        let stray = dir.path().join("stray.js");
        fs::write(&stray, b"").unwrap();

        let err = collect(&[root.join("manifest.json"), stray], &forced()).unwrap_err();
        assert!(matches!(err, PackError::Input(InputError::OutsideRoot { .. })));
    }

    #[test]
    fn excluded_outputs_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = extension(dir.path());
        fs::write(root.join("ext.crx"), b"previous run").unwrap();

        let options = CollectOptions {
            exclude: vec![root.join("ext.crx"), root.join("not-yet-written.zip")],
            ..forced()
        };
        let set = collect(&[root], &options).unwrap();
        assert!(set.get("ext.crx").is_none());
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn late_output_is_removed_from_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = extension(dir.path());
        fs::write(root.join("Demo.crx"), b"previous run").unwrap();

        let (mut set, found) = collect_rooted(&[root.clone()], &forced()).unwrap();
        assert_eq!(found, fs::canonicalize(&root).unwrap());
        assert!(set.get("Demo.crx").is_some());

        assert!(exclude_output(&mut set, &found, &root.join("Demo.crx")));
        assert!(set.get("Demo.crx").is_none());
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn late_output_elsewhere_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let root = extension(dir.path());
        fs::write(dir.path().join("Demo.crx"), b"previous run").unwrap();

        let (mut set, found) = collect_rooted(&[root], &forced()).unwrap();
        assert!(!exclude_output(&mut set, &found, &dir.path().join("Demo.crx")));
        assert!(!exclude_output(&mut set, &found, &dir.path().join("absent.crx")));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn forced_time_applies_to_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        let root = extension(dir.path());
        let set = collect(&[root], &forced()).unwrap();
        assert!(set.iter().all(|e| e.modified_at.timestamp() == 1_553_470_140));
    }

    #[test]
    fn mtime_is_used_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let root = extension(dir.path());
        let expected: DateTime<Utc> = fs::metadata(root.join("manifest.json"))
            .unwrap()
            .modified()
            .unwrap()
            .into();

        let set = collect(&[root], &CollectOptions::default()).unwrap();
        assert_eq!(set.manifest().unwrap().modified_at, expected);
    }
}
