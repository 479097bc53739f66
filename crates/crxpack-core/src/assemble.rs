//! Building a complete, signed package in memory.
//!
//! Nothing here touches the output paths: an [`Assembly`] holds every
//! artifact of a run, all derived from the same archive bytes and key, and
//! the caller decides what to persist.

use std::path::Path;

use crxpack_schema::{CrxId, frame};

use crate::archive::{self, ArchiveBytes, SourceSet};
use crate::descriptor::UpdateDescriptor;
use crate::error::{EncodingError, InputError, PackError};
use crate::header;
use crate::keys::KeyPair;
use crate::manifest::ExtensionManifest;

/// Every artifact of one packaging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    /// The framed CRX3 container.
    pub container: Vec<u8>,
    /// The archive embedded in `container`.
    pub archive: ArchiveBytes,
    /// Rendered update descriptor, when a codebase was supplied.
    pub descriptor: Option<String>,
    /// Package id, derived from the first signing key.
    pub crx_id: CrxId,
    /// Version from the manifest.
    pub version: String,
    /// Name from the manifest, if it had a string one.
    pub name: Option<String>,
}

impl Assembly {
    /// Manifest fields as a value, for output naming.
    pub fn manifest(&self) -> ExtensionManifest {
        ExtensionManifest {
            version: self.version.clone(),
            name: self.name.clone(),
        }
    }
}

/// Read and parse the root `manifest.json` of `sources`.
///
/// # Errors
///
/// Returns [`InputError::Empty`], [`InputError::MissingManifest`],
/// [`InputError::InvalidManifest`], or [`InputError::MissingVersion`].
pub fn read_manifest(sources: &SourceSet) -> Result<ExtensionManifest, PackError> {
    if sources.is_empty() {
        return Err(InputError::Empty.into());
    }
    let entry = sources.manifest().ok_or(InputError::MissingManifest)?;
    Ok(ExtensionManifest::parse(&entry.content)?)
}

/// Build a package, loading the key at `key_location` or generating one.
///
/// # Errors
///
/// Input errors are reported before any key is read or generated. See
/// [`read_manifest`], [`archive::build`], and [`KeyPair::obtain`].
pub fn assemble(
    sources: &SourceSet,
    key_location: Option<&Path>,
    codebase: Option<&str>,
) -> Result<Assembly, PackError> {
    let manifest = read_manifest(sources)?;
    let archive = archive::build(sources)?;
    let key = KeyPair::obtain(key_location)?;
    finish(manifest, archive, &[&key], codebase)
}

/// Build a package signed by `keys`; the id comes from the first key.
///
/// # Errors
///
/// As [`assemble`], plus [`EncodingError::NoProofs`] if `keys` is empty.
pub fn assemble_with_keys(
    sources: &SourceSet,
    keys: &[&KeyPair],
    codebase: Option<&str>,
) -> Result<Assembly, PackError> {
    let manifest = read_manifest(sources)?;
    let archive = archive::build(sources)?;
    finish(manifest, archive, keys, codebase)
}

fn finish(
    manifest: ExtensionManifest,
    archive: ArchiveBytes,
    keys: &[&KeyPair],
    codebase: Option<&str>,
) -> Result<Assembly, PackError> {
    let Some(primary) = keys.first() else {
        return Err(EncodingError::NoProofs.into());
    };
    let crx_id = primary.crx_id();

    let signed = header::sign(&crx_id, &archive, keys)?;
    let header_bytes = signed.encode();
    let container = frame(&header_bytes, archive.as_bytes())?;

    let descriptor = codebase.map(|codebase| {
        UpdateDescriptor {
            crx_id,
            version: manifest.version.clone(),
            codebase: codebase.to_string(),
        }
        .render()
    });

    tracing::debug!(
        id = %crx_id,
        version = %manifest.version,
        header = header_bytes.len(),
        archive = archive.len(),
        "assembled container"
    );

    Ok(Assembly {
        container,
        archive,
        descriptor,
        crx_id,
        version: manifest.version,
        name: manifest.name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::SourceEntry;
    use crate::error::{ErrorKind, KeyError};
    use chrono::DateTime;
    use crxpack_schema::{ContainerView, PREFIX_LEN};

    const PKCS8_PEM: &str = include_str!("../tests/fixtures/example-extension.pem");

    fn sources(manifest: &[u8]) -> SourceSet {
        let at = DateTime::from_timestamp(1_553_470_140, 0).unwrap();
        SourceSet::new([
            SourceEntry::new("manifest.json", manifest.to_vec(), at),
            SourceEntry::new("background.js", b"chrome.runtime.id;".to_vec(), at),
        ])
        .unwrap()
    }

    fn key() -> KeyPair {
        KeyPair::from_pem(PKCS8_PEM).unwrap()
    }

    #[test]
    fn container_wraps_archive() {
        let key = key();
        let out = assemble_with_keys(&sources(br#"{"version":"2.1","name":"Demo"}"#), &[&key], None)
            .unwrap();

        assert_eq!(&out.container[..4], b"Cr24");
        assert_eq!(&out.container[4..8], &3u32.to_le_bytes());
        let view = ContainerView::parse(&out.container).unwrap();
        assert_eq!(view.archive, out.archive.as_bytes());
        assert_eq!(
            out.container.len(),
            PREFIX_LEN + view.header.len() + out.archive.len()
        );
        assert_eq!(out.version, "2.1");
        assert_eq!(out.name.as_deref(), Some("Demo"));
        assert_eq!(out.crx_id, key.crx_id());
        assert!(out.descriptor.is_none());
    }

    #[test]
    fn outputs_share_one_identity() {
        let key = key();
        let out = assemble_with_keys(
            &sources(br#"{"version":"1.0"}"#),
            &[&key],
            Some("https://example.com/ext.crx"),
        )
        .unwrap();

        let view = ContainerView::parse(&out.container).unwrap();
        let header = header::SignedHeader::decode(view.header).unwrap();
        assert_eq!(header.crx_id(), Some(out.crx_id));
        assert_eq!(CrxId::from_public_key(&header.proofs[0].public_key), out.crx_id);

        let xml = out.descriptor.unwrap();
        assert!(xml.contains(&format!("appid='{}'", out.crx_id)));
        assert!(xml.contains("version='1.0'"));
    }

    #[test]
    fn same_inputs_same_bytes() {
        let key = key();
        let a = assemble_with_keys(&sources(br#"{"version":"1.0"}"#), &[&key], None).unwrap();
        let b = assemble_with_keys(&sources(br#"{"version":"1.0"}"#), &[&key], None).unwrap();
        assert_eq!(a.container, b.container);
    }

    #[test]
    fn missing_version_fails_before_key_access() {
        let dir = tempfile::tempdir().unwrap();
        // A key location that does not exist would be a key error if reached.
        let err = assemble(
            &sources(br#"{"name":"x"}"#),
            Some(&dir.path().join("absent.pem")),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, PackError::Input(InputError::MissingVersion)));
    }

    #[test]
    fn empty_sources_are_rejected() {
        let err = assemble(&SourceSet::default(), None, None).unwrap_err();
        assert!(matches!(err, PackError::Input(InputError::Empty)));
    }

    #[test]
    fn invalid_json_is_an_input_error() {
        let err = assemble_with_keys(&sources(b"{not json"), &[&key()], None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn unreadable_key_is_a_key_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = assemble(
            &sources(br#"{"version":"1.0"}"#),
            Some(&dir.path().join("absent.pem")),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, PackError::Key(KeyError::Read { .. })));
    }

    #[test]
    fn no_keys_is_an_encoding_error() {
        let err = assemble_with_keys(&sources(br#"{"version":"1.0"}"#), &[], None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
    }
}
