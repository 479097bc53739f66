use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use crxpack_core::error::InputError;
use crxpack_core::header::SignedHeader;
use crxpack_core::{CrxId, PackConfig, PackError, pack, verify_container};
use crxpack_schema::ContainerView;

const FIXTURE_ID: &str = "jpfeocehjgpbcajnnbljhmhegadhhldc";

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixed_time() -> DateTime<Utc> {
    "2019-03-24T23:29:00Z".parse().unwrap()
}

fn config(out: &Path) -> PackConfig {
    PackConfig {
        crx_path: Some(out.join("example.crx")),
        zip_path: Some(out.join("example.zip")),
        xml_path: Some(out.join("example.xml")),
        key_path: Some(fixtures().join("example-extension.pem")),
        codebase_url: Some("https://example.com/example.crx".into()),
        force_date_time: Some(fixed_time()),
        ..PackConfig::default()
    }
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn fixture_extension_packs_consistently() {
    let out = tempfile::tempdir().unwrap();
    let manifest = fixtures().join("example-extension/manifest.json");
    let outcome = pack(&[manifest], &config(out.path())).await.unwrap();

    assert_eq!(outcome.crx_id.to_string(), FIXTURE_ID);
    assert_eq!(outcome.version, "1.0");

    let crx = std::fs::read(out.path().join("example.crx")).unwrap();
    let zip = std::fs::read(out.path().join("example.zip")).unwrap();
    let xml = std::fs::read_to_string(out.path().join("example.xml")).unwrap();

    // Prefix: magic, version 3, header length.
    assert_eq!(&crx[0..4], b"Cr24");
    assert_eq!(u32::from_le_bytes(crx[4..8].try_into().unwrap()), 3);
    let header_len = u32::from_le_bytes(crx[8..12].try_into().unwrap()) as usize;
    assert_eq!(crx.len(), 12 + header_len + zip.len());

    // The archive after the header is exactly the .zip output.
    let view = ContainerView::parse(&crx).unwrap();
    assert_eq!(view.archive, zip.as_slice());

    // Contents survive, in sorted order.
    let mut archive = zip::ZipArchive::new(Cursor::new(&zip)).unwrap();
    assert_eq!(archive.len(), 2);
    assert_eq!(archive.by_index(0).unwrap().name(), "background.js");
    assert_eq!(archive.by_index(1).unwrap().name(), "manifest.json");
    let mut body = Vec::new();
    archive
        .by_name("manifest.json")
        .unwrap()
        .read_to_end(&mut body)
        .unwrap();
    assert_eq!(
        body,
        std::fs::read(fixtures().join("example-extension/manifest.json")).unwrap()
    );

    // Descriptor, header, and key all agree on the id.
    let header = SignedHeader::decode(view.header).unwrap();
    let key_id = CrxId::from_public_key(&header.proofs[0].public_key);
    assert_eq!(key_id, outcome.crx_id);
    assert_eq!(header.crx_id(), Some(outcome.crx_id));
    assert!(xml.contains(&format!("<app appid='{FIXTURE_ID}'>")));
    assert!(xml.contains("codebase='https://example.com/example.crx' version='1.0'"));

    assert_eq!(verify_container(&crx).unwrap().crx_id, outcome.crx_id);
}

#[tokio::test]
async fn repeated_runs_are_byte_identical() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let input = [fixtures().join("example-extension")];

    pack(&input, &config(first.path())).await.unwrap();
    pack(&input, &config(second.path())).await.unwrap();

    for name in ["example.crx", "example.zip", "example.xml"] {
        assert_eq!(
            std::fs::read(first.path().join(name)).unwrap(),
            std::fs::read(second.path().join(name)).unwrap(),
            "{name} differs between runs"
        );
    }
}

#[tokio::test]
async fn empty_input_creates_no_files() {
    let out = tempfile::tempdir().unwrap();
    let err = pack(&[], &config(out.path())).await.unwrap_err();
    assert!(matches!(err, PackError::Input(InputError::Empty)));
    assert!(listing(out.path()).is_empty());
}

#[tokio::test]
async fn missing_manifest_creates_no_files() {
    let src = tempfile::tempdir().unwrap();
    std::fs::write(src.path().join("background.js"), "").unwrap();
    let out = tempfile::tempdir().unwrap();

    let err = pack(&[src.path().to_path_buf()], &config(out.path()))
        .await
        .unwrap_err();
    assert!(matches!(err, PackError::Input(InputError::MissingManifest)));
    assert!(listing(out.path()).is_empty());
}

#[tokio::test]
async fn missing_version_creates_no_files() {
    let src = tempfile::tempdir().unwrap();
    std::fs::write(src.path().join("manifest.json"), r#"{"name":"x"}"#).unwrap();
    let out = tempfile::tempdir().unwrap();

    let err = pack(&[src.path().to_path_buf()], &config(out.path()))
        .await
        .unwrap_err();
    assert!(matches!(err, PackError::Input(InputError::MissingVersion)));
    assert!(listing(out.path()).is_empty());
}

#[tokio::test]
async fn unwritable_output_leaves_no_partial_set() {
    let out = tempfile::tempdir().unwrap();
    // The descriptor target is an existing directory, so its commit fails
    // after the container and archive were already renamed into place.
    let blocked = out.path().join("example.xml");
    std::fs::create_dir(&blocked).unwrap();
    std::fs::write(blocked.join("keep"), "").unwrap();

    let err = pack(&[fixtures().join("example-extension")], &config(out.path()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), crxpack_core::ErrorKind::Io);
    assert_eq!(listing(out.path()), vec!["example.xml"]);
}
