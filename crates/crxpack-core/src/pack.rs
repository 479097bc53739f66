//! The async entry point: inputs and a config in, files on disk out.

use std::path::PathBuf;

use crxpack_schema::CrxId;
use serde::Serialize;

use crate::assemble::{Assembly, assemble_with_keys, read_manifest};
use crate::collect::{CollectOptions, collect_rooted, exclude_output};
use crate::config::PackConfig;
use crate::error::{EncodingError, InputError, PackError};
use crate::keys::KeyPair;
use crate::output::OutputSet;

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackOutcome {
    /// Where the container was written.
    pub crx_path: PathBuf,
    /// Where the bare archive was written, if requested.
    pub zip_path: Option<PathBuf>,
    /// Where the update descriptor was written, if requested.
    pub xml_path: Option<PathBuf>,
    /// Where a generated key was saved, if requested.
    pub key_path: Option<PathBuf>,
    /// Package id shared by every output.
    pub crx_id: CrxId,
    /// Version from the manifest.
    pub version: String,
}

/// Package `inputs` according to `config`.
///
/// Runs collection, assembly, and output in that order on tokio's blocking
/// pool. Outputs are committed together; if any of them cannot be written,
/// none remain. Dropping the future before the commit leaves no files.
///
/// # Errors
///
/// Any [`PackError`]. Input and key errors are raised before an output path
/// is touched.
pub async fn pack(inputs: &[PathBuf], config: &PackConfig) -> Result<PackOutcome, PackError> {
    if inputs.is_empty() {
        return Err(InputError::Empty.into());
    }

    let options = CollectOptions {
        force_date_time: config.force_date_time,
        exclude: config.output_paths().map(PathBuf::from).collect(),
    };
    let inputs = inputs.to_vec();
    let cfg = config.clone();
    let sources = blocking(move || {
        let (mut sources, root) = collect_rooted(&inputs, &options)?;
        // The default container name comes from the manifest, so a previous
        // run's output can only be recognized after collection.
        if cfg.crx_path.is_none() {
            let manifest = read_manifest(&sources)?;
            exclude_output(&mut sources, &root, &cfg.resolved_crx_path(&manifest));
        }
        Ok(sources)
    })
    .await?;

    let cfg = config.clone();
    let (assembly, generated) = blocking(move || {
        let manifest = read_manifest(&sources)?;
        let crx_path = cfg.resolved_crx_path(&manifest);
        let codebase = cfg.xml_path.as_ref().map(|_| cfg.resolved_codebase(&crx_path));

        let (key, generated) = match &cfg.key_path {
            Some(path) => (KeyPair::load(path)?, false),
            None => (KeyPair::obtain(None)?, true),
        };
        let assembly = assemble_with_keys(&sources, &[&key], codebase.as_deref())?;
        let generated = generated.then_some(key);
        Ok((assembly, generated))
    })
    .await?;

    let cfg = config.clone();
    blocking(move || write_outputs(&cfg, &assembly, generated.as_ref())).await
}

fn write_outputs(
    config: &PackConfig,
    assembly: &Assembly,
    generated: Option<&KeyPair>,
) -> Result<PackOutcome, PackError> {
    let crx_path = config.resolved_crx_path(&assembly.manifest());
    let mut outputs = OutputSet::new();
    outputs.stage(&crx_path, &assembly.container)?;

    if let Some(path) = &config.zip_path {
        outputs.stage(path, assembly.archive.as_bytes())?;
    }
    if let (Some(path), Some(xml)) = (&config.xml_path, &assembly.descriptor) {
        outputs.stage(path, xml.as_bytes())?;
    }

    let key_path = match (generated, &config.save_generated_key) {
        (Some(key), Some(path)) => {
            outputs.stage_secret(path, key.to_pkcs8_pem()?.as_bytes())?;
            Some(path.clone())
        }
        (None, Some(path)) => {
            tracing::debug!(path = %path.display(), "key was supplied, not saving");
            None
        }
        _ => None,
    };

    outputs.commit()?;

    tracing::info!(
        id = %assembly.crx_id,
        version = %assembly.version,
        crx = %crx_path.display(),
        "packed extension"
    );

    Ok(PackOutcome {
        crx_path,
        zip_path: config.zip_path.clone(),
        xml_path: config.xml_path.clone().filter(|_| assembly.descriptor.is_some()),
        key_path,
        crx_id: assembly.crx_id,
        version: assembly.version.clone(),
    })
}

async fn blocking<T, F>(f: F) -> Result<T, PackError>
where
    F: FnOnce() -> Result<T, PackError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(res) => res,
        Err(e) => Err(EncodingError::Worker(e.to_string()).into()),
    }
}
