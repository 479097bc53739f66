//! `crxpack pack`

use anyhow::{Context, Result};
use crxpack_core::PackConfig;

use crate::PackArgs;

/// Package the inputs and report what was written.
pub async fn pack(args: &PackArgs, json: bool) -> Result<()> {
    let base = match &args.config {
        Some(path) => PackConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PackConfig::default(),
    };
    let config = base.merged_with(args.to_config());

    let outcome = crxpack_core::pack(&args.inputs, &config)
        .await
        .context("packaging failed")?;

    if json {
        return super::print_json(&outcome);
    }

    println!("  id       {}", outcome.crx_id);
    println!("  version  {}", outcome.version);
    println!("  wrote    {}", outcome.crx_path.display());
    for path in [&outcome.zip_path, &outcome.xml_path, &outcome.key_path]
        .into_iter()
        .flatten()
    {
        println!("  wrote    {}", path.display());
    }
    Ok(())
}
