//! `crxpack keygen`

use std::path::Path;

use anyhow::{Context, Result};
use crxpack_core::KeyPair;
use crxpack_core::output::OutputSet;

/// Generate a key, write it as PKCS#8 PEM, and print its id.
pub fn keygen(out: &Path, bits: usize, force: bool, json: bool) -> Result<()> {
    if out.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", out.display());
    }

    tracing::debug!(bits, "generating RSA key");
    let pair = KeyPair::generate(bits).context("key generation failed")?;
    let pem = pair.to_pkcs8_pem()?;
    let mut outputs = OutputSet::new();
    outputs.stage_secret(out, pem.as_bytes())?;
    outputs
        .commit()
        .with_context(|| format!("failed to write {}", out.display()))?;

    if json {
        return super::print_json(&serde_json::json!({
            "crx_id": pair.crx_id(),
            "bits": pair.bits(),
            "key_path": out,
        }));
    }
    println!("  wrote    {}", out.display());
    println!("  id       {}", pair.crx_id());
    Ok(())
}
