//! `crxpack verify`

use std::path::Path;

use anyhow::{Context, Result};

/// Verify a container file and print its id.
pub fn verify(crx: &Path, json: bool) -> Result<()> {
    let bytes = std::fs::read(crx).with_context(|| format!("failed to read {}", crx.display()))?;
    let verified = crxpack_core::verify_container(&bytes)
        .with_context(|| format!("{} is not a valid CRX3 container", crx.display()))?;

    if json {
        return super::print_json(&verified);
    }

    println!("  ok       {}", crx.display());
    println!("  id       {}", verified.crx_id);
    println!("  proofs   {}", verified.proofs);
    println!("  entries  {}", verified.entries.len());
    println!("  sha256   {}", verified.archive_sha256);
    Ok(())
}
