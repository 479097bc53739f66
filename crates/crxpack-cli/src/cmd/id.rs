//! `crxpack id`

use std::path::Path;

use anyhow::{Context, Result};
use crxpack_core::KeyPair;

/// Print the extension id for a private key.
pub fn id(key: &Path, json: bool) -> Result<()> {
    let pair = KeyPair::load(key).with_context(|| format!("failed to load {}", key.display()))?;
    let id = pair.crx_id();

    if json {
        return super::print_json(&serde_json::json!({ "crx_id": id, "bits": pair.bits() }));
    }
    println!("{id}");
    Ok(())
}
