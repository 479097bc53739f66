//! crxpack - deterministic CRX3 packaging
#![allow(clippy::missing_errors_doc)]
//!
//! Command-line front end for [`crxpack_core`]. Argument parsing lives here
//! so the binary and its tests share one definition.

pub mod cmd;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

/// Top-level arguments.
#[derive(Debug, Parser)]
#[command(name = "crxpack")]
#[command(author, version, about = "Package browser extensions as signed CRX3 files")]
pub struct Cli {
    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Package an extension into a signed container
    Pack(PackArgs),
    /// Check the signatures and id of an existing container
    Verify {
        /// Container to check
        crx: PathBuf,
    },
    /// Print the extension id a private key signs for
    Id {
        /// Private key (PEM or DER)
        #[arg(long, env = "CRXPACK_KEY")]
        key: PathBuf,
    },
    /// Generate a new RSA signing key
    Keygen {
        /// Where to write the PKCS#8 PEM key
        #[arg(short, long)]
        out: PathBuf,
        /// Modulus size in bits
        #[arg(long, default_value_t = crxpack_core::keys::DEFAULT_KEY_BITS)]
        bits: usize,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// Arguments of `crxpack pack`.
#[derive(Debug, clap::Args)]
pub struct PackArgs {
    /// Extension directory, manifest.json, files, or glob patterns
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Container output path [default: <manifest name>.crx]
    #[arg(long)]
    pub crx: Option<PathBuf>,

    /// Also write the bare ZIP archive here
    #[arg(long)]
    pub zip: Option<PathBuf>,

    /// Also write an update descriptor here
    #[arg(long)]
    pub xml: Option<PathBuf>,

    /// Private key to sign with [default: generate one]
    #[arg(long, env = "CRXPACK_KEY")]
    pub key: Option<PathBuf>,

    /// Save the generated key here (ignored with --key)
    #[arg(long, conflicts_with = "key")]
    pub save_key: Option<PathBuf>,

    /// Download URL written into the update descriptor
    #[arg(long)]
    pub codebase: Option<String>,

    /// Timestamp for every archive entry, e.g. 2019-03-24T23:29:00Z
    #[arg(long)]
    pub force_date: Option<DateTime<Utc>>,

    /// TOML file with packaging options; flags take precedence
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl PackArgs {
    /// Packaging options expressed by the flags alone.
    pub fn to_config(&self) -> crxpack_core::PackConfig {
        crxpack_core::PackConfig {
            crx_path: self.crx.clone(),
            zip_path: self.zip.clone(),
            xml_path: self.xml.clone(),
            key_path: self.key.clone(),
            save_generated_key: self.save_key.clone(),
            codebase_url: self.codebase.clone(),
            force_date_time: self.force_date,
        }
    }
}
