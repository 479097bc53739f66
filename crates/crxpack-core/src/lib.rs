//! Deterministic, signed CRX3 packaging for browser extensions.
//!
//! The pipeline is [`collect()`] → [`archive::build`] → [`KeyPair`] →
//! [`header::sign`] → [`assemble()`] → [`output::OutputSet`], wrapped by the
//! async [`pack()`] entry point.

pub mod archive;
pub mod assemble;
pub mod collect;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod header;
pub mod keys;
pub mod manifest;
pub mod output;
pub mod pack;
pub mod verify;

pub use archive::{ArchiveBytes, SourceEntry, SourceSet};
pub use assemble::{Assembly, assemble, assemble_with_keys};
pub use collect::{CollectOptions, collect, collect_rooted};
pub use config::PackConfig;
pub use crxpack_schema::CrxId;
pub use error::{ErrorKind, PackError};
pub use keys::KeyPair;
pub use pack::{PackOutcome, pack};
pub use verify::{VerifiedContainer, VerifyError, verify_container};
