//! Checking an existing container the way a browser would.

use std::io::Cursor;

use crxpack_schema::{ContainerError, ContainerView, CrxId};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::error::{EncodingError, KeyError, PackError};
use crate::header::{self, SignedHeader};

/// Why a container was rejected.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The prefix or header length is malformed.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// The header is not a valid `CrxFileHeader`.
    #[error("header does not decode: {0}")]
    Header(String),

    /// `signed_header_data` has no 16-byte `crx_id`.
    #[error("header carries no package id")]
    MissingId,

    /// The header has no RSA proofs.
    #[error("header carries no RSA proofs")]
    NoProofs,

    /// A proof's public key does not decode as a supported RSA key.
    #[error("proof {index} carries an unusable public key: {message}")]
    MalformedKey {
        /// Position of the proof in the header.
        index: usize,
        /// Decoder message.
        message: String,
    },

    /// A proof failed to verify.
    #[error("proof {index} does not verify")]
    BadSignature {
        /// Position of the proof in the header.
        index: usize,
    },

    /// No proof's key hashes to the embedded id.
    #[error("no proof is signed by the key for {0}")]
    IdMismatch(CrxId),

    /// The payload after the header is not a readable ZIP.
    #[error("archive is unreadable: {0}")]
    Archive(#[from] zip::result::ZipError),
}

/// Facts about a container that passed verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedContainer {
    /// Package id, matched by at least one proof key.
    pub crx_id: CrxId,
    /// Number of RSA proofs, all valid.
    pub proofs: usize,
    /// Size of the serialized header.
    pub header_len: usize,
    /// Size of the embedded archive.
    pub archive_len: usize,
    /// Hex SHA-256 of the embedded archive.
    pub archive_sha256: String,
    /// Archived file names in stored order.
    pub entries: Vec<String>,
}

/// Verify a complete container.
///
/// Every RSA proof must verify against the signing input, and at least one
/// must be made by the key the package id was derived from.
///
/// # Errors
///
/// Returns the first [`VerifyError`] encountered.
pub fn verify_container(bytes: &[u8]) -> Result<VerifiedContainer, VerifyError> {
    let view = ContainerView::parse(bytes)?;
    let header = SignedHeader::decode(view.header).map_err(|e| VerifyError::Header(e.to_string()))?;
    let crx_id = header.crx_id().ok_or(VerifyError::MissingId)?;

    if header.proofs.is_empty() {
        return Err(VerifyError::NoProofs);
    }

    let mut id_matched = false;
    for (index, proof) in header.proofs.iter().enumerate() {
        if !check(index, proof, &header.signed_data, view.archive)? {
            return Err(VerifyError::BadSignature { index });
        }
        id_matched |= CrxId::from_public_key(&proof.public_key) == crx_id;
    }
    if !id_matched {
        return Err(VerifyError::IdMismatch(crx_id));
    }

    let mut archive = zip::ZipArchive::new(Cursor::new(view.archive))?;
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        entries.push(archive.by_index(i)?.name().to_string());
    }

    tracing::debug!(id = %crx_id, proofs = header.proofs.len(), "container verified");

    Ok(VerifiedContainer {
        crx_id,
        proofs: header.proofs.len(),
        header_len: view.header.len(),
        archive_len: view.archive.len(),
        archive_sha256: hex::encode(Sha256::digest(view.archive)),
        entries,
    })
}

fn check(
    index: usize,
    proof: &header::Proof,
    signed_data: &[u8],
    archive: &[u8],
) -> Result<bool, VerifyError> {
    header::verify_proof(proof, signed_data, archive).map_err(|e| match e {
        PackError::Encoding(EncodingError::Container(c)) => VerifyError::Container(c),
        PackError::Key(KeyError::PublicKey(message)) => {
            VerifyError::MalformedKey { index, message }
        }
        other => VerifyError::Header(other.to_string()),
    })
}
