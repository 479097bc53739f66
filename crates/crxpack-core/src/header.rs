//! Signed CRX3 headers.
//!
//! Every proof signs the same input:
//!
//! ```text
//! "CRX3 SignedData\0" || u32le(len(signed_data)) || signed_data || archive
//! ```
//!
//! with RSASSA-PKCS1-v1_5 over SHA-256. The digest is fed incrementally so
//! the archive is never copied into a second buffer.

use crxpack_schema::{AsymmetricKeyProof, CrxFileHeader, CrxId, SignedData, signing_preamble};
use prost::Message;
use rand_core::OsRng;
use rsa::pkcs8::spki::SubjectPublicKeyInfoRef;
use rsa::{BigUint, Pkcs1v15Sign, RsaPublicKey, pkcs1};
use sha2::{Digest, Sha256};

use crate::archive::ArchiveBytes;
use crate::error::{EncodingError, KeyError, PackError};
use crate::keys::{KeyPair, MAX_KEY_BITS};

/// A public key and the signature it produced over the signing input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    /// DER `SubjectPublicKeyInfo`.
    pub public_key: Vec<u8>,
    /// PKCS#1 v1.5 signature.
    pub signature: Vec<u8>,
}

/// The decoded header of a CRX3 container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeader {
    /// Serialized `SignedData` message.
    pub signed_data: Vec<u8>,
    /// RSA proofs in signing order.
    pub proofs: Vec<Proof>,
}

impl SignedHeader {
    /// Serialize to the protobuf `CrxFileHeader` wire format.
    pub fn encode(&self) -> Vec<u8> {
        let header = CrxFileHeader {
            sha256_with_rsa: self
                .proofs
                .iter()
                .map(|p| AsymmetricKeyProof {
                    public_key: Some(p.public_key.clone()),
                    signature: Some(p.signature.clone()),
                })
                .collect(),
            sha256_with_ecdsa: Vec::new(),
            verified_contents: None,
            signed_header_data: Some(self.signed_data.clone()),
        };
        header.encode_to_vec()
    }

    /// Parse a serialized `CrxFileHeader`.
    ///
    /// ECDSA proofs and verified contents are ignored; proofs missing a key
    /// or signature decode as empty byte strings.
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError::Protobuf`] if the bytes are not a valid header.
    pub fn decode(bytes: &[u8]) -> Result<Self, PackError> {
        let header = CrxFileHeader::decode(bytes).map_err(EncodingError::Protobuf)?;
        Ok(Self {
            signed_data: header.signed_header_data.unwrap_or_default(),
            proofs: header
                .sha256_with_rsa
                .into_iter()
                .map(|p| Proof {
                    public_key: p.public_key.unwrap_or_default(),
                    signature: p.signature.unwrap_or_default(),
                })
                .collect(),
        })
    }

    /// The `crx_id` carried in `signed_data`, if present and well formed.
    pub fn crx_id(&self) -> Option<CrxId> {
        let data = SignedData::decode(self.signed_data.as_slice()).ok()?;
        CrxId::from_bytes(&data.crx_id?).ok()
    }
}

/// Serialize the `SignedData` message for `id`.
pub fn signed_data_for(id: &CrxId) -> Vec<u8> {
    SignedData {
        crx_id: Some(id.as_bytes().to_vec()),
    }
    .encode_to_vec()
}

/// SHA-256 over the full signing input.
///
/// # Errors
///
/// Returns [`EncodingError::Container`] if `signed_data` cannot carry a
/// 32-bit length prefix.
pub fn signing_digest(signed_data: &[u8], archive: &[u8]) -> Result<Vec<u8>, PackError> {
    let preamble = signing_preamble(signed_data)?;
    let mut hasher = Sha256::new();
    hasher.update(&preamble);
    hasher.update(archive);
    Ok(hasher.finalize().to_vec())
}

/// Sign `archive` for `id` with each key, producing one proof per key.
///
/// The first key is normally the one `id` was derived from; additional keys
/// add proofs over the same input (key rotation). Proof order follows key
/// order.
///
/// # Errors
///
/// Returns [`EncodingError::NoProofs`] if `keys` is empty and
/// [`KeyError::Sign`] if a signature cannot be produced.
pub fn sign(id: &CrxId, archive: &ArchiveBytes, keys: &[&KeyPair]) -> Result<SignedHeader, PackError> {
    if keys.is_empty() {
        return Err(EncodingError::NoProofs.into());
    }

    let signed_data = signed_data_for(id);
    let digest = signing_digest(&signed_data, archive.as_bytes())?;

    let mut proofs = Vec::with_capacity(keys.len());
    for key in keys {
        let signature = key
            .private()
            .sign_with_rng(&mut OsRng, Pkcs1v15Sign::new::<Sha256>(), &digest)
            .map_err(KeyError::Sign)?;
        tracing::debug!(key = %key.crx_id(), bytes = signature.len(), "signed header");
        proofs.push(Proof {
            public_key: key.public_der().to_vec(),
            signature,
        });
    }

    Ok(SignedHeader {
        signed_data,
        proofs,
    })
}

/// Check one proof against `signed_data` and `archive`.
///
/// Returns `false` if the signature does not match.
///
/// # Errors
///
/// Returns [`KeyError::PublicKey`] if the proof's key is not an RSA
/// `SubjectPublicKeyInfo` of a supported size, and
/// [`EncodingError::Container`] if the signing input cannot be framed.
pub fn verify_proof(proof: &Proof, signed_data: &[u8], archive: &[u8]) -> Result<bool, PackError> {
    let public = decode_public_key(&proof.public_key)?;
    let digest = signing_digest(signed_data, archive)?;
    Ok(public
        .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, &proof.signature)
        .is_ok())
}

/// Parse DER `SubjectPublicKeyInfo`, allowing moduli up to [`MAX_KEY_BITS`].
///
/// `RsaPublicKey::from_public_key_der` stops at 4096 bits, below what
/// [`KeyPair`] signs with.
fn decode_public_key(der: &[u8]) -> Result<RsaPublicKey, KeyError> {
    let spki = SubjectPublicKeyInfoRef::try_from(der).map_err(malformed)?;
    spki.algorithm
        .assert_algorithm_oid(pkcs1::ALGORITHM_OID)
        .map_err(malformed)?;
    let bits = spki
        .subject_public_key
        .as_bytes()
        .ok_or_else(|| malformed("unaligned key bit string"))?;
    let key = pkcs1::RsaPublicKey::try_from(bits).map_err(malformed)?;

    let n = BigUint::from_bytes_be(key.modulus.as_bytes());
    let e = BigUint::from_bytes_be(key.public_exponent.as_bytes());
    RsaPublicKey::new_with_max_size(n, e, MAX_KEY_BITS).map_err(malformed)
}

fn malformed(err: impl std::fmt::Display) -> KeyError {
    KeyError::PublicKey(err.to_string())
}
