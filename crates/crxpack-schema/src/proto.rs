//! Protobuf messages carried in the CRX3 header.
//!
//! Field numbers and proto2 `optional` semantics match the browser's
//! `crx3.proto`; only the derive is hand-written so no `protoc` is needed at
//! build time.

/// Top-level header stored between the container prefix and the archive.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CrxFileHeader {
    /// RSASSA-PKCS1-v1_5 / SHA-256 proofs, in signing order.
    #[prost(message, repeated, tag = "2")]
    pub sha256_with_rsa: Vec<AsymmetricKeyProof>,

    /// ECDSA P-256 / SHA-256 proofs. Decoded for completeness, never written.
    #[prost(message, repeated, tag = "3")]
    pub sha256_with_ecdsa: Vec<AsymmetricKeyProof>,

    /// Web-store verified contents blob. Never written by this crate.
    #[prost(bytes = "vec", optional, tag = "4")]
    pub verified_contents: Option<Vec<u8>>,

    /// Serialized [`SignedData`]; covered by every proof's signature.
    #[prost(bytes = "vec", optional, tag = "10000")]
    pub signed_header_data: Option<Vec<u8>>,
}

/// One public key and the signature it produced.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AsymmetricKeyProof {
    /// DER `SubjectPublicKeyInfo`.
    #[prost(bytes = "vec", optional, tag = "1")]
    pub public_key: Option<Vec<u8>>,

    /// Raw signature bytes.
    #[prost(bytes = "vec", optional, tag = "2")]
    pub signature: Option<Vec<u8>>,
}

/// Metadata signed alongside the archive.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignedData {
    /// First 16 bytes of SHA-256 over the identity key's DER encoding.
    #[prost(bytes = "vec", optional, tag = "1")]
    pub crx_id: Option<Vec<u8>>,
}
