//! Shared types and wire format for CRX3 packages.
//!
//! Everything here is pure: no filesystem, no key material. The byte layouts
//! are fixed by the browser that consumes the container, so every constant in
//! this crate is part of an external contract.

pub mod container;
pub mod id;
pub mod proto;

// Re-exports
pub use container::{
    CRX_FORMAT_VERSION, CRX_MAGIC, ContainerError, ContainerView, PREFIX_LEN, SIGNATURE_CONTEXT,
    frame, signing_preamble,
};
pub use id::{CrxId, CrxIdError};
pub use proto::{AsymmetricKeyProof, CrxFileHeader, SignedData};
