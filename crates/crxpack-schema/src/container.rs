//! CRX3 container framing.
//!
//! ```text
//! offset  size  field
//! 0       4     magic "Cr24"
//! 4       4     format version, u32 little-endian (3)
//! 8       4     header length N, u32 little-endian
//! 12      N     serialized CrxFileHeader
//! 12+N    ..    ZIP archive
//! ```

use thiserror::Error;

/// Magic bytes opening every CRX file.
pub const CRX_MAGIC: [u8; 4] = *b"Cr24";

/// The only container version this crate reads or writes.
pub const CRX_FORMAT_VERSION: u32 = 3;

/// Size of the fixed prefix (magic + version + header length).
pub const PREFIX_LEN: usize = 12;

/// Context string that opens every signing input, NUL terminator included.
pub const SIGNATURE_CONTEXT: &[u8] = b"CRX3 SignedData\0";

/// Errors raised while framing or parsing a container.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// Fewer bytes than the fixed prefix.
    #[error("container is {0} bytes, shorter than the 12-byte prefix")]
    Truncated(usize),

    /// The first four bytes are not `Cr24`.
    #[error("bad magic {0:02x?}, expected \"Cr24\"")]
    BadMagic([u8; 4]),

    /// A version other than 3.
    #[error("unsupported container version {0}")]
    UnsupportedVersion(u32),

    /// The declared header runs past the end of the input.
    #[error("header length {declared} exceeds the {available} bytes after the prefix")]
    HeaderOverrun {
        /// Length declared in the prefix.
        declared: u32,
        /// Bytes actually present after the prefix.
        available: usize,
    },

    /// A length that cannot be expressed as a `u32` prefix.
    #[error("{0} bytes do not fit a 32-bit length prefix")]
    LengthOverflow(usize),
}

/// Borrowed view over the sections of a parsed container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerView<'a> {
    /// Format version read from the prefix.
    pub version: u32,
    /// Serialized `CrxFileHeader`.
    pub header: &'a [u8],
    /// Everything after the header: the ZIP archive.
    pub archive: &'a [u8],
}

impl<'a> ContainerView<'a> {
    /// Split `bytes` into header and archive sections.
    ///
    /// # Errors
    ///
    /// Returns a [`ContainerError`] if the prefix is truncated, the magic or
    /// version do not match, or the header length overruns the input.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ContainerError> {
        if bytes.len() < PREFIX_LEN {
            return Err(ContainerError::Truncated(bytes.len()));
        }

        let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
        if magic != CRX_MAGIC {
            return Err(ContainerError::BadMagic(magic));
        }

        let version = read_u32_le(&bytes[4..8]);
        if version != CRX_FORMAT_VERSION {
            return Err(ContainerError::UnsupportedVersion(version));
        }

        let declared = read_u32_le(&bytes[8..12]);
        let rest = &bytes[PREFIX_LEN..];
        let header_len = declared as usize;
        if header_len > rest.len() {
            return Err(ContainerError::HeaderOverrun {
                declared,
                available: rest.len(),
            });
        }

        let (header, archive) = rest.split_at(header_len);
        Ok(Self {
            version,
            header,
            archive,
        })
    }

    /// Total size of prefix plus header, i.e. the offset of the archive.
    pub fn archive_offset(&self) -> usize {
        PREFIX_LEN + self.header.len()
    }
}

/// Concatenate prefix, header, and archive into a container.
///
/// # Errors
///
/// Returns [`ContainerError::LengthOverflow`] if the header is longer than
/// `u32::MAX` bytes.
pub fn frame(header: &[u8], archive: &[u8]) -> Result<Vec<u8>, ContainerError> {
    let header_len = len_prefix(header.len())?;

    let mut out = Vec::with_capacity(PREFIX_LEN + header.len() + archive.len());
    out.extend_from_slice(&CRX_MAGIC);
    out.extend_from_slice(&CRX_FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&header_len);
    out.extend_from_slice(header);
    out.extend_from_slice(archive);
    Ok(out)
}

/// Bytes that precede the archive in the signing input:
/// `SIGNATURE_CONTEXT || u32le(len(signed_data)) || signed_data`.
///
/// The archive itself is appended (or fed to the digest) by the caller so
/// that large archives are never copied.
///
/// # Errors
///
/// Returns [`ContainerError::LengthOverflow`] if `signed_data` is longer than
/// `u32::MAX` bytes.
pub fn signing_preamble(signed_data: &[u8]) -> Result<Vec<u8>, ContainerError> {
    let len = len_prefix(signed_data.len())?;

    let mut out = Vec::with_capacity(SIGNATURE_CONTEXT.len() + 4 + signed_data.len());
    out.extend_from_slice(SIGNATURE_CONTEXT);
    out.extend_from_slice(&len);
    out.extend_from_slice(signed_data);
    Ok(out)
}

fn len_prefix(len: usize) -> Result<[u8; 4], ContainerError> {
    u32::try_from(len)
        .map(u32::to_le_bytes)
        .map_err(|_| ContainerError::LengthOverflow(len))
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
