//! Error taxonomy for packaging runs.
//!
//! Every failure reaches the caller as a [`PackError`] whose [`ErrorKind`]
//! tells input problems, key problems, filesystem problems, and internal
//! encoding defects apart. Nothing is retried or downgraded.

use std::io;
use std::path::{Path, PathBuf};

use crxpack_schema::ContainerError;
use thiserror::Error;

/// Coarse classification of a [`PackError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing inputs: no files, no manifest, no version.
    Input,
    /// Unreadable or malformed private key, or a signing failure.
    Key,
    /// A source file could not be read or an output could not be written.
    Io,
    /// Internal encoding failure. Indicates a defect, not a user error.
    Encoding,
}

/// Top-level error for every packaging operation.
#[derive(Error, Debug)]
pub enum PackError {
    /// See [`InputError`].
    #[error(transparent)]
    Input(#[from] InputError),

    /// See [`KeyError`].
    #[error(transparent)]
    Key(#[from] KeyError),

    /// Filesystem failure on a specific path.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// See [`EncodingError`].
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl PackError {
    /// Attach a path to an I/O error.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Which family this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input(_) => ErrorKind::Input,
            Self::Key(_) => ErrorKind::Key,
            Self::Io { .. } => ErrorKind::Io,
            Self::Encoding(_) => ErrorKind::Encoding,
        }
    }
}

/// Problems with the set of files handed to the packager.
#[derive(Error, Debug)]
pub enum InputError {
    /// No input paths, or no files found under them.
    #[error("no input files given")]
    Empty,

    /// No `manifest.json` at the root of the source set.
    #[error("no manifest.json found at the root of the input files")]
    MissingManifest,

    /// `manifest.json` is not valid JSON.
    #[error("manifest.json is not valid JSON: {0}")]
    InvalidManifest(#[from] serde_json::Error),

    /// `manifest.json` has no string `version` field.
    #[error("manifest.json has no \"version\" string")]
    MissingVersion,

    /// Two entries share a relative path.
    #[error("duplicate path in input set: {0}")]
    DuplicatePath(String),

    /// A relative path that is absolute, empty, or escapes the root.
    #[error("invalid archive path: {0:?}")]
    InvalidPath(String),

    /// A file that is not inside the extension root.
    #[error("{} is outside the extension root {}", path.display(), root.display())]
    OutsideRoot {
        /// Offending file.
        path: PathBuf,
        /// Directory containing `manifest.json`.
        root: PathBuf,
    },

    /// A config file that does not parse.
    #[error("invalid config: {0}")]
    Config(String),

    /// A glob pattern that matched nothing.
    #[error("no files match {0:?}")]
    NoMatch(String),

    /// A glob pattern that is malformed.
    #[error("invalid glob pattern {pattern:?}: {message}")]
    Pattern {
        /// Pattern as given.
        pattern: String,
        /// Parser message.
        message: String,
    },
}

/// Problems loading, generating, or using a private key.
#[derive(Error, Debug)]
pub enum KeyError {
    /// The key file could not be read.
    #[error("cannot read private key {}: {source}", path.display())]
    Read {
        /// Key location.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The bytes are not an RSA private key in PEM or DER form.
    #[error("not a valid RSA private key: {0}")]
    Format(String),

    /// The modulus is below the supported minimum.
    #[error("RSA key is {bits} bits, at least {min} required")]
    TooSmall {
        /// Actual modulus size.
        bits: usize,
        /// Required minimum.
        min: usize,
    },

    /// The modulus is above the supported maximum.
    #[error("RSA key is {bits} bits, at most {max} supported")]
    TooLarge {
        /// Actual modulus size.
        bits: usize,
        /// Supported maximum.
        max: usize,
    },

    /// A proof carries a public key that is not an RSA `SubjectPublicKeyInfo`.
    #[error("not a valid RSA public key: {0}")]
    PublicKey(String),

    /// Key generation failed.
    #[error("key generation failed: {0}")]
    Generate(#[source] rsa::Error),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Sign(#[source] rsa::Error),

    /// Encoding a key for export failed.
    #[error("cannot encode key: {0}")]
    Export(String),
}

/// Internal encoding failures. Correct code never produces these.
#[derive(Error, Debug)]
pub enum EncodingError {
    /// The ZIP writer failed.
    #[error("archive construction failed: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// A timestamp could not be expressed in the archive format.
    #[error("timestamp {0} cannot be stored in the archive")]
    Timestamp(i64),

    /// A protobuf message failed to decode.
    #[error("protobuf decode failed: {0}")]
    Protobuf(#[from] prost::DecodeError),

    /// Container framing failed.
    #[error("container framing failed: {0}")]
    Container(#[from] ContainerError),

    /// A header was requested without any signing key.
    #[error("at least one signing key is required")]
    NoProofs,

    /// A blocking worker panicked or was cancelled.
    #[error("packaging worker failed: {0}")]
    Worker(String),
}

impl From<zip::result::ZipError> for PackError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Encoding(EncodingError::Archive(err))
    }
}

impl From<ContainerError> for PackError {
    fn from(err: ContainerError) -> Self {
        Self::Encoding(EncodingError::Container(err))
    }
}
