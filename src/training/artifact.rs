//! Binary artifact format: a fixed 24-byte header followed by a postcard payload.
//!
//! ```text
//! offset size field
//!      0    4 magic "PVAL"
//!      4    1 format version major
//!      5    1 format version minor
//!      6    2 reserved, zero
//!      8    4 feature count      (u32 LE)
//!     12    4 tree count         (u32 LE)
//!     16    4 payload length     (u32 LE)
//!     20    4 CRC32 of payload   (u32 LE)
//! ```
//!
//! Decoding checks everything a serving process depends on before handing
//! the artifact out: header integrity, checksum, schema lockstep with
//! the feature column order, and tree structure.

use thiserror::Error;

use crate::data::domain::N_FEATURES;

use super::domain::ModelArtifact;
use super::tree::TreeError;

/// Magic bytes identifying an artifact file.
pub const MAGIC: &[u8; 4] = b"PVAL";

pub const VERSION_MAJOR: u8 = 1;
pub const VERSION_MINOR: u8 = 0;

/// Size of the header in bytes.
pub const HEADER_SIZE: usize = 24;

/// Everything that can go wrong writing or reading an artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("not a model artifact")]
    NotAnArtifact,

    #[error("artifact format {major}.{minor} is not supported (expected {VERSION_MAJOR}.x)")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("artifact truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("corrupt artifact: {0}")]
    Corrupt(String),

    #[error("artifact features {actual:?} do not match the request schema")]
    SchemaMismatch { actual: Vec<String> },

    #[error("invalid model: {0}")]
    InvalidModel(#[from] TreeError),

    #[error("codec error: {0}")]
    Codec(#[from] postcard::Error),

    #[error("artifact I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parsed fixed-size header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version_major: u8,
    pub version_minor: u8,
    pub n_features: u32,
    pub n_trees: u32,
    pub payload_len: u32,
    pub checksum: u32,
}

impl Header {
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = self.version_major;
        buf[5] = self.version_minor;
        buf[8..12].copy_from_slice(&self.n_features.to_le_bytes());
        buf[12..16].copy_from_slice(&self.n_trees.to_le_bytes());
        buf[16..20].copy_from_slice(&self.payload_len.to_le_bytes());
        buf[20..24].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, ArtifactError> {
        if buf.len() < HEADER_SIZE {
            if !buf.is_empty() && !MAGIC.starts_with(&buf[..buf.len().min(4)]) {
                return Err(ArtifactError::NotAnArtifact);
            }
            return Err(ArtifactError::Truncated {
                expected: HEADER_SIZE,
                actual: buf.len(),
            });
        }
        if &buf[0..4] != MAGIC {
            return Err(ArtifactError::NotAnArtifact);
        }
        let (major, minor) = (buf[4], buf[5]);
        if major != VERSION_MAJOR {
            return Err(ArtifactError::UnsupportedVersion { major, minor });
        }
        let word = |at: usize| u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);
        Ok(Self {
            version_major: major,
            version_minor: minor,
            n_features: word(8),
            n_trees: word(12),
            payload_len: word(16),
            checksum: word(20),
        })
    }
}

/// Serialize `artifact` into header + payload bytes.
pub fn encode(artifact: &ModelArtifact) -> Result<Vec<u8>, ArtifactError> {
    let payload = postcard::to_allocvec(artifact)?;
    let payload_len = u32::try_from(payload.len())
        .map_err(|_| ArtifactError::Corrupt("payload exceeds 4 GiB".into()))?;

    let header = Header {
        version_major: VERSION_MAJOR,
        version_minor: VERSION_MINOR,
        n_features: artifact.forest.n_features() as u32,
        n_trees: artifact.forest.n_trees() as u32,
        payload_len,
        checksum: crc32fast::hash(&payload),
    };

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Parse and fully validate an artifact.
pub fn decode(bytes: &[u8]) -> Result<ModelArtifact, ArtifactError> {
    let header = Header::from_bytes(bytes)?;
    let expected = HEADER_SIZE + header.payload_len as usize;
    if bytes.len() < expected {
        return Err(ArtifactError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }
    if bytes.len() > expected {
        return Err(ArtifactError::Corrupt(format!(
            "{} trailing bytes after payload",
            bytes.len() - expected
        )));
    }

    let payload = &bytes[HEADER_SIZE..];
    let actual = crc32fast::hash(payload);
    if actual != header.checksum {
        return Err(ArtifactError::ChecksumMismatch {
            expected: header.checksum,
            actual,
        });
    }

    let artifact: ModelArtifact = postcard::from_bytes(payload)?;

    if artifact.forest.n_features() != header.n_features as usize
        || artifact.forest.n_trees() != header.n_trees as usize
    {
        return Err(ArtifactError::Corrupt("header disagrees with payload".into()));
    }
    if !artifact.matches_schema() || artifact.forest.n_features() != N_FEATURES {
        return Err(ArtifactError::SchemaMismatch {
            actual: artifact.meta.feature_names.clone(),
        });
    }
    artifact.forest.validate()?;
    Ok(artifact)
}
