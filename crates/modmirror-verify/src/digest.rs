use std::fmt;

use crate::hasher::sha256;
use crate::{Result, VerifyError};

const HEX_LEN: usize = 64;

/// SHA-256 of a blob's raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    pub fn of(data: &[u8]) -> Self {
        Self(sha256(data))
    }

    pub fn from_hex(input: &str) -> Result<Self> {
        if input.len() != HEX_LEN {
            return Err(VerifyError::InvalidLength {
                input: input.to_string(),
                expected: HEX_LEN,
            });
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(input, &mut bytes).map_err(|source| VerifyError::InvalidHex {
            input: input.to_string(),
            source,
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.to_hex())
    }
}
