use std::fmt;
use std::str::FromStr;

/// A 32-byte double-SHA256-style digest used for transaction ids, block
/// hashes, privacy serials/pubcoins and accumulator checkpoint entries.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub const fn zero() -> Self {
        Hash256([0u8; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Byte-reversed (little-endian display) copy, matching the convention
    /// used when printing block/transaction hashes.
    pub fn reversed(&self) -> Self {
        let mut out = self.0;
        out.reverse();
        Hash256(out)
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Hash256(bytes)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.reversed().0))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.reversed().0))
    }
}

#[derive(Debug)]
pub struct Hash256ParseError;

impl FromStr for Hash256 {
    type Err = Hash256ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| Hash256ParseError)?;
        if bytes.len() != 32 {
            return Err(Hash256ParseError);
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        out.reverse();
        Ok(Hash256(out))
    }
}

/// A 20-byte digest used for address/script hashes (RIPEMD160(SHA256(x))).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash160(pub [u8; 20]);

impl From<[u8; 20]> for Hash160 {
    fn from(bytes: [u8; 20]) -> Self {
        Hash160(bytes)
    }
}

impl AsRef<[u8]> for Hash160 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Hash160 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
