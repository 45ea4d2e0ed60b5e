use duskcoin_primitives::hash::Hash256;
use duskcoin_serialization::{Serializable, Stream};

/// Payload carried by a `TxKind::PrivacySpend` transaction. The serial
/// hashes are what the assembler's duplicate/double-spend screen (step 8
/// of the template sequence) checks against already-confirmed serials and
/// against other candidates in the same template.
///
/// The zero-knowledge proof itself is opaque here — verifying it is
/// consensus/crypto territory, out of scope for the assembler.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpendProof {
    pub serial_hashes: Vec<Hash256>,
    pub proof: Vec<u8>,
}

/// Payload carried by a `TxKind::PrivacyMint` transaction. The pubcoin
/// hashes are checked for uniqueness the same way spend serials are.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MintProof {
    pub pubcoin_hashes: Vec<Hash256>,
    pub proof: Vec<u8>,
}

impl Serializable for SpendProof {
    fn serialize(&self, stream: &mut Stream) {
        stream.append(&self.serial_hashes).append(&self.proof);
    }
}

impl Serializable for MintProof {
    fn serialize(&self, stream: &mut Stream) {
        stream.append(&self.pubcoin_hashes).append(&self.proof);
    }
}
