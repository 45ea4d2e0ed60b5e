//! Hashing and signature primitives consumed by the chain and miner crates.
//!
//! Zero-knowledge proof verification (the privacy extension's "spend"/"mint"
//! proofs) is out of scope here — this crate only provides the digest and
//! signature primitives the block assembler itself needs: transaction/header
//! hashing and PoS block signing.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use duskcoin_primitives::hash::{Hash160, Hash256};

/// SHA256(SHA256(data)), the hash used for transaction ids and block hashes.
pub fn dhash256(data: &[u8]) -> Hash256 {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    Hash256(out)
}

/// RIPEMD160(SHA256(data)), the hash used for P2PKH/P2SH script hashes.
pub fn dhash160(data: &[u8]) -> Hash160 {
    let sha = Sha256::digest(data);
    let ripe = Ripemd160::digest(sha);
    let mut out = [0u8; 20];
    out.copy_from_slice(&ripe);
    Hash160(out)
}

pub mod signing {
    use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};

    #[derive(Clone)]
    pub struct StakeKey(SigningKey);

    impl StakeKey {
        pub fn from_bytes(bytes: [u8; 32]) -> Self {
            StakeKey(SigningKey::from_bytes(&bytes))
        }

        pub fn public_key(&self) -> VerifyingKey {
            self.0.verifying_key()
        }

        pub fn sign(&self, message: &[u8]) -> Signature {
            self.0.sign(message)
        }
    }
}
