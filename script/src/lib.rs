//! Minimal output-script construction and classification.
//!
//! Full script evaluation (the interpreter, signature checks, opcodes
//! beyond the handful of standard templates) is consensus-rule territory
//! and out of scope — this crate only builds and recognizes the standard
//! output templates the block assembler needs: P2PKH, P2SH, and a
//! reserve-address marker script used by the network-reward scan.

use duskcoin_keys::{Address, AddressKind};
use duskcoin_primitives::{Bytes, Hash160};

const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;
const OP_EQUAL: u8 = 0x87;
const OP_RETURN: u8 = 0x6a;
const OP_PUSHDATA_20: u8 = 0x14;

#[derive(Clone, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Script(pub Bytes);

impl Script {
    pub fn new(bytes: Vec<u8>) -> Self {
        Script(Bytes(bytes))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Builds scripts push-by-push, mirroring the teacher's `script::Builder`.
#[derive(Default)]
pub struct Builder {
    buffer: Vec<u8>,
}

impl Builder {
    pub fn default() -> Self {
        Builder { buffer: Vec::new() }
    }

    pub fn push_opcode(mut self, op: u8) -> Self {
        self.buffer.push(op);
        self
    }

    pub fn push_bytes(mut self, data: &[u8]) -> Self {
        assert!(data.len() < 0x4c, "only short pushes are needed here");
        self.buffer.push(data.len() as u8);
        self.buffer.extend_from_slice(data);
        self
    }

    /// Pushes a minimally-encoded integer (used for the coinbase height push).
    pub fn push_i64(mut self, value: i64) -> Self {
        if value == 0 {
            self.buffer.push(0x00);
            return self;
        }
        let negative = value < 0;
        let mut abs = value.unsigned_abs();
        let mut bytes = Vec::new();
        while abs > 0 {
            bytes.push((abs & 0xff) as u8);
            abs >>= 8;
        }
        if bytes.last().map(|b| b & 0x80 != 0).unwrap_or(false) {
            bytes.push(if negative { 0x80 } else { 0x00 });
        } else if negative {
            let last = bytes.last_mut().unwrap();
            *last |= 0x80;
        }
        self.push_bytes(&bytes)
    }

    pub fn into_script(self) -> Script {
        Script::new(self.buffer)
    }
}

pub fn build_p2pkh(hash: &Hash160) -> Script {
    Builder::default()
        .push_opcode(OP_DUP)
        .push_opcode(OP_HASH160)
        .push_opcode(OP_PUSHDATA_20)
        .push_bytes(&hash.0)
        .push_opcode(OP_EQUALVERIFY)
        .push_opcode(OP_CHECKSIG)
        .into_script()
}

pub fn build_p2sh(hash: &Hash160) -> Script {
    Builder::default()
        .push_opcode(OP_HASH160)
        .push_opcode(OP_PUSHDATA_20)
        .push_bytes(&hash.0)
        .push_opcode(OP_EQUAL)
        .into_script()
}

pub fn build_for_address(address: &Address) -> Script {
    match address.kind {
        AddressKind::P2PKH => build_p2pkh(&address.hash),
        AddressKind::P2SH => build_p2sh(&address.hash),
    }
}

/// Marker script for an OP_RETURN-style data carrier, used by the privacy
/// extension to stamp serials/pubcoins. Never "standard" for value outputs.
pub fn build_data_carrier(data: &[u8]) -> Script {
    Builder::default()
        .push_opcode(OP_RETURN)
        .push_bytes(data)
        .into_script()
}

/// `IsStandardOutput` — recognizes the handful of templates this node
/// treats as standard payment scripts. Matches spec.md §9 Open Question
/// (c): non-standard outputs contribute nothing to the reserve scan.
pub fn is_standard_output(script: &Script) -> bool {
    is_p2pkh(script) || is_p2sh(script)
}

pub fn is_p2pkh(script: &Script) -> bool {
    let b = &script.0 .0;
    b.len() == 25
        && b[0] == OP_DUP
        && b[1] == OP_HASH160
        && b[2] == OP_PUSHDATA_20
        && b[23] == OP_EQUALVERIFY
        && b[24] == OP_CHECKSIG
}

pub fn is_p2sh(script: &Script) -> bool {
    let b = &script.0 .0;
    b.len() == 23 && b[0] == OP_HASH160 && b[1] == OP_PUSHDATA_20 && b[22] == OP_EQUAL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p2pkh_round_trips_classification() {
        let script = build_p2pkh(&Hash160([1u8; 20]));
        assert!(is_p2pkh(&script));
        assert!(is_standard_output(&script));
        assert!(!is_p2sh(&script));
    }

    #[test]
    fn p2sh_round_trips_classification() {
        let script = build_p2sh(&Hash160([2u8; 20]));
        assert!(is_p2sh(&script));
        assert!(is_standard_output(&script));
    }

    #[test]
    fn height_push_is_minimal() {
        let script = Builder::default().push_i64(500).into_script();
        assert_eq!(script.0 .0[0] as usize, script.0 .0.len() - 1);
    }

    #[test]
    fn data_carrier_is_never_standard() {
        let script = build_data_carrier(b"serial");
        assert!(!is_standard_output(&script));
    }
}
