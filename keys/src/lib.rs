//! Address types. Key custody, derivation and signing policy are wallet
//! concerns and out of scope here — this crate only models the address
//! shape the block assembler needs to build payout scripts.

use std::fmt;
use std::str::FromStr;

use base58::{FromBase58, ToBase58};
use duskcoin_primitives::hash::Hash160;

/// Which kind of standard output script an address decodes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressKind {
    P2PKH,
    P2SH,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Address {
    pub kind: AddressKind,
    pub hash: Hash160,
}

#[derive(Debug)]
pub struct AddressParseError;

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data = s.from_base58().map_err(|_| AddressParseError)?;
        if data.len() != 21 {
            return Err(AddressParseError);
        }
        let kind = match data[0] {
            0 => AddressKind::P2PKH,
            5 => AddressKind::P2SH,
            _ => return Err(AddressParseError),
        };
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&data[1..]);
        Ok(Address {
            kind,
            hash: Hash160(hash),
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let version: u8 = match self.kind {
            AddressKind::P2PKH => 0,
            AddressKind::P2SH => 5,
        };
        let mut data = Vec::with_capacity(21);
        data.push(version);
        data.extend_from_slice(&self.hash.0);
        write!(f, "{}", data.to_base58())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trips_through_base58() {
        let addr = Address {
            kind: AddressKind::P2PKH,
            hash: Hash160([7u8; 20]),
        };
        let text = addr.to_string();
        let parsed: Address = text.parse().unwrap();
        assert_eq!(parsed, addr);
    }
}
