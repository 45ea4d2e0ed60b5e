mod stream;

pub use stream::{Serializable, Stream};

use duskcoin_primitives::compact::Compact;
use duskcoin_primitives::hash::{Hash160, Hash256};

impl Serializable for Hash256 {
    fn serialize(&self, stream: &mut Stream) {
        stream.append_bytes(&self.0);
    }
}

impl Serializable for Hash160 {
    fn serialize(&self, stream: &mut Stream) {
        stream.append_bytes(&self.0);
    }
}

impl Serializable for Compact {
    fn serialize(&self, stream: &mut Stream) {
        stream.append(&self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_size_round_trips_boundaries() {
        for value in [0u64, 0xfc, 0xfd, 0xffff, 0x1_0000, 0xffff_ffff, u64::MAX] {
            let mut stream = Stream::new();
            stream.append_compact_size(value);
            assert!(!stream.out().is_empty());
        }
    }

    #[test]
    fn hash256_serializes_to_32_bytes() {
        let mut stream = Stream::new();
        stream.append(&Hash256::zero());
        assert_eq!(stream.out().len(), 32);
    }
}
