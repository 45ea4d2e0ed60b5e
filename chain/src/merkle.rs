use duskcoin_crypto::dhash256;
use duskcoin_primitives::hash::Hash256;

/// Binary Merkle root over a sequence of leaf hashes. An odd-sized level
/// duplicates its last element, matching the Bitcoin-lineage convention
/// the teacher's `merkle_root` implements.
pub fn merkle_root(hashes: &[Hash256]) -> Hash256 {
    if hashes.is_empty() {
        return Hash256::zero();
    }
    if hashes.len() == 1 {
        return hashes[0];
    }

    let mut level: Vec<Hash256> = hashes.to_vec();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = *level.last().unwrap();
            level.push(last);
        }
        level = level
            .chunks(2)
            .map(|pair| merkle_node_hash(&pair[0], &pair[1]))
            .collect();
    }
    level[0]
}

pub fn merkle_node_hash(left: &Hash256, right: &Hash256) -> Hash256 {
    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(&left.0);
    buf.extend_from_slice(&right.0);
    dhash256(&buf)
}

/// Witness Merkle root over the per-transaction witness identifiers. The
/// coinbase's witness id is defined as the zero hash, per the usual
/// segwit-style convention the teacher's block assembly follows.
pub fn witness_merkle_root(witness_hashes: &[Hash256]) -> Hash256 {
    if witness_hashes.is_empty() {
        return Hash256::zero();
    }
    let mut leaves = witness_hashes.to_vec();
    leaves[0] = Hash256::zero();
    merkle_root(&leaves)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_leaf_root_is_the_leaf_itself() {
        let h = Hash256([7u8; 32]);
        assert_eq!(merkle_root(&[h]), h);
    }

    #[test]
    fn empty_root_is_zero() {
        assert_eq!(merkle_root(&[]), Hash256::zero());
    }

    #[test]
    fn odd_leaf_count_duplicates_last() {
        let a = Hash256([1u8; 32]);
        let b = Hash256([2u8; 32]);
        let three = merkle_root(&[a, b, b]);
        let two_then_dup = merkle_root(&[a, b]);
        assert_ne!(three, two_then_dup);
    }

    #[test]
    fn witness_root_zeroes_coinbase_slot() {
        let a = Hash256([9u8; 32]);
        let b = Hash256([3u8; 32]);
        let root = witness_merkle_root(&[a, b]);
        let expected = merkle_root(&[Hash256::zero(), b]);
        assert_eq!(root, expected);
    }
}
