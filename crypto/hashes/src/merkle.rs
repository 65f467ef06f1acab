use crate::{Hash, HashWriter};

/// Computes the merkle root over `leaves`. Odd levels duplicate their last
/// node. An empty leaf set yields the zero hash.
pub fn calc_merkle_root(leaves: impl IntoIterator<Item = Hash>) -> Hash {
    let mut level: Vec<Hash> = leaves.into_iter().collect();
    if level.is_empty() {
        return Hash::zeroed();
    }
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = pair[0];
                let right = pair.get(1).copied().unwrap_or(left);
                let mut writer = HashWriter::new();
                writer.update(left).update(right);
                Hash::from_bytes(writer.finalize_double())
            })
            .collect();
    }
    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_leaf_is_root() {
        let leaf = Hash::from_u64_word(42);
        assert_eq!(calc_merkle_root([leaf]), leaf);
    }

    #[test]
    fn odd_level_duplicates_last() {
        let (a, b, c) = (Hash::from_u64_word(1), Hash::from_u64_word(2), Hash::from_u64_word(3));
        assert_eq!(calc_merkle_root([a, b, c]), calc_merkle_root([a, b, c, c]));
        assert_ne!(calc_merkle_root([a, b]), calc_merkle_root([b, a]));
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(calc_merkle_root(Vec::new()), Hash::zeroed());
    }
}
