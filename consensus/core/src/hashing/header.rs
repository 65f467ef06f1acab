use super::HashWriterExtensions;
use crate::{header::Header, Hash};
use lumen_hashes::HashWriter;

/// Computes the hash of a block header. Covers every field except the cached hash.
pub fn hash(header: &Header) -> Hash {
    let mut hasher = HashWriter::new();
    hasher.write_u16(header.version).write_len(header.parents.len());
    for parent in header.parents.iter() {
        hasher.update(parent);
    }
    hasher
        .update(header.hash_merkle_root)
        .write_u64(header.timestamp)
        .write_u32(header.bits)
        .write_u64(header.nonce)
        .write_u64(header.daa_score)
        .update(header.blue_work.to_le_bytes())
        .write_u64(header.blue_score);
    Hash::from_bytes(hasher.finalize_double())
}
