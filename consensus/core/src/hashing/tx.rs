use super::HashWriterExtensions;
use crate::tx::{Transaction, TransactionId, TransactionInput, TransactionOutput};
use lumen_hashes::HashWriter;

/// Computes the transaction id. The cached id field itself is not covered.
pub fn id(tx: &Transaction) -> TransactionId {
    let mut hasher = HashWriter::new();
    hasher.write_u16(tx.version).write_len(tx.inputs.len());
    for input in tx.inputs.iter() {
        write_input(&mut hasher, input);
    }
    hasher.write_len(tx.outputs.len());
    for output in tx.outputs.iter() {
        write_output(&mut hasher, output);
    }
    hasher
        .write_u64(tx.lock_time)
        .update(tx.subnetwork_id.as_bytes())
        .write_u64(tx.gas)
        .write_var_bytes(&tx.payload);
    TransactionId::from_bytes(hasher.finalize())
}

fn write_input(hasher: &mut HashWriter, input: &TransactionInput) {
    hasher
        .update(input.previous_outpoint.transaction_id)
        .write_u32(input.previous_outpoint.index)
        .write_var_bytes(&input.signature_script)
        .write_u64(input.sequence)
        .write_u8(input.sig_op_count);
}

fn write_output(hasher: &mut HashWriter, output: &TransactionOutput) {
    hasher
        .write_u64(output.value)
        .write_u16(output.script_public_key.version())
        .write_var_bytes(output.script_public_key.script());
}
