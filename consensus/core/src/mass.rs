//! Transaction and block mass
//!
//! Mass weighs a transaction by its estimated serialized size, the script
//! bytes it locks outputs to and the signature operations its inputs declare.
//! A block's mass is the sum over its transactions and is capped per network.

use crate::config::params::Params;
use crate::subnets::SUBNETWORK_ID_SIZE;
use crate::tx::{Transaction, TransactionInput, TransactionOutput};

const HASH_SIZE: u64 = 32;

/// Deterministic estimate of the encoded size of `tx`. Only feeds mass, so it
/// need not match any wire format byte for byte.
pub fn transaction_estimated_serialized_size(tx: &Transaction) -> u64 {
    let inputs: u64 = tx.inputs.iter().map(input_estimated_serialized_size).sum();
    let outputs: u64 = tx.outputs.iter().map(output_estimated_serialized_size).sum();
    // version, input count, output count, lock time, subnetwork, gas, payload hash, payload length
    let fixed = 2 + 8 + 8 + 8 + SUBNETWORK_ID_SIZE as u64 + 8 + HASH_SIZE + 8;
    fixed + inputs + outputs + tx.payload.len() as u64
}

fn input_estimated_serialized_size(input: &TransactionInput) -> u64 {
    // outpoint, script length, script, sequence
    HASH_SIZE + 4 + 8 + input.signature_script.len() as u64 + 8
}

fn output_estimated_serialized_size(output: &TransactionOutput) -> u64 {
    // value, script version, script length, script
    8 + 2 + 8 + output.script_public_key.script().len() as u64
}

#[derive(Clone, Debug)]
pub struct MassCalculator {
    mass_per_tx_byte: u64,
    mass_per_script_pub_key_byte: u64,
    mass_per_sig_op: u64,
}

impl MassCalculator {
    pub fn new(
        mass_per_tx_byte: u64,
        mass_per_script_pub_key_byte: u64,
        mass_per_sig_op: u64,
    ) -> Self {
        Self { mass_per_tx_byte, mass_per_script_pub_key_byte, mass_per_sig_op }
    }

    pub fn from_params(params: &Params) -> Self {
        Self::new(
            params.mass_per_tx_byte,
            params.mass_per_script_pub_key_byte,
            params.mass_per_sig_op,
        )
    }

    /// Coinbase transactions weigh nothing, their size is bounded by the payload limit instead
    pub fn calc_tx_mass(&self, tx: &Transaction) -> u64 {
        if tx.is_coinbase() {
            return 0;
        }
        let size = transaction_estimated_serialized_size(tx);
        let script_bytes: u64 = tx
            .outputs
            .iter()
            .map(|output| 2 + output.script_public_key.script().len() as u64)
            .sum();
        let sig_ops: u64 = tx.inputs.iter().map(|input| input.sig_op_count as u64).sum();
        size * self.mass_per_tx_byte
            + script_bytes * self.mass_per_script_pub_key_byte
            + sig_ops * self.mass_per_sig_op
    }

    /// Saturating sum, so an absurd block compares above any limit
    pub fn calc_block_mass<'a>(
        &self,
        transactions: impl IntoIterator<Item = &'a Transaction>,
    ) -> u64 {
        transactions.into_iter().fold(0u64, |mass, tx| mass.saturating_add(self.calc_tx_mass(tx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::params::SIMNET_PARAMS;
    use crate::subnets::{SUBNETWORK_ID_COINBASE, SUBNETWORK_ID_NATIVE};
    use crate::tx::{ScriptPublicKey, TransactionOutpoint};
    use crate::Hash;

    fn transfer(inputs: usize, script_len: usize) -> Transaction {
        let inputs = (0..inputs)
            .map(|i| {
                let outpoint = TransactionOutpoint::new(Hash::from_u64_word(i as u64 + 1), 0);
                TransactionInput::new(outpoint, vec![0; 66], 0, 1)
            })
            .collect();
        let script = ScriptPublicKey::from_vec(0, vec![0x20; script_len]);
        let outputs = vec![TransactionOutput::new(10, script)];
        Transaction::new(0, inputs, outputs, 0, SUBNETWORK_ID_NATIVE, 0, vec![])
    }

    #[test]
    fn test_tx_mass_components() {
        let calc = MassCalculator::from_params(&SIMNET_PARAMS);
        let tx = transfer(1, 34);
        // 94 fixed + 118 per input + 52 per output
        assert_eq!(transaction_estimated_serialized_size(&tx), 94 + 118 + 52);
        assert_eq!(calc.calc_tx_mass(&tx), 264 + 36 * 10 + 1000);
        assert_eq!(calc.calc_tx_mass(&transfer(2, 34)) - calc.calc_tx_mass(&tx), 118 + 1000);

        let mut coinbase = tx.clone();
        coinbase.inputs.clear();
        coinbase.subnetwork_id = SUBNETWORK_ID_COINBASE;
        coinbase.payload = vec![0; 100];
        coinbase.finalize();
        assert_eq!(calc.calc_tx_mass(&coinbase), 0);
    }

    #[test]
    fn test_block_mass_sums_transactions() {
        let calc = MassCalculator::new(1, 10, 1000);
        let txs = vec![transfer(1, 34), transfer(3, 20)];
        let expected = calc.calc_tx_mass(&txs[0]) + calc.calc_tx_mass(&txs[1]);
        assert_eq!(calc.calc_block_mass(&txs), expected);
    }
}
