use duskcoin_chain::Transaction;
use duskcoin_script::{is_p2pkh, is_p2sh};

/// Sigop cost charged against the block's `maxSigOpCost` budget. Full
/// script evaluation (counting `OP_CHECKMULTISIG` operands, witness
/// discount) is out of scope; this charges the fixed per-template
/// weights the standard output templates imply, which is all Resource
/// Accounting needs to enforce the cap.
const P2PKH_SIGOP_COST: u64 = 4;
const P2SH_SIGOP_COST: u64 = 4;

pub fn transaction_sigops(tx: &Transaction) -> u64 {
    tx.outputs
        .iter()
        .map(|output| {
            if is_p2pkh(&output.script_pubkey) {
                P2PKH_SIGOP_COST
            } else if is_p2sh(&output.script_pubkey) {
                P2SH_SIGOP_COST
            } else {
                0
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use duskcoin_chain::{OutPoint, TransactionInput, TransactionOutput, TxKind};
    use duskcoin_primitives::Hash160;
    use duskcoin_script::build_p2pkh;

    #[test]
    fn p2pkh_output_charges_four_sigops() {
        let tx = Transaction {
            version: 1,
            kind: TxKind::Standard,
            inputs: vec![TransactionInput {
                previous_output: OutPoint::null(),
                script_sig: Default::default(),
                sequence: 0,
            }],
            outputs: vec![TransactionOutput {
                value: 1,
                script_pubkey: build_p2pkh(&Hash160([1u8; 20])),
            }],
            lock_time: 0,
        };
        assert_eq!(transaction_sigops(&tx), P2PKH_SIGOP_COST);
    }
}
