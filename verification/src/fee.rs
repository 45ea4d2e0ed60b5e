use duskcoin_chain::Transaction;
use duskcoin_storage::TransactionOutputProvider;

use crate::error::TransactionError;

/// Fee paid by a transaction: sum of input values minus sum of output
/// values. Missing prevouts (already spent, or an input the view has no
/// record of) are a hard error rather than treated as zero-value, since a
/// silently-zeroed input would understate the fee and break ancestor-score
/// ordering. Grounded on the teacher's `checked_transaction_fee`.
pub fn transaction_fee(
    store: &dyn TransactionOutputProvider,
    tx: &Transaction,
) -> Result<u64, TransactionError> {
    let mut incoming: u64 = 0;
    for (input_idx, input) in tx.inputs.iter().enumerate() {
        let prevout = store
            .transaction_output(&input.previous_output)
            .ok_or(TransactionError::Input(input_idx))?;
        incoming = incoming
            .checked_add(prevout.value)
            .ok_or(TransactionError::InputValueOverflow)?;
    }

    let outgoing = tx.total_output_value();

    incoming
        .checked_sub(outgoing)
        .ok_or(TransactionError::Overspend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use duskcoin_chain::{OutPoint, TransactionInput, TransactionOutput, TxKind};
    use duskcoin_script::Script;
    use duskcoin_storage::MemoryUtxoView;

    fn output(value: u64) -> TransactionOutput {
        TransactionOutput {
            value,
            script_pubkey: Script::default(),
        }
    }

    #[test]
    fn fee_is_input_value_minus_output_value() {
        let mut store = MemoryUtxoView::new();
        let outpoint = OutPoint {
            hash: Default::default(),
            index: 0,
        };
        store.insert(outpoint, output(1_000_000));

        let tx = Transaction {
            version: 1,
            kind: TxKind::Standard,
            inputs: vec![TransactionInput {
                previous_output: outpoint,
                script_sig: Script::default(),
                sequence: 0,
            }],
            outputs: vec![output(900_000)],
            lock_time: 0,
        };

        assert_eq!(transaction_fee(&store, &tx), Ok(100_000));
    }

    #[test]
    fn missing_prevout_is_an_error() {
        let store = MemoryUtxoView::new();
        let tx = Transaction {
            version: 1,
            kind: TxKind::Standard,
            inputs: vec![TransactionInput {
                previous_output: OutPoint::null(),
                script_sig: Script::default(),
                sequence: 0,
            }],
            outputs: vec![output(1)],
            lock_time: 0,
        };
        assert_eq!(transaction_fee(&store, &tx), Err(TransactionError::Input(0)));
    }

    #[test]
    fn overspend_is_an_error() {
        let mut store = MemoryUtxoView::new();
        let outpoint = OutPoint {
            hash: Default::default(),
            index: 0,
        };
        store.insert(outpoint, output(100));

        let tx = Transaction {
            version: 1,
            kind: TxKind::Standard,
            inputs: vec![TransactionInput {
                previous_output: outpoint,
                script_sig: Script::default(),
                sequence: 0,
            }],
            outputs: vec![output(200)],
            lock_time: 0,
        };
        assert_eq!(transaction_fee(&store, &tx), Err(TransactionError::Overspend));
    }
}
