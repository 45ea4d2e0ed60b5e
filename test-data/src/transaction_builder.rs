use duskcoin_chain::{OutPoint, Transaction, TransactionInput, TransactionOutput, TxKind};
use duskcoin_script::Script;

/// Builder-style transaction fixture helper, following the teacher's
/// `TransactionBuilder` convention (chained setters returning `Self`,
/// a coinbase shortcut, a default input/output shape).
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    transaction: Transaction,
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        TransactionBuilder {
            transaction: Transaction {
                version: 1,
                kind: TxKind::Standard,
                inputs: Vec::new(),
                outputs: Vec::new(),
                lock_time: 0,
            },
        }
    }
}

impl TransactionBuilder {
    pub fn coinbase() -> TransactionBuilder {
        let mut builder = TransactionBuilder::default();
        builder.transaction.kind = TxKind::Coinbase;
        builder.transaction.inputs.push(TransactionInput {
            previous_output: OutPoint::null(),
            script_sig: Script::default(),
            sequence: u32::MAX,
        });
        builder
    }

    pub fn with_output(value: u64) -> TransactionBuilder {
        TransactionBuilder::default().add_output(value)
    }

    pub fn with_input(transaction: &Transaction, output_index: u32) -> TransactionBuilder {
        TransactionBuilder::default().add_input(transaction, output_index)
    }

    pub fn set_kind(mut self, kind: TxKind) -> Self {
        self.transaction.kind = kind;
        self
    }

    pub fn set_lock_time(mut self, lock_time: u32) -> Self {
        self.transaction.lock_time = lock_time;
        self
    }

    pub fn add_output(mut self, value: u64) -> Self {
        self.transaction.outputs.push(TransactionOutput {
            value,
            script_pubkey: Script::default(),
        });
        self
    }

    pub fn add_input(mut self, transaction: &Transaction, output_index: u32) -> Self {
        self.transaction.inputs.push(TransactionInput {
            previous_output: OutPoint {
                hash: transaction.hash(),
                index: output_index,
            },
            script_sig: Script::default(),
            sequence: u32::MAX,
        });
        self
    }

    /// Makes the input non-final: clears max-sequence and sets a future
    /// locktime, so finality tests can exercise the cutoff path.
    pub fn lock(mut self) -> Self {
        if let Some(input) = self.transaction.inputs.first_mut() {
            input.sequence = 0;
        }
        self.transaction.lock_time = 500_000;
        self
    }

    pub fn build(self) -> Transaction {
        self.transaction
    }
}
