#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    #[error("missing prevout for input {0}")]
    Input(usize),
    #[error("sum of input values overflows")]
    InputValueOverflow,
    #[error("sum of output values overflows")]
    OutputValueOverflow,
    #[error("transaction spends more than it is given")]
    Overspend,
}
