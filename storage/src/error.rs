/// Failures a storage collaborator can report back to the assembler.
/// Kept as a plain `thiserror` enum rather than the core's richer
/// `AssemblerError` taxonomy — callers here only branch on "did this
/// lookup fail", not on a matchable reason.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(String),
    #[error("block parent is unknown")]
    UnknownParent,
    #[error("fork is too long to proceed")]
    AncientFork,
}
