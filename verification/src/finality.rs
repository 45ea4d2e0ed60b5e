use duskcoin_chain::Transaction;

/// Resource Accounting's `testFinality`: every transaction in a package
/// must be final at the given height/cutoff, per spec.md §4.1.
pub fn package_is_final(transactions: &[&Transaction], height: u32, locktime_cutoff: u32) -> bool {
    transactions
        .iter()
        .all(|tx| tx.is_final_in_block(height, locktime_cutoff))
}

/// §4.3 step 5: selects the locktime cutoff the package selector and
/// coinbase scriptsig both use. Median-time-past locktime is a soft-fork
/// activated behavior elsewhere in the node; here it is a plain flag
/// supplied by the consensus collaborator.
pub fn locktime_cutoff(median_time_past_active: bool, median_time_past: u32, block_time: u32) -> u32 {
    if median_time_past_active {
        median_time_past
    } else {
        block_time
    }
}
