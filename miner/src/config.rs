//! Configuration surface from spec.md §6, collected into one struct the
//! hosting binary fills in from CLI flags (see the `duskcoind` crate's
//! `clap`-derived arguments) and passes into the assembler.

use duskcoin_network::{ConsensusParams, DEFAULT_BLOCK_MAX_WEIGHT};

/// Recognized configuration options, named exactly as spec.md §6 lists
/// them (camelCase in the spec text, `snake_case` fields here per Rust
/// convention).
#[derive(Clone, Debug)]
pub struct MinerConfig {
    /// Hard cap on the assembled block's weight; clamped into
    /// `[4000, MAX_BLOCK_WEIGHT/4]` at assembler construction regardless
    /// of what is configured here.
    pub block_max_weight: u64,
    /// Optional floor on package feerate (disabled by default; see
    /// spec.md §9 Open Question b).
    pub block_min_tx_fee: u64,
    /// Regtest-only override of the header version field.
    pub block_version: Option<u32>,
    /// Bypasses initial-block-download and tip-age gating; used for
    /// regtest/local mining.
    pub genoverride: bool,
    /// Diagnostic per-tx feerate logging during package selection.
    pub printpriority: bool,
}

impl Default for MinerConfig {
    fn default() -> Self {
        MinerConfig {
            block_max_weight: DEFAULT_BLOCK_MAX_WEIGHT,
            block_min_tx_fee: 0,
            block_version: None,
            genoverride: false,
            printpriority: false,
        }
    }
}

impl MinerConfig {
    /// Resolves the clamped weight cap this config implies for `consensus`.
    pub fn clamped_max_weight(&self, consensus: &ConsensusParams) -> u64 {
        consensus.clamp_block_max_weight(self.block_max_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duskcoin_network::Network;

    #[test]
    fn default_config_clamps_to_the_network_default() {
        let config = MinerConfig::default();
        let consensus = ConsensusParams::for_network(Network::Mainnet);
        assert_eq!(
            config.clamped_max_weight(&consensus),
            DEFAULT_BLOCK_MAX_WEIGHT
        );
    }
}
