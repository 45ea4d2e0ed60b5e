use crate::network::Network;
use crate::reward::RewardSplit;

/// Hard ceiling on block weight; the assembler's configured weight cap is
/// clamped into `[4000, MAX_BLOCK_WEIGHT / 4]` regardless of what the
/// operator requests.
pub const MAX_BLOCK_WEIGHT: u64 = 4_000_000;
pub const DEFAULT_BLOCK_MAX_WEIGHT: u64 = 3_000_000;
pub const DEFAULT_MAX_SIGOP_COST: u64 = 80_000;

/// Cap applied to the carried-forward network-reward reserve (§4.3 step 7).
pub const MAX_NETWORK_REWARD: u64 = 10_000_000_000;

/// Consensus-parameterized values the block assembler and miner driver
/// depend on. Grounded on the teacher's `network::ConsensusParams`, which
/// plays the same role for segwit/overwinter/sapling activation heights —
/// here it carries the reward-schedule and weight-cap knobs this spec's
/// consensus collaborator needs instead.
#[derive(Clone, Debug)]
pub struct ConsensusParams {
    pub network: Network,
    pub max_block_weight: u64,
    pub max_sigop_cost: u64,
    pub pos_start_height: u32,
    pub founder_reward_last_height: u32,
    pub budget_start_height: u32,
    pub lab_reward_basis_points: u32,
    pub founder_reward_basis_points: u32,
    pub budget_reward_basis_points: u32,
}

impl ConsensusParams {
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Mainnet => ConsensusParams {
                network,
                max_block_weight: DEFAULT_BLOCK_MAX_WEIGHT,
                max_sigop_cost: DEFAULT_MAX_SIGOP_COST,
                pos_start_height: 200_000,
                founder_reward_last_height: 1_000_000,
                budget_start_height: 500_000,
                lab_reward_basis_points: 500,
                founder_reward_basis_points: 1000,
                budget_reward_basis_points: 1000,
            },
            Network::Testnet => ConsensusParams {
                network,
                max_block_weight: DEFAULT_BLOCK_MAX_WEIGHT,
                max_sigop_cost: DEFAULT_MAX_SIGOP_COST,
                pos_start_height: 1_000,
                founder_reward_last_height: 10_000,
                budget_start_height: 5_000,
                lab_reward_basis_points: 500,
                founder_reward_basis_points: 1000,
                budget_reward_basis_points: 1000,
            },
            Network::Regtest => ConsensusParams {
                network,
                max_block_weight: DEFAULT_BLOCK_MAX_WEIGHT,
                max_sigop_cost: DEFAULT_MAX_SIGOP_COST,
                pos_start_height: 0,
                founder_reward_last_height: 0,
                budget_start_height: 0,
                lab_reward_basis_points: 500,
                founder_reward_basis_points: 1000,
                budget_reward_basis_points: 1000,
            },
        }
    }

    /// Clamps a configured block-weight cap into `[4000, MAX_BLOCK_WEIGHT/4]`,
    /// unconditionally, regardless of what was requested — spec.md §6.
    pub fn clamp_block_max_weight(&self, requested: u64) -> u64 {
        requested.clamp(4000, MAX_BLOCK_WEIGHT / 4)
    }

    /// `ComputeBlockVersion` — stubbed as a constant current version; real
    /// soft-fork version-bit signaling is consensus-rule territory and out
    /// of scope for the assembler.
    pub fn compute_block_version(&self, _previous_height: u32) -> u32 {
        4
    }

    pub fn is_pos_active(&self, height: u32) -> bool {
        height >= self.pos_start_height
    }

    /// `budget_schedule` — pure function of height over the era boundaries
    /// configured above. See SPEC_FULL.md §4.3.1 for the Open Question
    /// decision this implements: founder share is a fixed basis-point cut
    /// active only up to `founder_reward_last_height`, lab share is active
    /// for the life of the chain, budget share switches on at
    /// `budget_start_height`. All three are basis points of the gross
    /// subsidy; the returned `block_reward` is already net of them, so
    /// spec.md §4.3 step 11's "miner output value = blockReward +
    /// networkReward" is correct to apply directly without any further
    /// subtraction.
    pub fn budget_schedule(&self, height: u32, gross_reward: u64) -> RewardSplit {
        let lab_payment = bps(gross_reward, self.lab_reward_basis_points);
        let founder_payment = if height <= self.founder_reward_last_height {
            bps(gross_reward, self.founder_reward_basis_points)
        } else {
            0
        };
        let budget_payment = if height >= self.budget_start_height {
            bps(gross_reward, self.budget_reward_basis_points)
        } else {
            0
        };
        let block_reward = gross_reward
            .saturating_sub(founder_payment)
            .saturating_sub(lab_payment)
            .saturating_sub(budget_payment);
        RewardSplit {
            block_reward,
            founder_payment,
            lab_payment,
            budget_payment,
            network_reward: 0,
        }
    }
}

fn bps(amount: u64, basis_points: u32) -> u64 {
    amount.saturating_mul(basis_points as u64) / 10_000
}

/// Starting block subsidy, before any reward-split deduction. Halves
/// every `SUBSIDY_HALVING_INTERVAL` blocks, the way the teacher's own
/// subsidy schedule (and the chains it descends from) compute issuance.
pub const INITIAL_BLOCK_SUBSIDY: u64 = 5_000_000_000;
pub const SUBSIDY_HALVING_INTERVAL: u32 = 210_000;

/// Gross per-block subsidy at `height`, before founder/lab/budget cuts
/// and before adding collected fees. The block assembler feeds
/// `block_subsidy(height) + collected_fees` into `budget_schedule` as
/// its `gross_reward` argument.
pub fn block_subsidy(height: u32) -> u64 {
    let halvings = height / SUBSIDY_HALVING_INTERVAL;
    if halvings >= 64 {
        0
    } else {
        INITIAL_BLOCK_SUBSIDY >> halvings
    }
}
