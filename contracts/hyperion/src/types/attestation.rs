use cosmwasm_schema::cw_serde;

use crate::types::claim::Claim;
use crate::types::valset::Valset;

/// A validator's vote, with the counterparty tx hash and rpc endpoint its
/// orchestrator reported.
#[cw_serde]
pub struct Vote {
    pub validator: String,
    pub tx_hash: String,
    pub rpc_used: String,
}

#[cw_serde]
pub struct Attestation {
    pub hyperion_id: u64,
    pub observed: bool,
    /// Local height of the first vote
    pub height: u64,
    pub claim: Claim,
    pub votes: Vec<Vote>,
    /// Local height the attestation was observed at
    pub observed_height: Option<u64>,
}

impl Attestation {
    pub fn has_vote_from(&self, validator: &str) -> bool {
        self.votes.iter().any(|v| v.validator == validator)
    }
}

/// Event nonce and counterparty height of the latest claim of a validator.
#[cw_serde]
#[derive(Default)]
pub struct LastClaimEvent {
    pub ethereum_event_nonce: u64,
    pub ethereum_event_height: u64,
}

/// Counterparty height of the last observed event, with the local height it was
/// observed at.
#[cw_serde]
#[derive(Default)]
pub struct LastObservedEthereumBlockHeight {
    pub cosmos_block_height: u64,
    pub ethereum_block_height: u64,
}

/// Valset last reported as active by the bridge contract.
#[cw_serde]
pub struct LastObservedValset {
    pub valset: Valset,
    pub event_nonce: u64,
}
