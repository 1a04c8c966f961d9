use std::collections::BTreeMap;

use cosmwasm_schema::cw_serde;
use cosmwasm_std::Uint256;

use crate::types::checkpoint::valset_checkpoint;
use crate::types::eth::EthAddress;

/// Upper bound of the normalized bridge power of a whole valset.
pub const MAX_NORMALIZED_POWER: u64 = u32::MAX as u64;

/// Power change (in percent) between the current and the latest stored set that
/// triggers a new valset.
pub const POWER_DIFF_TRIGGER_PERCENT: u128 = 5;

#[cw_serde]
pub struct BridgeValidator {
    pub ethereum_address: EthAddress,
    /// Normalized power, out of [`MAX_NORMALIZED_POWER`]
    pub power: u64,
}

#[cw_serde]
pub struct Valset {
    pub hyperion_id: u64,
    pub nonce: u64,
    /// Local block height the valset was created at
    pub height: u64,
    pub members: Vec<BridgeValidator>,
    pub reward_amount: Uint256,
    /// Counterparty token the relaying reward is paid in, zero when unset
    pub reward_token: EthAddress,
}

impl Valset {
    pub fn checkpoint(&self) -> [u8; 32] {
        let validators: Vec<EthAddress> =
            self.members.iter().map(|m| m.ethereum_address).collect();
        let powers: Vec<u64> = self.members.iter().map(|m| m.power).collect();
        valset_checkpoint(
            self.hyperion_id,
            self.nonce,
            &validators,
            &powers,
            self.reward_amount,
            &self.reward_token,
        )
    }

    pub fn total_power(&self) -> u64 {
        self.members.iter().map(|m| m.power).sum()
    }
}

/// Normalizes raw consensus powers so they sum to at most [`MAX_NORMALIZED_POWER`].
///
/// Members are sorted by power (descending), then by address, so every node
/// produces the same ordering.
pub fn normalize_members(raw: &[(EthAddress, u64)]) -> Vec<BridgeValidator> {
    let total: u128 = raw.iter().map(|(_, p)| *p as u128).sum();
    if total == 0 {
        return vec![];
    }
    let mut members: Vec<BridgeValidator> = raw
        .iter()
        .map(|(addr, p)| BridgeValidator {
            ethereum_address: *addr,
            power: (*p as u128 * MAX_NORMALIZED_POWER as u128 / total) as u64,
        })
        .collect();
    sort_members(&mut members);
    members
}

pub fn sort_members(members: &mut [BridgeValidator]) {
    members.sort_by(|a, b| {
        b.power
            .cmp(&a.power)
            .then_with(|| a.ethereum_address.cmp(&b.ethereum_address))
    });
}

/// Sum of absolute per-address power differences, in normalized power units.
pub fn power_diff(current: &[BridgeValidator], previous: &[BridgeValidator]) -> u128 {
    let mut powers: BTreeMap<EthAddress, (u64, u64)> = BTreeMap::new();
    for m in current {
        powers.entry(m.ethereum_address).or_default().0 += m.power;
    }
    for m in previous {
        powers.entry(m.ethereum_address).or_default().1 += m.power;
    }
    powers
        .values()
        .map(|(a, b)| a.abs_diff(*b) as u128)
        .sum()
}

/// Whether the power moved by more than [`POWER_DIFF_TRIGGER_PERCENT`].
pub fn power_diff_exceeds_trigger(current: &[BridgeValidator], previous: &[BridgeValidator]) -> bool {
    power_diff(current, previous) * 100 > POWER_DIFF_TRIGGER_PERCENT * MAX_NORMALIZED_POWER as u128
}

/// An orchestrator's signature over a valset checkpoint.
#[cw_serde]
pub struct ValsetConfirm {
    pub hyperion_id: u64,
    pub nonce: u64,
    pub orchestrator: String,
    pub eth_address: EthAddress,
    /// Hex encoded `r || s || v`
    pub signature: String,
}
