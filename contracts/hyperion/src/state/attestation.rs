use cosmwasm_std::{Order, StdResult, Storage};
use cw_storage_plus::{Bound, Map};

use crate::types::{Attestation, LastClaimEvent, LastObservedEthereumBlockHeight, LastObservedValset};

/// (hyperion id, event nonce, claim hash) -> attestation
pub(crate) const ATTESTATIONS: Map<(u64, u64, &[u8]), Attestation> = Map::new("attestations");
pub(crate) const LAST_OBSERVED_EVENT_NONCE: Map<u64, u64> = Map::new("last_observed_event_nonce");
pub(crate) const LAST_OBSERVED_ETH_HEIGHT: Map<u64, LastObservedEthereumBlockHeight> =
    Map::new("last_observed_eth_height");
/// (hyperion id, event nonce) -> local height its attestation was pruned at
pub(crate) const NONCE_OBSERVED: Map<(u64, u64), u64> = Map::new("nonce_observed");
/// (hyperion id, validator) -> latest claim
pub(crate) const LAST_EVENT_BY_VALIDATOR: Map<(u64, &str), LastClaimEvent> =
    Map::new("last_event_by_validator");
pub(crate) const LAST_OBSERVED_VALSET: Map<u64, LastObservedValset> =
    Map::new("last_observed_valset");

pub fn get_attestation(
    storage: &dyn Storage,
    hyperion_id: u64,
    nonce: u64,
    claim_hash: &[u8],
) -> StdResult<Option<Attestation>> {
    ATTESTATIONS.may_load(storage, (hyperion_id, nonce, claim_hash))
}

pub fn set_attestation(
    storage: &mut dyn Storage,
    nonce: u64,
    claim_hash: &[u8],
    att: &Attestation,
) -> StdResult<()> {
    ATTESTATIONS.save(storage, (att.hyperion_id, nonce, claim_hash), att)
}

pub fn delete_attestation(storage: &mut dyn Storage, hyperion_id: u64, nonce: u64, claim_hash: &[u8]) {
    ATTESTATIONS.remove(storage, (hyperion_id, nonce, claim_hash));
}

/// Attestations of a hyperion id as `(nonce, claim hash, attestation)`,
/// ordered by nonce then hash.
pub fn attestations(
    storage: &dyn Storage,
    hyperion_id: u64,
) -> StdResult<Vec<(u64, Vec<u8>, Attestation)>> {
    ATTESTATIONS
        .sub_prefix(hyperion_id)
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|((nonce, hash), att)| (nonce, hash, att)))
        .collect()
}

/// Attestations at one nonce, ordered by claim hash.
pub fn attestations_at_nonce(
    storage: &dyn Storage,
    hyperion_id: u64,
    nonce: u64,
) -> StdResult<Vec<(Vec<u8>, Attestation)>> {
    ATTESTATIONS
        .prefix((hyperion_id, nonce))
        .range(storage, None, None, Order::Ascending)
        .collect()
}

/// Most recent attestations first, up to `limit`.
pub fn latest_attestations(
    storage: &dyn Storage,
    hyperion_id: u64,
    start_before: Option<u64>,
    limit: usize,
) -> StdResult<Vec<Attestation>> {
    let empty: &[u8] = &[];
    let max = start_before.map(|nonce| Bound::exclusive((nonce, empty)));
    ATTESTATIONS
        .sub_prefix(hyperion_id)
        .range(storage, None, max, Order::Descending)
        .take(limit)
        .map(|item| item.map(|(_, att)| att))
        .collect()
}

pub fn last_observed_event_nonce(storage: &dyn Storage, hyperion_id: u64) -> StdResult<u64> {
    Ok(LAST_OBSERVED_EVENT_NONCE
        .may_load(storage, hyperion_id)?
        .unwrap_or_default())
}

pub fn last_observed_eth_height(
    storage: &dyn Storage,
    hyperion_id: u64,
) -> StdResult<LastObservedEthereumBlockHeight> {
    Ok(LAST_OBSERVED_ETH_HEIGHT
        .may_load(storage, hyperion_id)?
        .unwrap_or_default())
}

pub fn set_last_observed_eth_height(
    storage: &mut dyn Storage,
    hyperion_id: u64,
    ethereum_block_height: u64,
    cosmos_block_height: u64,
) -> StdResult<()> {
    LAST_OBSERVED_ETH_HEIGHT.save(
        storage,
        hyperion_id,
        &LastObservedEthereumBlockHeight {
            cosmos_block_height,
            ethereum_block_height,
        },
    )
}

pub fn last_event_by_validator(
    storage: &dyn Storage,
    hyperion_id: u64,
    validator: &str,
) -> StdResult<LastClaimEvent> {
    Ok(LAST_EVENT_BY_VALIDATOR
        .may_load(storage, (hyperion_id, validator))?
        .unwrap_or_default())
}

pub fn is_nonce_observed(storage: &dyn Storage, hyperion_id: u64, nonce: u64) -> bool {
    NONCE_OBSERVED.has(storage, (hyperion_id, nonce))
}
