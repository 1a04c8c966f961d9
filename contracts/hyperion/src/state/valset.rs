use cosmwasm_std::{Order, StdResult, Storage};
use cw_storage_plus::{Bound, Map};

use crate::types::{Valset, ValsetConfirm};

/// (hyperion id, nonce) -> valset
pub(crate) const VALSETS: Map<(u64, u64), Valset> = Map::new("valsets");
pub(crate) const LATEST_VALSET_NONCE: Map<u64, u64> = Map::new("latest_valset_nonce");
pub(crate) const LAST_SLASHED_VALSET_NONCE: Map<u64, u64> = Map::new("last_slashed_valset_nonce");
/// (hyperion id, nonce, orchestrator) -> confirm
pub(crate) const VALSET_CONFIRMS: Map<(u64, u64, &str), ValsetConfirm> =
    Map::new("valset_confirms");
/// (hyperion id, checkpoint) -> local height it was stored at. Holds valset and
/// batch checkpoints alike.
pub(crate) const PAST_CHECKPOINTS: Map<(u64, &[u8]), u64> = Map::new("past_checkpoints");

pub fn get_valset(storage: &dyn Storage, hyperion_id: u64, nonce: u64) -> StdResult<Option<Valset>> {
    VALSETS.may_load(storage, (hyperion_id, nonce))
}

pub fn latest_valset_nonce(storage: &dyn Storage, hyperion_id: u64) -> StdResult<u64> {
    Ok(LATEST_VALSET_NONCE
        .may_load(storage, hyperion_id)?
        .unwrap_or_default())
}

pub fn latest_valset(storage: &dyn Storage, hyperion_id: u64) -> StdResult<Option<Valset>> {
    let nonce = latest_valset_nonce(storage, hyperion_id)?;
    if nonce == 0 {
        return Ok(None);
    }
    get_valset(storage, hyperion_id, nonce)
}

/// Stores a new valset and records its checkpoint.
pub fn store_valset(storage: &mut dyn Storage, valset: &Valset) -> StdResult<()> {
    VALSETS.save(storage, (valset.hyperion_id, valset.nonce), valset)?;
    if valset.nonce > latest_valset_nonce(storage, valset.hyperion_id)? {
        LATEST_VALSET_NONCE.save(storage, valset.hyperion_id, &valset.nonce)?;
    }
    store_past_checkpoint(storage, valset.hyperion_id, &valset.checkpoint(), valset.height)
}

pub fn delete_valset(storage: &mut dyn Storage, hyperion_id: u64, nonce: u64) -> StdResult<()> {
    VALSETS.remove(storage, (hyperion_id, nonce));
    let orchestrators: Vec<String> = VALSET_CONFIRMS
        .prefix((hyperion_id, nonce))
        .keys(storage, None, None, Order::Ascending)
        .collect::<StdResult<_>>()?;
    for orchestrator in orchestrators {
        VALSET_CONFIRMS.remove(storage, (hyperion_id, nonce, &orchestrator));
    }
    Ok(())
}

/// Valsets ordered by nonce, most recent first.
pub fn valsets_desc(
    storage: &dyn Storage,
    hyperion_id: u64,
    limit: Option<usize>,
) -> StdResult<Vec<Valset>> {
    let iter = VALSETS
        .prefix(hyperion_id)
        .range(storage, None, None, Order::Descending)
        .map(|item| item.map(|(_, vs)| vs));
    match limit {
        Some(limit) => iter.take(limit).collect(),
        None => iter.collect(),
    }
}

pub fn last_slashed_valset_nonce(storage: &dyn Storage, hyperion_id: u64) -> StdResult<u64> {
    Ok(LAST_SLASHED_VALSET_NONCE
        .may_load(storage, hyperion_id)?
        .unwrap_or_default())
}

/// Valsets not slashed yet that were created below `max_height`.
pub fn unslashed_valsets(
    storage: &dyn Storage,
    hyperion_id: u64,
    max_height: u64,
) -> StdResult<Vec<Valset>> {
    let last_slashed = last_slashed_valset_nonce(storage, hyperion_id)?;
    VALSETS
        .prefix(hyperion_id)
        .range(
            storage,
            Some(Bound::exclusive(last_slashed)),
            None,
            Order::Ascending,
        )
        .filter_map(|item| match item {
            Ok((_, vs)) if vs.height >= max_height => None,
            other => Some(other.map(|(_, vs)| vs)),
        })
        .collect()
}

pub fn get_valset_confirm(
    storage: &dyn Storage,
    hyperion_id: u64,
    nonce: u64,
    orchestrator: &str,
) -> StdResult<Option<ValsetConfirm>> {
    VALSET_CONFIRMS.may_load(storage, (hyperion_id, nonce, orchestrator))
}

pub fn store_valset_confirm(storage: &mut dyn Storage, confirm: &ValsetConfirm) -> StdResult<()> {
    VALSET_CONFIRMS.save(
        storage,
        (confirm.hyperion_id, confirm.nonce, &confirm.orchestrator),
        confirm,
    )
}

pub fn valset_confirms(
    storage: &dyn Storage,
    hyperion_id: u64,
    nonce: u64,
) -> StdResult<Vec<ValsetConfirm>> {
    VALSET_CONFIRMS
        .prefix((hyperion_id, nonce))
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, confirm)| confirm))
        .collect()
}

pub fn store_past_checkpoint(
    storage: &mut dyn Storage,
    hyperion_id: u64,
    checkpoint: &[u8; 32],
    height: u64,
) -> StdResult<()> {
    PAST_CHECKPOINTS.save(storage, (hyperion_id, checkpoint.as_slice()), &height)
}

pub fn is_past_checkpoint(storage: &dyn Storage, hyperion_id: u64, checkpoint: &[u8]) -> bool {
    PAST_CHECKPOINTS.has(storage, (hyperion_id, checkpoint))
}
