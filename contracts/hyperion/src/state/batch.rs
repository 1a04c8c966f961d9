use cosmwasm_std::{Empty, Order, StdResult, Storage};
use cw_storage_plus::Map;

use crate::keys::{batch_ref, parse_batch_ref};
use crate::types::{BatchConfirm, EthAddress, OutgoingTxBatch};

/// (hyperion id, token, nonce) -> batch
pub(crate) const BATCHES: Map<(u64, &[u8], u64), OutgoingTxBatch> = Map::new("batches");
/// (hyperion id, block, token || nonce), for slashing in block order
pub(crate) const BATCH_BY_BLOCK: Map<(u64, u64, &[u8]), Empty> = Map::new("batch_by_block");
pub(crate) const LAST_SLASHED_BATCH_BLOCK: Map<u64, u64> = Map::new("last_slashed_batch_block");
/// (hyperion id, token || nonce, orchestrator) -> confirm
pub(crate) const BATCH_CONFIRMS: Map<(u64, &[u8], &str), BatchConfirm> =
    Map::new("batch_confirms");
pub(crate) const LAST_BATCH_ID: Map<u64, u64> = Map::new("last_batch_id");

pub fn get_batch(
    storage: &dyn Storage,
    hyperion_id: u64,
    token: &EthAddress,
    nonce: u64,
) -> StdResult<Option<OutgoingTxBatch>> {
    BATCHES.may_load(storage, (hyperion_id, token.as_bytes().as_slice(), nonce))
}

pub fn store_batch(storage: &mut dyn Storage, batch: &OutgoingTxBatch) -> StdResult<()> {
    let token = batch.token_contract.as_bytes().as_slice();
    BATCHES.save(storage, (batch.hyperion_id, token, batch.batch_nonce), batch)?;
    BATCH_BY_BLOCK.save(
        storage,
        (
            batch.hyperion_id,
            batch.block,
            &batch_ref(&batch.token_contract, batch.batch_nonce),
        ),
        &Empty {},
    )
}

/// Removes a batch along with its confirms.
pub fn delete_batch(storage: &mut dyn Storage, batch: &OutgoingTxBatch) -> StdResult<()> {
    let token = batch.token_contract.as_bytes().as_slice();
    let bref = batch_ref(&batch.token_contract, batch.batch_nonce);
    BATCHES.remove(storage, (batch.hyperion_id, token, batch.batch_nonce));
    BATCH_BY_BLOCK.remove(storage, (batch.hyperion_id, batch.block, &bref));
    let orchestrators: Vec<String> = BATCH_CONFIRMS
        .prefix((batch.hyperion_id, &bref))
        .keys(storage, None, None, Order::Ascending)
        .collect::<StdResult<_>>()?;
    for orchestrator in orchestrators {
        BATCH_CONFIRMS.remove(storage, (batch.hyperion_id, &bref, &orchestrator));
    }
    Ok(())
}

/// Pending batches ordered by token, then nonce.
pub fn batches(storage: &dyn Storage, hyperion_id: u64) -> StdResult<Vec<OutgoingTxBatch>> {
    BATCHES
        .sub_prefix(hyperion_id)
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, batch)| batch))
        .collect()
}

pub fn batches_for_token(
    storage: &dyn Storage,
    hyperion_id: u64,
    token: &EthAddress,
) -> StdResult<Vec<OutgoingTxBatch>> {
    BATCHES
        .prefix((hyperion_id, token.as_bytes().as_slice()))
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, batch)| batch))
        .collect()
}

/// Highest-nonce pending batch of a token.
pub fn last_batch_for_token(
    storage: &dyn Storage,
    hyperion_id: u64,
    token: &EthAddress,
) -> StdResult<Option<OutgoingTxBatch>> {
    BATCHES
        .prefix((hyperion_id, token.as_bytes().as_slice()))
        .range(storage, None, None, Order::Descending)
        .next()
        .transpose()
        .map(|item| item.map(|(_, batch)| batch))
}

pub fn next_batch_nonce(storage: &mut dyn Storage, hyperion_id: u64) -> StdResult<u64> {
    let next = LAST_BATCH_ID.may_load(storage, hyperion_id)?.unwrap_or_default() + 1;
    LAST_BATCH_ID.save(storage, hyperion_id, &next)?;
    Ok(next)
}

pub fn last_slashed_batch_block(storage: &dyn Storage, hyperion_id: u64) -> StdResult<u64> {
    Ok(LAST_SLASHED_BATCH_BLOCK
        .may_load(storage, hyperion_id)?
        .unwrap_or_default())
}

/// Batches not slashed yet that were built below `max_block`, in block order.
pub fn unslashed_batches(
    storage: &dyn Storage,
    hyperion_id: u64,
    max_block: u64,
) -> StdResult<Vec<OutgoingTxBatch>> {
    let last_slashed = last_slashed_batch_block(storage, hyperion_id)?;
    let refs: Vec<(u64, Vec<u8>)> = BATCH_BY_BLOCK
        .sub_prefix(hyperion_id)
        .keys(storage, None, None, Order::Ascending)
        .collect::<StdResult<_>>()?;
    let mut out = vec![];
    for (block, bref) in refs {
        if block <= last_slashed || block >= max_block {
            continue;
        }
        let (token, nonce) = parse_batch_ref(&bref)?;
        if let Some(batch) = get_batch(storage, hyperion_id, &token, nonce)? {
            out.push(batch);
        }
    }
    Ok(out)
}

pub fn get_batch_confirm(
    storage: &dyn Storage,
    hyperion_id: u64,
    token: &EthAddress,
    nonce: u64,
    orchestrator: &str,
) -> StdResult<Option<BatchConfirm>> {
    BATCH_CONFIRMS.may_load(storage, (hyperion_id, &batch_ref(token, nonce), orchestrator))
}

pub fn store_batch_confirm(storage: &mut dyn Storage, confirm: &BatchConfirm) -> StdResult<()> {
    BATCH_CONFIRMS.save(
        storage,
        (
            confirm.hyperion_id,
            &batch_ref(&confirm.token_contract, confirm.nonce),
            &confirm.orchestrator,
        ),
        confirm,
    )
}

pub fn batch_confirms(
    storage: &dyn Storage,
    hyperion_id: u64,
    token: &EthAddress,
    nonce: u64,
) -> StdResult<Vec<BatchConfirm>> {
    BATCH_CONFIRMS
        .prefix((hyperion_id, &batch_ref(token, nonce)))
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, confirm)| confirm))
        .collect()
}
