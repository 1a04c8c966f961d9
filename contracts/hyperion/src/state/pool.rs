use cosmwasm_std::{Order, StdResult, Storage, Uint128};
use cw_storage_plus::Map;

use crate::keys::{fee_key, parse_fee_key};
use crate::types::{EthAddress, OutgoingTransferTx};

/// (hyperion id, tx id) -> unbatched or batched transfer
pub(crate) const POOL: Map<(u64, u64), OutgoingTransferTx> = Map::new("pool");
/// (hyperion id, token, fee) -> ids of unbatched transfers paying that fee
pub(crate) const FEE_INDEX: Map<(u64, &[u8], &[u8]), Vec<u64>> = Map::new("pool_fee_index");
pub(crate) const LAST_TX_POOL_ID: Map<u64, u64> = Map::new("last_tx_pool_id");

pub fn next_tx_id(storage: &mut dyn Storage, hyperion_id: u64) -> StdResult<u64> {
    let next = LAST_TX_POOL_ID.may_load(storage, hyperion_id)?.unwrap_or_default() + 1;
    LAST_TX_POOL_ID.save(storage, hyperion_id, &next)?;
    Ok(next)
}

pub fn get_pool_entry(
    storage: &dyn Storage,
    hyperion_id: u64,
    id: u64,
) -> StdResult<Option<OutgoingTransferTx>> {
    POOL.may_load(storage, (hyperion_id, id))
}

pub fn set_pool_entry(storage: &mut dyn Storage, tx: &OutgoingTransferTx) -> StdResult<()> {
    POOL.save(storage, (tx.hyperion_id, tx.id), tx)
}

pub fn remove_pool_entry(storage: &mut dyn Storage, hyperion_id: u64, id: u64) {
    POOL.remove(storage, (hyperion_id, id));
}

/// Every pool entry, batched or not, ordered by id.
pub fn pool_entries(storage: &dyn Storage, hyperion_id: u64) -> StdResult<Vec<OutgoingTransferTx>> {
    POOL.prefix(hyperion_id)
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, tx)| tx))
        .collect()
}

fn index_key(token: &EthAddress, fee: Uint128) -> (&[u8], [u8; 16]) {
    (token.as_bytes().as_slice(), fee_key(fee))
}

/// Adds `id` behind the transfers already waiting with the same fee.
pub fn append_to_fee_index(
    storage: &mut dyn Storage,
    hyperion_id: u64,
    token: &EthAddress,
    fee: Uint128,
    id: u64,
) -> StdResult<()> {
    let (token, fee) = index_key(token, fee);
    let mut ids = FEE_INDEX
        .may_load(storage, (hyperion_id, token, &fee))?
        .unwrap_or_default();
    ids.push(id);
    FEE_INDEX.save(storage, (hyperion_id, token, &fee), &ids)
}

/// Adds `id` in front of the transfers waiting with the same fee.
pub fn prepend_to_fee_index(
    storage: &mut dyn Storage,
    hyperion_id: u64,
    token: &EthAddress,
    fee: Uint128,
    id: u64,
) -> StdResult<()> {
    let (token, fee) = index_key(token, fee);
    let mut ids = FEE_INDEX
        .may_load(storage, (hyperion_id, token, &fee))?
        .unwrap_or_default();
    ids.insert(0, id);
    FEE_INDEX.save(storage, (hyperion_id, token, &fee), &ids)
}

/// Removes `id` from the index. Returns `false` when it was not indexed.
pub fn remove_from_fee_index(
    storage: &mut dyn Storage,
    hyperion_id: u64,
    token: &EthAddress,
    fee: Uint128,
    id: u64,
) -> StdResult<bool> {
    let (token, fee) = index_key(token, fee);
    let Some(mut ids) = FEE_INDEX.may_load(storage, (hyperion_id, token, &fee))? else {
        return Ok(false);
    };
    let Some(pos) = ids.iter().position(|x| *x == id) else {
        return Ok(false);
    };
    ids.remove(pos);
    if ids.is_empty() {
        FEE_INDEX.remove(storage, (hyperion_id, token, &fee));
    } else {
        FEE_INDEX.save(storage, (hyperion_id, token, &fee), &ids)?;
    }
    Ok(true)
}

/// Unbatched transfer ids of a token as `(fee, ids)`, highest fee first.
pub fn fee_index_desc(
    storage: &dyn Storage,
    hyperion_id: u64,
    token: &EthAddress,
) -> StdResult<Vec<(Uint128, Vec<u64>)>> {
    FEE_INDEX
        .prefix((hyperion_id, token.as_bytes().as_slice()))
        .range(storage, None, None, Order::Descending)
        .map(|item| {
            let (fee, ids) = item?;
            Ok((parse_fee_key(&fee)?, ids))
        })
        .collect()
}

/// Tokens that have unbatched transfers.
pub fn tokens_with_unbatched(storage: &dyn Storage, hyperion_id: u64) -> StdResult<Vec<EthAddress>> {
    let mut tokens: Vec<EthAddress> = vec![];
    for key in FEE_INDEX
        .sub_prefix(hyperion_id)
        .keys(storage, None, None, Order::Ascending)
    {
        let (token, _) = key?;
        let token = EthAddress::from_slice(&token)
            .map_err(|e| cosmwasm_std::StdError::generic_err(e.to_string()))?;
        if tokens.last() != Some(&token) {
            tokens.push(token);
        }
    }
    Ok(tokens)
}

pub fn is_unbatched(storage: &dyn Storage, tx: &OutgoingTransferTx) -> StdResult<bool> {
    let (token, fee) = index_key(&tx.erc20_token.contract, tx.erc20_fee.amount);
    Ok(FEE_INDEX
        .may_load(storage, (tx.hyperion_id, token, &fee))?
        .is_some_and(|ids| ids.contains(&tx.id)))
}
