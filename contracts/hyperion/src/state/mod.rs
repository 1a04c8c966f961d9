pub mod archive;
pub mod attestation;
pub mod batch;
pub mod config;
pub mod orchestrator;
pub mod pool;
pub mod token;
pub mod valset;

use cosmwasm_std::{Order, StdResult, Storage};

use crate::state::attestation::{
    attestations, delete_attestation, LAST_EVENT_BY_VALIDATOR, LAST_OBSERVED_ETH_HEIGHT,
    LAST_OBSERVED_EVENT_NONCE, LAST_OBSERVED_VALSET, NONCE_OBSERVED,
};
use crate::state::batch::{batches, delete_batch, LAST_BATCH_ID, LAST_SLASHED_BATCH_BLOCK};
use crate::state::config::CHAIN_PARAMS;
use crate::state::pool::{FEE_INDEX, LAST_TX_POOL_ID, POOL};
use crate::state::token::{remove_token, tokens, CONTRACT_BALANCE};
use crate::state::valset::{
    delete_valset, valsets_desc, LAST_SLASHED_VALSET_NONCE, LATEST_VALSET_NONCE, PAST_CHECKPOINTS,
};

/// Removes a bridge instance with everything stored under its hyperion id.
/// Delegate keys and orchestrator statistics are kept.
pub fn delete_chain_state(storage: &mut dyn Storage, hyperion_id: u64) -> StdResult<()> {
    for batch in batches(storage, hyperion_id)? {
        delete_batch(storage, &batch)?;
    }
    let ids: Vec<u64> = POOL
        .prefix(hyperion_id)
        .keys(storage, None, None, Order::Ascending)
        .collect::<StdResult<_>>()?;
    for id in ids {
        POOL.remove(storage, (hyperion_id, id));
    }
    let fee_keys: Vec<(Vec<u8>, Vec<u8>)> = FEE_INDEX
        .sub_prefix(hyperion_id)
        .keys(storage, None, None, Order::Ascending)
        .collect::<StdResult<_>>()?;
    for (token, fee) in fee_keys {
        FEE_INDEX.remove(storage, (hyperion_id, &token, &fee));
    }

    for vs in valsets_desc(storage, hyperion_id, None)? {
        delete_valset(storage, hyperion_id, vs.nonce)?;
    }
    let checkpoints: Vec<Vec<u8>> = PAST_CHECKPOINTS
        .prefix(hyperion_id)
        .keys(storage, None, None, Order::Ascending)
        .collect::<StdResult<_>>()?;
    for checkpoint in checkpoints {
        PAST_CHECKPOINTS.remove(storage, (hyperion_id, &checkpoint));
    }

    for (nonce, hash, _) in attestations(storage, hyperion_id)? {
        delete_attestation(storage, hyperion_id, nonce, &hash);
    }
    let nonces: Vec<u64> = NONCE_OBSERVED
        .prefix(hyperion_id)
        .keys(storage, None, None, Order::Ascending)
        .collect::<StdResult<_>>()?;
    for nonce in nonces {
        NONCE_OBSERVED.remove(storage, (hyperion_id, nonce));
    }
    let validators: Vec<String> = LAST_EVENT_BY_VALIDATOR
        .prefix(hyperion_id)
        .keys(storage, None, None, Order::Ascending)
        .collect::<StdResult<_>>()?;
    for validator in validators {
        LAST_EVENT_BY_VALIDATOR.remove(storage, (hyperion_id, &validator));
    }

    for mapping in tokens(storage, hyperion_id)? {
        remove_token(storage, hyperion_id, &mapping);
    }
    let balances: Vec<Vec<u8>> = CONTRACT_BALANCE
        .prefix(hyperion_id)
        .keys(storage, None, None, Order::Ascending)
        .collect::<StdResult<_>>()?;
    for token in balances {
        CONTRACT_BALANCE.remove(storage, (hyperion_id, &token));
    }

    for counter in [
        LAST_OBSERVED_EVENT_NONCE,
        LATEST_VALSET_NONCE,
        LAST_SLASHED_VALSET_NONCE,
        LAST_SLASHED_BATCH_BLOCK,
        LAST_BATCH_ID,
        LAST_TX_POOL_ID,
    ] {
        counter.remove(storage, hyperion_id);
    }
    LAST_OBSERVED_ETH_HEIGHT.remove(storage, hyperion_id);
    LAST_OBSERVED_VALSET.remove(storage, hyperion_id);
    archive::delete_archive(storage, hyperion_id)?;
    CHAIN_PARAMS.remove(storage, hyperion_id);
    Ok(())
}
