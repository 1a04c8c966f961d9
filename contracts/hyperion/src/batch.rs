//! Outgoing batch construction and lifecycle.

use cosmwasm_std::{Coin, Env, Event, Storage, Uint128, Uint256};
use cosmwasm_logging::{debug, error};

use crate::cache::with_storage_cache;
use crate::error::ContractError;
use crate::events::new_batch_event;
use crate::host::bank;
use crate::state::archive::archive_transfer;
use crate::state::attestation::last_observed_eth_height;
use crate::state::batch::{
    batches, batches_for_token, delete_batch, get_batch, last_batch_for_token, next_batch_nonce,
    store_batch,
};
use crate::state::config::{chain_params, CONFIG};
use crate::state::orchestrator::update_orchestrator_data;
use crate::state::pool::{
    fee_index_desc, get_pool_entry, prepend_to_fee_index, remove_from_fee_index,
    remove_pool_entry, tokens_with_unbatched,
};
use crate::state::token::token_from_address;
use crate::state::valset::store_past_checkpoint;
use crate::types::{
    BatchFees, CounterpartyChainParams, EthAddress, OutgoingTransferTx, OutgoingTxBatch,
    TransferDirection, TransferProof, TransferStatus, TransferToken, TransferTx, WithdrawClaim,
};
use crate::valset::projected_current_eth_height;

/// Fee and transfer count of the `max_elements` best paying unbatched
/// transfers of a token.
pub fn projected_batch_fee(
    storage: &dyn Storage,
    hyperion_id: u64,
    token: &EthAddress,
    max_elements: usize,
) -> Result<(Uint128, u64), ContractError> {
    let mut total = Uint128::zero();
    let mut count = 0usize;
    'outer: for (fee, ids) in fee_index_desc(storage, hyperion_id, token)? {
        for _ in ids {
            if count == max_elements {
                break 'outer;
            }
            total = total.checked_add(fee)?;
            count += 1;
        }
    }
    Ok((total, count as u64))
}

/// Builds a batch from the best paying unbatched transfers of `token`.
///
/// A new batch is refused while a pending batch of the token pays at least as
/// much as the new one would.
pub fn build_outgoing_tx_batch(
    storage: &mut dyn Storage,
    env: &Env,
    hyperion_id: u64,
    token: &EthAddress,
    max_elements: usize,
) -> Result<(OutgoingTxBatch, Event), ContractError> {
    if max_elements == 0 {
        return Err(ContractError::invalid("max elements value"));
    }
    let params = chain_params(storage, hyperion_id)?;

    if let Some(last) = last_batch_for_token(storage, hyperion_id, token)? {
        let (projected_fee, _) = projected_batch_fee(storage, hyperion_id, token, max_elements)?;
        if last.total_fee() >= projected_fee {
            return Err(ContractError::invalid(
                "new batch would not be more profitable",
            ));
        }
    }

    let mut selected: Vec<OutgoingTransferTx> = vec![];
    'outer: for (fee, ids) in fee_index_desc(storage, hyperion_id, token)? {
        for id in ids {
            if selected.len() == max_elements {
                break 'outer;
            }
            let tx = get_pool_entry(storage, hyperion_id, id)?.ok_or_else(|| {
                ContractError::Internal(format!("indexed pool transaction {id} not found"))
            })?;
            remove_from_fee_index(storage, hyperion_id, token, fee, id)?;
            selected.push(tx);
        }
    }
    if selected.is_empty() {
        return Err(ContractError::NoUnbatchedTxsFound);
    }

    let batch_nonce = next_batch_nonce(storage, hyperion_id)?;
    let projected = projected_current_eth_height(storage, env, &params)?;
    let batch = OutgoingTxBatch {
        hyperion_id,
        batch_nonce,
        batch_timeout: projected.saturating_add(
            params.target_batch_timeout / params.average_counterparty_block_time.max(1),
        ),
        transactions: selected,
        token_contract: *token,
        block: env.block.height,
    };
    store_batch(storage, &batch)?;
    store_past_checkpoint(storage, hyperion_id, &batch.checkpoint(), env.block.height)?;

    let ev = new_batch_event("hyperion_outgoing_batch", &batch)
        .add_attribute("batch_timeout", batch.batch_timeout.to_string())
        .add_attribute("total_fee", batch.total_fee().to_string());
    Ok((batch, ev))
}

/// Puts the transfers of a pending batch back in front of the pool and deletes
/// the batch.
pub fn cancel_outgoing_tx_batch(
    storage: &mut dyn Storage,
    hyperion_id: u64,
    token: &EthAddress,
    nonce: u64,
) -> Result<Event, ContractError> {
    let batch = get_batch(storage, hyperion_id, token, nonce)?
        .ok_or_else(|| ContractError::unknown(format!("batch {nonce} of {token}")))?;
    for tx in batch.transactions.iter().rev() {
        prepend_to_fee_index(
            storage,
            hyperion_id,
            &tx.erc20_token.contract,
            tx.erc20_fee.amount,
            tx.id,
        )?;
    }
    delete_batch(storage, &batch)?;
    Ok(new_batch_event("hyperion_outgoing_batch_canceled", &batch))
}

/// Finalizes a batch the counterparty chain executed.
///
/// Older pending batches of the token are canceled, the transfers are archived
/// and their fees go to the reporting orchestrator. Unknown batches are ignored.
pub fn outgoing_tx_batch_executed(
    storage: &mut dyn Storage,
    env: &Env,
    claim: &WithdrawClaim,
) -> Result<Vec<Event>, ContractError> {
    let hyperion_id = claim.hyperion_id;
    let token = &claim.token_contract;
    let Some(batch) = get_batch(storage, hyperion_id, token, claim.batch_nonce)? else {
        debug!(
            "hyperion {hyperion_id}: executed batch {} of {token} not found",
            claim.batch_nonce
        );
        return Ok(vec![]);
    };
    let params = chain_params(storage, hyperion_id)?;
    let config = CONFIG.load(storage)?;
    let denom = token_from_address(storage, hyperion_id, token)?
        .map(|m| m.denom)
        .unwrap_or_else(|| token.to_string());

    let mut events = vec![];
    for tx in &batch.transactions {
        remove_pool_entry(storage, hyperion_id, tx.id);
    }
    for older in batches_for_token(storage, hyperion_id, token)? {
        if older.batch_nonce < batch.batch_nonce {
            events.push(cancel_outgoing_tx_batch(
                storage,
                hyperion_id,
                token,
                older.batch_nonce,
            )?);
        }
    }
    delete_batch(storage, &batch)?;

    for tx in &batch.transactions {
        archive_out_transfer(storage, env, &params, tx, &denom, &config.native_fee_denom, claim)?;
    }

    let total_fee = batch.total_fee();
    bank::send(
        storage,
        &claim.orchestrator,
        vec![Coin::new(total_fee, &config.native_fee_denom)],
    )?;
    update_orchestrator_data(storage, &claim.orchestrator, hyperion_id, |data| {
        data.tx_out_complete += batch.transactions.len() as u64;
        data.fees_collected = data.fees_collected.saturating_add(total_fee);
    })?;

    events.push(
        new_batch_event("hyperion_outgoing_batch_executed", &batch)
            .add_attribute("orchestrator", &claim.orchestrator)
            .add_attribute("fees", total_fee.to_string()),
    );
    Ok(events)
}

fn archive_out_transfer(
    storage: &mut dyn Storage,
    env: &Env,
    params: &CounterpartyChainParams,
    tx: &OutgoingTransferTx,
    denom: &str,
    fee_denom: &str,
    claim: &WithdrawClaim,
) -> Result<(), ContractError> {
    archive_transfer(
        storage,
        &TransferTx {
            hyperion_id: tx.hyperion_id,
            id: tx.id,
            height: env.block.height,
            sender: tx.sender.to_string(),
            dest_address: tx.dest_address.to_string(),
            sent_token: TransferToken {
                contract: denom.to_string(),
                amount: Uint256::from(tx.erc20_token.amount),
            },
            sent_fee: TransferToken {
                contract: fee_denom.to_string(),
                amount: Uint256::from(tx.erc20_fee.amount),
            },
            received_token: TransferToken {
                contract: tx.erc20_token.contract.to_string(),
                amount: Uint256::from(tx.erc20_token.amount),
            },
            status: TransferStatus::Bridged,
            direction: TransferDirection::Out,
            chain_id: params.bridge_chain_id,
            tx_hash: claim.tx_hash.clone(),
            proof: TransferProof {
                orchestrators: vec![claim.orchestrator.clone()],
                hashes: vec![claim.tx_hash.clone()],
            },
        },
    )?;
    Ok(())
}

/// Cancels pending batches the counterparty chain can no longer execute.
pub fn cancel_timed_out_batches(
    storage: &mut dyn Storage,
    params: &CounterpartyChainParams,
) -> Result<Vec<Event>, ContractError> {
    let hyperion_id = params.hyperion_id;
    let eth_height = last_observed_eth_height(storage, hyperion_id)?.ethereum_block_height;
    let mut events = vec![];
    for batch in batches(storage, hyperion_id)? {
        if batch.batch_timeout >= eth_height {
            continue;
        }
        let canceled = with_storage_cache(storage, |cached| {
            cancel_outgoing_tx_batch(cached, hyperion_id, &batch.token_contract, batch.batch_nonce)
        });
        match canceled {
            Ok(ev) => events.push(ev),
            Err(err) if err.is_fail_stop() => return Err(err),
            Err(err) => error!(
                "hyperion {hyperion_id}: canceling timed out batch {} of {} failed: {err}",
                batch.batch_nonce, batch.token_contract
            ),
        }
    }
    Ok(events)
}

/// Fees a batch would collect per token, for tokens with unbatched transfers.
pub fn batch_fees(
    storage: &dyn Storage,
    hyperion_id: u64,
    max_elements: usize,
) -> Result<Vec<BatchFees>, ContractError> {
    tokens_with_unbatched(storage, hyperion_id)?
        .into_iter()
        .map(|token| {
            let (total_fees, tx_count) =
                projected_batch_fee(storage, hyperion_id, &token, max_elements)?;
            Ok(BatchFees {
                token,
                total_fees,
                tx_count,
            })
        })
        .collect()
}
