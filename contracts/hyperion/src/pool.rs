//! Pending outbound transfers.

use cosmwasm_std::{Addr, Coin, Env, Event, Storage, Uint256};
use cosmwasm_logging::{debug, error};

use crate::cache::with_storage_cache;
use crate::error::ContractError;
use crate::host::bank;
use crate::state::archive::archive_transfer;
use crate::state::config::{chain_params, CONFIG};
use crate::state::pool::{
    append_to_fee_index, get_pool_entry, is_unbatched, next_tx_id, pool_entries,
    remove_from_fee_index, remove_pool_entry, set_pool_entry,
};
use crate::state::token::{
    decrease_contract_balance, increase_contract_balance, token_from_address, token_from_denom,
};
use crate::types::{
    CounterpartyChainParams, Erc20Token, EthAddress, OutgoingTransferTx, TransferDirection,
    TransferProof, TransferStatus, TransferToken, TransferTx,
};
use crate::valset::projected_current_eth_height;

/// Whether `sender` already has an unbatched transfer on this chain.
pub fn has_pending_transfer(
    storage: &dyn Storage,
    hyperion_id: u64,
    sender: &Addr,
) -> Result<bool, ContractError> {
    for tx in pool_entries(storage, hyperion_id)? {
        if &tx.sender == sender && is_unbatched(storage, &tx)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Queues a transfer of `amount` to `dest` paying `fee` to the relayer.
///
/// Both coins must already be held by the contract. The amount is burned, or
/// locked for cosmos-originated tokens, and the fee is kept until a batch
/// carrying the transfer executes.
pub fn add_to_outgoing_pool(
    storage: &mut dyn Storage,
    env: &Env,
    sender: &Addr,
    hyperion_id: u64,
    dest: EthAddress,
    amount: Coin,
    fee: Coin,
) -> Result<(OutgoingTransferTx, Event), ContractError> {
    let params = chain_params(storage, hyperion_id)?;
    if params.paused {
        return Err(ContractError::ChainPaused(hyperion_id));
    }
    if dest.is_zero() {
        return Err(ContractError::InvalidEthDestination(dest.to_string()));
    }
    if amount.amount.is_zero() {
        return Err(ContractError::invalid("transfer amount must be positive"));
    }
    let config = CONFIG.load(storage)?;
    if fee.denom != config.native_fee_denom {
        return Err(ContractError::invalid(format!(
            "bridge fee must be paid in {}",
            config.native_fee_denom
        )));
    }
    let mapping = token_from_denom(storage, hyperion_id, &amount.denom)?.ok_or_else(|| {
        ContractError::invalid(format!(
            "denom {} is not bridged to hyperion {hyperion_id}",
            amount.denom
        ))
    })?;
    if has_pending_transfer(storage, hyperion_id, sender)? {
        return Err(ContractError::invalid(format!(
            "{sender} already has a pending transfer"
        )));
    }

    if mapping.is_cosmos_originated {
        increase_contract_balance(storage, hyperion_id, &mapping.token_address, amount.amount)?;
    } else {
        bank::burn(storage, &amount)?;
    }

    let id = next_tx_id(storage, hyperion_id)?;
    let projected = projected_current_eth_height(storage, env, &params)?;
    let tx = OutgoingTransferTx {
        hyperion_id,
        id,
        sender: sender.clone(),
        dest_address: dest,
        erc20_token: Erc20Token {
            contract: mapping.token_address,
            amount: amount.amount,
        },
        erc20_fee: Erc20Token {
            contract: mapping.token_address,
            amount: fee.amount,
        },
        tx_timeout: projected.saturating_add(
            params.target_outgoing_tx_timeout / params.average_counterparty_block_time.max(1),
        ),
        tx_hash: String::new(),
    };
    set_pool_entry(storage, &tx)?;
    append_to_fee_index(
        storage,
        hyperion_id,
        &mapping.token_address,
        fee.amount,
        id,
    )?;

    let ev = Event::new("hyperion_send_to_chain")
        .add_attribute("hyperion_id", hyperion_id.to_string())
        .add_attribute("tx_id", id.to_string())
        .add_attribute("sender", sender.as_str())
        .add_attribute("dest_address", dest.to_string())
        .add_attribute("amount", amount.to_string())
        .add_attribute("bridge_fee", fee.to_string());
    Ok((tx, ev))
}

/// Takes an unbatched transfer out of the pool and refunds its owner.
pub fn remove_from_outgoing_pool_and_refund(
    storage: &mut dyn Storage,
    env: &Env,
    hyperion_id: u64,
    tx_id: u64,
    sender: &Addr,
) -> Result<Event, ContractError> {
    let params = chain_params(storage, hyperion_id)?;
    let tx = get_pool_entry(storage, hyperion_id, tx_id)?
        .ok_or_else(|| ContractError::unknown(format!("pool transaction {tx_id}")))?;
    if &tx.sender != sender {
        return Err(ContractError::invalid(format!(
            "transfer {tx_id} does not belong to {sender}"
        )));
    }
    if tx.erc20_fee.contract != tx.erc20_token.contract {
        return Err(ContractError::invalid("fee token does not match transfer token"));
    }
    if !remove_from_fee_index(
        storage,
        hyperion_id,
        &tx.erc20_token.contract,
        tx.erc20_fee.amount,
        tx_id,
    )? {
        return Err(ContractError::invalid(format!(
            "transfer {tx_id} is part of a batch"
        )));
    }
    remove_pool_entry(storage, hyperion_id, tx_id);
    refund_transfer(storage, env, &params, &tx)
}

/// Refunds unbatched transfers whose timeout fell behind the projected
/// counterparty height.
pub fn refund_timed_out_transfers(
    storage: &mut dyn Storage,
    env: &Env,
    params: &CounterpartyChainParams,
) -> Result<Vec<Event>, ContractError> {
    let hyperion_id = params.hyperion_id;
    let projected = projected_current_eth_height(storage, env, params)?;
    let mut events = vec![];
    for tx in pool_entries(storage, hyperion_id)? {
        if tx.tx_timeout >= projected {
            continue;
        }
        let refunded = with_storage_cache(storage, |cached| -> Result<_, ContractError> {
            if !remove_from_fee_index(
                cached,
                hyperion_id,
                &tx.erc20_token.contract,
                tx.erc20_fee.amount,
                tx.id,
            )? {
                return Ok(None);
            }
            remove_pool_entry(cached, hyperion_id, tx.id);
            refund_transfer(cached, env, params, &tx).map(Some)
        });
        match refunded {
            Ok(Some(ev)) => events.push(ev),
            Ok(None) => {}
            Err(err) if err.is_fail_stop() => return Err(err),
            Err(err) => error!(
                "hyperion {hyperion_id}: refunding timed out transfer {} failed: {err}",
                tx.id
            ),
        }
    }
    if !events.is_empty() {
        debug!(
            "hyperion {hyperion_id}: refunded {} timed out transfers",
            events.len()
        );
    }
    Ok(events)
}

/// Returns amount and fee of a transfer already removed from the pool.
fn refund_transfer(
    storage: &mut dyn Storage,
    env: &Env,
    params: &CounterpartyChainParams,
    tx: &OutgoingTransferTx,
) -> Result<Event, ContractError> {
    let hyperion_id = tx.hyperion_id;
    let mapping = token_from_address(storage, hyperion_id, &tx.erc20_token.contract)?
        .ok_or_else(|| {
            ContractError::unknown(format!("token {}", tx.erc20_token.contract))
        })?;
    let config = CONFIG.load(storage)?;
    let amount = Coin::new(tx.erc20_token.amount, &mapping.denom);
    let fee = Coin::new(tx.erc20_fee.amount, &config.native_fee_denom);

    if mapping.is_cosmos_originated {
        decrease_contract_balance(storage, hyperion_id, &mapping.token_address, amount.amount)?;
        bank::send(storage, tx.sender.as_str(), vec![amount.clone()])?;
    } else {
        bank::mint(storage, &amount, tx.sender.as_str())?;
    }
    bank::send(storage, tx.sender.as_str(), vec![fee.clone()])?;

    archive_transfer(
        storage,
        &TransferTx {
            hyperion_id,
            id: tx.id,
            height: env.block.height,
            sender: tx.sender.to_string(),
            dest_address: tx.dest_address.to_string(),
            sent_token: TransferToken {
                contract: mapping.denom.clone(),
                amount: Uint256::from(amount.amount),
            },
            sent_fee: TransferToken {
                contract: fee.denom.clone(),
                amount: Uint256::from(fee.amount),
            },
            received_token: TransferToken {
                contract: mapping.denom,
                amount: Uint256::from(amount.amount),
            },
            status: TransferStatus::Failed,
            direction: TransferDirection::Out,
            chain_id: params.bridge_chain_id,
            tx_hash: tx.tx_hash.clone(),
            proof: TransferProof::default(),
        },
    )?;

    Ok(Event::new("hyperion_send_to_chain_canceled")
        .add_attribute("hyperion_id", hyperion_id.to_string())
        .add_attribute("tx_id", tx.id.to_string())
        .add_attribute("sender", tx.sender.as_str())
        .add_attribute("refund", amount.to_string())
        .add_attribute("fee_refund", fee.to_string()))
}
