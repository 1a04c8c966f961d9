//! Bridge validator set management.

use cosmwasm_std::{DepsMut, Env, Event, StdResult, Storage, Uint256};
use cosmwasm_logging::debug;

use crate::error::ContractError;
use crate::host::staking;
use crate::state::attestation::{last_observed_eth_height, LAST_OBSERVED_VALSET};
use crate::state::orchestrator::eth_address_by_validator;
use crate::state::token::token_from_denom;
use crate::state::valset::{
    delete_valset, last_slashed_valset_nonce, latest_valset, latest_valset_nonce, store_valset,
    valsets_desc,
};
use crate::types::valset::{normalize_members, power_diff_exceeds_trigger};
use crate::types::{CounterpartyChainParams, EthAddress, Valset};

/// Counterparty height extrapolated from the last observed one.
///
/// Zero until an event has been observed.
pub fn projected_current_eth_height(
    storage: &dyn Storage,
    env: &Env,
    params: &CounterpartyChainParams,
) -> StdResult<u64> {
    let last = last_observed_eth_height(storage, params.hyperion_id)?;
    if last.cosmos_block_height == 0 || last.ethereum_block_height == 0 {
        return Ok(0);
    }
    let elapsed = env.block.height.saturating_sub(last.cosmos_block_height) as u128;
    let projected = elapsed * params.average_block_time as u128
        / params.average_counterparty_block_time.max(1) as u128;
    Ok(last
        .ethereum_block_height
        .saturating_add(projected.min(u64::MAX as u128) as u64))
}

/// Valset computed from the bonded validators with a registered signing key.
///
/// Validators without a key are left out of the normalization. The nonce is the
/// one the set would get if stored now.
pub fn current_valset(
    storage: &dyn Storage,
    env: &Env,
    params: &CounterpartyChainParams,
) -> Result<Valset, ContractError> {
    let hyperion_id = params.hyperion_id;
    let mut raw: Vec<(EthAddress, u64)> = vec![];
    for val in staking::bonded_validators(storage)? {
        if let Some(eth) = eth_address_by_validator(storage, hyperion_id, &val.operator)? {
            raw.push((eth, val.consensus_power));
        }
    }

    let (reward_amount, reward_token) = match &params.valset_reward {
        Some(reward) if !reward.amount.is_zero() => {
            match token_from_denom(storage, hyperion_id, &reward.denom)? {
                Some(token) => (Uint256::from(reward.amount), token.token_address),
                None => (Uint256::zero(), EthAddress::ZERO),
            }
        }
        _ => (Uint256::zero(), EthAddress::ZERO),
    };

    let nonce = latest_valset_nonce(storage, hyperion_id)?.max(params.offset_valset_nonce) + 1;
    Ok(Valset {
        hyperion_id,
        nonce,
        height: env.block.height,
        members: normalize_members(&raw),
        reward_amount,
        reward_token,
    })
}

/// Stores the current valset as a new valset request.
pub fn set_valset_request(
    storage: &mut dyn Storage,
    env: &Env,
    params: &CounterpartyChainParams,
) -> Result<(Valset, Event), ContractError> {
    let valset = current_valset(storage, env, params)?;
    store_valset(storage, &valset)?;
    let ev = Event::new("hyperion_valset_request")
        .add_attribute("hyperion_id", valset.hyperion_id.to_string())
        .add_attribute("valset_nonce", valset.nonce.to_string())
        .add_attribute("members", valset.members.len().to_string())
        .add_attribute("checkpoint", hex::encode(valset.checkpoint()));
    Ok((valset, ev))
}

/// Whether a new valset has to be requested in this block.
pub fn valset_due(
    storage: &dyn Storage,
    env: &Env,
    current: &Valset,
) -> Result<bool, ContractError> {
    if current.members.is_empty() {
        return Ok(false);
    }
    let Some(latest) = latest_valset(storage, current.hyperion_id)? else {
        return Ok(true);
    };
    if staking::last_unbonding_height(storage)? == env.block.height {
        return Ok(true);
    }
    Ok(power_diff_exceeds_trigger(&current.members, &latest.members))
}

/// Requests a new valset when one is due.
pub fn create_valsets(
    deps: &mut DepsMut,
    env: &Env,
    params: &CounterpartyChainParams,
) -> Result<Vec<Event>, ContractError> {
    let current = current_valset(deps.storage, env, params)?;
    if !valset_due(deps.storage, env, &current)? {
        return Ok(vec![]);
    }
    let (valset, ev) = set_valset_request(deps.storage, env, params)?;
    debug!(
        "hyperion {}: new valset {} with {} members",
        valset.hyperion_id,
        valset.nonce,
        valset.members.len()
    );
    Ok(vec![ev])
}

/// Deletes valsets older than the last observed one once they left the signing
/// window and were checked for missing confirms.
pub fn prune_valsets(
    deps: &mut DepsMut,
    env: &Env,
    params: &CounterpartyChainParams,
) -> Result<(), ContractError> {
    let hyperion_id = params.hyperion_id;
    let Some(observed) = LAST_OBSERVED_VALSET.may_load(deps.storage, hyperion_id)? else {
        return Ok(());
    };
    let last_slashed = last_slashed_valset_nonce(deps.storage, hyperion_id)?;
    let cutoff = env.block.height.saturating_sub(params.signed_valsets_window);
    for vs in valsets_desc(deps.storage, hyperion_id, None)? {
        if vs.nonce < observed.valset.nonce && vs.height < cutoff && vs.nonce <= last_slashed {
            delete_valset(deps.storage, hyperion_id, vs.nonce)?;
        }
    }
    Ok(())
}
