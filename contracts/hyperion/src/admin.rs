//! Chain management messages of the contract admin and the params admins.

use cosmwasm_std::{Coin, DepsMut, Env, Event, MessageInfo, Order, StdResult, Storage, Uint128};
use cosmwasm_logging::warn;

use crate::error::ContractError;
use crate::host::bank;
use crate::state::archive::{blacklist, revoke_blacklist};
use crate::state::attestation::{
    set_last_observed_eth_height, LAST_EVENT_BY_VALIDATOR, LAST_OBSERVED_EVENT_NONCE,
};
use crate::state::batch::batches_for_token;
use crate::state::config::{chain_params, ensure_admin, ADMIN, CHAIN_PARAMS, PARAMS};
use crate::state::delete_chain_state;
use crate::state::pool::tokens_with_unbatched;
use crate::state::token::{remove_token, set_token, token_from_address, token_from_denom};
use crate::types::params::MAX_CHAIN_NAME_LEN;
use crate::types::{CounterpartyChainParams, EthAddress, Params, TokenAddressToDenom};

fn admin_event(action: &str, hyperion_id: u64) -> Event {
    Event::new(format!("hyperion_{action}")).add_attribute("hyperion_id", hyperion_id.to_string())
}

fn parse_eth(addr: &str) -> Result<EthAddress, ContractError> {
    EthAddress::parse(addr).map_err(|e| ContractError::invalid(e.to_string()))
}

/// Stores the params of a new chain and its default token mappings.
pub(crate) fn register_chain(
    deps: &mut DepsMut,
    env: &Env,
    params: &CounterpartyChainParams,
) -> Result<(), ContractError> {
    params.validate()?;
    let hyperion_id = params.hyperion_id;
    if CHAIN_PARAMS.has(deps.storage, hyperion_id) {
        return Err(ContractError::Duplicate(format!(
            "hyperion id {hyperion_id} already exists"
        )));
    }
    CHAIN_PARAMS.save(deps.storage, hyperion_id, params)?;
    for token in &params.default_tokens {
        set_token(
            deps.storage,
            hyperion_id,
            &TokenAddressToDenom {
                token_address: token.token_address,
                denom: token.denom.clone(),
                is_cosmos_originated: token.is_cosmos_originated,
            },
        )?;
    }
    if params.bridge_contract_start_height > 0 {
        set_last_observed_eth_height(
            deps.storage,
            hyperion_id,
            params.bridge_contract_start_height,
            env.block.height,
        )?;
    }
    Ok(())
}

/// Only the contract admin may add chains.
pub fn add_counterparty_chain_params(
    deps: &mut DepsMut,
    env: &Env,
    info: &MessageInfo,
    params: &CounterpartyChainParams,
) -> Result<Event, ContractError> {
    ADMIN.assert_admin(deps.as_ref(), &info.sender)?;
    register_chain(deps, env, params)?;
    Ok(admin_event("add_counterparty_chain", params.hyperion_id)
        .add_attribute("bridge_chain_id", params.bridge_chain_id.to_string()))
}

pub fn update_counterparty_chain_params(
    deps: &mut DepsMut,
    info: &MessageInfo,
    params: &CounterpartyChainParams,
) -> Result<Event, ContractError> {
    ensure_admin(deps.as_ref(), &info.sender)?;
    chain_params(deps.storage, params.hyperion_id)?;
    params.validate()?;
    CHAIN_PARAMS.save(deps.storage, params.hyperion_id, params)?;
    Ok(admin_event("update_counterparty_chain", params.hyperion_id))
}

pub fn update_params(
    deps: &mut DepsMut,
    info: &MessageInfo,
    admins: &[String],
) -> Result<Event, ContractError> {
    ensure_admin(deps.as_ref(), &info.sender)?;
    let admins = admins
        .iter()
        .map(|a| deps.api.addr_validate(a))
        .collect::<StdResult<Vec<_>>>()?;
    PARAMS.save(deps.storage, &Params { admins })?;
    Ok(Event::new("hyperion_update_params"))
}

pub fn delete_counterparty_chain(
    deps: &mut DepsMut,
    info: &MessageInfo,
    hyperion_id: u64,
) -> Result<Event, ContractError> {
    ensure_admin(deps.as_ref(), &info.sender)?;
    chain_params(deps.storage, hyperion_id)?;
    delete_chain_state(deps.storage, hyperion_id)?;
    warn!("hyperion {hyperion_id} deleted by {}", info.sender);
    Ok(admin_event("delete_counterparty_chain", hyperion_id))
}

/// Applies `f` to the params of a chain.
fn update_chain(
    deps: &mut DepsMut,
    info: &MessageInfo,
    hyperion_id: u64,
    f: impl FnOnce(&mut CounterpartyChainParams) -> Result<(), ContractError>,
) -> Result<(), ContractError> {
    ensure_admin(deps.as_ref(), &info.sender)?;
    let mut params = chain_params(deps.storage, hyperion_id)?;
    f(&mut params)?;
    CHAIN_PARAMS.save(deps.storage, hyperion_id, &params)?;
    Ok(())
}

pub fn set_paused(
    deps: &mut DepsMut,
    info: &MessageInfo,
    hyperion_id: u64,
    paused: bool,
) -> Result<Event, ContractError> {
    update_chain(deps, info, hyperion_id, |params| {
        params.paused = paused;
        Ok(())
    })?;
    let action = if paused { "pause_chain" } else { "unpause_chain" };
    Ok(admin_event(action, hyperion_id))
}

pub fn update_chain_logo(
    deps: &mut DepsMut,
    info: &MessageInfo,
    hyperion_id: u64,
    logo: &str,
) -> Result<Event, ContractError> {
    update_chain(deps, info, hyperion_id, |params| {
        params.bridge_chain_logo = logo.to_string();
        Ok(())
    })?;
    Ok(admin_event("update_chain_logo", hyperion_id))
}

pub fn update_chain_name(
    deps: &mut DepsMut,
    info: &MessageInfo,
    hyperion_id: u64,
    name: &str,
) -> Result<Event, ContractError> {
    update_chain(deps, info, hyperion_id, |params| {
        if name.len() > MAX_CHAIN_NAME_LEN {
            return Err(ContractError::invalid("bridge chain name too long"));
        }
        params.bridge_chain_name = name.to_string();
        Ok(())
    })?;
    Ok(admin_event("update_chain_name", hyperion_id).add_attribute("name", name))
}

/// Forces the last observed event. Validators resume from it.
pub fn set_last_observed_nonce(
    deps: &mut DepsMut,
    env: &Env,
    info: &MessageInfo,
    hyperion_id: u64,
    nonce: u64,
    eth_height: u64,
) -> Result<Event, ContractError> {
    ensure_admin(deps.as_ref(), &info.sender)?;
    chain_params(deps.storage, hyperion_id)?;
    LAST_OBSERVED_EVENT_NONCE.save(deps.storage, hyperion_id, &nonce)?;
    set_last_observed_eth_height(deps.storage, hyperion_id, eth_height, env.block.height)?;

    let validators: Vec<String> = LAST_EVENT_BY_VALIDATOR
        .prefix(hyperion_id)
        .keys(deps.storage, None, None, Order::Ascending)
        .collect::<StdResult<_>>()?;
    for validator in validators {
        LAST_EVENT_BY_VALIDATOR.remove(deps.storage, (hyperion_id, &validator));
    }
    Ok(admin_event("set_last_observed_nonce", hyperion_id)
        .add_attribute("nonce", nonce.to_string())
        .add_attribute("eth_height", eth_height.to_string()))
}

/// Links `denom` with a counterparty token, replacing the previous mappings of
/// both.
pub fn set_token_to_chain(
    deps: &mut DepsMut,
    info: &MessageInfo,
    hyperion_id: u64,
    token_address: &str,
    denom: &str,
    is_cosmos_originated: bool,
) -> Result<Event, ContractError> {
    ensure_admin(deps.as_ref(), &info.sender)?;
    chain_params(deps.storage, hyperion_id)?;
    let token = parse_eth(token_address)?;
    let linked = TokenAddressToDenom {
        token_address: token,
        denom: denom.to_string(),
        is_cosmos_originated,
    };
    let replaced = [
        token_from_denom(deps.storage, hyperion_id, denom)?,
        token_from_address(deps.storage, hyperion_id, &token)?,
    ];
    for old in replaced.iter().flatten() {
        if *old != linked {
            ensure_token_idle(deps.storage, hyperion_id, &old.token_address)?;
        }
    }
    for old in replaced.iter().flatten() {
        remove_token(deps.storage, hyperion_id, old);
    }
    set_token(deps.storage, hyperion_id, &linked)?;
    Ok(admin_event("set_token_to_chain", hyperion_id)
        .add_attribute("token_contract", token.to_string())
        .add_attribute("denom", denom))
}

pub fn remove_token_from_chain(
    deps: &mut DepsMut,
    info: &MessageInfo,
    hyperion_id: u64,
    denom: &str,
) -> Result<Event, ContractError> {
    ensure_admin(deps.as_ref(), &info.sender)?;
    let mapping = token_from_denom(deps.storage, hyperion_id, denom)?
        .ok_or_else(|| ContractError::unknown(format!("token for denom {denom}")))?;
    ensure_token_idle(deps.storage, hyperion_id, &mapping.token_address)?;
    remove_token(deps.storage, hyperion_id, &mapping);
    Ok(admin_event("remove_token_from_chain", hyperion_id).add_attribute("denom", denom))
}

/// Pending transfers and batches of a token need its mapping to be refunded
/// or executed.
fn ensure_token_idle(
    storage: &dyn Storage,
    hyperion_id: u64,
    token: &EthAddress,
) -> Result<(), ContractError> {
    if tokens_with_unbatched(storage, hyperion_id)?.contains(token)
        || !batches_for_token(storage, hyperion_id, token)?.is_empty()
    {
        return Err(ContractError::invalid(format!(
            "token {token} has pending transfers"
        )));
    }
    Ok(())
}

fn minted_token(
    storage: &dyn Storage,
    hyperion_id: u64,
    token_address: &str,
) -> Result<TokenAddressToDenom, ContractError> {
    let token = parse_eth(token_address)?;
    let mapping = token_from_address(storage, hyperion_id, &token)?
        .ok_or_else(|| ContractError::unknown(format!("token {token}")))?;
    if mapping.is_cosmos_originated {
        return Err(ContractError::invalid(format!(
            "{} is cosmos originated",
            mapping.denom
        )));
    }
    Ok(mapping)
}

pub fn mint_token(
    deps: &mut DepsMut,
    info: &MessageInfo,
    hyperion_id: u64,
    token_address: &str,
    amount: Uint128,
    receiver: &str,
) -> Result<Event, ContractError> {
    ensure_admin(deps.as_ref(), &info.sender)?;
    let mapping = minted_token(deps.storage, hyperion_id, token_address)?;
    let receiver = deps.api.addr_validate(receiver)?;
    let coin = Coin::new(amount, &mapping.denom);
    bank::mint(deps.storage, &coin, receiver.as_str())?;
    Ok(admin_event("mint_token", hyperion_id)
        .add_attribute("amount", coin.to_string())
        .add_attribute("receiver", receiver))
}

/// Burns the attached coins of a counterparty token.
pub fn burn_token(
    deps: &mut DepsMut,
    info: &MessageInfo,
    hyperion_id: u64,
    token_address: &str,
) -> Result<Event, ContractError> {
    ensure_admin(deps.as_ref(), &info.sender)?;
    let mapping = minted_token(deps.storage, hyperion_id, token_address)?;
    let amount = cw_utils::must_pay(info, &mapping.denom)?;
    let coin = Coin::new(amount, &mapping.denom);
    bank::burn(deps.storage, &coin)?;
    Ok(admin_event("burn_token", hyperion_id).add_attribute("amount", coin.to_string()))
}

pub fn blacklist_addresses(
    deps: &mut DepsMut,
    info: &MessageInfo,
    addresses: &[String],
    revoke: bool,
) -> Result<Event, ContractError> {
    ensure_admin(deps.as_ref(), &info.sender)?;
    let addresses = addresses
        .iter()
        .map(|a| parse_eth(a))
        .collect::<Result<Vec<_>, _>>()?;
    for addr in &addresses {
        if revoke {
            revoke_blacklist(deps.storage, addr);
        } else {
            blacklist(deps.storage, addr)?;
        }
    }
    let ty = if revoke {
        "hyperion_revoke_blacklist"
    } else {
        "hyperion_blacklist"
    };
    Ok(Event::new(ty).add_attribute("count", addresses.len().to_string()))
}
