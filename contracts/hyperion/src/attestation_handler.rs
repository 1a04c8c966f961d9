//! State transitions applied when a claim gets observed.

use cosmwasm_std::{Addr, Coin, DepsMut, Env, Event, Storage, Uint128};
use cosmwasm_logging::warn;
use hyperion_bindings::{DenomMetadata, DenomUnit};

use crate::batch::outgoing_tx_batch_executed;
use crate::cache::with_cache;
use crate::error::ContractError;
use crate::host::{bank, erc20};
use crate::pool::add_to_outgoing_pool;
use crate::state::archive::is_blacklisted;
use crate::state::attestation::LAST_OBSERVED_VALSET;
use crate::state::config::chain_params;
use crate::state::token::{
    decrease_contract_balance, set_token, token_from_address, token_from_denom,
};
use crate::types::token::{hyperion_denom, DEFAULT_TOKEN_DECIMALS};
use crate::types::{
    Claim, ClaimData, ClaimDataMsg, ClaimTokenMetadata, DepositClaim, Erc20DeployedClaim,
    EthAddress, LastObservedValset, TokenAddressToDenom, Valset, ValsetUpdatedClaim,
};

pub fn handle(deps: &mut DepsMut, env: &Env, claim: &Claim) -> Result<Vec<Event>, ContractError> {
    match claim {
        Claim::Deposit(c) => handle_deposit(deps, env, c),
        Claim::Withdraw(c) => outgoing_tx_batch_executed(deps.storage, env, c),
        Claim::Erc20Deployed(c) => handle_erc20_deployed(deps.storage, c).map(|ev| vec![ev]),
        Claim::ValsetUpdated(c) => handle_valset_updated(deps.storage, c).map(|ev| vec![ev]),
    }
}

fn handle_deposit(
    deps: &mut DepsMut,
    env: &Env,
    claim: &DepositClaim,
) -> Result<Vec<Event>, ContractError> {
    let hyperion_id = claim.hyperion_id;
    let sender = EthAddress::parse(&claim.ethereum_sender)
        .map_err(|_| ContractError::InvalidEthSender(claim.ethereum_sender.clone()))?;
    let data = ClaimData::parse(&claim.data)?;

    let mut events = vec![];
    let mapping = match token_from_address(deps.storage, hyperion_id, &claim.token_contract)? {
        Some(mapping) => mapping,
        None => {
            let (mapping, ev) = register_counterparty_token(
                deps.storage,
                hyperion_id,
                &claim.token_contract,
                data.metadata.as_ref(),
            )?;
            events.push(ev);
            mapping
        }
    };

    let amount = Uint128::try_from(claim.amount)
        .map_err(|_| ContractError::SupplyOverflow(mapping.denom.clone()))?;
    let coin = Coin::new(amount, &mapping.denom);
    if mapping.is_cosmos_originated {
        decrease_contract_balance(deps.storage, hyperion_id, &mapping.token_address, amount)?;
    } else {
        bank::ensure_mintable(deps.storage, &mapping.denom, claim.amount)?;
    }

    let receiver = deps.api.addr_validate(&claim.cosmos_receiver).ok();
    let receiver = match receiver {
        Some(receiver) if !is_blacklisted(deps.storage, &sender) => receiver,
        _ => {
            // the contract takes custody and hands the coins to the community pool
            if !mapping.is_cosmos_originated {
                bank::mint(deps.storage, &coin, env.contract.address.as_str())?;
            }
            bank::fund_community_pool(deps.storage, vec![coin.clone()])?;
            events.push(
                Event::new("hyperion_deposit_diverted")
                    .add_attribute("hyperion_id", hyperion_id.to_string())
                    .add_attribute("event_nonce", claim.event_nonce.to_string())
                    .add_attribute("ethereum_sender", &claim.ethereum_sender)
                    .add_attribute("cosmos_receiver", &claim.cosmos_receiver)
                    .add_attribute("amount", coin.to_string()),
            );
            return Ok(events);
        }
    };

    let remainder = match data.data {
        Some(ClaimDataMsg::SendToChain {
            dest_hyperion_id,
            dest_address,
            amount: send_amount,
            bridge_fee,
        }) => {
            if !mapping.is_cosmos_originated {
                bank::mint(deps.storage, &coin, env.contract.address.as_str())?;
            }
            let forwarded = with_cache(deps, |cached| {
                forward_deposit(
                    cached.storage,
                    env,
                    &receiver,
                    &coin,
                    dest_hyperion_id,
                    &dest_address,
                    send_amount,
                    bridge_fee,
                )
            });
            let consumed = match forwarded {
                Ok((consumed, ev)) => {
                    events.push(ev);
                    consumed
                }
                Err(err) => {
                    warn!("hyperion {hyperion_id}: deposit {} forward failed: {err}", claim.event_nonce);
                    Uint128::zero()
                }
            };
            bank::send(
                deps.storage,
                receiver.as_str(),
                vec![Coin::new(amount - consumed, &mapping.denom)],
            )?;
            amount - consumed
        }
        None => {
            if mapping.is_cosmos_originated {
                bank::send(deps.storage, receiver.as_str(), vec![coin.clone()])?;
            } else {
                bank::mint(deps.storage, &coin, receiver.as_str())?;
            }
            amount
        }
    };

    events.push(
        Event::new("hyperion_deposit")
            .add_attribute("hyperion_id", hyperion_id.to_string())
            .add_attribute("event_nonce", claim.event_nonce.to_string())
            .add_attribute("ethereum_sender", sender.to_string())
            .add_attribute("cosmos_receiver", receiver.as_str())
            .add_attribute("amount", coin.to_string())
            .add_attribute("credited", remainder.to_string()),
    );
    Ok(events)
}

/// Sends part of a deposit, held by the contract, on to another chain on
/// behalf of the receiver. Returns how much of the deposit it used.
#[allow(clippy::too_many_arguments)]
fn forward_deposit(
    storage: &mut dyn Storage,
    env: &Env,
    receiver: &Addr,
    deposit: &Coin,
    dest_hyperion_id: u64,
    dest_address: &str,
    amount: Coin,
    bridge_fee: Coin,
) -> Result<(Uint128, Event), ContractError> {
    let dest = EthAddress::parse(dest_address)
        .map_err(|_| ContractError::InvalidEthDestination(dest_address.to_string()))?;
    if amount.denom != deposit.denom {
        return Err(ContractError::invalid("forwarded denom differs from the deposit"));
    }
    let mut consumed = amount.amount;
    if !bridge_fee.amount.is_zero() {
        if bridge_fee.denom != deposit.denom {
            return Err(ContractError::invalid(
                "forwarded bridge fee must be paid from the deposit",
            ));
        }
        consumed = consumed.checked_add(bridge_fee.amount)?;
    }
    if consumed > deposit.amount {
        return Err(ContractError::invalid("forwarded amount exceeds the deposit"));
    }
    let (_, ev) = add_to_outgoing_pool(
        storage,
        env,
        receiver,
        dest_hyperion_id,
        dest,
        amount,
        bridge_fee,
    )?;
    Ok((consumed, ev))
}

/// Creates the local denom of a counterparty token seen for the first time.
fn register_counterparty_token(
    storage: &mut dyn Storage,
    hyperion_id: u64,
    token: &EthAddress,
    metadata: Option<&ClaimTokenMetadata>,
) -> Result<(TokenAddressToDenom, Event), ContractError> {
    let denom = hyperion_denom(hyperion_id, token);
    let (name, symbol, decimals) = match metadata {
        Some(m) => (m.name.clone(), m.symbol.clone(), m.decimals),
        None => (denom.clone(), denom.clone(), DEFAULT_TOKEN_DECIMALS),
    };
    let mut denom_units = vec![DenomUnit {
        denom: denom.clone(),
        exponent: 0,
    }];
    if symbol != denom {
        denom_units.push(DenomUnit {
            denom: symbol.clone(),
            exponent: decimals,
        });
    }
    let metadata = DenomMetadata {
        description: format!("{name} bridged through hyperion {hyperion_id}"),
        denom_units,
        base: denom.clone(),
        display: symbol.clone(),
        name,
        symbol,
        decimals,
        logo: String::new(),
    };
    bank::set_denom_metadata(storage, metadata.clone())?;
    let erc20 = erc20::ensure_token_pair(storage, &metadata)?;

    let mapping = TokenAddressToDenom {
        token_address: *token,
        denom: denom.clone(),
        is_cosmos_originated: false,
    };
    set_token(storage, hyperion_id, &mapping)?;

    let ev = Event::new("hyperion_token_registered")
        .add_attribute("hyperion_id", hyperion_id.to_string())
        .add_attribute("token_contract", token.to_string())
        .add_attribute("denom", denom)
        .add_attribute("erc20", erc20.to_string());
    Ok((mapping, ev))
}

fn handle_erc20_deployed(
    storage: &mut dyn Storage,
    claim: &Erc20DeployedClaim,
) -> Result<Event, ContractError> {
    let hyperion_id = claim.hyperion_id;
    if let Some(existing) = token_from_denom(storage, hyperion_id, &claim.cosmos_denom)? {
        return Err(ContractError::invalid(format!(
            "denom {} already mapped to {}",
            claim.cosmos_denom, existing.token_address
        )));
    }
    if token_from_address(storage, hyperion_id, &claim.token_contract)?.is_some() {
        return Err(ContractError::invalid(format!(
            "token {} already mapped",
            claim.token_contract
        )));
    }
    let metadata = bank::denom_metadata(storage, &claim.cosmos_denom)?
        .ok_or_else(|| ContractError::unknown(format!("metadata of {}", claim.cosmos_denom)))?;

    if claim.name != metadata.name {
        return Err(ContractError::invalid(format!(
            "ERC20 name {} does not match denom name {}",
            claim.name, metadata.name
        )));
    }
    if claim.symbol != metadata.display {
        return Err(ContractError::invalid(format!(
            "ERC20 symbol {} does not match denom display {}",
            claim.symbol, metadata.display
        )));
    }
    let exponent = metadata.display_exponent().ok_or_else(|| {
        ContractError::invalid(format!("denom {} has no display unit", claim.cosmos_denom))
    })?;
    if claim.decimals != exponent as u64 {
        return Err(ContractError::invalid(format!(
            "ERC20 decimals {} do not match denom decimals {exponent}",
            claim.decimals
        )));
    }

    set_token(
        storage,
        hyperion_id,
        &TokenAddressToDenom {
            token_address: claim.token_contract,
            denom: claim.cosmos_denom.clone(),
            is_cosmos_originated: true,
        },
    )?;
    Ok(Event::new("hyperion_erc20_deployed")
        .add_attribute("hyperion_id", hyperion_id.to_string())
        .add_attribute("cosmos_denom", &claim.cosmos_denom)
        .add_attribute("token_contract", claim.token_contract.to_string()))
}

fn handle_valset_updated(
    storage: &mut dyn Storage,
    claim: &ValsetUpdatedClaim,
) -> Result<Event, ContractError> {
    chain_params(storage, claim.hyperion_id)?;
    let observed = LastObservedValset {
        valset: Valset {
            hyperion_id: claim.hyperion_id,
            nonce: claim.valset_nonce,
            height: claim.block_height,
            members: claim.members.clone(),
            reward_amount: claim.reward_amount,
            reward_token: claim.reward_token,
        },
        event_nonce: claim.event_nonce,
    };
    LAST_OBSERVED_VALSET.save(storage, claim.hyperion_id, &observed)?;
    Ok(Event::new("hyperion_valset_updated")
        .add_attribute("hyperion_id", claim.hyperion_id.to_string())
        .add_attribute("valset_nonce", claim.valset_nonce.to_string())
        .add_attribute("members", claim.members.len().to_string()))
}
