//! Handlers of the messages orchestrators and users send.

use cosmwasm_std::{Coin, DepsMut, Env, Event, MessageInfo, Storage, Uint128};
use cosmwasm_logging::debug;
use cw_utils::NativeBalance;

use crate::attestation::attest;
use crate::batch::{build_outgoing_tx_batch, projected_batch_fee};
use crate::cache::with_cache;
use crate::error::ContractError;
use crate::evidence::{check_bad_signature_evidence, EvidenceSubject};
use crate::host::staking;
use crate::msg::BatchConfirmMsg;
use crate::pool::{add_to_outgoing_pool, remove_from_outgoing_pool_and_refund};
use crate::state::batch::{get_batch, get_batch_confirm, store_batch_confirm};
use crate::state::config::{chain_params, CONFIG};
use crate::state::orchestrator::{
    eth_address_by_validator, orchestrator_data, set_delegate_keys, update_orchestrator_data,
    validator_by_orchestrator,
};
use crate::state::token::token_from_denom;
use crate::state::valset::{get_valset, get_valset_confirm, store_valset_confirm};
use crate::types::eth::verify_signature;
use crate::types::{BatchConfirm, Claim, EthAddress, ValsetConfirm};

fn parse_eth(field: &str, addr: &str) -> Result<EthAddress, ContractError> {
    EthAddress::parse(addr).map_err(|e| ContractError::invalid(format!("{field}: {e}")))
}

fn decode_signature(sig: &str) -> Result<Vec<u8>, ContractError> {
    Ok(hex::decode(sig.trim_start_matches("0x"))?)
}

/// Validator and registered signing key behind an orchestrator.
fn delegate_of(
    storage: &dyn Storage,
    hyperion_id: u64,
    orchestrator: &str,
) -> Result<(String, EthAddress), ContractError> {
    let validator = validator_by_orchestrator(storage, hyperion_id, orchestrator)?
        .ok_or_else(|| ContractError::unknown(format!("validator for orchestrator {orchestrator}")))?;
    let eth = eth_address_by_validator(storage, hyperion_id, &validator)?.ok_or_else(|| {
        ContractError::Internal(format!("validator {validator} has no signing key"))
    })?;
    Ok((validator, eth))
}

pub fn set_orchestrator_addresses(
    deps: &mut DepsMut,
    info: &MessageInfo,
    hyperion_id: u64,
    orchestrator: &str,
    eth_address: &str,
    minimum_batch_fee: Option<Uint128>,
) -> Result<Event, ContractError> {
    chain_params(deps.storage, hyperion_id)?;
    let validator = info.sender.as_str();
    if staking::validator(deps.storage, validator)?.is_none() {
        return Err(ContractError::unknown(format!("validator {validator}")));
    }
    let orchestrator = deps.api.addr_validate(orchestrator)?;
    let eth = parse_eth("eth_address", eth_address)?;

    set_delegate_keys(deps.storage, hyperion_id, validator, orchestrator.as_str(), &eth)?;
    update_orchestrator_data(deps.storage, orchestrator.as_str(), hyperion_id, |data| {
        data.minimum_batch_fee = minimum_batch_fee.unwrap_or_default();
    })?;

    Ok(Event::new("hyperion_set_orchestrator_addresses")
        .add_attribute("hyperion_id", hyperion_id.to_string())
        .add_attribute("validator", validator)
        .add_attribute("orchestrator", orchestrator)
        .add_attribute("eth_address", eth.to_string()))
}

pub fn valset_confirm(
    storage: &mut dyn Storage,
    info: &MessageInfo,
    hyperion_id: u64,
    nonce: u64,
    eth_address: &str,
    signature: &str,
) -> Result<Event, ContractError> {
    let valset = get_valset(storage, hyperion_id, nonce)?
        .ok_or_else(|| ContractError::invalid(format!("couldn't find valset {nonce}")))?;
    let orchestrator = info.sender.as_str();
    let (_, registered) = delegate_of(storage, hyperion_id, orchestrator)?;
    let eth = parse_eth("eth_address", eth_address)?;
    if eth != registered {
        return Err(ContractError::invalid(format!(
            "signing key {eth} is not the delegate key {registered}"
        )));
    }
    verify_signature(&valset.checkpoint(), &decode_signature(signature)?, &eth)?;
    if get_valset_confirm(storage, hyperion_id, nonce, orchestrator)?.is_some() {
        return Err(ContractError::Duplicate(format!(
            "valset {nonce} already confirmed by {orchestrator}"
        )));
    }

    store_valset_confirm(
        storage,
        &ValsetConfirm {
            hyperion_id,
            nonce,
            orchestrator: orchestrator.to_string(),
            eth_address: eth,
            signature: signature.to_string(),
        },
    )?;
    Ok(Event::new("hyperion_valset_confirm")
        .add_attribute("hyperion_id", hyperion_id.to_string())
        .add_attribute("valset_nonce", nonce.to_string())
        .add_attribute("orchestrator", orchestrator))
}

pub fn confirm_batch(
    storage: &mut dyn Storage,
    info: &MessageInfo,
    msg: &BatchConfirmMsg,
) -> Result<Event, ContractError> {
    let hyperion_id = msg.hyperion_id;
    let token = parse_eth("token_contract", &msg.token_contract)?;
    let batch = get_batch(storage, hyperion_id, &token, msg.nonce)?
        .ok_or_else(|| ContractError::invalid(format!("couldn't find batch {}", msg.nonce)))?;
    let orchestrator = info.sender.as_str();
    let (_, registered) = delegate_of(storage, hyperion_id, orchestrator)?;
    let signer = parse_eth("eth_signer", &msg.eth_signer)?;
    if signer != registered {
        return Err(ContractError::invalid(format!(
            "signing key {signer} is not the delegate key {registered}"
        )));
    }
    verify_signature(&batch.checkpoint(), &decode_signature(&msg.signature)?, &signer)?;
    if get_batch_confirm(storage, hyperion_id, &token, msg.nonce, orchestrator)?.is_some() {
        return Err(ContractError::Duplicate(format!(
            "batch {} already confirmed by {orchestrator}",
            msg.nonce
        )));
    }

    store_batch_confirm(
        storage,
        &BatchConfirm {
            hyperion_id,
            nonce: msg.nonce,
            token_contract: token,
            eth_signer: signer,
            orchestrator: orchestrator.to_string(),
            signature: msg.signature.clone(),
        },
    )?;
    update_orchestrator_data(storage, orchestrator, hyperion_id, |data| {
        data.batch_confirmed += 1
    })?;
    Ok(Event::new("hyperion_batch_confirm")
        .add_attribute("hyperion_id", hyperion_id.to_string())
        .add_attribute("token_contract", token.to_string())
        .add_attribute("batch_nonce", msg.nonce.to_string())
        .add_attribute("orchestrator", orchestrator))
}

/// Confirms every batch it can. Already confirmed batches are skipped.
pub fn confirm_multiple_batches(
    deps: &mut DepsMut,
    info: &MessageInfo,
    confirms: &[BatchConfirmMsg],
) -> Result<Vec<Event>, ContractError> {
    let mut events = vec![];
    for msg in confirms {
        match with_cache(deps, |cached| confirm_batch(cached.storage, info, msg)) {
            Ok(ev) => events.push(ev),
            Err(ContractError::Duplicate(reason)) => debug!("skipping confirm: {reason}"),
            Err(err) => return Err(err),
        }
    }
    Ok(events)
}

/// Records the vote of the validator behind the sending orchestrator.
pub fn submit_claim(
    storage: &mut dyn Storage,
    env: &Env,
    info: &MessageInfo,
    claim: Claim,
) -> Result<Vec<Event>, ContractError> {
    let hyperion_id = claim.hyperion_id();
    let params = chain_params(storage, hyperion_id)?;
    if claim.orchestrator() != info.sender.as_str() {
        return Err(ContractError::InvalidSigner(format!(
            "claim orchestrator {} is not the sender {}",
            claim.orchestrator(),
            info.sender
        )));
    }
    let validator = validator_by_orchestrator(storage, hyperion_id, info.sender.as_str())?
        .ok_or_else(|| ContractError::unknown(format!("validator for orchestrator {}", info.sender)))?;
    let bonded = staking::validator(storage, &validator)?
        .map(|v| v.is_bonded())
        .unwrap_or(false);
    if !bonded {
        return Err(ContractError::InvalidSigner(format!(
            "validator {validator} is not bonded"
        )));
    }
    attest(storage, env, &params, claim, &validator)
}

/// The attached funds must be exactly `amount` plus `bridge_fee`.
fn check_funds(info: &MessageInfo, amount: &Coin, bridge_fee: &Coin) -> Result<(), ContractError> {
    let mut required = NativeBalance(vec![amount.clone(), bridge_fee.clone()]);
    required.normalize();
    let mut sent = NativeBalance(info.funds.clone());
    sent.normalize();
    if required != sent {
        return Err(ContractError::invalid(format!(
            "attached funds {sent} do not match amount plus bridge fee {required}"
        )));
    }
    Ok(())
}

pub fn send_to_chain(
    storage: &mut dyn Storage,
    env: &Env,
    info: &MessageInfo,
    dest_hyperion_id: u64,
    dest: &str,
    amount: Coin,
    bridge_fee: Coin,
) -> Result<Event, ContractError> {
    check_funds(info, &amount, &bridge_fee)?;
    let dest = EthAddress::parse(dest)
        .map_err(|_| ContractError::InvalidEthDestination(dest.to_string()))?;
    let (_, ev) = add_to_outgoing_pool(
        storage,
        env,
        &info.sender,
        dest_hyperion_id,
        dest,
        amount,
        bridge_fee,
    )?;
    Ok(ev)
}

pub fn cancel_send_to_chain(
    storage: &mut dyn Storage,
    env: &Env,
    info: &MessageInfo,
    hyperion_id: u64,
    transaction_id: u64,
) -> Result<Event, ContractError> {
    remove_from_outgoing_pool_and_refund(storage, env, hyperion_id, transaction_id, &info.sender)
}

/// Builds a batch of `denom` transfers on behalf of an orchestrator.
pub fn request_batch(
    storage: &mut dyn Storage,
    env: &Env,
    info: &MessageInfo,
    hyperion_id: u64,
    denom: &str,
) -> Result<Event, ContractError> {
    let params = chain_params(storage, hyperion_id)?;
    if params.paused {
        return Err(ContractError::ChainPaused(hyperion_id));
    }
    let mapping = token_from_denom(storage, hyperion_id, denom)?
        .ok_or_else(|| ContractError::invalid(format!("denom {denom} is not bridged")))?;
    let max_elements = CONFIG.load(storage)?.max_batch_size as usize;

    let requester = info.sender.as_str();
    let is_orchestrator = validator_by_orchestrator(storage, hyperion_id, requester)?.is_some();
    if is_orchestrator {
        let minimum = orchestrator_data(storage, requester, hyperion_id)?.minimum_batch_fee;
        if !minimum.is_zero() {
            let (fee, _) =
                projected_batch_fee(storage, hyperion_id, &mapping.token_address, max_elements)?;
            if fee < minimum {
                return Err(ContractError::invalid(format!(
                    "batch fee {fee} below the minimum {minimum} of {requester}"
                )));
            }
        }
    }

    let (_, ev) = build_outgoing_tx_batch(
        storage,
        env,
        hyperion_id,
        &mapping.token_address,
        max_elements,
    )?;
    if is_orchestrator {
        update_orchestrator_data(storage, requester, hyperion_id, |data| {
            data.batch_created += 1
        })?;
    }
    Ok(ev)
}

pub fn submit_bad_signature_evidence(
    storage: &mut dyn Storage,
    env: &Env,
    hyperion_id: u64,
    subject: &EvidenceSubject,
    signature: &str,
) -> Result<Event, ContractError> {
    check_bad_signature_evidence(storage, env, hyperion_id, subject, signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::staking::{sync_validators, tests::bonded};
    use crate::pool::tests::{send, setup_chain, FEE_DENOM, TOKEN_DENOM};
    use crate::state::batch::batch_confirms;
    use crate::state::valset::store_valset;
    use crate::types::eth::test_keys::{address, sign, signing_key};
    use crate::types::{BridgeValidator, DepositClaim, Valset};
    use assert_matches::assert_matches;
    use cosmwasm_std::testing::{message_info, mock_dependencies, mock_env, MockApi};
    use cosmwasm_std::{coin, Addr, Uint256};

    struct Keyed {
        validator: Addr,
        orchestrator: Addr,
        key: k256::ecdsa::SigningKey,
    }

    fn register(deps: &mut DepsMut, name: &str, seed: u8) -> Keyed {
        let api = MockApi::default();
        let validator = api.addr_make(name);
        let orchestrator = api.addr_make(&format!("{name}_orch"));
        let key = signing_key(seed);
        set_orchestrator_addresses(
            deps,
            &message_info(&validator, &[]),
            1,
            orchestrator.as_str(),
            &address(&key).to_string(),
            None,
        )
        .unwrap();
        Keyed {
            validator,
            orchestrator,
            key,
        }
    }

    fn valset(nonce: u64) -> Valset {
        Valset {
            hyperion_id: 1,
            nonce,
            height: 1,
            members: vec![BridgeValidator {
                ethereum_address: EthAddress::new([1; 20]),
                power: 1,
            }],
            reward_amount: Uint256::zero(),
            reward_token: EthAddress::ZERO,
        }
    }

    #[test]
    fn delegate_keys_need_a_known_validator() {
        let mut deps = mock_dependencies();
        setup_chain(&mut deps.storage);
        let stranger = deps.api.addr_make("stranger");
        let orch = deps.api.addr_make("orch");
        assert_matches!(
            set_orchestrator_addresses(
                &mut deps.as_mut(),
                &message_info(&stranger, &[]),
                1,
                orch.as_str(),
                &EthAddress::new([1; 20]).to_string(),
                None
            ),
            Err(ContractError::Unknown(_))
        );
    }

    #[test]
    fn valset_confirm_checks_signer() {
        let mut deps = mock_dependencies();
        setup_chain(&mut deps.storage);
        let env = mock_env();
        let val = deps.api.addr_make("val");
        sync_validators(&mut deps.storage, &env, vec![bonded(val.as_str(), 10)]).unwrap();
        let keyed = register(&mut deps.as_mut(), "val", 5);
        let vs = valset(1);
        store_valset(&mut deps.storage, &vs).unwrap();

        let info = message_info(&keyed.orchestrator, &[]);
        let eth = address(&keyed.key).to_string();
        let wrong = hex::encode(sign(&signing_key(6), &vs.checkpoint()));
        assert_matches!(
            valset_confirm(&mut deps.storage, &info, 1, 1, &eth, &wrong),
            Err(ContractError::EthSignature(_))
        );

        let good = hex::encode(sign(&keyed.key, &vs.checkpoint()));
        valset_confirm(&mut deps.storage, &info, 1, 1, &eth, &good).unwrap();
        assert_matches!(
            valset_confirm(&mut deps.storage, &info, 1, 1, &eth, &good),
            Err(ContractError::Duplicate(_))
        );
        assert_matches!(
            valset_confirm(&mut deps.storage, &info, 1, 2, &eth, &good),
            Err(ContractError::Invalid(_))
        );
    }

    #[test]
    fn multiple_batch_confirms_skip_duplicates() {
        let mut deps = mock_dependencies();
        setup_chain(&mut deps.storage);
        let env = mock_env();
        let val = deps.api.addr_make("val");
        sync_validators(&mut deps.storage, &env, vec![bonded(val.as_str(), 10)]).unwrap();
        let keyed = register(&mut deps.as_mut(), "val", 5);

        send(&mut deps.storage, "alice", 100, 2);
        let requester = message_info(&keyed.orchestrator, &[]);
        request_batch(&mut deps.storage, &env, &requester, 1, TOKEN_DENOM).unwrap();
        let batch = crate::state::batch::batches(&deps.storage, 1).unwrap().remove(0);

        let msg = BatchConfirmMsg {
            hyperion_id: 1,
            nonce: batch.batch_nonce,
            token_contract: batch.token_contract.to_string(),
            eth_signer: address(&keyed.key).to_string(),
            signature: hex::encode(sign(&keyed.key, &batch.checkpoint())),
        };
        let events =
            confirm_multiple_batches(&mut deps.as_mut(), &requester, &[msg.clone(), msg]).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            batch_confirms(&deps.storage, 1, &batch.token_contract, batch.batch_nonce)
                .unwrap()
                .len(),
            1
        );
        let data = orchestrator_data(&deps.storage, keyed.orchestrator.as_str(), 1).unwrap();
        assert_eq!(data.batch_created, 1);
        assert_eq!(data.batch_confirmed, 1);
    }

    #[test]
    fn minimum_batch_fee_is_enforced() {
        let mut deps = mock_dependencies();
        setup_chain(&mut deps.storage);
        let env = mock_env();
        let val = deps.api.addr_make("val");
        sync_validators(&mut deps.storage, &env, vec![bonded(val.as_str(), 10)]).unwrap();
        let orch = deps.api.addr_make("orch");
        set_orchestrator_addresses(
            &mut deps.as_mut(),
            &message_info(&val, &[]),
            1,
            orch.as_str(),
            &EthAddress::new([3; 20]).to_string(),
            Some(Uint128::new(10)),
        )
        .unwrap();
        send(&mut deps.storage, "alice", 100, 4);

        let info = message_info(&orch, &[]);
        assert_matches!(
            request_batch(&mut deps.storage, &env, &info, 1, TOKEN_DENOM),
            Err(ContractError::Invalid(_))
        );
        send(&mut deps.storage, "bob", 100, 6);
        request_batch(&mut deps.storage, &env, &info, 1, TOKEN_DENOM).unwrap();
    }

    #[test]
    fn claims_come_from_bonded_orchestrators() {
        let mut deps = mock_dependencies();
        setup_chain(&mut deps.storage);
        let env = mock_env();
        let val = deps.api.addr_make("val");
        let mut jailed = bonded(val.as_str(), 10);
        jailed.status = staking::BondStatus::Unbonded;
        sync_validators(&mut deps.storage, &env, vec![jailed]).unwrap();
        let keyed = register(&mut deps.as_mut(), "val", 5);

        let claim = |orchestrator: &Addr| {
            Claim::Deposit(DepositClaim {
                hyperion_id: 1,
                event_nonce: 1,
                block_height: 10,
                token_contract: EthAddress::new([1; 20]),
                amount: Uint256::from(5u32),
                ethereum_sender: EthAddress::new([2; 20]).to_string(),
                cosmos_receiver: "receiver".to_string(),
                orchestrator: orchestrator.to_string(),
                data: String::new(),
                tx_hash: String::new(),
                rpc_used: String::new(),
            })
        };
        let info = message_info(&keyed.orchestrator, &[]);
        let other = deps.api.addr_make("other");
        assert_matches!(
            submit_claim(&mut deps.storage, &env, &info, claim(&other)),
            Err(ContractError::InvalidSigner(_))
        );
        assert_matches!(
            submit_claim(&mut deps.storage, &env, &info, claim(&keyed.orchestrator)),
            Err(ContractError::InvalidSigner(_))
        );

        sync_validators(&mut deps.storage, &env, vec![bonded(keyed.validator.as_str(), 10)])
            .unwrap();
        let events =
            submit_claim(&mut deps.storage, &env, &info, claim(&keyed.orchestrator)).unwrap();
        assert_eq!(events[0].ty, "hyperion_deposit_claim");
    }

    #[test]
    fn send_requires_exact_funds() {
        let mut deps = mock_dependencies();
        setup_chain(&mut deps.storage);
        let env = mock_env();
        let alice = deps.api.addr_make("alice");
        let dest = EthAddress::new([9; 20]).to_string();

        let short = message_info(&alice, &[coin(10, TOKEN_DENOM)]);
        assert_matches!(
            send_to_chain(
                &mut deps.storage,
                &env,
                &short,
                1,
                &dest,
                coin(10, TOKEN_DENOM),
                coin(1, FEE_DENOM)
            ),
            Err(ContractError::Invalid(_))
        );
        let exact = message_info(&alice, &[coin(1, FEE_DENOM), coin(10, TOKEN_DENOM)]);
        let ev = send_to_chain(
            &mut deps.storage,
            &env,
            &exact,
            1,
            &dest,
            coin(10, TOKEN_DENOM),
            coin(1, FEE_DENOM),
        )
        .unwrap();
        assert_eq!(ev.ty, "hyperion_send_to_chain");
    }
}
