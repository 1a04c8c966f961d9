//! Vote recording and tallying of counterparty claims.

use std::collections::BTreeSet;

use cosmwasm_std::{DepsMut, Env, Event, Storage};
use cosmwasm_logging::{debug, error};

use crate::attestation_handler;
use crate::cache::with_cache;
use crate::error::ContractError;
use crate::events::{new_claim_event, new_observed_event, new_vote_event};
use crate::host::staking;
use crate::state::archive::archive_transfer;
use crate::state::attestation::{
    attestations, delete_attestation, get_attestation, is_nonce_observed,
    last_event_by_validator, last_observed_eth_height, last_observed_event_nonce,
    set_attestation, set_last_observed_eth_height, LAST_EVENT_BY_VALIDATOR,
    LAST_OBSERVED_EVENT_NONCE, NONCE_OBSERVED,
};
use crate::state::config::CHAIN_PARAMS;
use crate::state::orchestrator::orchestrator_by_validator;
use crate::types::params::MAX_RPCS;
use crate::types::{
    Attestation, Claim, CounterpartyChainParams, LastClaimEvent, Rpc, TransferDirection,
    TransferProof, TransferStatus, TransferToken, TransferTx, Vote,
};

/// Share of the total bonded power, in percent, needed to observe a claim.
pub const ATTESTATION_THRESHOLD_PERCENT: u128 = 66;

pub fn required_power(total_power: u64) -> u64 {
    (total_power as u128 * ATTESTATION_THRESHOLD_PERCENT / 100) as u64
}

/// Last claim of a validator. A validator that never voted starts from the
/// last observed event.
pub fn validator_last_event(
    storage: &dyn Storage,
    hyperion_id: u64,
    validator: &str,
) -> Result<LastClaimEvent, ContractError> {
    let last = last_event_by_validator(storage, hyperion_id, validator)?;
    if last.ethereum_event_nonce != 0 || last.ethereum_event_height != 0 {
        return Ok(last);
    }
    Ok(LastClaimEvent {
        ethereum_event_nonce: last_observed_event_nonce(storage, hyperion_id)?,
        ethereum_event_height: last_observed_eth_height(storage, hyperion_id)?
            .ethereum_block_height,
    })
}

/// Records the vote of `validator` on `claim`.
///
/// Tallying happens at the end of the block.
pub fn attest(
    storage: &mut dyn Storage,
    env: &Env,
    params: &CounterpartyChainParams,
    claim: Claim,
    validator: &str,
) -> Result<Vec<Event>, ContractError> {
    let hyperion_id = params.hyperion_id;
    let nonce = claim.event_nonce();

    if params.enforce_event_nonce_contiguity {
        let last = validator_last_event(storage, hyperion_id, validator)?;
        if nonce != last.ethereum_event_nonce + 1 {
            return Err(ContractError::NonContiguousEventNonce {
                expected: last.ethereum_event_nonce + 1,
                actual: nonce,
            });
        }
        if claim.block_height() < last.ethereum_event_height {
            return Err(ContractError::NonContiguousEthEventBlockHeight {
                last: last.ethereum_event_height,
                actual: claim.block_height(),
            });
        }
    }

    if is_nonce_observed(storage, hyperion_id, nonce) {
        return Err(ContractError::AttestationAlreadyObserved(nonce));
    }

    let hash = claim.claim_hash();
    let mut events = vec![];
    let mut att = match get_attestation(storage, hyperion_id, nonce, &hash)? {
        Some(att) => att,
        None => {
            events.push(new_claim_event(&claim, &hash));
            Attestation {
                hyperion_id,
                observed: false,
                height: env.block.height,
                claim: claim.clone(),
                votes: vec![],
                observed_height: None,
            }
        }
    };
    if att.observed {
        return Err(ContractError::AttestationAlreadyObserved(nonce));
    }
    if env.block.height >= params.duplicate_vote_check_height && att.has_vote_from(validator) {
        return Err(ContractError::AttestationAlreadyVoted(validator.to_string()));
    }

    att.votes.push(Vote {
        validator: validator.to_string(),
        tx_hash: claim.tx_hash().to_string(),
        rpc_used: claim.rpc_used().to_string(),
    });
    set_attestation(storage, nonce, &hash, &att)?;
    LAST_EVENT_BY_VALIDATOR.save(
        storage,
        (hyperion_id, validator),
        &LastClaimEvent {
            ethereum_event_nonce: nonce,
            ethereum_event_height: claim.block_height(),
        },
    )?;

    events.push(new_vote_event(&att, &hash, validator));
    Ok(events)
}

/// Observes the attestation when its voters hold enough of the current bonded
/// power, then applies the claim.
///
/// The claim is applied in a cache context. A failing claim is logged and
/// discarded while the attestation stays observed.
pub fn try_attestation(
    deps: &mut DepsMut,
    env: &Env,
    claim_hash: &[u8],
    mut att: Attestation,
) -> Result<Vec<Event>, ContractError> {
    if att.observed {
        return Ok(vec![]);
    }
    let hyperion_id = att.hyperion_id;
    let nonce = att.claim.event_nonce();
    // another claim at this nonce won already
    if is_nonce_observed(deps.storage, hyperion_id, nonce) {
        return Ok(vec![]);
    }
    let total_power = staking::last_total_power(deps.storage)?;
    if total_power == 0 {
        return Ok(vec![]);
    }
    let required = required_power(total_power);
    let mut voted = 0u64;
    for vote in &att.votes {
        voted = voted.saturating_add(staking::last_validator_power(deps.storage, &vote.validator)?);
    }
    if voted < required {
        return Ok(vec![]);
    }

    att.observed = true;
    att.observed_height = Some(env.block.height);
    set_attestation(deps.storage, nonce, claim_hash, &att)?;

    if nonce > last_observed_event_nonce(deps.storage, hyperion_id)? {
        LAST_OBSERVED_EVENT_NONCE.save(deps.storage, hyperion_id, &nonce)?;
        set_last_observed_eth_height(
            deps.storage,
            hyperion_id,
            att.claim.block_height(),
            env.block.height,
        )?;
    }
    NONCE_OBSERVED.save(deps.storage, (hyperion_id, nonce), &env.block.height)?;
    credit_rpcs(deps.storage, &att)?;

    let claim = att.claim.clone();
    let mut events = vec![];
    let handled = with_cache(deps, |cached| attestation_handler::handle(cached, env, &claim));
    let ok = match handled {
        Ok(handler_events) => {
            events.extend(handler_events);
            true
        }
        Err(err) => {
            error!(
                "hyperion {hyperion_id}: {} claim at nonce {nonce} failed: {err}",
                claim.claim_type().as_str()
            );
            false
        }
    };
    events.insert(0, new_observed_event(&att, claim_hash, ok));
    Ok(events)
}

/// Tallies every pending attestation of a chain, in nonce order.
pub fn tally_attestations(
    deps: &mut DepsMut,
    env: &Env,
    params: &CounterpartyChainParams,
) -> Result<Vec<Event>, ContractError> {
    let mut events = vec![];
    for (nonce, hash, att) in attestations(deps.storage, params.hyperion_id)? {
        if att.observed {
            continue;
        }
        if att.claim.event_nonce() != nonce {
            return Err(ContractError::Internal(format!(
                "attestation stored at nonce {nonce} holds nonce {}",
                att.claim.event_nonce()
            )));
        }
        events.extend(try_attestation(deps, env, &hash, att)?);
    }
    Ok(events)
}

/// Deletes observed attestations behind the last observed nonce once their
/// retention elapsed, along with the claims that lost at those nonces. Observed deposits are archived on the way out.
pub fn prune_attestations(
    deps: &mut DepsMut,
    env: &Env,
    params: &CounterpartyChainParams,
) -> Result<u64, ContractError> {
    let hyperion_id = params.hyperion_id;
    let last_nonce = last_observed_event_nonce(deps.storage, hyperion_id)?;
    let mut pruned = 0;
    for (nonce, hash, att) in attestations(deps.storage, hyperion_id)? {
        if nonce >= last_nonce {
            break;
        }
        if !att.observed {
            // lost to another claim at an observed nonce
            if is_nonce_observed(deps.storage, hyperion_id, nonce) {
                delete_attestation(deps.storage, hyperion_id, nonce, &hash);
                pruned += 1;
            }
            continue;
        }
        let observed_at = att.observed_height.unwrap_or(att.height);
        if env.block.height < observed_at.saturating_add(params.attestation_retention_blocks) {
            continue;
        }
        if let Claim::Deposit(deposit) = &att.claim {
            let mut proof = TransferProof::default();
            for vote in &att.votes {
                let orchestrator = orchestrator_by_validator(deps.storage, hyperion_id, &vote.validator)?
                    .unwrap_or_else(|| vote.validator.clone());
                proof.orchestrators.push(orchestrator);
                proof.hashes.push(vote.tx_hash.clone());
            }
            let token = TransferToken {
                contract: deposit.token_contract.to_string(),
                amount: deposit.amount,
            };
            archive_transfer(
                deps.storage,
                &TransferTx {
                    hyperion_id,
                    id: nonce,
                    height: observed_at,
                    sender: deposit.ethereum_sender.clone(),
                    dest_address: deposit.cosmos_receiver.clone(),
                    sent_token: token.clone(),
                    sent_fee: TransferToken {
                        contract: deposit.token_contract.to_string(),
                        amount: Default::default(),
                    },
                    received_token: token,
                    status: TransferStatus::Bridged,
                    direction: TransferDirection::In,
                    chain_id: params.bridge_chain_id,
                    tx_hash: deposit.tx_hash.clone(),
                    proof,
                },
            )?;
        }
        delete_attestation(deps.storage, hyperion_id, nonce, &hash);
        pruned += 1;
    }
    if pruned > 0 {
        debug!("hyperion {hyperion_id}: pruned {pruned} attestations");
    }
    Ok(pruned)
}

/// Credits the https endpoints the voters of an observed attestation used.
fn credit_rpcs(storage: &mut dyn Storage, att: &Attestation) -> Result<(), ContractError> {
    let urls: BTreeSet<&str> = att
        .votes
        .iter()
        .map(|v| v.rpc_used.as_str())
        .filter(|url| url.starts_with("https://"))
        .collect();
    if urls.is_empty() {
        return Ok(());
    }
    let Some(mut params) = CHAIN_PARAMS.may_load(storage, att.hyperion_id)? else {
        return Ok(());
    };
    let height = att.claim.block_height();
    for url in urls {
        match params.rpcs.iter_mut().find(|rpc| rpc.url == url) {
            Some(rpc) => {
                rpc.reputation += 1;
                rpc.last_height_used = rpc.last_height_used.max(height);
            }
            None => params.rpcs.push(Rpc {
                url: url.to_string(),
                reputation: 1,
                last_height_used: height,
            }),
        }
    }
    params
        .rpcs
        .sort_by(|a, b| b.last_height_used.cmp(&a.last_height_used).then_with(|| a.url.cmp(&b.url)));
    params.rpcs.truncate(MAX_RPCS);
    CHAIN_PARAMS.save(storage, att.hyperion_id, &params)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::erc20::token_pair;
    use crate::host::staking::sync_validators;
    use crate::host::staking::tests::bonded;
    use crate::host::{bank, pending};
    use crate::state::attestation::LAST_OBSERVED_VALSET;
    use crate::state::config::CHAIN_PARAMS;
    use crate::state::token::token_from_address;
    use crate::types::token::hyperion_denom;
    use crate::types::{DepositClaim, EthAddress, ValsetUpdatedClaim};
    use assert_matches::assert_matches;
    use cosmwasm_std::testing::{mock_dependencies, mock_env};
    use cosmwasm_std::Uint256;

    fn valset_claim(nonce: u64, orchestrator: &str, rpc: &str) -> Claim {
        Claim::ValsetUpdated(ValsetUpdatedClaim {
            hyperion_id: 1,
            event_nonce: nonce,
            block_height: 100 + nonce,
            valset_nonce: nonce,
            members: vec![],
            reward_amount: Uint256::zero(),
            reward_token: EthAddress::ZERO,
            orchestrator: orchestrator.to_string(),
            tx_hash: format!("0xtx{nonce}"),
            rpc_used: rpc.to_string(),
        })
    }

    fn setup(deps: &mut DepsMut, env: &Env) -> CounterpartyChainParams {
        let params = CounterpartyChainParams::new_default(1, 1);
        CHAIN_PARAMS.save(deps.storage, 1, &params).unwrap();
        sync_validators(deps.storage, env, vec![bonded("val60", 60), bonded("val40", 40)])
            .unwrap();
        params
    }

    #[test]
    fn threshold_is_floor_of_66_percent() {
        assert_eq!(required_power(100), 66);
        assert_eq!(required_power(3), 1);
        assert_eq!(required_power(0), 0);
    }

    #[test]
    fn second_vote_crosses_threshold() {
        let mut deps = mock_dependencies();
        let env = mock_env();
        let params = setup(&mut deps.as_mut(), &env);

        attest(&mut deps.storage, &env, &params, valset_claim(1, "o60", ""), "val60").unwrap();
        let events = tally_attestations(&mut deps.as_mut(), &env, &params).unwrap();
        assert!(events.is_empty());
        let (_, _, att) = attestations(&deps.storage, 1).unwrap().remove(0);
        assert!(!att.observed);

        attest(&mut deps.storage, &env, &params, valset_claim(1, "o40", ""), "val40").unwrap();
        let events = tally_attestations(&mut deps.as_mut(), &env, &params).unwrap();
        assert_eq!(events[0].ty, "hyperion_attestation_observed");
        let (_, _, att) = attestations(&deps.storage, 1).unwrap().remove(0);
        assert!(att.observed);
        assert_eq!(att.votes.len(), 2);
        assert_eq!(last_observed_event_nonce(&deps.storage, 1).unwrap(), 1);
        assert_eq!(last_observed_eth_height(&deps.storage, 1).unwrap().ethereum_block_height, 101);

        assert_matches!(
            attest(&mut deps.storage, &env, &params, valset_claim(1, "o60", ""), "val60"),
            Err(ContractError::AttestationAlreadyObserved(1))
        );
    }

    #[test]
    fn duplicate_votes_are_rejected() {
        let mut deps = mock_dependencies();
        let env = mock_env();
        let params = setup(&mut deps.as_mut(), &env);
        attest(&mut deps.storage, &env, &params, valset_claim(1, "o40", ""), "val40").unwrap();
        assert_matches!(
            attest(&mut deps.storage, &env, &params, valset_claim(1, "o40", ""), "val40"),
            Err(ContractError::AttestationAlreadyVoted(_))
        );

        let mut lenient = params.clone();
        lenient.duplicate_vote_check_height = env.block.height + 1;
        attest(&mut deps.storage, &env, &lenient, valset_claim(1, "o40", ""), "val40").unwrap();
    }

    #[test]
    fn last_observed_nonce_never_moves_back() {
        let mut deps = mock_dependencies();
        let env = mock_env();
        let params = setup(&mut deps.as_mut(), &env);

        for val in ["val60", "val40"] {
            attest(&mut deps.storage, &env, &params, valset_claim(5, "o", ""), val).unwrap();
        }
        tally_attestations(&mut deps.as_mut(), &env, &params).unwrap();
        assert_eq!(last_observed_event_nonce(&deps.storage, 1).unwrap(), 5);

        for val in ["val60", "val40"] {
            attest(&mut deps.storage, &env, &params, valset_claim(3, "o", ""), val).unwrap();
        }
        tally_attestations(&mut deps.as_mut(), &env, &params).unwrap();
        assert_eq!(last_observed_event_nonce(&deps.storage, 1).unwrap(), 5);
        assert!(is_nonce_observed(&deps.storage, 1, 3));
    }

    #[test]
    fn contiguity_is_enforced_when_enabled() {
        let mut deps = mock_dependencies();
        let env = mock_env();
        let mut params = setup(&mut deps.as_mut(), &env);
        params.enforce_event_nonce_contiguity = true;

        assert_matches!(
            attest(&mut deps.storage, &env, &params, valset_claim(2, "o", ""), "val60"),
            Err(ContractError::NonContiguousEventNonce {
                expected: 1,
                actual: 2
            })
        );
        attest(&mut deps.storage, &env, &params, valset_claim(1, "o", ""), "val60").unwrap();
        attest(&mut deps.storage, &env, &params, valset_claim(2, "o", ""), "val60").unwrap();
    }

    #[test]
    fn observed_attestations_credit_rpcs_and_get_pruned() {
        let mut deps = mock_dependencies();
        let mut env = mock_env();
        let params = setup(&mut deps.as_mut(), &env);

        for nonce in 1..=2 {
            attest(
                &mut deps.storage,
                &env,
                &params,
                valset_claim(nonce, "o", "https://rpc.one"),
                "val60",
            )
            .unwrap();
            attest(
                &mut deps.storage,
                &env,
                &params,
                valset_claim(nonce, "o", "http://plain"),
                "val40",
            )
            .unwrap();
        }
        tally_attestations(&mut deps.as_mut(), &env, &params).unwrap();

        let stored = CHAIN_PARAMS.load(&deps.storage, 1).unwrap();
        assert_eq!(stored.rpcs.len(), 1);
        assert_eq!(stored.rpcs[0].url, "https://rpc.one");
        assert_eq!(stored.rpcs[0].reputation, 2);
        assert_eq!(stored.rpcs[0].last_height_used, 102);

        let mut retained = params.clone();
        retained.attestation_retention_blocks = 10;
        env.block.height += 5;
        assert_eq!(prune_attestations(&mut deps.as_mut(), &env, &retained).unwrap(), 0);

        assert_eq!(prune_attestations(&mut deps.as_mut(), &env, &params).unwrap(), 1);
        let left = attestations(&deps.storage, 1).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].0, 2);
    }

    #[test]
    fn one_claim_per_nonce_is_observed() {
        let mut deps = mock_dependencies();
        let env = mock_env();
        let params = setup(&mut deps.as_mut(), &env);

        let first = valset_claim(1, "o", "");
        let mut second = first.clone();
        if let Claim::ValsetUpdated(claim) = &mut second {
            claim.valset_nonce = 7;
        }
        for claim in [first, second] {
            for val in ["val60", "val40"] {
                attest(&mut deps.storage, &env, &params, claim.clone(), val).unwrap();
            }
        }

        let events = tally_attestations(&mut deps.as_mut(), &env, &params).unwrap();
        let observed: Vec<_> = events
            .iter()
            .filter(|ev| ev.ty == "hyperion_attestation_observed")
            .collect();
        assert_eq!(observed.len(), 1);
        assert_eq!(
            events.iter().filter(|ev| ev.ty == "hyperion_valset_updated").count(),
            1
        );

        let atts = attestations(&deps.storage, 1).unwrap();
        assert_eq!(atts.len(), 2);
        let winners: Vec<_> = atts.iter().filter(|(_, _, att)| att.observed).collect();
        assert_eq!(winners.len(), 1);
        let Claim::ValsetUpdated(applied) = &winners[0].2.claim else {
            panic!("unexpected claim type");
        };
        let last = LAST_OBSERVED_VALSET.load(&deps.storage, 1).unwrap();
        assert_eq!(last.valset.nonce, applied.valset_nonce);

        // the losing claim stays unobserved on later tallies
        assert!(tally_attestations(&mut deps.as_mut(), &env, &params)
            .unwrap()
            .is_empty());

        // and is pruned with the winner once the nonce is behind
        for val in ["val60", "val40"] {
            attest(&mut deps.storage, &env, &params, valset_claim(2, "o", ""), val).unwrap();
        }
        tally_attestations(&mut deps.as_mut(), &env, &params).unwrap();
        assert_eq!(prune_attestations(&mut deps.as_mut(), &env, &params).unwrap(), 2);
        let left = attestations(&deps.storage, 1).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].0, 2);
    }

    #[test]
    fn failed_claim_stays_observed_and_leaves_no_trace() {
        let mut deps = mock_dependencies();
        let env = mock_env();
        let params = setup(&mut deps.as_mut(), &env);

        // a new token is registered before the amount overflows the bank
        let token = EthAddress::new([0x44; 20]);
        let claim = Claim::Deposit(DepositClaim {
            hyperion_id: 1,
            event_nonce: 1,
            block_height: 101,
            token_contract: token,
            amount: Uint256::MAX,
            ethereum_sender: EthAddress::new([0x55; 20]).to_string(),
            cosmos_receiver: deps.api.addr_make("alice").to_string(),
            orchestrator: "o".to_string(),
            data: String::new(),
            tx_hash: "0xdep".to_string(),
            rpc_used: String::new(),
        });
        for val in ["val60", "val40"] {
            attest(&mut deps.storage, &env, &params, claim.clone(), val).unwrap();
        }

        let events = tally_attestations(&mut deps.as_mut(), &env, &params).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].ty, "hyperion_attestation_observed");
        assert!(events[0]
            .attributes
            .iter()
            .any(|attr| attr.key == "handler" && attr.value == "failed"));

        let (_, _, att) = attestations(&deps.storage, 1).unwrap().remove(0);
        assert!(att.observed);
        assert_eq!(last_observed_event_nonce(&deps.storage, 1).unwrap(), 1);
        assert!(is_nonce_observed(&deps.storage, 1, 1));

        assert_eq!(token_from_address(&deps.storage, 1, &token).unwrap(), None);
        assert_eq!(token_pair(&deps.storage, &hyperion_denom(1, &token)).unwrap(), None);
        assert_eq!(
            bank::supply(&deps.storage, &hyperion_denom(1, &token)).unwrap(),
            Uint256::zero()
        );
        assert!(pending(&deps.storage).is_empty());
    }
}
