use cosmwasm_std::{Deps, Env, Order, StdResult};

use crate::batch::batch_fees as projected_batch_fees;
use crate::error::ContractError;
use crate::msg::{
    ArchivedTransfer, DelegateKeysResponse, ModuleState, PendingSendToChainResponse,
    TransferHistoryResponse,
};
use crate::state::archive::{blacklisted_addresses, last_transactions, transfer_history};
use crate::state::attestation::{
    attestations as all_attestations, get_attestation, last_event_by_validator,
    last_observed_event_nonce, last_observed_eth_height, latest_attestations,
    LAST_OBSERVED_VALSET,
};
use crate::state::batch::{
    batch_confirms as confirms_of_batch, batches, get_batch, get_batch_confirm, LAST_BATCH_ID,
};
use crate::state::config::{chain_params, CONFIG};
use crate::state::orchestrator::{
    eth_address_by_validator, orchestrator_by_validator, orchestrator_data as load_orchestrator,
    validator_by_eth_address, validator_by_orchestrator, VALIDATOR_ORCHESTRATOR,
};
use crate::state::pool::{is_unbatched, pool_entries, LAST_TX_POOL_ID};
use crate::state::token::{token_from_address, token_from_denom, tokens};
use crate::state::valset::{get_valset, get_valset_confirm, valset_confirms, valsets_desc};
use crate::types::{
    Attestation, BatchConfirm, BatchFees, EthAddress, LastClaimEvent, OrchestratorData,
    OutgoingTxBatch, TokenAddressToDenom, TransferTx, Valset,
};
use crate::valset;

// Settings for pagination
const MAX_LIMIT: u32 = 30;
const DEFAULT_LIMIT: u32 = 10;

/// Unsigned valsets returned to an orchestrator at once
const MAX_PENDING_VALSETS: usize = 100;

fn limit(limit: Option<u32>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize
}

fn parse_eth(addr: &str) -> Result<EthAddress, ContractError> {
    EthAddress::parse(addr).map_err(|e| ContractError::invalid(e.to_string()))
}

pub fn current_valset(deps: Deps, env: &Env, hyperion_id: u64) -> Result<Valset, ContractError> {
    let params = chain_params(deps.storage, hyperion_id)?;
    valset::current_valset(deps.storage, env, &params)
}

pub fn latest_valsets(deps: Deps, hyperion_id: u64, count: Option<u32>) -> StdResult<Vec<Valset>> {
    valsets_desc(deps.storage, hyperion_id, Some(limit(count)))
}

/// Valsets `orchestrator` has not confirmed yet, oldest first.
pub fn last_pending_valset_request_by_addr(
    deps: Deps,
    hyperion_id: u64,
    orchestrator: &str,
) -> StdResult<Vec<Valset>> {
    let mut pending = vec![];
    for vs in valsets_desc(deps.storage, hyperion_id, None)? {
        if get_valset_confirm(deps.storage, hyperion_id, vs.nonce, orchestrator)?.is_none() {
            pending.push(vs);
        }
        if pending.len() == MAX_PENDING_VALSETS {
            break;
        }
    }
    pending.reverse();
    Ok(pending)
}

/// Oldest batch `orchestrator` has not confirmed yet.
pub fn last_pending_batch_request_by_addr(
    deps: Deps,
    hyperion_id: u64,
    orchestrator: &str,
) -> StdResult<Option<OutgoingTxBatch>> {
    let mut all = batches(deps.storage, hyperion_id)?;
    all.sort_by_key(|b| b.batch_nonce);
    for batch in all {
        let confirm = get_batch_confirm(
            deps.storage,
            hyperion_id,
            &batch.token_contract,
            batch.batch_nonce,
            orchestrator,
        )?;
        if confirm.is_none() {
            return Ok(Some(batch));
        }
    }
    Ok(None)
}

pub fn pending_send_to_chain(
    deps: Deps,
    hyperion_id: u64,
    sender: &str,
) -> StdResult<PendingSendToChainResponse> {
    let transfers_in_batches = batches(deps.storage, hyperion_id)?
        .into_iter()
        .flat_map(|b| b.transactions)
        .filter(|tx| tx.sender.as_str() == sender)
        .collect();
    let mut unbatched_transfers = vec![];
    for tx in pool_entries(deps.storage, hyperion_id)? {
        if tx.sender.as_str() == sender && is_unbatched(deps.storage, &tx)? {
            unbatched_transfers.push(tx);
        }
    }
    Ok(PendingSendToChainResponse {
        transfers_in_batches,
        unbatched_transfers,
    })
}

/// Most recent batches first.
pub fn outgoing_tx_batches(
    deps: Deps,
    hyperion_id: u64,
    max: Option<u32>,
) -> StdResult<Vec<OutgoingTxBatch>> {
    let mut all = batches(deps.storage, hyperion_id)?;
    all.sort_by(|a, b| b.batch_nonce.cmp(&a.batch_nonce));
    all.truncate(limit(max));
    Ok(all)
}

pub fn batch_request_by_nonce(
    deps: Deps,
    hyperion_id: u64,
    token_contract: &str,
    nonce: u64,
) -> Result<Option<OutgoingTxBatch>, ContractError> {
    let token = parse_eth(token_contract)?;
    Ok(get_batch(deps.storage, hyperion_id, &token, nonce)?)
}

pub fn batch_confirms(
    deps: Deps,
    hyperion_id: u64,
    token_contract: &str,
    nonce: u64,
) -> Result<Vec<BatchConfirm>, ContractError> {
    let token = parse_eth(token_contract)?;
    Ok(confirms_of_batch(deps.storage, hyperion_id, &token, nonce)?)
}

pub fn batch_fees(deps: Deps, hyperion_id: u64) -> Result<Vec<BatchFees>, ContractError> {
    let max = CONFIG.load(deps.storage)?.max_batch_size as usize;
    projected_batch_fees(deps.storage, hyperion_id, max)
}

pub fn last_event_by_addr(
    deps: Deps,
    hyperion_id: u64,
    orchestrator: &str,
) -> Result<LastClaimEvent, ContractError> {
    let validator = validator_by_orchestrator(deps.storage, hyperion_id, orchestrator)?
        .ok_or_else(|| ContractError::unknown(format!("validator for {orchestrator}")))?;
    Ok(last_event_by_validator(deps.storage, hyperion_id, &validator)?)
}

fn delegate_keys(
    deps: Deps,
    hyperion_id: u64,
    validator: String,
) -> Result<DelegateKeysResponse, ContractError> {
    let orchestrator = orchestrator_by_validator(deps.storage, hyperion_id, &validator)?
        .ok_or_else(|| ContractError::unknown(format!("orchestrator of {validator}")))?;
    let eth = eth_address_by_validator(deps.storage, hyperion_id, &validator)?
        .ok_or_else(|| ContractError::unknown(format!("eth address of {validator}")))?;
    Ok(DelegateKeysResponse {
        validator,
        orchestrator,
        eth_address: eth.to_string(),
    })
}

pub fn delegate_key_by_validator(
    deps: Deps,
    hyperion_id: u64,
    validator: String,
) -> Result<DelegateKeysResponse, ContractError> {
    delegate_keys(deps, hyperion_id, validator)
}

pub fn delegate_key_by_eth(
    deps: Deps,
    hyperion_id: u64,
    eth_address: &str,
) -> Result<DelegateKeysResponse, ContractError> {
    let eth = parse_eth(eth_address)?;
    let validator = validator_by_eth_address(deps.storage, hyperion_id, &eth)?
        .ok_or_else(|| ContractError::unknown(format!("validator for {eth}")))?;
    delegate_keys(deps, hyperion_id, validator)
}

pub fn delegate_key_by_orchestrator(
    deps: Deps,
    hyperion_id: u64,
    orchestrator: &str,
) -> Result<DelegateKeysResponse, ContractError> {
    let validator = validator_by_orchestrator(deps.storage, hyperion_id, orchestrator)?
        .ok_or_else(|| ContractError::unknown(format!("validator for {orchestrator}")))?;
    delegate_keys(deps, hyperion_id, validator)
}

pub fn attestations(
    deps: Deps,
    hyperion_id: u64,
    start_before: Option<u64>,
    max: Option<u32>,
) -> StdResult<Vec<Attestation>> {
    latest_attestations(deps.storage, hyperion_id, start_before, limit(max))
}

pub fn attestation(
    deps: Deps,
    hyperion_id: u64,
    nonce: u64,
    claim_hash: &str,
) -> Result<Option<Attestation>, ContractError> {
    let hash = hex::decode(claim_hash.trim_start_matches("0x"))?;
    Ok(get_attestation(deps.storage, hyperion_id, nonce, &hash)?)
}

pub fn token_by_denom(
    deps: Deps,
    hyperion_id: u64,
    denom: &str,
) -> StdResult<Option<TokenAddressToDenom>> {
    token_from_denom(deps.storage, hyperion_id, denom)
}

pub fn token_by_address(
    deps: Deps,
    hyperion_id: u64,
    token_address: &str,
) -> Result<Option<TokenAddressToDenom>, ContractError> {
    let token = parse_eth(token_address)?;
    Ok(token_from_address(deps.storage, hyperion_id, &token)?)
}

pub fn orchestrator_data(
    deps: Deps,
    hyperion_id: u64,
    orchestrator: &str,
) -> StdResult<OrchestratorData> {
    load_orchestrator(deps.storage, orchestrator, hyperion_id)
}

pub fn transfers_of(
    deps: Deps,
    address: &str,
    start_before: Option<u64>,
    max: Option<u32>,
) -> StdResult<TransferHistoryResponse> {
    let transfers = transfer_history(deps.storage, address, start_before, limit(max))?
        .into_iter()
        .map(|(seq, transfer)| ArchivedTransfer { seq, transfer })
        .collect();
    Ok(TransferHistoryResponse { transfers })
}

pub fn recent_transactions(deps: Deps, max: Option<u32>) -> StdResult<Vec<TransferTx>> {
    last_transactions(deps.storage, limit(max))
}

pub fn blacklist(deps: Deps) -> StdResult<Vec<String>> {
    Ok(blacklisted_addresses(deps.storage)?
        .iter()
        .map(ToString::to_string)
        .collect())
}

pub fn projected_current_eth_height(
    deps: Deps,
    env: &Env,
    hyperion_id: u64,
) -> Result<u64, ContractError> {
    let params = chain_params(deps.storage, hyperion_id)?;
    Ok(valset::projected_current_eth_height(
        deps.storage,
        env,
        &params,
    )?)
}

/// Everything stored for one bridge instance, for exports.
pub fn module_state(deps: Deps, hyperion_id: u64) -> Result<ModuleState, ContractError> {
    let storage = deps.storage;
    let params = chain_params(storage, hyperion_id)?;

    let mut valsets = valsets_desc(storage, hyperion_id, None)?;
    valsets.reverse();
    let mut valset_confirms = vec![];
    for vs in &valsets {
        valset_confirms.extend(self::valset_confirms_of(deps, hyperion_id, vs.nonce)?);
    }

    let batches = batches(storage, hyperion_id)?;
    let mut batch_confirms = vec![];
    for batch in &batches {
        batch_confirms.extend(confirms_of_batch(
            storage,
            hyperion_id,
            &batch.token_contract,
            batch.batch_nonce,
        )?);
    }

    let mut unbatched_transfers = vec![];
    for tx in pool_entries(storage, hyperion_id)? {
        if is_unbatched(storage, &tx)? {
            unbatched_transfers.push(tx);
        }
    }

    let validators: Vec<String> = VALIDATOR_ORCHESTRATOR
        .prefix(hyperion_id)
        .keys(storage, None, None, Order::Ascending)
        .collect::<StdResult<_>>()?;
    let delegate_keys = validators
        .into_iter()
        .map(|v| delegate_keys(deps, hyperion_id, v))
        .collect::<Result<_, _>>()?;

    Ok(ModuleState {
        params,
        last_observed_nonce: last_observed_event_nonce(storage, hyperion_id)?,
        last_observed_eth_height: last_observed_eth_height(storage, hyperion_id)?,
        last_observed_valset: LAST_OBSERVED_VALSET.may_load(storage, hyperion_id)?,
        valsets,
        valset_confirms,
        batches,
        batch_confirms,
        unbatched_transfers,
        attestations: all_attestations(storage, hyperion_id)?
            .into_iter()
            .map(|(_, _, att)| att)
            .collect(),
        delegate_keys,
        tokens: tokens(storage, hyperion_id)?,
        last_tx_pool_id: LAST_TX_POOL_ID
            .may_load(storage, hyperion_id)?
            .unwrap_or_default(),
        last_batch_id: LAST_BATCH_ID.may_load(storage, hyperion_id)?.unwrap_or_default(),
    })
}

pub fn valset_request(deps: Deps, hyperion_id: u64, nonce: u64) -> StdResult<Option<Valset>> {
    get_valset(deps.storage, hyperion_id, nonce)
}

pub fn valset_confirms_of(
    deps: Deps,
    hyperion_id: u64,
    nonce: u64,
) -> StdResult<Vec<crate::types::ValsetConfirm>> {
    valset_confirms(deps.storage, hyperion_id, nonce)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::build_outgoing_tx_batch;
    use crate::pool::tests::{send, setup_chain, TOKEN};
    use crate::state::orchestrator::set_delegate_keys;
    use crate::state::valset::{store_valset, store_valset_confirm};
    use crate::types::ValsetConfirm;
    use cosmwasm_std::testing::{mock_dependencies, mock_env};
    use cosmwasm_std::Uint256;

    fn valset(nonce: u64) -> Valset {
        Valset {
            hyperion_id: 1,
            nonce,
            height: nonce * 10,
            members: vec![],
            reward_amount: Uint256::zero(),
            reward_token: EthAddress::ZERO,
        }
    }

    #[test]
    fn pending_valsets_oldest_first() {
        let mut deps = mock_dependencies();
        for nonce in 1..=3 {
            store_valset(&mut deps.storage, &valset(nonce)).unwrap();
        }
        store_valset_confirm(
            &mut deps.storage,
            &ValsetConfirm {
                hyperion_id: 1,
                nonce: 2,
                orchestrator: "orch".to_string(),
                eth_address: EthAddress::new([1; 20]),
                signature: String::new(),
            },
        )
        .unwrap();

        let pending = last_pending_valset_request_by_addr(deps.as_ref(), 1, "orch").unwrap();
        let nonces: Vec<u64> = pending.iter().map(|v| v.nonce).collect();
        assert_eq!(nonces, vec![1, 3]);
        assert_eq!(latest_valsets(deps.as_ref(), 1, Some(1)).unwrap()[0].nonce, 3);
    }

    #[test]
    fn pending_sends_split_by_batch() {
        let mut deps = mock_dependencies();
        setup_chain(&mut deps.storage);
        send(&mut deps.storage, "alice", 10, 5);
        send(&mut deps.storage, "bob", 10, 3);
        build_outgoing_tx_batch(&mut deps.storage, &mock_env(), 1, &TOKEN, 1).unwrap();
        send(&mut deps.storage, "alice", 10, 1);

        let res = pending_send_to_chain(deps.as_ref(), 1, "alice").unwrap();
        assert_eq!(res.transfers_in_batches.len(), 1);
        assert_eq!(res.unbatched_transfers.len(), 1);

        let pending = last_pending_batch_request_by_addr(deps.as_ref(), 1, "orch")
            .unwrap()
            .unwrap();
        assert_eq!(pending.transactions[0].sender.as_str(), "alice");
        assert_eq!(outgoing_tx_batches(deps.as_ref(), 1, None).unwrap().len(), 1);
    }

    #[test]
    fn delegate_key_lookups() {
        let mut deps = mock_dependencies();
        let eth = EthAddress::new([7; 20]);
        set_delegate_keys(&mut deps.storage, 1, "val", "orch", &eth).unwrap();

        let by_eth = delegate_key_by_eth(deps.as_ref(), 1, &eth.to_string()).unwrap();
        assert_eq!(by_eth.validator, "val");
        assert_eq!(by_eth.orchestrator, "orch");
        let by_orch = delegate_key_by_orchestrator(deps.as_ref(), 1, "orch").unwrap();
        assert_eq!(by_orch, by_eth);
        assert!(delegate_key_by_validator(deps.as_ref(), 1, "other".to_string()).is_err());
    }

    #[test]
    fn module_state_export() {
        let mut deps = mock_dependencies();
        setup_chain(&mut deps.storage);
        send(&mut deps.storage, "alice", 10, 5);
        let state = module_state(deps.as_ref(), 1).unwrap();
        assert_eq!(state.unbatched_transfers.len(), 1);
        assert_eq!(state.last_tx_pool_id, 1);
        assert_eq!(state.tokens.len(), 1);
        assert!(module_state(deps.as_ref(), 9).is_err());
    }
}
