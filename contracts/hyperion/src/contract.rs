use cosmwasm_std::{
    to_json_binary, Deps, DepsMut, Env, Event, MessageInfo, QueryResponse, Response,
};
use cosmwasm_logging::{debug, init_cosmwasm_logger};
use cw2::set_contract_version;
use cw_utils::{maybe_addr, nonpayable};
use hyperion_bindings::HyperionMsg;

use crate::admin::{self, register_chain};
use crate::error::ContractError;
use crate::msg::{ExecuteMsg, InstantiateMsg, MigrateMsg, QueryMsg, SudoMsg};
use crate::state::attestation::LAST_OBSERVED_VALSET;
use crate::state::config::{
    chain_params, Config, ADMIN, CONFIG, DEFAULT_MAX_BATCH_SIZE, PARAMS,
};
use crate::types::{Claim, Params};
use crate::{abci, execute as exec, host, queries};

pub const CONTRACT_NAME: &str = env!("CARGO_PKG_NAME");
pub const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn instantiate(
    mut deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response<HyperionMsg>, ContractError> {
    init_cosmwasm_logger(deps.api);
    nonpayable(&info)?;

    let native_fee_denom = match msg.native_fee_denom {
        Some(denom) => denom,
        None => deps.querier.query_bonded_denom()?,
    };
    let max_batch_size = msg.max_batch_size.unwrap_or(DEFAULT_MAX_BATCH_SIZE);
    if max_batch_size == 0 {
        return Err(ContractError::invalid("max batch size must be positive"));
    }
    CONFIG.save(
        deps.storage,
        &Config {
            native_fee_denom,
            max_batch_size,
        },
    )?;

    let api = deps.api;
    let admin = maybe_addr(api, msg.admin)?.unwrap_or_else(|| info.sender.clone());
    ADMIN.set(deps.branch(), Some(admin))?;
    let admins = msg
        .admins
        .iter()
        .map(|a| api.addr_validate(a))
        .collect::<Result<Vec<_>, _>>()?;
    PARAMS.save(deps.storage, &Params { admins })?;

    for params in &msg.chains {
        register_chain(&mut deps, &env, params)?;
    }

    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;
    Ok(Response::new()
        .add_attribute("action", "instantiate")
        .add_attribute("chains", msg.chains.len().to_string()))
}

/// Moves the side effects queued by a handler into its response.
fn respond(deps: &mut DepsMut, events: Vec<Event>) -> Result<Response<HyperionMsg>, ContractError> {
    let msgs = host::drain(deps.storage)?;
    Ok(Response::new().add_messages(msgs).add_events(events))
}

pub fn execute(
    mut deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response<HyperionMsg>, ContractError> {
    init_cosmwasm_logger(deps.api);
    msg.validate_basic()?;
    if !msg.accepts_funds() {
        nonpayable(&info)?;
    }

    let deps = &mut deps;
    let events = match msg {
        ExecuteMsg::SetOrchestratorAddresses {
            hyperion_id,
            orchestrator,
            eth_address,
            minimum_batch_fee,
        } => vec![exec::set_orchestrator_addresses(
            deps,
            &info,
            hyperion_id,
            &orchestrator,
            &eth_address,
            minimum_batch_fee,
        )?],
        ExecuteMsg::ValsetConfirm {
            hyperion_id,
            nonce,
            eth_address,
            signature,
        } => vec![exec::valset_confirm(
            deps.storage,
            &info,
            hyperion_id,
            nonce,
            &eth_address,
            &signature,
        )?],
        ExecuteMsg::SendToChain {
            dest_hyperion_id,
            dest,
            amount,
            bridge_fee,
        } => vec![exec::send_to_chain(
            deps.storage,
            &env,
            &info,
            dest_hyperion_id,
            &dest,
            amount,
            bridge_fee,
        )?],
        ExecuteMsg::CancelSendToChain {
            hyperion_id,
            transaction_id,
        } => vec![exec::cancel_send_to_chain(
            deps.storage,
            &env,
            &info,
            hyperion_id,
            transaction_id,
        )?],
        ExecuteMsg::RequestBatch { hyperion_id, denom } => vec![exec::request_batch(
            deps.storage,
            &env,
            &info,
            hyperion_id,
            &denom,
        )?],
        ExecuteMsg::ConfirmBatch(confirm) => {
            vec![exec::confirm_batch(deps.storage, &info, &confirm)?]
        }
        ExecuteMsg::ConfirmMultipleBatches { confirms } => {
            exec::confirm_multiple_batches(deps, &info, &confirms)?
        }
        ExecuteMsg::DepositClaim(claim) => {
            exec::submit_claim(deps.storage, &env, &info, Claim::Deposit(claim))?
        }
        ExecuteMsg::WithdrawClaim(claim) => {
            exec::submit_claim(deps.storage, &env, &info, Claim::Withdraw(claim))?
        }
        ExecuteMsg::Erc20DeployedClaim(claim) => {
            exec::submit_claim(deps.storage, &env, &info, Claim::Erc20Deployed(claim))?
        }
        ExecuteMsg::ValsetUpdatedClaim(claim) => {
            exec::submit_claim(deps.storage, &env, &info, Claim::ValsetUpdated(claim))?
        }
        ExecuteMsg::SubmitBadSignatureEvidence {
            hyperion_id,
            subject,
            signature,
        } => vec![exec::submit_bad_signature_evidence(
            deps.storage,
            &env,
            hyperion_id,
            &subject,
            &signature,
        )?],
        ExecuteMsg::AddCounterpartyChainParams { params } => vec![
            admin::add_counterparty_chain_params(deps, &env, &info, &params)?,
        ],
        ExecuteMsg::UpdateCounterpartyChainParams { params } => vec![
            admin::update_counterparty_chain_params(deps, &info, &params)?,
        ],
        ExecuteMsg::UpdateParams { admins } => vec![admin::update_params(deps, &info, &admins)?],
        ExecuteMsg::DeleteCounterpartyChain { hyperion_id } => vec![
            admin::delete_counterparty_chain(deps, &info, hyperion_id)?,
        ],
        ExecuteMsg::PauseChain { hyperion_id } => {
            vec![admin::set_paused(deps, &info, hyperion_id, true)?]
        }
        ExecuteMsg::UnpauseChain { hyperion_id } => {
            vec![admin::set_paused(deps, &info, hyperion_id, false)?]
        }
        ExecuteMsg::UpdateChainLogo { hyperion_id, logo } => {
            vec![admin::update_chain_logo(deps, &info, hyperion_id, &logo)?]
        }
        ExecuteMsg::UpdateChainName { hyperion_id, name } => {
            vec![admin::update_chain_name(deps, &info, hyperion_id, &name)?]
        }
        ExecuteMsg::SetLastObservedNonce {
            hyperion_id,
            nonce,
            eth_height,
        } => vec![admin::set_last_observed_nonce(
            deps,
            &env,
            &info,
            hyperion_id,
            nonce,
            eth_height,
        )?],
        ExecuteMsg::SetTokenToChain {
            hyperion_id,
            token_address,
            denom,
            is_cosmos_originated,
        } => vec![admin::set_token_to_chain(
            deps,
            &info,
            hyperion_id,
            &token_address,
            &denom,
            is_cosmos_originated,
        )?],
        ExecuteMsg::RemoveTokenFromChain { hyperion_id, denom } => vec![
            admin::remove_token_from_chain(deps, &info, hyperion_id, &denom)?,
        ],
        ExecuteMsg::MintToken {
            hyperion_id,
            token_address,
            amount,
            receiver,
        } => vec![admin::mint_token(
            deps,
            &info,
            hyperion_id,
            &token_address,
            amount,
            &receiver,
        )?],
        ExecuteMsg::BurnToken {
            hyperion_id,
            token_address,
        } => vec![admin::burn_token(deps, &info, hyperion_id, &token_address)?],
        ExecuteMsg::BlacklistEthereumAddresses { addresses } => {
            vec![admin::blacklist_addresses(deps, &info, &addresses, false)?]
        }
        ExecuteMsg::RevokeEthereumBlacklist { addresses } => {
            vec![admin::blacklist_addresses(deps, &info, &addresses, true)?]
        }
        ExecuteMsg::UpdateAdmin { admin } => {
            let api = deps.api;
            return Ok(ADMIN.execute_update_admin(deps.branch(), info, maybe_addr(api, admin)?)?);
        }
    };
    respond(deps, events)
}

pub fn sudo(mut deps: DepsMut, env: Env, msg: SudoMsg) -> Result<Response<HyperionMsg>, ContractError> {
    init_cosmwasm_logger(deps.api);
    let deps = &mut deps;
    let events = match msg {
        SudoMsg::BeginBlock {} => abci::begin_block(deps, &env)?,
        SudoMsg::EndBlock {} => abci::end_block(deps, &env)?,
        SudoMsg::SyncValidators { validators } => {
            debug!("syncing {} validators", validators.len());
            vec![host::staking::sync_validators(deps.storage, &env, validators)?]
        }
    };
    respond(deps, events)
}

pub fn query(deps: Deps, env: Env, msg: QueryMsg) -> Result<QueryResponse, ContractError> {
    init_cosmwasm_logger(deps.api);
    match msg {
        QueryMsg::Config {} => Ok(to_json_binary(&CONFIG.load(deps.storage)?)?),
        QueryMsg::Admin {} => to_json_binary(&ADMIN.query_admin(deps)?).map_err(Into::into),
        QueryMsg::Params {} => Ok(to_json_binary(
            &PARAMS.may_load(deps.storage)?.unwrap_or_default(),
        )?),
        QueryMsg::CounterpartyChainParams { hyperion_id } => {
            Ok(to_json_binary(&chain_params(deps.storage, hyperion_id)?)?)
        }
        QueryMsg::CurrentValset { hyperion_id } => Ok(to_json_binary(
            &queries::current_valset(deps, &env, hyperion_id)?,
        )?),
        QueryMsg::ValsetRequest { hyperion_id, nonce } => Ok(to_json_binary(
            &queries::valset_request(deps, hyperion_id, nonce)?,
        )?),
        QueryMsg::LatestValsets { hyperion_id, count } => Ok(to_json_binary(
            &queries::latest_valsets(deps, hyperion_id, count)?,
        )?),
        QueryMsg::LastObservedValset { hyperion_id } => Ok(to_json_binary(
            &LAST_OBSERVED_VALSET.may_load(deps.storage, hyperion_id)?,
        )?),
        QueryMsg::ValsetConfirm {
            hyperion_id,
            nonce,
            orchestrator,
        } => Ok(to_json_binary(
            &crate::state::valset::get_valset_confirm(
                deps.storage,
                hyperion_id,
                nonce,
                &orchestrator,
            )?,
        )?),
        QueryMsg::ValsetConfirmsByNonce { hyperion_id, nonce } => Ok(to_json_binary(
            &queries::valset_confirms_of(deps, hyperion_id, nonce)?,
        )?),
        QueryMsg::LastPendingValsetRequestByAddr {
            hyperion_id,
            orchestrator,
        } => Ok(to_json_binary(&queries::last_pending_valset_request_by_addr(
            deps,
            hyperion_id,
            &orchestrator,
        )?)?),
        QueryMsg::LastPendingBatchRequestByAddr {
            hyperion_id,
            orchestrator,
        } => Ok(to_json_binary(&queries::last_pending_batch_request_by_addr(
            deps,
            hyperion_id,
            &orchestrator,
        )?)?),
        QueryMsg::PendingSendToChain {
            hyperion_id,
            sender,
        } => Ok(to_json_binary(&queries::pending_send_to_chain(
            deps,
            hyperion_id,
            &sender,
        )?)?),
        QueryMsg::OutgoingTxBatches { hyperion_id, limit } => Ok(to_json_binary(
            &queries::outgoing_tx_batches(deps, hyperion_id, limit)?,
        )?),
        QueryMsg::BatchRequestByNonce {
            hyperion_id,
            token_contract,
            nonce,
        } => Ok(to_json_binary(&queries::batch_request_by_nonce(
            deps,
            hyperion_id,
            &token_contract,
            nonce,
        )?)?),
        QueryMsg::BatchConfirms {
            hyperion_id,
            token_contract,
            nonce,
        } => Ok(to_json_binary(&queries::batch_confirms(
            deps,
            hyperion_id,
            &token_contract,
            nonce,
        )?)?),
        QueryMsg::BatchFees { hyperion_id } => {
            Ok(to_json_binary(&queries::batch_fees(deps, hyperion_id)?)?)
        }
        QueryMsg::LastEventByAddr {
            hyperion_id,
            orchestrator,
        } => Ok(to_json_binary(&queries::last_event_by_addr(
            deps,
            hyperion_id,
            &orchestrator,
        )?)?),
        QueryMsg::LastObservedEventNonce { hyperion_id } => Ok(to_json_binary(
            &crate::state::attestation::last_observed_event_nonce(deps.storage, hyperion_id)?,
        )?),
        QueryMsg::LastObservedEthBlockHeight { hyperion_id } => Ok(to_json_binary(
            &crate::state::attestation::last_observed_eth_height(deps.storage, hyperion_id)?,
        )?),
        QueryMsg::GetDelegateKeyByValidator {
            hyperion_id,
            validator,
        } => Ok(to_json_binary(&queries::delegate_key_by_validator(
            deps,
            hyperion_id,
            validator,
        )?)?),
        QueryMsg::GetDelegateKeyByEth {
            hyperion_id,
            eth_address,
        } => Ok(to_json_binary(&queries::delegate_key_by_eth(
            deps,
            hyperion_id,
            &eth_address,
        )?)?),
        QueryMsg::GetDelegateKeyByOrchestrator {
            hyperion_id,
            orchestrator,
        } => Ok(to_json_binary(&queries::delegate_key_by_orchestrator(
            deps,
            hyperion_id,
            &orchestrator,
        )?)?),
        QueryMsg::Attestations {
            hyperion_id,
            start_before,
            limit,
        } => Ok(to_json_binary(&queries::attestations(
            deps,
            hyperion_id,
            start_before,
            limit,
        )?)?),
        QueryMsg::Attestation {
            hyperion_id,
            nonce,
            claim_hash,
        } => Ok(to_json_binary(&queries::attestation(
            deps,
            hyperion_id,
            nonce,
            &claim_hash,
        )?)?),
        QueryMsg::TokenFromDenom { hyperion_id, denom } => Ok(to_json_binary(
            &queries::token_by_denom(deps, hyperion_id, &denom)?,
        )?),
        QueryMsg::TokenFromAddress {
            hyperion_id,
            token_address,
        } => Ok(to_json_binary(&queries::token_by_address(
            deps,
            hyperion_id,
            &token_address,
        )?)?),
        QueryMsg::OrchestratorData {
            hyperion_id,
            orchestrator,
        } => Ok(to_json_binary(&queries::orchestrator_data(
            deps,
            hyperion_id,
            &orchestrator,
        )?)?),
        QueryMsg::TransferHistory {
            address,
            start_before,
            limit,
        } => Ok(to_json_binary(&queries::transfers_of(
            deps,
            &address,
            start_before,
            limit,
        )?)?),
        QueryMsg::LastTransactions { limit } => Ok(to_json_binary(
            &queries::recent_transactions(deps, limit)?,
        )?),
        QueryMsg::Blacklist {} => Ok(to_json_binary(&queries::blacklist(deps)?)?),
        QueryMsg::ProjectedCurrentEthHeight { hyperion_id } => Ok(to_json_binary(
            &queries::projected_current_eth_height(deps, &env, hyperion_id)?,
        )?),
        QueryMsg::ModuleState { hyperion_id } => {
            Ok(to_json_binary(&queries::module_state(deps, hyperion_id)?)?)
        }
    }
}

pub fn migrate(deps: DepsMut, _env: Env, _msg: MigrateMsg) -> Result<Response<HyperionMsg>, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;
    Ok(Response::new().add_attribute("action", "migrate"))
}
