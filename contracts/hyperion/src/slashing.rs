//! Penalties for validators that did not sign valsets or batches in time.

use cosmwasm_std::{Decimal, Env, Event, Storage};
use cosmwasm_logging::{debug, warn};

use crate::error::ContractError;
use crate::events::new_slash_event;
use crate::host::staking::{self, BondStatus, ValidatorInfo};
use crate::state::batch::{get_batch_confirm, unslashed_batches, LAST_SLASHED_BATCH_BLOCK};
use crate::state::orchestrator::{
    eth_address_by_validator, orchestrator_by_validator, update_orchestrator_data,
};
use crate::state::valset::{get_valset_confirm, unslashed_valsets, LAST_SLASHED_VALSET_NONCE};
use crate::types::{CounterpartyChainParams, SlashData};

pub const MISSING_VALSET_CONFIRM: &str = "missing_valset_confirm";
pub const MISSING_BATCH_CONFIRM: &str = "missing_batch_confirm";
pub const BAD_ETH_SIGNATURE: &str = "bad_eth_signature";

/// Slashes `fraction` of the validator's stake, jails it when it is not jailed
/// yet and books the slash on its orchestrator.
pub fn slash_and_jail(
    storage: &mut dyn Storage,
    env: &Env,
    hyperion_id: u64,
    operator: &str,
    fraction: Decimal,
    reason: &str,
) -> Result<Event, ContractError> {
    let power = staking::slash(storage, operator, env.block.height, fraction)?;
    staking::jail(storage, operator)?;

    if let Some(orchestrator) = orchestrator_by_validator(storage, hyperion_id, operator)? {
        let slash = SlashData {
            height: env.block.height,
            time: env.block.time.seconds(),
            fraction,
            reason: reason.to_string(),
        };
        update_orchestrator_data(storage, &orchestrator, hyperion_id, |data| {
            data.record_slash(slash)
        })?;
    }
    warn!("hyperion {hyperion_id}: slashed {operator} ({reason})");
    Ok(new_slash_event(hyperion_id, operator, power, fraction, reason))
}

/// Whether a validator still answers for a valset created at `height`.
fn accountable_for_valset(
    val: &ValidatorInfo,
    height: u64,
    params: &CounterpartyChainParams,
) -> bool {
    if val.start_height >= height {
        return false;
    }
    match val.status {
        BondStatus::Bonded => !val.jailed,
        BondStatus::Unbonding => {
            val.unbonding_height >= height
                && height < val.unbonding_height + params.unbond_slashing_valsets_window
        }
        BondStatus::Unbonded => false,
    }
}

/// Slashes every accountable validator that did not confirm a valset that left
/// the signing window.
pub fn valset_slashing(
    storage: &mut dyn Storage,
    env: &Env,
    params: &CounterpartyChainParams,
) -> Result<Vec<Event>, ContractError> {
    let hyperion_id = params.hyperion_id;
    if env.block.height <= params.signed_valsets_window {
        return Ok(vec![]);
    }
    let max_height = env.block.height - params.signed_valsets_window;

    let mut events = vec![];
    for vs in unslashed_valsets(storage, hyperion_id, max_height)? {
        // reloaded per valset, earlier slashes jail validators
        let mut candidates = staking::bonded_validators(storage)?;
        candidates.extend(staking::unbonding_validators(storage)?);

        for val in candidates {
            if !accountable_for_valset(&val, vs.height, params) {
                continue;
            }
            if eth_address_by_validator(storage, hyperion_id, &val.operator)?.is_none() {
                continue;
            }
            let confirmed = match orchestrator_by_validator(storage, hyperion_id, &val.operator)? {
                Some(orch) => get_valset_confirm(storage, hyperion_id, vs.nonce, &orch)?.is_some(),
                None => false,
            };
            if !confirmed {
                events.push(slash_and_jail(
                    storage,
                    env,
                    hyperion_id,
                    &val.operator,
                    params.slash_fraction_valset,
                    MISSING_VALSET_CONFIRM,
                )?);
            }
        }
        LAST_SLASHED_VALSET_NONCE.save(storage, hyperion_id, &vs.nonce)?;
        debug!("hyperion {hyperion_id}: valset {} checked for confirms", vs.nonce);
    }
    Ok(events)
}

/// Slashes bonded validators that did not confirm a batch that left the
/// signing window. Validators without delegate keys are skipped.
pub fn batch_slashing(
    storage: &mut dyn Storage,
    env: &Env,
    params: &CounterpartyChainParams,
) -> Result<Vec<Event>, ContractError> {
    let hyperion_id = params.hyperion_id;
    if env.block.height <= params.signed_batches_window {
        return Ok(vec![]);
    }
    let max_block = env.block.height - params.signed_batches_window;

    let mut events = vec![];
    for batch in unslashed_batches(storage, hyperion_id, max_block)? {
        for val in staking::bonded_validators(storage)? {
            if val.jailed || val.start_height >= batch.block {
                continue;
            }
            let Some(orch) = orchestrator_by_validator(storage, hyperion_id, &val.operator)? else {
                continue;
            };
            let confirm = get_batch_confirm(
                storage,
                hyperion_id,
                &batch.token_contract,
                batch.batch_nonce,
                &orch,
            )?;
            if confirm.is_none() {
                events.push(slash_and_jail(
                    storage,
                    env,
                    hyperion_id,
                    &val.operator,
                    params.slash_fraction_batch,
                    MISSING_BATCH_CONFIRM,
                )?);
            }
        }
        LAST_SLASHED_BATCH_BLOCK.save(storage, hyperion_id, &batch.block)?;
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::pending;
    use crate::host::staking::sync_validators;
    use crate::host::staking::tests::bonded;
    use crate::state::batch::{store_batch, store_batch_confirm};
    use crate::state::orchestrator::{orchestrator_data, set_delegate_keys};
    use crate::state::valset::{last_slashed_valset_nonce, store_valset, store_valset_confirm};
    use crate::types::{BatchConfirm, EthAddress, OutgoingTxBatch, Valset, ValsetConfirm};
    use cosmwasm_std::testing::{mock_env, MockStorage};
    use cosmwasm_std::{CosmosMsg, Uint256};
    use hyperion_bindings::HyperionMsg;

    fn setup(storage: &mut dyn Storage, env: &Env, vals: Vec<ValidatorInfo>) {
        for (i, val) in vals.iter().enumerate() {
            let eth = EthAddress::new([i as u8 + 1; 20]);
            set_delegate_keys(storage, 1, &val.operator, &format!("orch_{}", val.operator), &eth)
                .unwrap();
        }
        sync_validators(storage, env, vals).unwrap();
    }

    fn params() -> CounterpartyChainParams {
        let mut params = CounterpartyChainParams::new_default(1, 1);
        params.signed_valsets_window = 10;
        params.signed_batches_window = 10;
        params.unbond_slashing_valsets_window = 10;
        params
    }

    fn valset(nonce: u64, height: u64) -> Valset {
        Valset {
            hyperion_id: 1,
            nonce,
            height,
            members: vec![],
            reward_amount: Uint256::zero(),
            reward_token: EthAddress::ZERO,
        }
    }

    fn confirm_valset(storage: &mut dyn Storage, nonce: u64, orchestrator: &str) {
        let confirm = ValsetConfirm {
            hyperion_id: 1,
            nonce,
            orchestrator: orchestrator.to_string(),
            eth_address: EthAddress::ZERO,
            signature: String::new(),
        };
        store_valset_confirm(storage, &confirm).unwrap();
    }

    #[test]
    fn missing_valset_confirm_is_slashed_once() {
        let mut store = MockStorage::new();
        let mut env = mock_env();
        env.block.height = 100;
        let mut late = bonded("late", 10);
        late.start_height = 60;
        setup(
            &mut store,
            &env,
            vec![bonded("good", 50), bonded("lazy", 40), late],
        );
        store_valset(&mut store, &valset(1, 50)).unwrap();
        store_valset(&mut store, &valset(2, 95)).unwrap();
        confirm_valset(&mut store, 1, "orch_good");

        let events = valset_slashing(&mut store, &env, &params()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].ty, "hyperion_slash");
        assert_eq!(last_slashed_valset_nonce(&store, 1).unwrap(), 1);

        let lazy = staking::validator(&store, "lazy").unwrap().unwrap();
        assert!(lazy.jailed);
        assert_eq!(lazy.consensus_power, 40);
        assert_eq!(
            pending(&store)[1],
            CosmosMsg::Custom(HyperionMsg::JailValidator {
                validator: "lazy".to_string()
            })
        );
        let data = orchestrator_data(&store, "orch_lazy", 1).unwrap();
        assert_eq!(data.total_slash_count, 1);
        assert_eq!(data.slash_data[0].reason, MISSING_VALSET_CONFIRM);

        // the same valset is not checked twice
        assert!(valset_slashing(&mut store, &env, &params())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn unbonding_validator_answers_within_window() {
        let mut store = MockStorage::new();
        let mut env = mock_env();
        env.block.height = 100;
        let mut leaving = bonded("leaving", 10);
        leaving.status = BondStatus::Unbonding;
        leaving.unbonding_height = 55;
        let mut gone = bonded("gone", 10);
        gone.status = BondStatus::Unbonding;
        gone.unbonding_height = 40;
        setup(&mut store, &env, vec![leaving, gone]);
        store_valset(&mut store, &valset(1, 50)).unwrap();

        let events = valset_slashing(&mut store, &env, &params()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].attributes[1].value, "leaving");
    }

    #[test]
    fn missing_batch_confirm_is_slashed() {
        let mut store = MockStorage::new();
        let mut env = mock_env();
        env.block.height = 100;
        setup(&mut store, &env, vec![bonded("good", 50), bonded("lazy", 40)]);
        let token = EthAddress::new([9; 20]);
        let batch = OutgoingTxBatch {
            hyperion_id: 1,
            batch_nonce: 1,
            batch_timeout: 1_000,
            transactions: vec![],
            token_contract: token,
            block: 70,
        };
        store_batch(&mut store, &batch).unwrap();
        store_batch_confirm(
            &mut store,
            &BatchConfirm {
                hyperion_id: 1,
                nonce: 1,
                token_contract: token,
                eth_signer: EthAddress::new([1; 20]),
                orchestrator: "orch_good".to_string(),
                signature: String::new(),
            },
        )
        .unwrap();

        let events = batch_slashing(&mut store, &env, &params()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].attributes[1].value, "lazy");
        assert_eq!(LAST_SLASHED_BATCH_BLOCK.load(&store, 1).unwrap(), 70);
        assert!(batch_slashing(&mut store, &env, &params())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn young_chain_is_not_slashed() {
        let mut store = MockStorage::new();
        let mut env = mock_env();
        env.block.height = 5;
        setup(&mut store, &env, vec![bonded("lazy", 40)]);
        store_valset(&mut store, &valset(1, 1)).unwrap();
        assert!(valset_slashing(&mut store, &env, &params())
            .unwrap()
            .is_empty());
    }
}
