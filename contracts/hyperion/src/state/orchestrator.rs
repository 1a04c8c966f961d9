use cosmwasm_std::{StdResult, Storage};
use cw_storage_plus::Map;

use crate::error::ContractError;
use crate::types::{EthAddress, OrchestratorData};

/// (hyperion id, orchestrator) -> validator operator
pub(crate) const ORCHESTRATOR_VALIDATOR: Map<(u64, &str), String> =
    Map::new("orchestrator_validator");
/// (hyperion id, validator) -> orchestrator
pub(crate) const VALIDATOR_ORCHESTRATOR: Map<(u64, &str), String> =
    Map::new("validator_orchestrator");
/// (hyperion id, validator) -> counterparty signing key
pub(crate) const VALIDATOR_ETH: Map<(u64, &str), EthAddress> = Map::new("validator_eth");
/// (hyperion id, counterparty signing key) -> validator
pub(crate) const ETH_VALIDATOR: Map<(u64, &[u8]), String> = Map::new("eth_validator");
/// (orchestrator, hyperion id) -> statistics
pub(crate) const ORCHESTRATOR_DATA: Map<(&str, u64), OrchestratorData> =
    Map::new("orchestrator_data");

pub fn validator_by_orchestrator(
    storage: &dyn Storage,
    hyperion_id: u64,
    orchestrator: &str,
) -> StdResult<Option<String>> {
    ORCHESTRATOR_VALIDATOR.may_load(storage, (hyperion_id, orchestrator))
}

pub fn orchestrator_by_validator(
    storage: &dyn Storage,
    hyperion_id: u64,
    validator: &str,
) -> StdResult<Option<String>> {
    VALIDATOR_ORCHESTRATOR.may_load(storage, (hyperion_id, validator))
}

pub fn eth_address_by_validator(
    storage: &dyn Storage,
    hyperion_id: u64,
    validator: &str,
) -> StdResult<Option<EthAddress>> {
    VALIDATOR_ETH.may_load(storage, (hyperion_id, validator))
}

pub fn validator_by_eth_address(
    storage: &dyn Storage,
    hyperion_id: u64,
    eth: &EthAddress,
) -> StdResult<Option<String>> {
    ETH_VALIDATOR.may_load(storage, (hyperion_id, eth.as_bytes().as_slice()))
}

/// Registers the delegate keys of a validator. Keys can be set only once.
pub fn set_delegate_keys(
    storage: &mut dyn Storage,
    hyperion_id: u64,
    validator: &str,
    orchestrator: &str,
    eth: &EthAddress,
) -> Result<(), ContractError> {
    if validator_by_orchestrator(storage, hyperion_id, orchestrator)?.is_some()
        || eth_address_by_validator(storage, hyperion_id, validator)?.is_some()
        || validator_by_eth_address(storage, hyperion_id, eth)?.is_some()
    {
        return Err(ContractError::ResetDelegateKeys);
    }
    ORCHESTRATOR_VALIDATOR.save(storage, (hyperion_id, orchestrator), &validator.to_string())?;
    VALIDATOR_ORCHESTRATOR.save(storage, (hyperion_id, validator), &orchestrator.to_string())?;
    VALIDATOR_ETH.save(storage, (hyperion_id, validator), eth)?;
    ETH_VALIDATOR.save(
        storage,
        (hyperion_id, eth.as_bytes().as_slice()),
        &validator.to_string(),
    )?;
    Ok(())
}

pub fn orchestrator_data(
    storage: &dyn Storage,
    orchestrator: &str,
    hyperion_id: u64,
) -> StdResult<OrchestratorData> {
    Ok(ORCHESTRATOR_DATA
        .may_load(storage, (orchestrator, hyperion_id))?
        .unwrap_or_else(|| OrchestratorData::new(orchestrator, hyperion_id)))
}

/// Loads, mutates and stores the statistics of an orchestrator.
pub fn update_orchestrator_data(
    storage: &mut dyn Storage,
    orchestrator: &str,
    hyperion_id: u64,
    f: impl FnOnce(&mut OrchestratorData),
) -> StdResult<()> {
    let mut data = orchestrator_data(storage, orchestrator, hyperion_id)?;
    f(&mut data);
    ORCHESTRATOR_DATA.save(storage, (orchestrator, hyperion_id), &data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmwasm_std::testing::MockStorage;

    #[test]
    fn delegate_keys_are_set_once() {
        let mut store = MockStorage::new();
        let eth = EthAddress::new([1; 20]);
        set_delegate_keys(&mut store, 1, "val", "orch", &eth).unwrap();

        assert_eq!(
            validator_by_orchestrator(&store, 1, "orch").unwrap().as_deref(),
            Some("val")
        );
        assert_eq!(
            orchestrator_by_validator(&store, 1, "val").unwrap().as_deref(),
            Some("orch")
        );
        assert_eq!(
            validator_by_eth_address(&store, 1, &eth).unwrap().as_deref(),
            Some("val")
        );

        let err = set_delegate_keys(&mut store, 1, "val", "orch2", &EthAddress::new([2; 20]))
            .unwrap_err();
        assert_eq!(err, ContractError::ResetDelegateKeys);
        let err = set_delegate_keys(&mut store, 1, "val2", "orch2", &eth).unwrap_err();
        assert_eq!(err, ContractError::ResetDelegateKeys);

        // keys are scoped by hyperion id
        set_delegate_keys(&mut store, 2, "val", "orch", &eth).unwrap();
    }
}
