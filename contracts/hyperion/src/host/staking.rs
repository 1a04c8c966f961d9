//! Validator snapshot pushed by the host, standing in for the staking and
//! slashing keepers.

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Decimal, Env, Event, Order, StdResult, Storage, Uint128};
use cw_storage_plus::{Item, Map};
use hyperion_bindings::HyperionMsg;

use crate::error::ContractError;
use crate::host::queue;

#[cw_serde]
#[derive(Copy, Eq)]
pub enum BondStatus {
    Bonded,
    Unbonding,
    Unbonded,
}

#[cw_serde]
pub struct ValidatorInfo {
    /// Operator account of the validator
    pub operator: String,
    pub consensus_power: u64,
    pub status: BondStatus,
    pub jailed: bool,
    /// Height the validator started unbonding at, zero if it never did
    pub unbonding_height: u64,
    /// Signing-info start height
    pub start_height: u64,
}

impl ValidatorInfo {
    pub fn is_bonded(&self) -> bool {
        self.status == BondStatus::Bonded
    }
}

pub(crate) const VALIDATORS: Map<&str, ValidatorInfo> = Map::new("staking_validators");
pub(crate) const LAST_UNBONDING_HEIGHT: Item<u64> = Item::new("staking_last_unbonding_height");

/// Replaces the snapshot with `validators`.
pub fn sync_validators(
    storage: &mut dyn Storage,
    env: &Env,
    validators: Vec<ValidatorInfo>,
) -> Result<Event, ContractError> {
    let old: Vec<String> = VALIDATORS
        .keys(storage, None, None, Order::Ascending)
        .collect::<StdResult<_>>()?;
    for operator in old {
        VALIDATORS.remove(storage, &operator);
    }

    let mut bonded = 0u64;
    for val in &validators {
        if val.operator.is_empty() {
            return Err(ContractError::invalid("validator without operator"));
        }
        if VALIDATORS.has(storage, &val.operator) {
            return Err(ContractError::Duplicate(format!(
                "validator {} listed twice",
                val.operator
            )));
        }
        if val.status == BondStatus::Unbonding && val.unbonding_height == env.block.height {
            LAST_UNBONDING_HEIGHT.save(storage, &env.block.height)?;
        }
        if val.is_bonded() {
            bonded += 1;
        }
        VALIDATORS.save(storage, &val.operator, val)?;
    }

    Ok(Event::new("hyperion_sync_validators")
        .add_attribute("validators", validators.len().to_string())
        .add_attribute("bonded", bonded.to_string()))
}

pub fn validator(storage: &dyn Storage, operator: &str) -> StdResult<Option<ValidatorInfo>> {
    VALIDATORS.may_load(storage, operator)
}

/// Bonded validators ordered by power, highest first.
pub fn bonded_validators(storage: &dyn Storage) -> StdResult<Vec<ValidatorInfo>> {
    let mut bonded: Vec<ValidatorInfo> = VALIDATORS
        .range(storage, None, None, Order::Ascending)
        .filter_map(|item| match item {
            Ok((_, val)) if !val.is_bonded() => None,
            other => Some(other.map(|(_, val)| val)),
        })
        .collect::<StdResult<_>>()?;
    bonded.sort_by(|a, b| {
        b.consensus_power
            .cmp(&a.consensus_power)
            .then_with(|| a.operator.cmp(&b.operator))
    });
    Ok(bonded)
}

pub fn unbonding_validators(storage: &dyn Storage) -> StdResult<Vec<ValidatorInfo>> {
    VALIDATORS
        .range(storage, None, None, Order::Ascending)
        .filter_map(|item| match item {
            Ok((_, val)) if val.status != BondStatus::Unbonding => None,
            other => Some(other.map(|(_, val)| val)),
        })
        .collect()
}

/// Power of a validator in the last bonded set, zero when not bonded.
pub fn last_validator_power(storage: &dyn Storage, operator: &str) -> StdResult<u64> {
    Ok(validator(storage, operator)?
        .filter(ValidatorInfo::is_bonded)
        .map(|v| v.consensus_power)
        .unwrap_or_default())
}

pub fn last_total_power(storage: &dyn Storage) -> StdResult<u64> {
    Ok(bonded_validators(storage)?
        .iter()
        .map(|v| v.consensus_power)
        .sum())
}

pub fn last_unbonding_height(storage: &dyn Storage) -> StdResult<u64> {
    Ok(LAST_UNBONDING_HEIGHT.may_load(storage)?.unwrap_or_default())
}

/// Slashes `fraction` of the validator's power and returns the power it had.
pub fn slash(
    storage: &mut dyn Storage,
    operator: &str,
    infraction_height: u64,
    fraction: Decimal,
) -> Result<u64, ContractError> {
    let mut val = validator(storage, operator)?
        .ok_or_else(|| ContractError::Internal(format!("slashing unknown validator {operator}")))?;
    let power = val.consensus_power;
    let burned = Uint128::from(power).mul_floor(fraction).u128() as u64;
    val.consensus_power = power.saturating_sub(burned);
    VALIDATORS.save(storage, operator, &val)?;
    queue(
        storage,
        HyperionMsg::SlashValidator {
            validator: operator.to_string(),
            infraction_height,
            power,
            fraction,
        },
    )?;
    Ok(power)
}

/// Jails the validator. Returns `false` when it already was.
pub fn jail(storage: &mut dyn Storage, operator: &str) -> Result<bool, ContractError> {
    let mut val = validator(storage, operator)?
        .ok_or_else(|| ContractError::Internal(format!("jailing unknown validator {operator}")))?;
    if val.jailed {
        return Ok(false);
    }
    val.jailed = true;
    VALIDATORS.save(storage, operator, &val)?;
    queue(
        storage,
        HyperionMsg::JailValidator {
            validator: operator.to_string(),
        },
    )?;
    Ok(true)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::host::pending;
    use cosmwasm_std::testing::{mock_env, MockStorage};
    use cosmwasm_std::CosmosMsg;

    pub(crate) fn bonded(operator: &str, power: u64) -> ValidatorInfo {
        ValidatorInfo {
            operator: operator.to_string(),
            consensus_power: power,
            status: BondStatus::Bonded,
            jailed: false,
            unbonding_height: 0,
            start_height: 0,
        }
    }

    #[test]
    fn sync_replaces_snapshot() {
        let mut store = MockStorage::new();
        let env = mock_env();
        sync_validators(&mut store, &env, vec![bonded("a", 10), bonded("b", 20)]).unwrap();

        let mut leaving = bonded("b", 20);
        leaving.status = BondStatus::Unbonding;
        leaving.unbonding_height = env.block.height;
        let ev = sync_validators(&mut store, &env, vec![bonded("c", 5), leaving]).unwrap();
        assert_eq!(ev.attributes[1].value, "1");

        assert!(validator(&store, "a").unwrap().is_none());
        assert_eq!(last_total_power(&store).unwrap(), 5);
        assert_eq!(last_validator_power(&store, "b").unwrap(), 0);
        assert_eq!(unbonding_validators(&store).unwrap().len(), 1);
        assert_eq!(last_unbonding_height(&store).unwrap(), env.block.height);
    }

    #[test]
    fn sync_rejects_duplicates() {
        let mut store = MockStorage::new();
        let err = sync_validators(&mut store, &mock_env(), vec![bonded("a", 1), bonded("a", 2)])
            .unwrap_err();
        assert!(matches!(err, ContractError::Duplicate(_)));
    }

    #[test]
    fn bonded_set_ordered_by_power() {
        let mut store = MockStorage::new();
        sync_validators(
            &mut store,
            &mock_env(),
            vec![bonded("a", 10), bonded("b", 30), bonded("c", 10)],
        )
        .unwrap();
        let order: Vec<String> = bonded_validators(&store)
            .unwrap()
            .into_iter()
            .map(|v| v.operator)
            .collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn slash_and_jail_queue_host_messages() {
        let mut store = MockStorage::new();
        sync_validators(&mut store, &mock_env(), vec![bonded("a", 1000)]).unwrap();

        assert_eq!(slash(&mut store, "a", 7, Decimal::percent(10)).unwrap(), 1000);
        assert_eq!(last_validator_power(&store, "a").unwrap(), 900);
        assert!(jail(&mut store, "a").unwrap());
        assert!(!jail(&mut store, "a").unwrap());

        let msgs = pending(&store);
        assert_eq!(msgs.len(), 2);
        assert_eq!(
            msgs[0],
            CosmosMsg::Custom(HyperionMsg::SlashValidator {
                validator: "a".to_string(),
                infraction_height: 7,
                power: 1000,
                fraction: Decimal::percent(10),
            })
        );
        assert!(matches!(slash(&mut store, "zz", 1, Decimal::one()), Err(ContractError::Internal(_))));
    }
}
