use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Deps, Order, StdResult, Storage};
use cw_controllers::Admin;
use cw_storage_plus::{Item, Map};

use crate::error::ContractError;
use crate::types::{CounterpartyChainParams, Params};

pub(crate) const CONFIG: Item<Config> = Item::new("config");
pub(crate) const ADMIN: Admin = Admin::new("admin");
pub(crate) const PARAMS: Item<Params> = Item::new("params");
pub(crate) const CHAIN_PARAMS: Map<u64, CounterpartyChainParams> = Map::new("chain_params");

pub const DEFAULT_MAX_BATCH_SIZE: u32 = 100;

/// Config are instantiate-time bridge settings
#[cw_serde]
pub struct Config {
    /// Denom bridge fees are paid in
    pub native_fee_denom: String,
    /// Most transfers a requested batch may carry
    pub max_batch_size: u32,
}

pub fn chain_params(
    storage: &dyn Storage,
    hyperion_id: u64,
) -> Result<CounterpartyChainParams, ContractError> {
    CHAIN_PARAMS
        .may_load(storage, hyperion_id)?
        .ok_or(ContractError::InvalidHyperionId(hyperion_id))
}

/// Every configured chain, ordered by hyperion id.
pub fn all_chain_params(storage: &dyn Storage) -> StdResult<Vec<CounterpartyChainParams>> {
    CHAIN_PARAMS
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, params)| params))
        .collect()
}

/// The contract admin or one of the params admins.
pub fn is_admin(deps: Deps, addr: &Addr) -> StdResult<bool> {
    if ADMIN.is_admin(deps, addr)? {
        return Ok(true);
    }
    let params = PARAMS.may_load(deps.storage)?.unwrap_or_default();
    Ok(params.admins.contains(addr))
}

pub fn ensure_admin(deps: Deps, addr: &Addr) -> Result<(), ContractError> {
    if !is_admin(deps, addr)? {
        return Err(ContractError::Unauthorized);
    }
    Ok(())
}
