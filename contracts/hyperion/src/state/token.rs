use cosmwasm_std::{Order, StdResult, Storage, Uint128};
use cw_storage_plus::Map;

use crate::error::ContractError;
use crate::types::{EthAddress, TokenAddressToDenom};

/// (hyperion id, token) -> mapping
pub(crate) const TOKEN_TO_DENOM: Map<(u64, &[u8]), TokenAddressToDenom> =
    Map::new("token_to_denom");
/// (hyperion id, denom) -> token
pub(crate) const DENOM_TO_TOKEN: Map<(u64, &str), EthAddress> = Map::new("denom_to_token");
/// (hyperion id, token) -> amount of a cosmos-originated token locked on the
/// counterparty chain
pub(crate) const CONTRACT_BALANCE: Map<(u64, &[u8]), Uint128> = Map::new("contract_balance");

pub fn token_from_address(
    storage: &dyn Storage,
    hyperion_id: u64,
    token: &EthAddress,
) -> StdResult<Option<TokenAddressToDenom>> {
    TOKEN_TO_DENOM.may_load(storage, (hyperion_id, token.as_bytes().as_slice()))
}

pub fn token_from_denom(
    storage: &dyn Storage,
    hyperion_id: u64,
    denom: &str,
) -> StdResult<Option<TokenAddressToDenom>> {
    match DENOM_TO_TOKEN.may_load(storage, (hyperion_id, denom))? {
        Some(token) => token_from_address(storage, hyperion_id, &token),
        None => Ok(None),
    }
}

pub fn set_token(
    storage: &mut dyn Storage,
    hyperion_id: u64,
    mapping: &TokenAddressToDenom,
) -> StdResult<()> {
    TOKEN_TO_DENOM.save(
        storage,
        (hyperion_id, mapping.token_address.as_bytes().as_slice()),
        mapping,
    )?;
    DENOM_TO_TOKEN.save(storage, (hyperion_id, &mapping.denom), &mapping.token_address)
}

pub fn remove_token(storage: &mut dyn Storage, hyperion_id: u64, mapping: &TokenAddressToDenom) {
    TOKEN_TO_DENOM.remove(
        storage,
        (hyperion_id, mapping.token_address.as_bytes().as_slice()),
    );
    DENOM_TO_TOKEN.remove(storage, (hyperion_id, &mapping.denom));
}

pub fn tokens(storage: &dyn Storage, hyperion_id: u64) -> StdResult<Vec<TokenAddressToDenom>> {
    TOKEN_TO_DENOM
        .prefix(hyperion_id)
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, mapping)| mapping))
        .collect()
}

pub fn contract_balance(
    storage: &dyn Storage,
    hyperion_id: u64,
    token: &EthAddress,
) -> StdResult<Uint128> {
    Ok(CONTRACT_BALANCE
        .may_load(storage, (hyperion_id, token.as_bytes().as_slice()))?
        .unwrap_or_default())
}

pub fn increase_contract_balance(
    storage: &mut dyn Storage,
    hyperion_id: u64,
    token: &EthAddress,
    amount: Uint128,
) -> Result<(), ContractError> {
    let balance = contract_balance(storage, hyperion_id, token)?.checked_add(amount)?;
    CONTRACT_BALANCE.save(storage, (hyperion_id, token.as_bytes().as_slice()), &balance)?;
    Ok(())
}

/// Fails with `SupplyOverflow` when more than the locked balance is released.
pub fn decrease_contract_balance(
    storage: &mut dyn Storage,
    hyperion_id: u64,
    token: &EthAddress,
    amount: Uint128,
) -> Result<(), ContractError> {
    let balance = contract_balance(storage, hyperion_id, token)?
        .checked_sub(amount)
        .map_err(|_| {
            ContractError::SupplyOverflow(format!("locked balance of {token} below {amount}"))
        })?;
    CONTRACT_BALANCE.save(storage, (hyperion_id, token.as_bytes().as_slice()), &balance)?;
    Ok(())
}
