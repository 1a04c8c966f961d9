use cosmwasm_std::{BankMsg, Coin, StdResult, Storage, Uint256};
use cw_storage_plus::Map;
use hyperion_bindings::{DenomMetadata, HyperionMsg};

use crate::error::ContractError;
use crate::host::queue;

/// Supply minted and burned through the bridge, per denom.
pub(crate) const SUPPLY: Map<&str, Uint256> = Map::new("bank_supply");
pub(crate) const DENOM_METADATA: Map<&str, DenomMetadata> = Map::new("bank_denom_metadata");

pub fn supply(storage: &dyn Storage, denom: &str) -> StdResult<Uint256> {
    Ok(SUPPLY.may_load(storage, denom)?.unwrap_or_default())
}

/// Fails with `SupplyOverflow` when minting `amount` would not fit 256 bits.
pub fn ensure_mintable(
    storage: &dyn Storage,
    denom: &str,
    amount: Uint256,
) -> Result<(), ContractError> {
    supply(storage, denom)?
        .checked_add(amount)
        .map_err(|_| ContractError::SupplyOverflow(denom.to_string()))?;
    Ok(())
}

pub fn mint(storage: &mut dyn Storage, coin: &Coin, recipient: &str) -> Result<(), ContractError> {
    if coin.amount.is_zero() {
        return Ok(());
    }
    let new_supply = supply(storage, &coin.denom)?
        .checked_add(Uint256::from(coin.amount))
        .map_err(|_| ContractError::SupplyOverflow(coin.denom.clone()))?;
    SUPPLY.save(storage, &coin.denom, &new_supply)?;
    queue(
        storage,
        HyperionMsg::MintTokens {
            amount: coin.clone(),
            recipient: recipient.to_string(),
        },
    )?;
    Ok(())
}

/// Burns coins held by the contract.
pub fn burn(storage: &mut dyn Storage, coin: &Coin) -> Result<(), ContractError> {
    if coin.amount.is_zero() {
        return Ok(());
    }
    let new_supply = supply(storage, &coin.denom)?.saturating_sub(Uint256::from(coin.amount));
    SUPPLY.save(storage, &coin.denom, &new_supply)?;
    queue(
        storage,
        BankMsg::Burn {
            amount: vec![coin.clone()],
        },
    )?;
    Ok(())
}

/// Sends coins held by the contract.
pub fn send(storage: &mut dyn Storage, to: &str, coins: Vec<Coin>) -> StdResult<()> {
    let amount: Vec<Coin> = coins.into_iter().filter(|c| !c.amount.is_zero()).collect();
    if amount.is_empty() {
        return Ok(());
    }
    queue(
        storage,
        BankMsg::Send {
            to_address: to.to_string(),
            amount,
        },
    )
}

/// Moves coins held by the contract to the community pool.
pub fn fund_community_pool(storage: &mut dyn Storage, coins: Vec<Coin>) -> StdResult<()> {
    let amount: Vec<Coin> = coins.into_iter().filter(|c| !c.amount.is_zero()).collect();
    if amount.is_empty() {
        return Ok(());
    }
    queue(storage, HyperionMsg::FundCommunityPool { amount })
}

pub fn denom_metadata(storage: &dyn Storage, denom: &str) -> StdResult<Option<DenomMetadata>> {
    DENOM_METADATA.may_load(storage, denom)
}

pub fn set_denom_metadata(storage: &mut dyn Storage, metadata: DenomMetadata) -> StdResult<()> {
    DENOM_METADATA.save(storage, &metadata.base, &metadata)?;
    queue(storage, HyperionMsg::SetDenomMetadata { metadata })
}
