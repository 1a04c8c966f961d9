//! Registry of local ERC20 representations of bridged denoms.

use cosmwasm_std::{StdResult, Storage};
use cw_storage_plus::Map;
use hyperion_bindings::{DenomMetadata, HyperionMsg};

use crate::error::ContractError;
use crate::host::queue;
use crate::types::eth::{keccak256, EthAddress};

const ERC20_ADDRESS_SALT: &[u8] = b"hyperion-erc20";

/// denom -> local ERC20 contract
pub(crate) const TOKEN_PAIRS: Map<&str, EthAddress> = Map::new("erc20_token_pairs");

/// Deterministic address of the local ERC20 for `denom`.
pub fn local_erc20_address(denom: &str) -> EthAddress {
    let mut preimage = ERC20_ADDRESS_SALT.to_vec();
    preimage.extend_from_slice(denom.as_bytes());
    let hash = keccak256(&preimage);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    EthAddress::new(bytes)
}

pub fn token_pair(storage: &dyn Storage, denom: &str) -> StdResult<Option<EthAddress>> {
    TOKEN_PAIRS.may_load(storage, denom)
}

/// Registers the denom described by `metadata`, deploying its ERC20 and
/// enabling its precompile. An existing pair is returned unchanged.
pub fn ensure_token_pair(
    storage: &mut dyn Storage,
    metadata: &DenomMetadata,
) -> Result<EthAddress, ContractError> {
    if let Some(existing) = token_pair(storage, &metadata.base)? {
        return Ok(existing);
    }
    if metadata.base.is_empty() {
        return Err(ContractError::invalid("denom metadata without base denom"));
    }
    let contract = local_erc20_address(&metadata.base);
    TOKEN_PAIRS.save(storage, &metadata.base, &contract)?;
    queue(
        storage,
        HyperionMsg::DeployErc20 {
            denom: metadata.base.clone(),
            contract: contract.to_string(),
            name: metadata.name.clone(),
            symbol: metadata.symbol.clone(),
            decimals: metadata.decimals,
        },
    )?;
    queue(
        storage,
        HyperionMsg::EnableDynamicPrecompile {
            contract: contract.to_string(),
        },
    )?;
    Ok(contract)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::pending;
    use cosmwasm_std::testing::MockStorage;

    #[test]
    fn registers_once() {
        let mut store = MockStorage::new();
        let metadata = DenomMetadata {
            base: "hyperion/1/0xabc".to_string(),
            name: "Token".to_string(),
            symbol: "TKN".to_string(),
            decimals: 6,
            ..Default::default()
        };
        let first = ensure_token_pair(&mut store, &metadata).unwrap();
        let second = ensure_token_pair(&mut store, &metadata).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, local_erc20_address("hyperion/1/0xabc"));
        assert_ne!(first, local_erc20_address("hyperion/1/0xabd"));
        assert_eq!(pending(&store).len(), 2);
    }
}
