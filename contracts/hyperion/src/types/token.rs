use cosmwasm_schema::cw_serde;

use crate::types::eth::EthAddress;

pub const HYPERION_DENOM_PREFIX: &str = "hyperion";
pub const DEFAULT_TOKEN_DECIMALS: u32 = 18;

/// Mapping between a counterparty token and a local denom.
///
/// Cosmos-originated tokens are locked in the bridge contract while on the
/// counterparty chain, the others are minted and burned locally.
#[cw_serde]
pub struct TokenAddressToDenom {
    pub token_address: EthAddress,
    pub denom: String,
    pub is_cosmos_originated: bool,
}

/// Denom minted for a counterparty token first seen in a deposit.
pub fn hyperion_denom(hyperion_id: u64, token: &EthAddress) -> String {
    format!("{HYPERION_DENOM_PREFIX}/{hyperion_id}/{token}")
}
