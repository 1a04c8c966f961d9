//! Custom messages the Hyperion contract sends to the host chain.
//!
//! They cover what a plain `BankMsg` cannot express: minting, staking
//! penalties, denom metadata and ERC20 token-pair plumbing.

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Coin, CosmosMsg, Decimal, Empty};

/// Message that the Hyperion contract can send to the host chain.
/// The host has to route these to its bank, staking, distribution and erc20 modules.
#[cw_serde]
pub enum HyperionMsg {
    /// Mints `amount` and credits it to `recipient`.
    MintTokens { amount: Coin, recipient: String },
    /// Moves coins held by the contract into the community pool.
    FundCommunityPool { amount: Vec<Coin> },
    /// Slashes a validator by `fraction` of the stake it had at `infraction_height`.
    SlashValidator {
        /// Validator operator address
        validator: String,
        infraction_height: u64,
        /// Consensus power at the time of the infraction
        power: u64,
        fraction: Decimal,
    },
    /// Jails a validator.
    JailValidator { validator: String },
    /// Creates or replaces the bank metadata of a denom.
    SetDenomMetadata { metadata: DenomMetadata },
    /// Deploys the local ERC20 representation of `denom` at `contract`.
    DeployErc20 {
        denom: String,
        contract: String,
        name: String,
        symbol: String,
        decimals: u32,
    },
    /// Enables the dynamic precompile for a deployed ERC20 contract.
    EnableDynamicPrecompile { contract: String },
}

/// Bank metadata of a denom, mirroring the host's `Metadata` type.
#[cw_serde]
#[derive(Default)]
pub struct DenomMetadata {
    pub description: String,
    pub denom_units: Vec<DenomUnit>,
    pub base: String,
    pub display: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub logo: String,
}

impl DenomMetadata {
    /// Exponent of the unit named like `display`, if any.
    pub fn display_exponent(&self) -> Option<u32> {
        self.denom_units
            .iter()
            .find(|unit| unit.denom == self.display)
            .map(|unit| unit.exponent)
    }
}

#[cw_serde]
pub struct DenomUnit {
    pub denom: String,
    pub exponent: u32,
}

pub type HyperionSudoMsg = Empty;
pub type HyperionQuery = Empty;

// make HyperionMsg to implement CosmosMsg::CustomMsg
impl cosmwasm_std::CustomMsg for HyperionMsg {}

impl From<HyperionMsg> for CosmosMsg<HyperionMsg> {
    fn from(original: HyperionMsg) -> Self {
        CosmosMsg::Custom(original)
    }
}
