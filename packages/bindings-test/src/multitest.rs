use anyhow::{bail, Result as AnyResult};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::ops::{Deref, DerefMut};

use cosmwasm_std::testing::{MockApi, MockStorage};
use cosmwasm_std::Order::Ascending;
use cosmwasm_std::{
    Addr, Api, BankMsg, Binary, BlockInfo, CustomMsg, CustomQuery, Decimal, Empty, Querier,
    QuerierResult, StdResult, Storage, Timestamp,
};
use cw_multi_test::{
    App, AppResponse, BankKeeper, BankSudo, BasicAppBuilder, CosmosRouter, Module, WasmKeeper,
};
use cw_storage_plus::{Item, Map};
use serde::{Deserialize, Serialize};

use hyperion_bindings::{DenomMetadata, HyperionMsg, HyperionQuery};

/// How many seconds per block
/// (when we increment block.height, use this multiplier for block.time)
pub const BLOCK_TIME: u64 = 5;

/// Account standing in for the distribution module's community pool.
pub const COMMUNITY_POOL_ADDR: &str = "community_pool";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SlashRecord {
    pub validator: String,
    pub infraction_height: u64,
    pub power: u64,
    pub fraction: Decimal,
}

const SLASHES: Item<Vec<SlashRecord>> = Item::new("hyperion_module_slashes");
const JAILED: Map<&str, u64> = Map::new("hyperion_module_jailed");
const METADATA: Map<&str, DenomMetadata> = Map::new("hyperion_module_metadata");
const ERC20S: Map<&str, String> = Map::new("hyperion_module_erc20");
const PRECOMPILES: Map<&str, bool> = Map::new("hyperion_module_precompiles");

/// Host-side behaviour of `HyperionMsg`: mints through the bank, records
/// staking penalties and erc20 plumbing for inspection.
pub struct HyperionModule {}

impl HyperionModule {
    pub fn slashes(&self, storage: &dyn Storage) -> StdResult<Vec<SlashRecord>> {
        Ok(SLASHES.may_load(storage)?.unwrap_or_default())
    }

    /// Jailed validators with the height they were jailed at.
    pub fn jailed(&self, storage: &dyn Storage) -> StdResult<Vec<(String, u64)>> {
        JAILED.range(storage, None, None, Ascending).collect()
    }

    pub fn denom_metadata(
        &self,
        storage: &dyn Storage,
        denom: &str,
    ) -> StdResult<Option<DenomMetadata>> {
        METADATA.may_load(storage, denom)
    }

    /// Deployed erc20 contract for a denom, with its precompile flag.
    pub fn erc20(&self, storage: &dyn Storage, denom: &str) -> StdResult<Option<(String, bool)>> {
        let Some(contract) = ERC20S.may_load(storage, denom)? else {
            return Ok(None);
        };
        let enabled = PRECOMPILES.may_load(storage, &contract)?.unwrap_or(false);
        Ok(Some((contract, enabled)))
    }
}

impl Module for HyperionModule {
    type ExecT = HyperionMsg;
    type QueryT = Empty;
    type SudoT = Empty;

    fn execute<ExecC, QueryC>(
        &self,
        api: &dyn Api,
        storage: &mut dyn Storage,
        router: &dyn CosmosRouter<ExecC = ExecC, QueryC = QueryC>,
        block: &BlockInfo,
        sender: Addr,
        msg: HyperionMsg,
    ) -> AnyResult<AppResponse>
    where
        ExecC: Debug + Clone + PartialEq + JsonSchema + DeserializeOwned + CustomMsg,
        QueryC: CustomQuery + DeserializeOwned + 'static,
    {
        match msg {
            HyperionMsg::MintTokens { amount, recipient } => {
                let mint_msg = BankSudo::Mint {
                    to_address: recipient,
                    amount: vec![amount],
                };
                router.sudo(api, storage, block, mint_msg.into())?;
            }
            HyperionMsg::FundCommunityPool { amount } => {
                let send = BankMsg::Send {
                    to_address: MockApi::default().addr_make(COMMUNITY_POOL_ADDR).to_string(),
                    amount,
                };
                router.execute(api, storage, block, sender, send.into())?;
            }
            HyperionMsg::SlashValidator {
                validator,
                infraction_height,
                power,
                fraction,
            } => {
                let mut slashes = SLASHES.may_load(storage)?.unwrap_or_default();
                slashes.push(SlashRecord {
                    validator,
                    infraction_height,
                    power,
                    fraction,
                });
                SLASHES.save(storage, &slashes)?;
            }
            HyperionMsg::JailValidator { validator } => {
                if JAILED.has(storage, &validator) {
                    bail!("validator {validator} already jailed");
                }
                JAILED.save(storage, &validator, &block.height)?;
            }
            HyperionMsg::SetDenomMetadata { metadata } => {
                METADATA.save(storage, &metadata.base, &metadata)?;
            }
            HyperionMsg::DeployErc20 {
                denom, contract, ..
            } => {
                if ERC20S.has(storage, &denom) {
                    bail!("erc20 for {denom} already deployed");
                }
                ERC20S.save(storage, &denom, &contract)?;
            }
            HyperionMsg::EnableDynamicPrecompile { contract } => {
                PRECOMPILES.save(storage, &contract, &true)?;
            }
        }
        Ok(AppResponse::default())
    }

    fn query(
        &self,
        _api: &dyn Api,
        _storage: &dyn Storage,
        _querier: &dyn Querier,
        _block: &BlockInfo,
        _request: Empty,
    ) -> AnyResult<Binary> {
        bail!("query not implemented for HyperionModule")
    }

    fn sudo<ExecC, QueryC>(
        &self,
        _api: &dyn Api,
        _storage: &mut dyn Storage,
        _router: &dyn CosmosRouter<ExecC = ExecC, QueryC = QueryC>,
        _block: &BlockInfo,
        _msg: Self::SudoT,
    ) -> AnyResult<AppResponse>
    where
        ExecC: Debug + Clone + PartialEq + JsonSchema + DeserializeOwned + 'static,
        QueryC: CustomQuery + DeserializeOwned + 'static,
    {
        bail!("sudo not implemented for HyperionModule")
    }
}

pub type HyperionAppWrapped =
    App<BankKeeper, MockApi, MockStorage, HyperionModule, WasmKeeper<HyperionMsg, HyperionQuery>>;

pub struct HyperionApp(HyperionAppWrapped);

impl Deref for HyperionApp {
    type Target = HyperionAppWrapped;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for HyperionApp {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Querier for HyperionApp {
    fn raw_query(&self, bin_request: &[u8]) -> QuerierResult {
        self.0.raw_query(bin_request)
    }
}

impl HyperionApp {
    pub fn new() -> Self {
        Self::new_at_height(1)
    }

    pub fn new_at_height(height: u64) -> Self {
        let block_info = BlockInfo {
            height,
            time: Timestamp::from_seconds(1714119228),
            chain_id: "helios-testnet".to_owned(),
        };
        Self(
            BasicAppBuilder::<HyperionMsg, HyperionQuery>::new_custom()
                .with_custom(HyperionModule {})
                .with_block(block_info)
                .build(|_, _, _| {}),
        )
    }

    pub fn block_info(&self) -> BlockInfo {
        self.0.block_info()
    }

    /// This advances BlockInfo by given number of blocks.
    /// It does not do any callbacks, but keeps the ratio of seconds/block
    pub fn advance_blocks(&mut self, blocks: u64) {
        self.update_block(|block| {
            block.time = block.time.plus_seconds(BLOCK_TIME * blocks);
            block.height += blocks;
        });
    }
}

impl Default for HyperionApp {
    fn default() -> Self {
        Self::new()
    }
}
