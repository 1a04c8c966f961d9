use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Coin, Decimal};

use crate::error::ContractError;
use crate::types::eth::EthAddress;

pub const DEFAULT_SIGNED_VALSETS_WINDOW: u64 = 25_000;
pub const DEFAULT_SIGNED_BATCHES_WINDOW: u64 = 25_000;
pub const DEFAULT_UNBOND_SLASHING_VALSETS_WINDOW: u64 = 25_000;
/// Milliseconds
pub const DEFAULT_TARGET_BATCH_TIMEOUT: u64 = 43_200_000;
/// Milliseconds
pub const DEFAULT_TARGET_OUTGOING_TX_TIMEOUT: u64 = 600_000;
/// Milliseconds
pub const DEFAULT_AVERAGE_BLOCK_TIME: u64 = 2_000;
/// Milliseconds
pub const DEFAULT_AVERAGE_COUNTERPARTY_BLOCK_TIME: u64 = 2_000;

pub const MAX_RPCS: usize = 100;
pub const MAX_CHAIN_NAME_LEN: usize = 100;

pub fn default_slash_fraction() -> Decimal {
    Decimal::permille(1)
}

/// An RPC endpoint of the counterparty chain credited by observed claims.
#[cw_serde]
pub struct Rpc {
    pub url: String,
    pub reputation: u64,
    pub last_height_used: u64,
}

/// A token known to exist on the counterparty chain when the chain is added.
#[cw_serde]
pub struct DefaultToken {
    pub token_address: EthAddress,
    pub denom: String,
    pub is_cosmos_originated: bool,
}

/// Configuration of one bridge instance, keyed by `hyperion_id`.
#[cw_serde]
pub struct CounterpartyChainParams {
    pub hyperion_id: u64,
    pub bridge_counterparty_address: EthAddress,
    pub bridge_chain_id: u64,
    pub bridge_chain_name: String,
    pub bridge_chain_logo: String,
    pub bridge_chain_type: String,

    pub signed_valsets_window: u64,
    pub signed_batches_window: u64,
    pub unbond_slashing_valsets_window: u64,

    pub target_batch_timeout: u64,
    pub target_outgoing_tx_timeout: u64,
    pub average_block_time: u64,
    pub average_counterparty_block_time: u64,

    pub slash_fraction_valset: Decimal,
    pub slash_fraction_batch: Decimal,
    pub slash_fraction_bad_eth_signature: Decimal,

    /// Counterparty height the bridge contract was deployed at
    pub bridge_contract_start_height: u64,
    pub valset_reward: Option<Coin>,
    pub default_tokens: Vec<DefaultToken>,
    pub paused: bool,
    pub rpcs: Vec<Rpc>,
    /// Valset nonces start after this value
    pub offset_valset_nonce: u64,

    /// Reject claims whose event nonce does not directly follow the
    /// submitting validator's previous claim.
    pub enforce_event_nonce_contiguity: bool,
    /// Blocks an observed attestation is kept after the last observed nonce
    /// moved past it. Zero prunes on the next block.
    pub attestation_retention_blocks: u64,
    /// Height from which a validator voting twice on an attestation is rejected.
    pub duplicate_vote_check_height: u64,
}

impl CounterpartyChainParams {
    pub fn new_default(hyperion_id: u64, bridge_chain_id: u64) -> Self {
        Self {
            hyperion_id,
            bridge_counterparty_address: EthAddress::ZERO,
            bridge_chain_id,
            bridge_chain_name: String::new(),
            bridge_chain_logo: String::new(),
            bridge_chain_type: "evm".to_string(),
            signed_valsets_window: DEFAULT_SIGNED_VALSETS_WINDOW,
            signed_batches_window: DEFAULT_SIGNED_BATCHES_WINDOW,
            unbond_slashing_valsets_window: DEFAULT_UNBOND_SLASHING_VALSETS_WINDOW,
            target_batch_timeout: DEFAULT_TARGET_BATCH_TIMEOUT,
            target_outgoing_tx_timeout: DEFAULT_TARGET_OUTGOING_TX_TIMEOUT,
            average_block_time: DEFAULT_AVERAGE_BLOCK_TIME,
            average_counterparty_block_time: DEFAULT_AVERAGE_COUNTERPARTY_BLOCK_TIME,
            slash_fraction_valset: default_slash_fraction(),
            slash_fraction_batch: default_slash_fraction(),
            slash_fraction_bad_eth_signature: default_slash_fraction(),
            bridge_contract_start_height: 0,
            valset_reward: None,
            default_tokens: vec![],
            paused: false,
            rpcs: vec![],
            offset_valset_nonce: 0,
            enforce_event_nonce_contiguity: false,
            attestation_retention_blocks: 0,
            duplicate_vote_check_height: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ContractError> {
        if self.hyperion_id == 0 {
            return Err(ContractError::InvalidHyperionId(0));
        }
        if self.average_block_time == 0 || self.average_counterparty_block_time == 0 {
            return Err(ContractError::invalid("average block times must be positive"));
        }
        if self.target_batch_timeout == 0 {
            return Err(ContractError::invalid("target batch timeout must be positive"));
        }
        if self.signed_valsets_window == 0 || self.signed_batches_window == 0 {
            return Err(ContractError::invalid("signing windows must be positive"));
        }
        for fraction in [
            self.slash_fraction_valset,
            self.slash_fraction_batch,
            self.slash_fraction_bad_eth_signature,
        ] {
            if fraction > Decimal::one() {
                return Err(ContractError::invalid(format!(
                    "slash fraction {fraction} is above one"
                )));
            }
        }
        if self.bridge_chain_name.len() > MAX_CHAIN_NAME_LEN {
            return Err(ContractError::invalid("bridge chain name too long"));
        }
        if self.rpcs.len() > MAX_RPCS {
            return Err(ContractError::invalid("too many rpcs"));
        }
        for token in &self.default_tokens {
            if token.denom.is_empty() {
                return Err(ContractError::invalid("default token without denom"));
            }
        }
        Ok(())
    }
}

/// Module-wide params.
#[cw_serde]
#[derive(Default)]
pub struct Params {
    /// Accounts allowed to run chain management messages besides the contract admin
    pub admins: Vec<Addr>,
}
