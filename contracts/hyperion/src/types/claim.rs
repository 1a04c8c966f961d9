//! Claims orchestrators submit about events on the counterparty chain.

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Coin, Uint256};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ContractError;
use crate::types::eth::EthAddress;
use crate::types::valset::BridgeValidator;

pub const MAX_METADATA_DECIMALS: u32 = 18;
pub const MAX_METADATA_NAME_LEN: usize = 100;
pub const MAX_METADATA_SYMBOL_LEN: usize = 30;

#[cw_serde]
#[derive(Copy, Eq, PartialOrd, Ord)]
pub enum ClaimType {
    Deposit,
    Withdraw,
    Erc20Deployed,
    ValsetUpdated,
}

impl ClaimType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::Deposit => "CLAIM_TYPE_DEPOSIT",
            ClaimType::Withdraw => "CLAIM_TYPE_WITHDRAW",
            ClaimType::Erc20Deployed => "CLAIM_TYPE_ERC20_DEPLOYED",
            ClaimType::ValsetUpdated => "CLAIM_TYPE_VALSET_UPDATED",
        }
    }

    fn tag(&self) -> u8 {
        match self {
            ClaimType::Deposit => 1,
            ClaimType::Withdraw => 2,
            ClaimType::Erc20Deployed => 3,
            ClaimType::ValsetUpdated => 4,
        }
    }
}

/// Tokens locked in the bridge contract on the counterparty chain.
#[cw_serde]
pub struct DepositClaim {
    pub hyperion_id: u64,
    pub event_nonce: u64,
    pub block_height: u64,
    pub token_contract: EthAddress,
    pub amount: Uint256,
    /// Kept as submitted, an unparsable sender fails the deposit on observation
    pub ethereum_sender: String,
    pub cosmos_receiver: String,
    pub orchestrator: String,
    /// JSON [`ClaimData`], or empty
    pub data: String,
    pub tx_hash: String,
    pub rpc_used: String,
}

/// A batch was executed on the counterparty chain.
#[cw_serde]
pub struct WithdrawClaim {
    pub hyperion_id: u64,
    pub event_nonce: u64,
    pub block_height: u64,
    pub batch_nonce: u64,
    pub token_contract: EthAddress,
    pub orchestrator: String,
    pub tx_hash: String,
    pub rpc_used: String,
}

/// The bridge contract deployed an ERC20 for a local denom.
#[cw_serde]
pub struct Erc20DeployedClaim {
    pub hyperion_id: u64,
    pub event_nonce: u64,
    pub block_height: u64,
    pub cosmos_denom: String,
    pub token_contract: EthAddress,
    pub name: String,
    pub symbol: String,
    pub decimals: u64,
    pub orchestrator: String,
    pub tx_hash: String,
    pub rpc_used: String,
}

/// The bridge contract switched to a new valset.
#[cw_serde]
pub struct ValsetUpdatedClaim {
    pub hyperion_id: u64,
    pub event_nonce: u64,
    pub block_height: u64,
    pub valset_nonce: u64,
    pub members: Vec<BridgeValidator>,
    pub reward_amount: Uint256,
    pub reward_token: EthAddress,
    pub orchestrator: String,
    pub tx_hash: String,
    pub rpc_used: String,
}

#[cw_serde]
pub enum Claim {
    Deposit(DepositClaim),
    Withdraw(WithdrawClaim),
    Erc20Deployed(Erc20DeployedClaim),
    ValsetUpdated(ValsetUpdatedClaim),
}

macro_rules! claim_field {
    ($self:ident, $field:ident) => {
        match $self {
            Claim::Deposit(c) => &c.$field,
            Claim::Withdraw(c) => &c.$field,
            Claim::Erc20Deployed(c) => &c.$field,
            Claim::ValsetUpdated(c) => &c.$field,
        }
    };
}

impl Claim {
    pub fn claim_type(&self) -> ClaimType {
        match self {
            Claim::Deposit(_) => ClaimType::Deposit,
            Claim::Withdraw(_) => ClaimType::Withdraw,
            Claim::Erc20Deployed(_) => ClaimType::Erc20Deployed,
            Claim::ValsetUpdated(_) => ClaimType::ValsetUpdated,
        }
    }

    pub fn hyperion_id(&self) -> u64 {
        *claim_field!(self, hyperion_id)
    }

    pub fn event_nonce(&self) -> u64 {
        *claim_field!(self, event_nonce)
    }

    pub fn block_height(&self) -> u64 {
        *claim_field!(self, block_height)
    }

    pub fn orchestrator(&self) -> &str {
        claim_field!(self, orchestrator)
    }

    pub fn tx_hash(&self) -> &str {
        claim_field!(self, tx_hash)
    }

    pub fn rpc_used(&self) -> &str {
        claim_field!(self, rpc_used)
    }

    /// Content hash shared by every validator reporting the same event.
    ///
    /// The submitting orchestrator and the rpc it used are not part of it.
    pub fn claim_hash(&self) -> [u8; 32] {
        let mut h = ClaimHasher::new(self.claim_type());
        h.u64(self.hyperion_id());
        h.u64(self.event_nonce());
        h.u64(self.block_height());
        match self {
            Claim::Deposit(c) => {
                h.bytes(c.token_contract.as_bytes());
                h.bytes(&c.amount.to_be_bytes());
                h.str(&c.ethereum_sender);
                h.str(&c.cosmos_receiver);
                h.str(&c.data);
            }
            Claim::Withdraw(c) => {
                h.u64(c.batch_nonce);
                h.bytes(c.token_contract.as_bytes());
            }
            Claim::Erc20Deployed(c) => {
                h.str(&c.cosmos_denom);
                h.bytes(c.token_contract.as_bytes());
                h.str(&c.name);
                h.str(&c.symbol);
                h.u64(c.decimals);
            }
            Claim::ValsetUpdated(c) => {
                h.u64(c.valset_nonce);
                h.u64(c.members.len() as u64);
                for m in &c.members {
                    h.bytes(m.ethereum_address.as_bytes());
                    h.u64(m.power);
                }
                h.bytes(&c.reward_amount.to_be_bytes());
                h.bytes(c.reward_token.as_bytes());
            }
        }
        h.str(self.tx_hash());
        h.finish()
    }
}

struct ClaimHasher(Sha256);

impl ClaimHasher {
    fn new(ty: ClaimType) -> Self {
        let mut hasher = Sha256::new();
        hasher.update([ty.tag()]);
        Self(hasher)
    }

    fn u64(&mut self, n: u64) {
        self.0.update(n.to_be_bytes());
    }

    fn bytes(&mut self, b: &[u8]) {
        self.u64(b.len() as u64);
        self.0.update(b);
    }

    fn str(&mut self, s: &str) {
        self.bytes(s.as_bytes());
    }

    fn finish(self) -> [u8; 32] {
        self.0.finalize().into()
    }
}

/// Token metadata a depositor can attach to the first deposit of a token.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ClaimTokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

impl ClaimTokenMetadata {
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.decimals > MAX_METADATA_DECIMALS {
            return Err(ContractError::invalid(format!(
                "token decimals {} above {MAX_METADATA_DECIMALS}",
                self.decimals
            )));
        }
        if self.name.is_empty() || self.name.chars().count() > MAX_METADATA_NAME_LEN {
            return Err(ContractError::invalid("token name must be 1 to 100 chars"));
        }
        if self.symbol.is_empty() || self.symbol.chars().count() > MAX_METADATA_SYMBOL_LEN {
            return Err(ContractError::invalid("token symbol must be 1 to 30 chars"));
        }
        Ok(())
    }
}

/// A message executed on behalf of the deposit receiver once the deposit lands.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ClaimDataMsg {
    SendToChain {
        dest_hyperion_id: u64,
        dest_address: String,
        amount: Coin,
        bridge_fee: Coin,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ClaimData {
    #[serde(default)]
    pub metadata: Option<ClaimTokenMetadata>,
    #[serde(default)]
    pub data: Option<ClaimDataMsg>,
}

impl ClaimData {
    /// Parses and validates deposit data. Empty input is no data.
    pub fn parse(raw: &str) -> Result<Self, ContractError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let data: ClaimData = serde_json::from_str(raw)
            .map_err(|e| ContractError::invalid(format!("claim data: {e}")))?;
        if let Some(metadata) = &data.metadata {
            metadata.validate()?;
        }
        Ok(data)
    }
}
