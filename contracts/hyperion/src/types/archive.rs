use cosmwasm_schema::cw_serde;
use cosmwasm_std::Uint256;

#[cw_serde]
#[derive(Copy, Eq)]
pub enum TransferStatus {
    Bridged,
    Failed,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Bridged => "BRIDGED",
            TransferStatus::Failed => "FAILED",
        }
    }
}

#[cw_serde]
#[derive(Copy, Eq)]
pub enum TransferDirection {
    In,
    Out,
}

impl TransferDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferDirection::In => "IN",
            TransferDirection::Out => "OUT",
        }
    }
}

/// Amount of a token on one side of a transfer: a counterparty contract
/// address or a local denom.
#[cw_serde]
pub struct TransferToken {
    pub contract: String,
    pub amount: Uint256,
}

/// Who vouched for a finalized transfer.
#[cw_serde]
#[derive(Default)]
pub struct TransferProof {
    pub orchestrators: Vec<String>,
    pub hashes: Vec<String>,
}

/// A finalized bridge transfer, kept for history queries.
#[cw_serde]
pub struct TransferTx {
    pub hyperion_id: u64,
    /// Event nonce for inbound transfers, pool id for outbound ones
    pub id: u64,
    pub height: u64,
    pub sender: String,
    pub dest_address: String,
    pub sent_token: TransferToken,
    pub sent_fee: TransferToken,
    pub received_token: TransferToken,
    pub status: TransferStatus,
    pub direction: TransferDirection,
    pub chain_id: u64,
    pub tx_hash: String,
    pub proof: TransferProof,
}
