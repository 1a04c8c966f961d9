use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Uint128, Uint256};

use crate::types::checkpoint::batch_checkpoint;
use crate::types::eth::EthAddress;

/// An amount of a counterparty token.
#[cw_serde]
pub struct Erc20Token {
    pub contract: EthAddress,
    pub amount: Uint128,
}

/// A transfer waiting in the pool or packed in a batch.
#[cw_serde]
pub struct OutgoingTransferTx {
    pub hyperion_id: u64,
    pub id: u64,
    pub sender: Addr,
    pub dest_address: EthAddress,
    pub erc20_token: Erc20Token,
    pub erc20_fee: Erc20Token,
    /// Projected counterparty height after which the transfer is refunded
    pub tx_timeout: u64,
    /// Local transaction hash when known
    pub tx_hash: String,
}

#[cw_serde]
pub struct OutgoingTxBatch {
    pub hyperion_id: u64,
    pub batch_nonce: u64,
    pub batch_timeout: u64,
    pub transactions: Vec<OutgoingTransferTx>,
    pub token_contract: EthAddress,
    /// Local height the batch was built at
    pub block: u64,
}

impl OutgoingTxBatch {
    pub fn total_fee(&self) -> Uint128 {
        self.transactions
            .iter()
            .map(|tx| tx.erc20_fee.amount)
            .fold(Uint128::zero(), |acc, fee| acc.saturating_add(fee))
    }

    pub fn checkpoint(&self) -> [u8; 32] {
        let amounts: Vec<Uint256> = self
            .transactions
            .iter()
            .map(|tx| Uint256::from(tx.erc20_token.amount))
            .collect();
        let destinations: Vec<EthAddress> =
            self.transactions.iter().map(|tx| tx.dest_address).collect();
        let fees: Vec<Uint256> = self
            .transactions
            .iter()
            .map(|tx| Uint256::from(tx.erc20_fee.amount))
            .collect();
        batch_checkpoint(
            self.hyperion_id,
            &amounts,
            &destinations,
            &fees,
            self.batch_nonce,
            &self.token_contract,
            self.batch_timeout,
        )
    }

    pub fn tx_ids(&self) -> Vec<u64> {
        self.transactions.iter().map(|tx| tx.id).collect()
    }
}

/// An orchestrator's signature over a batch checkpoint.
#[cw_serde]
pub struct BatchConfirm {
    pub hyperion_id: u64,
    pub nonce: u64,
    pub token_contract: EthAddress,
    pub eth_signer: EthAddress,
    pub orchestrator: String,
    /// Hex encoded `r || s || v`
    pub signature: String,
}

/// Fee a batch would collect for a token if it were built now.
#[cw_serde]
pub struct BatchFees {
    pub token: EthAddress,
    pub total_fees: Uint128,
    pub tx_count: u64,
}
