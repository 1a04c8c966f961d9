use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Coin, Uint128};
#[cfg(not(target_arch = "wasm32"))]
use {
    crate::state::config::Config,
    crate::types::{BatchFees, LastClaimEvent, OrchestratorData, Params},
    cw_controllers::AdminResponse,
};

use crate::error::ContractError;
use crate::evidence::EvidenceSubject;
use crate::host::staking::ValidatorInfo;
use crate::types::eth::ETH_SIGNATURE_LEN;
use crate::types::{
    Attestation, BatchConfirm, Claim, ClaimData, CounterpartyChainParams, DepositClaim,
    Erc20DeployedClaim, EthAddress, LastObservedEthereumBlockHeight, LastObservedValset,
    OutgoingTransferTx, OutgoingTxBatch, TokenAddressToDenom, TransferTx, Valset, ValsetConfirm,
    ValsetUpdatedClaim, WithdrawClaim,
};

#[cw_serde]
pub struct InstantiateMsg {
    /// Contract admin, allowed to add counterparty chains
    pub admin: Option<String>,
    /// Defaults to the bonded denom
    pub native_fee_denom: Option<String>,
    pub max_batch_size: Option<u32>,
    /// Additional chain management accounts
    #[serde(default)]
    pub admins: Vec<String>,
    #[serde(default)]
    pub chains: Vec<CounterpartyChainParams>,
}

#[cw_serde]
pub struct BatchConfirmMsg {
    pub hyperion_id: u64,
    pub nonce: u64,
    pub token_contract: String,
    pub eth_signer: String,
    /// Hex encoded `r || s || v`
    pub signature: String,
}

#[cw_serde]
pub enum ExecuteMsg {
    /// Registers the delegate keys of the sending validator.
    SetOrchestratorAddresses {
        hyperion_id: u64,
        orchestrator: String,
        eth_address: String,
        /// Batches paying less are not built on this orchestrator's request
        minimum_batch_fee: Option<Uint128>,
    },
    ValsetConfirm {
        hyperion_id: u64,
        nonce: u64,
        eth_address: String,
        signature: String,
    },
    /// Moves the attached `amount` to `dest` on another chain, paying the
    /// attached `bridge_fee` to relayers.
    SendToChain {
        dest_hyperion_id: u64,
        dest: String,
        amount: Coin,
        bridge_fee: Coin,
    },
    CancelSendToChain {
        hyperion_id: u64,
        transaction_id: u64,
    },
    RequestBatch {
        hyperion_id: u64,
        denom: String,
    },
    ConfirmBatch(BatchConfirmMsg),
    ConfirmMultipleBatches {
        confirms: Vec<BatchConfirmMsg>,
    },
    DepositClaim(DepositClaim),
    WithdrawClaim(WithdrawClaim),
    Erc20DeployedClaim(Erc20DeployedClaim),
    ValsetUpdatedClaim(ValsetUpdatedClaim),
    SubmitBadSignatureEvidence {
        hyperion_id: u64,
        subject: EvidenceSubject,
        signature: String,
    },

    AddCounterpartyChainParams {
        params: CounterpartyChainParams,
    },
    UpdateCounterpartyChainParams {
        params: CounterpartyChainParams,
    },
    UpdateParams {
        admins: Vec<String>,
    },
    DeleteCounterpartyChain {
        hyperion_id: u64,
    },
    PauseChain {
        hyperion_id: u64,
    },
    UnpauseChain {
        hyperion_id: u64,
    },
    UpdateChainLogo {
        hyperion_id: u64,
        logo: String,
    },
    UpdateChainName {
        hyperion_id: u64,
        name: String,
    },
    /// Testnet recovery: force the last observed event and counterparty height.
    SetLastObservedNonce {
        hyperion_id: u64,
        nonce: u64,
        eth_height: u64,
    },
    SetTokenToChain {
        hyperion_id: u64,
        token_address: String,
        denom: String,
        is_cosmos_originated: bool,
    },
    RemoveTokenFromChain {
        hyperion_id: u64,
        denom: String,
    },
    MintToken {
        hyperion_id: u64,
        token_address: String,
        amount: Uint128,
        receiver: String,
    },
    /// Burns the attached funds.
    BurnToken {
        hyperion_id: u64,
        token_address: String,
    },
    BlacklistEthereumAddresses {
        addresses: Vec<String>,
    },
    RevokeEthereumBlacklist {
        addresses: Vec<String>,
    },
    UpdateAdmin {
        admin: Option<String>,
    },
}

#[cw_serde]
pub enum SudoMsg {
    BeginBlock {},
    EndBlock {},
    /// Replaces the validator snapshot
    SyncValidators { validators: Vec<ValidatorInfo> },
}

#[cw_serde]
pub struct MigrateMsg {}

fn check_eth_address(field: &str, addr: &str) -> Result<EthAddress, ContractError> {
    EthAddress::parse(addr).map_err(|e| ContractError::invalid(format!("{field}: {e}")))
}

fn check_signature(sig: &str) -> Result<(), ContractError> {
    let bytes = hex::decode(sig.trim_start_matches("0x"))?;
    if bytes.len() != ETH_SIGNATURE_LEN {
        return Err(ContractError::invalid(format!(
            "signature must be {ETH_SIGNATURE_LEN} bytes"
        )));
    }
    Ok(())
}

fn check_claim(claim: &Claim) -> Result<(), ContractError> {
    if claim.event_nonce() == 0 {
        return Err(ContractError::invalid("event nonce must be positive"));
    }
    if claim.orchestrator().is_empty() {
        return Err(ContractError::invalid("claim without orchestrator"));
    }
    match claim {
        Claim::Deposit(c) => {
            if c.cosmos_receiver.is_empty() {
                return Err(ContractError::invalid("deposit without receiver"));
            }
            ClaimData::parse(&c.data)?;
        }
        Claim::Erc20Deployed(c) => {
            if c.cosmos_denom.is_empty() {
                return Err(ContractError::invalid("erc20 deployed without denom"));
            }
        }
        Claim::ValsetUpdated(c) => {
            if c.members.iter().any(|m| m.ethereum_address.is_zero()) {
                return Err(ContractError::invalid("valset member without address"));
            }
        }
        Claim::Withdraw(_) => {}
    }
    Ok(())
}

impl BatchConfirmMsg {
    pub fn validate_basic(&self) -> Result<(), ContractError> {
        check_eth_address("token_contract", &self.token_contract)?;
        check_eth_address("eth_signer", &self.eth_signer)?;
        check_signature(&self.signature)
    }
}

impl ExecuteMsg {
    /// Stateless checks run before a message touches storage.
    pub fn validate_basic(&self) -> Result<(), ContractError> {
        match self {
            ExecuteMsg::SetOrchestratorAddresses {
                orchestrator,
                eth_address,
                ..
            } => {
                if orchestrator.is_empty() {
                    return Err(ContractError::invalid("empty orchestrator"));
                }
                if check_eth_address("eth_address", eth_address)?.is_zero() {
                    return Err(ContractError::invalid("eth_address: zero address"));
                }
            }
            ExecuteMsg::ValsetConfirm {
                eth_address,
                signature,
                ..
            } => {
                check_eth_address("eth_address", eth_address)?;
                check_signature(signature)?;
            }
            ExecuteMsg::SendToChain {
                dest,
                amount,
                bridge_fee,
                ..
            } => {
                check_eth_address("dest", dest)
                    .map_err(|_| ContractError::InvalidEthDestination(dest.clone()))?;
                if amount.amount.is_zero() {
                    return Err(ContractError::invalid("amount must be positive"));
                }
                if bridge_fee.denom.is_empty() {
                    return Err(ContractError::invalid("bridge fee without denom"));
                }
            }
            ExecuteMsg::RequestBatch { denom, .. } => {
                if denom.is_empty() {
                    return Err(ContractError::invalid("empty denom"));
                }
            }
            ExecuteMsg::ConfirmBatch(confirm) => confirm.validate_basic()?,
            ExecuteMsg::ConfirmMultipleBatches { confirms } => {
                if confirms.is_empty() {
                    return Err(ContractError::Empty("no batch confirms".to_string()));
                }
                for confirm in confirms {
                    confirm.validate_basic()?;
                }
            }
            ExecuteMsg::DepositClaim(c) => check_claim(&Claim::Deposit(c.clone()))?,
            ExecuteMsg::WithdrawClaim(c) => check_claim(&Claim::Withdraw(c.clone()))?,
            ExecuteMsg::Erc20DeployedClaim(c) => check_claim(&Claim::Erc20Deployed(c.clone()))?,
            ExecuteMsg::ValsetUpdatedClaim(c) => check_claim(&Claim::ValsetUpdated(c.clone()))?,
            ExecuteMsg::SubmitBadSignatureEvidence { signature, .. } => {
                check_signature(signature)?
            }
            ExecuteMsg::AddCounterpartyChainParams { params }
            | ExecuteMsg::UpdateCounterpartyChainParams { params } => params.validate()?,
            ExecuteMsg::SetTokenToChain {
                token_address,
                denom,
                ..
            } => {
                check_eth_address("token_address", token_address)?;
                if denom.is_empty() {
                    return Err(ContractError::invalid("empty denom"));
                }
            }
            ExecuteMsg::MintToken {
                token_address,
                amount,
                ..
            } => {
                check_eth_address("token_address", token_address)?;
                if amount.is_zero() {
                    return Err(ContractError::invalid("amount must be positive"));
                }
            }
            ExecuteMsg::BurnToken { token_address, .. } => {
                check_eth_address("token_address", token_address)?;
            }
            ExecuteMsg::BlacklistEthereumAddresses { addresses }
            | ExecuteMsg::RevokeEthereumBlacklist { addresses } => {
                if addresses.is_empty() {
                    return Err(ContractError::Empty("no addresses".to_string()));
                }
                for addr in addresses {
                    check_eth_address("address", addr)?;
                }
            }
            ExecuteMsg::CancelSendToChain { .. }
            | ExecuteMsg::UpdateParams { .. }
            | ExecuteMsg::DeleteCounterpartyChain { .. }
            | ExecuteMsg::PauseChain { .. }
            | ExecuteMsg::UnpauseChain { .. }
            | ExecuteMsg::UpdateChainLogo { .. }
            | ExecuteMsg::UpdateChainName { .. }
            | ExecuteMsg::SetLastObservedNonce { .. }
            | ExecuteMsg::RemoveTokenFromChain { .. }
            | ExecuteMsg::UpdateAdmin { .. } => {}
        }
        Ok(())
    }

    /// Messages that consume the attached funds. Every other message is
    /// nonpayable.
    pub fn accepts_funds(&self) -> bool {
        matches!(
            self,
            ExecuteMsg::SendToChain { .. } | ExecuteMsg::BurnToken { .. }
        )
    }
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    #[returns(Config)]
    Config {},
    #[returns(AdminResponse)]
    Admin {},
    #[returns(Params)]
    Params {},
    #[returns(CounterpartyChainParams)]
    CounterpartyChainParams { hyperion_id: u64 },
    /// Valset the bridge would request if it did so now.
    #[returns(Valset)]
    CurrentValset { hyperion_id: u64 },
    #[returns(Option<Valset>)]
    ValsetRequest { hyperion_id: u64, nonce: u64 },
    /// Most recent valsets first.
    #[returns(Vec<Valset>)]
    LatestValsets {
        hyperion_id: u64,
        count: Option<u32>,
    },
    #[returns(Option<LastObservedValset>)]
    LastObservedValset { hyperion_id: u64 },
    #[returns(Option<ValsetConfirm>)]
    ValsetConfirm {
        hyperion_id: u64,
        nonce: u64,
        orchestrator: String,
    },
    #[returns(Vec<ValsetConfirm>)]
    ValsetConfirmsByNonce { hyperion_id: u64, nonce: u64 },
    /// Valsets the orchestrator still has to sign, oldest first.
    #[returns(Vec<Valset>)]
    LastPendingValsetRequestByAddr {
        hyperion_id: u64,
        orchestrator: String,
    },
    /// Oldest batch the orchestrator still has to sign.
    #[returns(Option<OutgoingTxBatch>)]
    LastPendingBatchRequestByAddr {
        hyperion_id: u64,
        orchestrator: String,
    },
    #[returns(PendingSendToChainResponse)]
    PendingSendToChain { hyperion_id: u64, sender: String },
    #[returns(Vec<OutgoingTxBatch>)]
    OutgoingTxBatches {
        hyperion_id: u64,
        limit: Option<u32>,
    },
    #[returns(Option<OutgoingTxBatch>)]
    BatchRequestByNonce {
        hyperion_id: u64,
        token_contract: String,
        nonce: u64,
    },
    #[returns(Vec<BatchConfirm>)]
    BatchConfirms {
        hyperion_id: u64,
        token_contract: String,
        nonce: u64,
    },
    /// Fees a batch would collect per token if built now.
    #[returns(Vec<BatchFees>)]
    BatchFees { hyperion_id: u64 },
    #[returns(LastClaimEvent)]
    LastEventByAddr {
        hyperion_id: u64,
        orchestrator: String,
    },
    #[returns(u64)]
    LastObservedEventNonce { hyperion_id: u64 },
    #[returns(LastObservedEthereumBlockHeight)]
    LastObservedEthBlockHeight { hyperion_id: u64 },
    #[returns(DelegateKeysResponse)]
    GetDelegateKeyByValidator { hyperion_id: u64, validator: String },
    #[returns(DelegateKeysResponse)]
    GetDelegateKeyByEth {
        hyperion_id: u64,
        eth_address: String,
    },
    #[returns(DelegateKeysResponse)]
    GetDelegateKeyByOrchestrator {
        hyperion_id: u64,
        orchestrator: String,
    },
    /// Most recent attestations first.
    #[returns(Vec<Attestation>)]
    Attestations {
        hyperion_id: u64,
        start_before: Option<u64>,
        limit: Option<u32>,
    },
    #[returns(Option<Attestation>)]
    Attestation {
        hyperion_id: u64,
        nonce: u64,
        /// Hex encoded
        claim_hash: String,
    },
    #[returns(Option<TokenAddressToDenom>)]
    TokenFromDenom { hyperion_id: u64, denom: String },
    #[returns(Option<TokenAddressToDenom>)]
    TokenFromAddress {
        hyperion_id: u64,
        token_address: String,
    },
    #[returns(OrchestratorData)]
    OrchestratorData {
        hyperion_id: u64,
        orchestrator: String,
    },
    /// Archived transfers sent or received by `address`, most recent first.
    #[returns(TransferHistoryResponse)]
    TransferHistory {
        address: String,
        start_before: Option<u64>,
        limit: Option<u32>,
    },
    #[returns(Vec<TransferTx>)]
    LastTransactions { limit: Option<u32> },
    #[returns(Vec<String>)]
    Blacklist {},
    #[returns(u64)]
    ProjectedCurrentEthHeight { hyperion_id: u64 },
    #[returns(ModuleState)]
    ModuleState { hyperion_id: u64 },
}

#[cw_serde]
pub struct PendingSendToChainResponse {
    pub transfers_in_batches: Vec<OutgoingTransferTx>,
    pub unbatched_transfers: Vec<OutgoingTransferTx>,
}

#[cw_serde]
pub struct DelegateKeysResponse {
    pub validator: String,
    pub orchestrator: String,
    pub eth_address: String,
}

#[cw_serde]
pub struct ArchivedTransfer {
    /// Archive sequence, usable as `start_before`
    pub seq: u64,
    pub transfer: TransferTx,
}

#[cw_serde]
pub struct TransferHistoryResponse {
    pub transfers: Vec<ArchivedTransfer>,
}

/// Export of the state of one bridge instance.
#[cw_serde]
pub struct ModuleState {
    pub params: CounterpartyChainParams,
    pub last_observed_nonce: u64,
    pub last_observed_eth_height: LastObservedEthereumBlockHeight,
    pub last_observed_valset: Option<LastObservedValset>,
    pub valsets: Vec<Valset>,
    pub valset_confirms: Vec<ValsetConfirm>,
    pub batches: Vec<OutgoingTxBatch>,
    pub batch_confirms: Vec<BatchConfirm>,
    pub unbatched_transfers: Vec<OutgoingTransferTx>,
    pub attestations: Vec<Attestation>,
    pub delegate_keys: Vec<DelegateKeysResponse>,
    pub tokens: Vec<TokenAddressToDenom>,
    pub last_tx_pool_id: u64,
    pub last_batch_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use cosmwasm_std::coin;

    const ADDR: &str = "0x1111111111111111111111111111111111111111";

    fn sig() -> String {
        format!("0x{}", "ab".repeat(65))
    }

    fn deposit(data: &str) -> ExecuteMsg {
        ExecuteMsg::DepositClaim(DepositClaim {
            hyperion_id: 1,
            event_nonce: 1,
            block_height: 10,
            token_contract: EthAddress::new([1; 20]),
            amount: 5u32.into(),
            ethereum_sender: "not checked here".to_string(),
            cosmos_receiver: "receiver".to_string(),
            orchestrator: "orch".to_string(),
            data: data.to_string(),
            tx_hash: String::new(),
            rpc_used: String::new(),
        })
    }

    #[test]
    fn validate_basic_table() {
        let send = |dest: &str, amount: u128| ExecuteMsg::SendToChain {
            dest_hyperion_id: 1,
            dest: dest.to_string(),
            amount: coin(amount, "token"),
            bridge_fee: coin(1, "ahelios"),
        };
        let cases: Vec<(ExecuteMsg, bool)> = vec![
            (send(ADDR, 10), true),
            (send("0x1234", 10), false),
            (send(ADDR, 0), false),
            (
                ExecuteMsg::SetOrchestratorAddresses {
                    hyperion_id: 1,
                    orchestrator: "orch".to_string(),
                    eth_address: ADDR.to_string(),
                    minimum_batch_fee: None,
                },
                true,
            ),
            (
                ExecuteMsg::SetOrchestratorAddresses {
                    hyperion_id: 1,
                    orchestrator: "orch".to_string(),
                    eth_address: format!("0x{}", "00".repeat(20)),
                    minimum_batch_fee: None,
                },
                false,
            ),
            (
                ExecuteMsg::ValsetConfirm {
                    hyperion_id: 1,
                    nonce: 1,
                    eth_address: ADDR.to_string(),
                    signature: sig(),
                },
                true,
            ),
            (
                ExecuteMsg::ValsetConfirm {
                    hyperion_id: 1,
                    nonce: 1,
                    eth_address: ADDR.to_string(),
                    signature: "abcd".to_string(),
                },
                false,
            ),
            (ExecuteMsg::ConfirmMultipleBatches { confirms: vec![] }, false),
            (deposit(""), true),
            (deposit("{not json"), false),
            (
                ExecuteMsg::BlacklistEthereumAddresses {
                    addresses: vec![ADDR.to_string(), "nope".to_string()],
                },
                false,
            ),
            (
                ExecuteMsg::MintToken {
                    hyperion_id: 1,
                    token_address: ADDR.to_string(),
                    amount: Uint128::zero(),
                    receiver: "r".to_string(),
                },
                false,
            ),
            (ExecuteMsg::PauseChain { hyperion_id: 1 }, true),
        ];
        for (i, (msg, ok)) in cases.into_iter().enumerate() {
            assert_eq!(msg.validate_basic().is_ok(), ok, "case {i}: {msg:?}");
        }
    }

    #[test]
    fn bad_destination_is_typed() {
        let msg = ExecuteMsg::SendToChain {
            dest_hyperion_id: 1,
            dest: "0xzz".to_string(),
            amount: coin(1, "token"),
            bridge_fee: coin(1, "ahelios"),
        };
        assert_matches!(
            msg.validate_basic(),
            Err(ContractError::InvalidEthDestination(_))
        );
    }
}
