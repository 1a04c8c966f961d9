pub mod archive;
pub mod attestation;
pub mod batch;
pub mod checkpoint;
pub mod claim;
pub mod eth;
pub mod orchestrator;
pub mod params;
pub mod token;
pub mod valset;

pub use archive::{TransferDirection, TransferProof, TransferStatus, TransferToken, TransferTx};
pub use attestation::{
    Attestation, LastClaimEvent, LastObservedEthereumBlockHeight, LastObservedValset, Vote,
};
pub use batch::{BatchConfirm, BatchFees, Erc20Token, OutgoingTransferTx, OutgoingTxBatch};
pub use claim::{
    Claim, ClaimData, ClaimDataMsg, ClaimTokenMetadata, ClaimType, DepositClaim,
    Erc20DeployedClaim, ValsetUpdatedClaim, WithdrawClaim,
};
pub use eth::EthAddress;
pub use orchestrator::{OrchestratorData, SlashData};
pub use params::{CounterpartyChainParams, DefaultToken, Params, Rpc};
pub use token::TokenAddressToDenom;
pub use valset::{BridgeValidator, Valset, ValsetConfirm};
