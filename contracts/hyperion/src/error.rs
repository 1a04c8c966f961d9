use cosmwasm_std::{OverflowError, StdError};
use cw_controllers::AdminError;
use cw_utils::PaymentError;
use thiserror::Error;

/// Errors of the Ethereum-side primitives: addresses and signatures.
#[derive(Error, Debug, PartialEq)]
pub enum EthSignatureError {
    #[error("invalid ethereum address {0}")]
    InvalidAddress(String),
    #[error("signature must be 65 bytes, got {0}")]
    BadSignatureLength(usize),
    #[error("invalid recovery id {0}")]
    BadRecoveryId(u8),
    #[error("ecdsa error: {0}")]
    Ecdsa(String),
    #[error("signature recovers to {recovered}, expected {expected}")]
    SignerMismatch { expected: String, recovered: String },
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
}

impl From<k256::ecdsa::Error> for EthSignatureError {
    fn from(e: k256::ecdsa::Error) -> Self {
        Self::Ecdsa(e.to_string())
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error("internal: {0}")]
    Internal(String),
    #[error("duplicate: {0}")]
    Duplicate(String),
    #[error("invalid: {0}")]
    Invalid(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("unknown: {0}")]
    Unknown(String),
    #[error("empty: {0}")]
    Empty(String),
    #[error("outdated: {0}")]
    Outdated(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("non contiguous event nonce: expected {expected}, got {actual}")]
    NonContiguousEventNonce { expected: u64, actual: u64 },
    #[error("no unbatched txs found")]
    NoUnbatchedTxsFound,
    #[error("can not set orchestrator addresses more than once")]
    ResetDelegateKeys,
    #[error("supply cannot exceed max ERC20 value: {0}")]
    SupplyOverflow(String),
    #[error("invalid ethereum sender on claim: {0}")]
    InvalidEthSender(String),
    #[error("invalid ethereum destination: {0}")]
    InvalidEthDestination(String),
    #[error("no claims found for validator {0}")]
    NoLastClaimForValidator(String),
    #[error("non contiguous ethereum block height: last {last}, got {actual}")]
    NonContiguousEthEventBlockHeight { last: u64, actual: u64 },
    #[error("invalid hyperion id {0}")]
    InvalidHyperionId(u64),
    #[error("invalid signer: {0}")]
    InvalidSigner(String),
    #[error("attestation already voted by {0}")]
    AttestationAlreadyVoted(String),
    #[error("attestation for nonce {0} already observed")]
    AttestationAlreadyObserved(u64),
    #[error("chain {0} is paused")]
    ChainPaused(u64),
    #[error("Unauthorized")]
    Unauthorized,
    #[error(transparent)]
    EthSignature(#[from] EthSignatureError),
    #[error(transparent)]
    Admin(#[from] AdminError),
    #[error(transparent)]
    Std(#[from] StdError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Overflow(#[from] OverflowError),
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
}

impl ContractError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }

    /// Broken invariants that abort the block instead of being skipped.
    pub fn is_fail_stop(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}
