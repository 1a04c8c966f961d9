//! Fixed-width big-endian key builders for composite keys that do not fit
//! the tuple keys of `cw-storage-plus`.
//!
//! Every integer is encoded as 8 big-endian bytes and every address as its
//! raw 20 bytes, so lexicographic key order equals numeric order.

use cosmwasm_std::{StdError, StdResult, Uint128};

use crate::types::eth::{EthAddress, ETH_ADDRESS_LEN};

pub const BATCH_REF_LEN: usize = ETH_ADDRESS_LEN + 8;

/// `token || nonce`, identifying a batch inside one hyperion id.
pub fn batch_ref(token: &EthAddress, nonce: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(BATCH_REF_LEN);
    key.extend_from_slice(token.as_bytes());
    key.extend_from_slice(&nonce.to_be_bytes());
    key
}

pub fn parse_batch_ref(key: &[u8]) -> StdResult<(EthAddress, u64)> {
    if key.len() != BATCH_REF_LEN {
        return Err(StdError::generic_err(format!(
            "batch ref must be {BATCH_REF_LEN} bytes, got {}",
            key.len()
        )));
    }
    let token = EthAddress::from_slice(&key[..ETH_ADDRESS_LEN])
        .map_err(|e| StdError::generic_err(e.to_string()))?;
    let mut nonce = [0u8; 8];
    nonce.copy_from_slice(&key[ETH_ADDRESS_LEN..]);
    Ok((token, u64::from_be_bytes(nonce)))
}

/// Fee amount as 16 big-endian bytes, for fee-ordered iteration.
pub fn fee_key(fee: Uint128) -> [u8; 16] {
    fee.u128().to_be_bytes()
}

pub fn parse_fee_key(key: &[u8]) -> StdResult<Uint128> {
    let bytes: [u8; 16] = key
        .try_into()
        .map_err(|_| StdError::generic_err("fee key must be 16 bytes"))?;
    Ok(Uint128::new(u128::from_be_bytes(bytes)))
}
