//! Solidity ABI encoding of the artifacts orchestrators sign.
//!
//! Both checkpoints are `keccak256(abi.encode(...))` of the arguments the bridge
//! contract rebuilds on the counterparty chain. Head layout for the valset:
//!
//! ```text
//! word 0  hyperion id
//! word 1  bytes32("checkpoint")
//! word 2  valset nonce
//! word 3  offset of address[] validators
//! word 4  offset of uint256[] powers
//! word 5  reward amount
//! word 6  reward token
//! ```
//!
//! and for a batch:
//!
//! ```text
//! word 0  hyperion id
//! word 1  bytes32("transactionBatch")
//! word 2  offset of uint256[] amounts
//! word 3  offset of address[] destinations
//! word 4  offset of uint256[] fees
//! word 5  batch nonce
//! word 6  token contract
//! word 7  batch timeout
//! ```
//!
//! Dynamic arrays follow the head as `length || items`.

use cosmwasm_std::Uint256;

use crate::types::eth::{keccak256, EthAddress};

pub const VALSET_METHOD_NAME: &str = "checkpoint";
pub const BATCH_METHOD_NAME: &str = "transactionBatch";

const WORD: usize = 32;

pub(crate) fn word_u64(n: u64) -> [u8; WORD] {
    let mut w = [0u8; WORD];
    w[24..].copy_from_slice(&n.to_be_bytes());
    w
}

pub(crate) fn word_u256(n: Uint256) -> [u8; WORD] {
    n.to_be_bytes()
}

pub(crate) fn word_address(addr: &EthAddress) -> [u8; WORD] {
    let mut w = [0u8; WORD];
    w[12..].copy_from_slice(addr.as_bytes());
    w
}

/// `bytes32` literal: left aligned, zero padded.
pub(crate) fn word_bytes32(s: &str) -> [u8; WORD] {
    let mut w = [0u8; WORD];
    let bytes = s.as_bytes();
    let n = bytes.len().min(WORD);
    w[..n].copy_from_slice(&bytes[..n]);
    w
}

struct AbiEncoder {
    head: Vec<[u8; WORD]>,
    tail: Vec<[u8; WORD]>,
    head_words: usize,
}

impl AbiEncoder {
    fn new(head_words: usize) -> Self {
        Self {
            head: Vec::with_capacity(head_words),
            tail: vec![],
            head_words,
        }
    }

    fn static_word(&mut self, w: [u8; WORD]) {
        self.head.push(w);
    }

    fn dynamic_array(&mut self, items: impl ExactSizeIterator<Item = [u8; WORD]>) {
        let offset = (self.head_words + self.tail.len()) * WORD;
        self.head.push(word_u64(offset as u64));
        self.tail.push(word_u64(items.len() as u64));
        self.tail.extend(items);
    }

    fn finish(self) -> Vec<u8> {
        debug_assert_eq!(self.head.len(), self.head_words);
        self.head
            .into_iter()
            .chain(self.tail)
            .flat_map(|w| w.into_iter())
            .collect()
    }
}

pub fn encode_valset(
    hyperion_id: u64,
    nonce: u64,
    validators: &[EthAddress],
    powers: &[u64],
    reward_amount: Uint256,
    reward_token: &EthAddress,
) -> Vec<u8> {
    let mut enc = AbiEncoder::new(7);
    enc.static_word(word_u64(hyperion_id));
    enc.static_word(word_bytes32(VALSET_METHOD_NAME));
    enc.static_word(word_u64(nonce));
    enc.dynamic_array(validators.iter().map(word_address));
    enc.dynamic_array(powers.iter().map(|p| word_u64(*p)));
    enc.static_word(word_u256(reward_amount));
    enc.static_word(word_address(reward_token));
    enc.finish()
}

pub fn valset_checkpoint(
    hyperion_id: u64,
    nonce: u64,
    validators: &[EthAddress],
    powers: &[u64],
    reward_amount: Uint256,
    reward_token: &EthAddress,
) -> [u8; 32] {
    keccak256(&encode_valset(
        hyperion_id,
        nonce,
        validators,
        powers,
        reward_amount,
        reward_token,
    ))
}

#[allow(clippy::too_many_arguments)]
pub fn encode_batch(
    hyperion_id: u64,
    amounts: &[Uint256],
    destinations: &[EthAddress],
    fees: &[Uint256],
    nonce: u64,
    token_contract: &EthAddress,
    timeout: u64,
) -> Vec<u8> {
    let mut enc = AbiEncoder::new(8);
    enc.static_word(word_u64(hyperion_id));
    enc.static_word(word_bytes32(BATCH_METHOD_NAME));
    enc.dynamic_array(amounts.iter().map(|a| word_u256(*a)));
    enc.dynamic_array(destinations.iter().map(word_address));
    enc.dynamic_array(fees.iter().map(|f| word_u256(*f)));
    enc.static_word(word_u64(nonce));
    enc.static_word(word_address(token_contract));
    enc.static_word(word_u64(timeout));
    enc.finish()
}

pub fn batch_checkpoint(
    hyperion_id: u64,
    amounts: &[Uint256],
    destinations: &[EthAddress],
    fees: &[Uint256],
    nonce: u64,
    token_contract: &EthAddress,
    timeout: u64,
) -> [u8; 32] {
    keccak256(&encode_batch(
        hyperion_id,
        amounts,
        destinations,
        fees,
        nonce,
        token_contract,
        timeout,
    ))
}
