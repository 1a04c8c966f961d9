//! Ethereum-side primitives: 20-byte addresses, keccak hashing and
//! `personal_sign` signature recovery.

use std::fmt;
use std::str::FromStr;

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use tiny_keccak::{Hasher, Keccak};

use crate::error::EthSignatureError;

pub const ETH_ADDRESS_LEN: usize = 20;
pub const ETH_SIGNATURE_LEN: usize = 65;

const PERSONAL_SIGN_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

/// Hash an orchestrator actually signs for a checkpoint.
pub fn eth_signed_message_hash(checkpoint: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(PERSONAL_SIGN_PREFIX);
    hasher.update(checkpoint);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

/// An address on the counterparty chain. Serialized as lower-case `0x` hex.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EthAddress([u8; ETH_ADDRESS_LEN]);

impl EthAddress {
    pub const ZERO: EthAddress = EthAddress([0u8; ETH_ADDRESS_LEN]);

    pub const fn new(bytes: [u8; ETH_ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses 40 hex characters, with or without the `0x` prefix.
    pub fn parse(s: &str) -> Result<Self, EthSignatureError> {
        let raw = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if raw.len() != ETH_ADDRESS_LEN * 2 {
            return Err(EthSignatureError::InvalidAddress(s.to_string()));
        }
        let mut bytes = [0u8; ETH_ADDRESS_LEN];
        hex::decode_to_slice(raw, &mut bytes)
            .map_err(|_| EthSignatureError::InvalidAddress(s.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, EthSignatureError> {
        let bytes: [u8; ETH_ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| EthSignatureError::InvalidAddress(hex::encode(bytes)))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; ETH_ADDRESS_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ETH_ADDRESS_LEN]
    }

    /// Address controlled by `key`: the last 20 bytes of the keccak hash of the
    /// uncompressed public point.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        let hash = keccak256(&point.as_bytes()[1..]);
        let mut bytes = [0u8; ETH_ADDRESS_LEN];
        bytes.copy_from_slice(&hash[12..]);
        Self(bytes)
    }
}

impl fmt::Display for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EthAddress({self})")
    }
}

impl FromStr for EthAddress {
    type Err = EthSignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for EthAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EthAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(de::Error::custom)
    }
}

impl JsonSchema for EthAddress {
    fn schema_name() -> String {
        "EthAddress".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

/// Recovers the signer of a `personal_sign` signature over `checkpoint`.
///
/// The signature is `r || s || v` with `v` either `{0, 1}` or `{27, 28}`.
pub fn recover_signer(
    checkpoint: &[u8; 32],
    signature: &[u8],
) -> Result<EthAddress, EthSignatureError> {
    if signature.len() != ETH_SIGNATURE_LEN {
        return Err(EthSignatureError::BadSignatureLength(signature.len()));
    }
    let v = signature[64];
    let recovery_byte = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        _ => return Err(EthSignatureError::BadRecoveryId(v)),
    };
    let recovery_id =
        RecoveryId::from_byte(recovery_byte).ok_or(EthSignatureError::BadRecoveryId(v))?;
    let sig = Signature::from_slice(&signature[..64])?;
    let key = VerifyingKey::recover_from_prehash(
        &eth_signed_message_hash(checkpoint),
        &sig,
        recovery_id,
    )?;
    Ok(EthAddress::from_verifying_key(&key))
}

/// Checks that `signature` over `checkpoint` was produced by `expected`.
pub fn verify_signature(
    checkpoint: &[u8; 32],
    signature: &[u8],
    expected: &EthAddress,
) -> Result<(), EthSignatureError> {
    let recovered = recover_signer(checkpoint, signature)?;
    if &recovered != expected {
        return Err(EthSignatureError::SignerMismatch {
            expected: expected.to_string(),
            recovered: recovered.to_string(),
        });
    }
    Ok(())
}
