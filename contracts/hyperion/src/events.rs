use cosmwasm_std::{Decimal, Event};

use crate::types::{Attestation, Claim, ClaimType, OutgoingTxBatch};

impl ClaimType {
    /// Type of the event emitted when the first vote on a claim arrives.
    pub fn event_type(&self) -> &'static str {
        match self {
            ClaimType::Deposit => "hyperion_deposit_claim",
            ClaimType::Withdraw => "hyperion_withdraw_claim",
            ClaimType::Erc20Deployed => "hyperion_erc20_deployed_claim",
            ClaimType::ValsetUpdated => "hyperion_valset_updated_claim",
        }
    }
}

pub fn new_claim_event(claim: &Claim, claim_hash: &[u8]) -> Event {
    let ev = Event::new(claim.claim_type().event_type())
        .add_attribute("hyperion_id", claim.hyperion_id().to_string())
        .add_attribute("event_nonce", claim.event_nonce().to_string())
        .add_attribute("block_height", claim.block_height().to_string())
        .add_attribute("claim_hash", hex::encode(claim_hash));
    match claim {
        Claim::Deposit(c) => ev
            .add_attribute("token_contract", c.token_contract.to_string())
            .add_attribute("amount", c.amount.to_string())
            .add_attribute("ethereum_sender", &c.ethereum_sender)
            .add_attribute("cosmos_receiver", &c.cosmos_receiver),
        Claim::Withdraw(c) => ev
            .add_attribute("token_contract", c.token_contract.to_string())
            .add_attribute("batch_nonce", c.batch_nonce.to_string()),
        Claim::Erc20Deployed(c) => ev
            .add_attribute("cosmos_denom", &c.cosmos_denom)
            .add_attribute("token_contract", c.token_contract.to_string()),
        Claim::ValsetUpdated(c) => ev.add_attribute("valset_nonce", c.valset_nonce.to_string()),
    }
}

pub fn new_vote_event(att: &Attestation, claim_hash: &[u8], validator: &str) -> Event {
    Event::new("hyperion_attestation_vote")
        .add_attribute("hyperion_id", att.hyperion_id.to_string())
        .add_attribute("event_nonce", att.claim.event_nonce().to_string())
        .add_attribute("claim_hash", hex::encode(claim_hash))
        .add_attribute("validator", validator)
        .add_attribute("votes", att.votes.len().to_string())
}

pub fn new_observed_event(att: &Attestation, claim_hash: &[u8], handler_ok: bool) -> Event {
    Event::new("hyperion_attestation_observed")
        .add_attribute("hyperion_id", att.hyperion_id.to_string())
        .add_attribute("claim_type", att.claim.claim_type().as_str())
        .add_attribute("event_nonce", att.claim.event_nonce().to_string())
        .add_attribute("claim_hash", hex::encode(claim_hash))
        .add_attribute("handler", if handler_ok { "ok" } else { "failed" })
}

pub fn new_batch_event(ty: &str, batch: &OutgoingTxBatch) -> Event {
    Event::new(ty)
        .add_attribute("hyperion_id", batch.hyperion_id.to_string())
        .add_attribute("token_contract", batch.token_contract.to_string())
        .add_attribute("batch_nonce", batch.batch_nonce.to_string())
        .add_attribute("tx_count", batch.transactions.len().to_string())
}

pub fn new_slash_event(
    hyperion_id: u64,
    validator: &str,
    power: u64,
    fraction: Decimal,
    reason: &str,
) -> Event {
    Event::new("hyperion_slash")
        .add_attribute("hyperion_id", hyperion_id.to_string())
        .add_attribute("validator", validator)
        .add_attribute("power", power.to_string())
        .add_attribute("fraction", fraction.to_string())
        .add_attribute("reason", reason)
}
