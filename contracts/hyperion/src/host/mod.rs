//! The host chain modules the bridge drives: staking, bank and the ERC20
//! token-pair registry.
//!
//! Every side effect is queued in a storage-backed outbox and drained into the
//! `Response` of the entry point, so a discarded cache context discards the
//! side effects it queued.

pub mod bank;
pub mod erc20;
pub mod staking;

use cosmwasm_std::{CosmosMsg, StdResult, Storage};
use cw_storage_plus::Deque;
use hyperion_bindings::HyperionMsg;

const OUTBOX: Deque<CosmosMsg<HyperionMsg>> = Deque::new("host_outbox");

pub(crate) fn queue(
    storage: &mut dyn Storage,
    msg: impl Into<CosmosMsg<HyperionMsg>>,
) -> StdResult<()> {
    OUTBOX.push_back(storage, &msg.into())
}

/// Takes every queued message, in queue order.
pub fn drain(storage: &mut dyn Storage) -> StdResult<Vec<CosmosMsg<HyperionMsg>>> {
    let mut msgs = vec![];
    while let Some(msg) = OUTBOX.pop_front(storage)? {
        msgs.push(msg);
    }
    Ok(msgs)
}

#[cfg(test)]
pub(crate) fn pending(storage: &dyn Storage) -> Vec<CosmosMsg<HyperionMsg>> {
    OUTBOX
        .iter(storage)
        .unwrap()
        .collect::<StdResult<Vec<_>>>()
        .unwrap()
}
